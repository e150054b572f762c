pub mod coordinator;

pub use coordinator::SessionCoordinator;
