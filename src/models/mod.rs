pub mod auth_state;
pub mod session;
pub mod user;
pub mod view;

pub use auth_state::AuthState;
pub use session::Session;
pub use user::User;
pub use view::{AuthView, ViewModel};
