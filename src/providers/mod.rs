pub mod base;
pub mod gotrue_provider;
pub mod listeners;

// Re-export from base.rs so we can do "use crate::providers::*;"
pub use base::*;
pub use listeners::{AuthChangeListener, ListenerRegistry, Subscription};
pub use gotrue_provider::{GoTrueProvider, GoTrueProviderConfig};
