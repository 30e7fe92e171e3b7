pub mod app;
pub mod connection;
pub mod registry;

pub use app::AppState;
pub use connection::{ConnectionHandle, SubscriptionId};
pub use registry::{ConnectionRegistry, PendingSubscription};
