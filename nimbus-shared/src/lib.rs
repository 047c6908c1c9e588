pub mod models;
pub mod pii;

pub use models::events::{OrderCreatedEvent, OrderEvent, OrderStatusChangedEvent};
pub use pii::Masked;
