use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub region: Option<String>,
    pub tier_id: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub note: String,
    pub timestamp: i64,
}

/// Lifecycle notifications published by the order store.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created(OrderCreatedEvent),
    StatusChanged(OrderStatusChangedEvent),
}
