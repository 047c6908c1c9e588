use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One resolved service profile as sent to the order-processing service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub profile_id: String,
    pub name: String,
    pub region: String,
    pub tier_key: String,
    pub quantity: u32,
    pub months: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub currency: String,
    /// Audit bag for the receiving service (tier, assignment, pricing).
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub reference: Uuid,
    pub country_code: String,
    pub currency_code: String,
    pub line_items: Vec<LineItem>,
    pub submitted_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub reference: Uuid,
    pub external_id: String,
    pub accepted_at: DateTime<Utc>,
}

/// Downstream order-creation service.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, Box<dyn std::error::Error + Send + Sync>>;
}
