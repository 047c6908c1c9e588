use chrono::{DateTime, Utc};
use nimbus_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Order status in the provisioning lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    PaymentConfirmed,
    Provisioning,
    Active,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::PaymentConfirmed => "payment_confirmed",
            OrderStatus::Provisioning => "provisioning",
            OrderStatus::Active => "active",
            OrderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    AdminApproved,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::AdminApproved => "admin_approved",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    Tenant,
    User,
    #[default]
    Unassigned,
}

/// Monetary breakdown; every field is clamped to zero or above.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub total: Decimal,
}

impl Billing {
    pub fn non_negative(self) -> Self {
        let clamp = |d: Decimal| d.max(Decimal::ZERO);
        Self {
            unit_price: clamp(self.unit_price),
            subtotal: clamp(self.subtotal),
            tax: clamp(self.tax),
            total: clamp(self.total),
        }
    }

    /// tax = subtotal × rate rounded to cents; total = subtotal + tax.
    /// `None` when either result does not fit in a `Decimal`.
    pub fn from_subtotal(
        unit_price: Decimal,
        subtotal: Decimal,
        tax_rate: Decimal,
    ) -> Option<Self> {
        let tax = subtotal.checked_mul(tax_rate)?.round_dp(2);
        let total = subtotal.checked_add(tax)?;
        Some(
            Self {
                unit_price,
                subtotal,
                tax,
                total,
            }
            .non_negative(),
        )
    }
}

/// Immutable audit record of one status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    pub id: Uuid,
    pub status: OrderStatus,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// A storage-capacity request moving through the provisioning lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer_type: CustomerType,
    pub customer_name: Option<String>,
    pub customer_email: Option<Masked<String>>,
    pub country_code: String,
    pub currency_code: String,
    pub region: Option<String>,
    pub tier_id: Option<String>,
    pub tier_name: Option<String>,
    pub quantity: u32,
    pub months: u32,
    pub billing: Billing,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub timeline: Vec<TimelineEntry>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub reviewer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload. Everything is optional; see `OrderStore::create_order`
/// for the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrder {
    pub customer_type: Option<CustomerType>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub country_code: Option<String>,
    pub currency_code: Option<String>,
    pub region: Option<String>,
    pub tier_id: Option<String>,
    pub tier_name: Option<String>,
    pub quantity: Option<u32>,
    pub months: Option<u32>,
    pub billing: Option<Billing>,
    pub payment_method: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub reviewer: Option<String>,
    /// Note for the initial timeline entry.
    pub note: Option<String>,
}

impl NewOrder {
    /// Status a fresh order starts in when the payload does not name one.
    pub fn initial_status(&self) -> OrderStatus {
        match (self.status, self.payment_status) {
            (Some(status), _) => status,
            (None, Some(PaymentStatus::Paid)) => OrderStatus::PaymentConfirmed,
            (None, _) => OrderStatus::PendingPayment,
        }
    }
}

/// Partial update merged into an existing order. `id`, `created_at` and the
/// timeline are not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<String>,
    pub billing: Option<Billing>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub reviewer: Option<String>,
    pub quantity: Option<u32>,
    pub months: Option<u32>,
    /// Timeline note used when the status changes.
    pub note: Option<String>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = Some(payment_status);
        self
    }

    /// Merges every supplied field except `status`, which the store applies
    /// together with the timeline.
    pub(crate) fn apply_fields(self, order: &mut Order) {
        if let Some(v) = self.payment_status {
            order.payment_status = v;
        }
        if let Some(v) = self.payment_method {
            order.payment_method = Some(v);
        }
        if let Some(v) = self.billing {
            order.billing = v.non_negative();
        }
        if let Some(v) = self.customer_name {
            order.customer_name = Some(v);
        }
        if let Some(v) = self.customer_email {
            order.customer_email = Some(Masked(v));
        }
        if let Some(v) = self.notes {
            order.notes = Some(v);
        }
        if let Some(v) = self.reviewer {
            order.reviewer = Some(v);
        }
        if let Some(v) = self.quantity {
            order.quantity = v.max(1);
        }
        if let Some(v) = self.months {
            order.months = v.max(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_rules() {
        let explicit = NewOrder {
            status: Some(OrderStatus::Provisioning),
            payment_status: Some(PaymentStatus::Paid),
            ..NewOrder::default()
        };
        assert_eq!(explicit.initial_status(), OrderStatus::Provisioning);

        let paid = NewOrder {
            payment_status: Some(PaymentStatus::Paid),
            ..NewOrder::default()
        };
        assert_eq!(paid.initial_status(), OrderStatus::PaymentConfirmed);

        assert_eq!(NewOrder::default().initial_status(), OrderStatus::PendingPayment);
    }

    #[test]
    fn test_billing_never_negative() {
        let billing = Billing {
            unit_price: Decimal::from(-1),
            subtotal: Decimal::from(10),
            tax: Decimal::from(-3),
            total: Decimal::from(7),
        }
        .non_negative();
        assert_eq!(billing.unit_price, Decimal::ZERO);
        assert_eq!(billing.tax, Decimal::ZERO);
        assert_eq!(billing.subtotal, Decimal::from(10));
    }

    #[test]
    fn test_billing_from_subtotal() {
        let billing = Billing::from_subtotal(
            Decimal::new(1000, 2),
            Decimal::new(3000, 2),
            Decimal::new(75, 3),
        )
        .unwrap();
        assert_eq!(billing.tax, Decimal::new(225, 2));
        assert_eq!(billing.total, Decimal::new(3225, 2));
    }

    #[test]
    fn test_billing_overflow_is_none() {
        let rate = Decimal::new(75, 3);
        assert!(Billing::from_subtotal(Decimal::ONE, Decimal::MAX, rate).is_none());
        assert!(Billing::from_subtotal(Decimal::ONE, Decimal::MAX, Decimal::ZERO).is_some());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
        let status: PaymentStatus = serde_json::from_str("\"admin_approved\"").unwrap();
        assert_eq!(status, PaymentStatus::AdminApproved);
    }
}
