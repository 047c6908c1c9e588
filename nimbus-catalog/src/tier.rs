use nimbus_core::resolve_currency_code;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

/// Region key for rows without a region, and the name of the fallback bucket.
pub const GLOBAL_REGION: &str = "__global__";

const REGION_PATHS: &[&[&str]] = &[
    &["region"],
    &["region", "code"],
    &["region", "region"],
    &["region_code"],
    &["product", "region"],
];

// Precedence matters: the first non-empty value wins.
const IDENTITY_PATHS: &[&[&str]] = &[
    &["productable_id"],
    &["product_id"],
    &["id"],
    &["product", "id"],
    &["product", "provider_resource_id"],
    &["product", "name"],
];

const PRICE_PATHS: &[&[&str]] = &[
    &["pricing", "effective", "price_local"],
    &["pricing", "effective", "price"],
    &["pricing", "effective", "unit_price"],
    &["pricing", "effective", "amount"],
    &["price"],
    &["product", "price"],
];

const CURRENCY_PATHS: &[&[&str]] = &[
    &["pricing", "effective", "currency"],
    &["pricing", "effective", "currency_code"],
    &["currency"],
    &["currency_code"],
];

const QUOTA_PATHS: &[&[&str]] = &[
    &["product", "quota"],
    &["quota"],
    &["pricing", "effective", "quota"],
];

const NAME_PATHS: &[&[&str]] = &[&["product", "name"], &["name"]];

/// Where a tier's product identity came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    /// Read from one of the row's id/name fields.
    Field,
    /// UUIDv5 over the row's canonical JSON; stable across rebuilds.
    Hashed,
    /// Random; the row carried nothing to derive an identity from.
    Random,
}

/// A purchasable capacity tier within one region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TierCatalogEntry {
    pub key: String,
    pub region_key: String,
    pub product_identity: String,
    pub identity_source: IdentitySource,
    pub display_name: String,
    pub currency: Option<String>,
    pub unit_price: Decimal,
    pub quota: Option<Decimal>,
}

impl TierCatalogEntry {
    /// Normalizes one upstream pricing row. Never fails: every field is
    /// optional and malformed values degrade to defaults.
    pub fn from_row(row: &Value) -> Self {
        let region_key = first_text(row, REGION_PATHS)
            .map(|r| r.to_lowercase())
            .unwrap_or_else(|| GLOBAL_REGION.to_string());

        let (product_identity, identity_source) = match first_text(row, IDENTITY_PATHS) {
            Some(identity) => (identity, IdentitySource::Field),
            None => synthetic_identity(row),
        };

        let unit_price = PRICE_PATHS
            .iter()
            .find_map(|p| lookup(row, p).and_then(decimal_value))
            .filter(|price| !price.is_sign_negative())
            .unwrap_or(Decimal::ZERO);

        let currency = CURRENCY_PATHS.iter().find_map(|p| {
            lookup(row, p)
                .and_then(Value::as_str)
                .and_then(|c| resolve_currency_code(Some(c)))
        });

        let quota = QUOTA_PATHS
            .iter()
            .find_map(|p| lookup(row, p).and_then(decimal_value));

        let display_name =
            first_text(row, NAME_PATHS).unwrap_or_else(|| product_identity.clone());

        Self {
            key: composite_key(&region_key, &product_identity),
            region_key,
            product_identity,
            identity_source,
            display_name,
            currency,
            unit_price,
            quota,
        }
    }

    pub fn is_global(&self) -> bool {
        self.region_key == GLOBAL_REGION
    }
}

pub fn composite_key(region_key: &str, product_identity: &str) -> String {
    format!("{}::{}", region_key, product_identity)
}

fn synthetic_identity(row: &Value) -> (String, IdentitySource) {
    let has_attributes = match row {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    };

    if has_attributes {
        // serde_json maps are ordered by key, so this rendering is canonical.
        let canonical = row.to_string();
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, canonical.as_bytes());
        (format!("tier-{}", id), IdentitySource::Hashed)
    } else {
        (format!("synthetic-{}", Uuid::new_v4()), IdentitySource::Random)
    }
}

fn lookup<'a>(row: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(row, |value, key| value.get(*key))
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(row: &Value, paths: &[&[&str]]) -> Option<String> {
    paths
        .iter()
        .find_map(|p| lookup(row, p).and_then(non_empty_text))
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}
