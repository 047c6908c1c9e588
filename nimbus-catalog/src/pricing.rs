use nimbus_core::{resolve_currency_code, codes::DEFAULT_CURRENCY_CODE};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use crate::catalog::TierCatalog;

/// Pre-submission draft of one region/tier/term selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub tier_key: String,
    #[serde(default)]
    pub months: Option<i64>,
    /// Free-form operator input; only a positive decimal counts as an override.
    #[serde(default, deserialize_with = "text_or_number")]
    pub unit_price_override: Option<String>,
}

impl ServiceProfile {
    pub fn override_price(&self) -> Option<Decimal> {
        parse_override(self.unit_price_override.as_deref())
    }
}

/// Price resolution output for one profile. Carries resolution gaps as flags
/// rather than errors so the caller can prompt for a manual override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedProfile {
    pub profile_id: String,
    pub name: String,
    pub region: String,
    pub tier_key: String,
    pub tier_name: Option<String>,
    pub months: u32,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub currency: String,
    pub has_tier_data: bool,
    pub using_fallback_catalog: bool,
    pub override_applied: bool,
    /// `months × unit_price` does not fit in a `Decimal`; `subtotal` is zero.
    #[serde(default)]
    pub price_out_of_range: bool,
}

pub fn parse_override(raw: Option<&str>) -> Option<Decimal> {
    raw.and_then(|r| Decimal::from_str(r.trim()).ok())
        .filter(|price| *price > Decimal::ZERO)
}

/// Resolves the unit price, subtotal and currency for one draft profile.
///
/// Deterministic for fixed inputs; the region bucket is preferred and the
/// GLOBAL bucket is used when the region has none.
pub fn resolve_profile(
    profile: &ServiceProfile,
    catalog: &TierCatalog,
    display_currency: Option<&str>,
) -> ResolvedProfile {
    let (bucket, using_fallback_catalog) = match catalog.bucket(&profile.region) {
        Some(bucket) if !profile.region.trim().is_empty() => (bucket, false),
        _ => (catalog.global(), true),
    };

    let entry = bucket.get(profile.tier_key.trim());
    let override_price = profile.override_price();

    let unit_price = override_price
        .or_else(|| entry.map(|e| e.unit_price))
        .unwrap_or(Decimal::ZERO);

    let months = u32::try_from(profile.months.unwrap_or(1).max(1)).unwrap_or(u32::MAX);
    let subtotal = Decimal::from(months).checked_mul(unit_price);
    if subtotal.is_none() {
        debug!(
            "Subtotal for profile {} overflows ({} months at {})",
            profile.id, months, unit_price
        );
    }

    let currency = entry
        .and_then(|e| e.currency.clone())
        .or_else(|| resolve_currency_code(display_currency))
        .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());

    if entry.is_none() {
        debug!(
            "No tier data for {} in region {} (fallback: {})",
            profile.tier_key, profile.region, using_fallback_catalog
        );
    }

    ResolvedProfile {
        profile_id: profile.id.clone(),
        name: profile.name.clone(),
        region: profile.region.clone(),
        tier_key: profile.tier_key.clone(),
        tier_name: entry.map(|e| e.display_name.clone()),
        months,
        quantity: 1,
        unit_price,
        subtotal: subtotal.unwrap_or(Decimal::ZERO),
        currency,
        has_tier_data: entry.is_some(),
        using_fallback_catalog,
        override_applied: override_price.is_some(),
        price_out_of_range: subtotal.is_none(),
    }
}

pub fn resolve_profiles(
    profiles: &[ServiceProfile],
    catalog: &TierCatalog,
    display_currency: Option<&str>,
) -> Vec<ResolvedProfile> {
    profiles
        .iter()
        .map(|p| resolve_profile(p, catalog, display_currency))
        .collect()
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
