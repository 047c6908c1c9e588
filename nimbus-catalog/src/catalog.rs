use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::tier::{TierCatalogEntry, GLOBAL_REGION};

/// Presentation entry for a tier picker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierOption {
    pub key: String,
    pub label: String,
}

/// Tiers available in one region, in feed order, with O(1) key lookup.
#[derive(Debug, Clone, Default)]
pub struct PricingBucket {
    options: Vec<TierOption>,
    entries: HashMap<String, TierCatalogEntry>,
}

impl PricingBucket {
    /// Returns true when an existing entry with the same key was replaced.
    fn insert(&mut self, entry: TierCatalogEntry) -> bool {
        let key = entry.key.clone();
        let label = entry.display_name.clone();

        match self.entries.insert(key.clone(), entry) {
            Some(_) => {
                if let Some(option) = self.options.iter_mut().find(|o| o.key == key) {
                    option.label = label;
                }
                true
            }
            None => {
                self.options.push(TierOption { key, label });
                false
            }
        }
    }

    pub fn options(&self) -> &[TierOption] {
        &self.options
    }

    pub fn get(&self, key: &str) -> Option<&TierCatalogEntry> {
        self.entries.get(key)
    }

    /// Entries in option order.
    pub fn entries(&self) -> impl Iterator<Item = &TierCatalogEntry> {
        self.options.iter().filter_map(|o| self.entries.get(&o.key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Pricing feed must be a JSON array of rows, got {0}")]
    InvalidFeed(String),

    #[error("Pricing feed is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Region-keyed tier catalog built from the upstream pricing feed.
#[derive(Debug, Clone)]
pub struct TierCatalog {
    regions: HashMap<String, PricingBucket>,
    global: PricingBucket,
    built_at: DateTime<Utc>,
}

impl TierCatalog {
    pub fn empty() -> Self {
        Self {
            regions: HashMap::new(),
            global: PricingBucket::default(),
            built_at: Utc::now(),
        }
    }

    /// Every entry lands in its region bucket and in GLOBAL, so fallback
    /// lookups see every tier. Duplicate keys are last-write-wins.
    pub fn from_rows(rows: &[Value]) -> Self {
        let mut catalog = Self::empty();

        for row in rows {
            let entry = TierCatalogEntry::from_row(row);

            if !entry.is_global() {
                catalog
                    .regions
                    .entry(entry.region_key.clone())
                    .or_default()
                    .insert(entry.clone());
            }

            let key = entry.key.clone();
            if catalog.global.insert(entry) {
                warn!("Duplicate tier key {} in pricing feed, keeping the later row", key);
            }
        }

        debug!(
            "Built tier catalog: {} tiers across {} regions",
            catalog.global.len(),
            catalog.regions.len()
        );
        catalog
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        match serde_json::from_str::<Value>(raw)? {
            Value::Array(rows) => Ok(Self::from_rows(&rows)),
            other => Err(CatalogError::InvalidFeed(json_kind(&other).to_string())),
        }
    }

    /// Region bucket for `region` (case-insensitive), or GLOBAL when asked for it.
    pub fn bucket(&self, region: &str) -> Option<&PricingBucket> {
        let key = region.trim().to_lowercase();
        if key == GLOBAL_REGION {
            return Some(&self.global);
        }
        self.regions.get(&key)
    }

    pub fn global(&self) -> &PricingBucket {
        &self.global
    }

    /// Region keys with a dedicated bucket, sorted.
    pub fn regions(&self) -> Vec<&str> {
        let mut regions: Vec<&str> = self.regions.keys().map(String::as_str).collect();
        regions.sort_unstable();
        regions
    }

    /// Distinct tiers across all regions.
    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
