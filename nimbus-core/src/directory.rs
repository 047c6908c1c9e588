use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Regions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Region {
    pub code: String,
    pub name: String,
    pub country_code: String,
}

/// Read-only view of the regions capacity can be ordered in.
#[derive(Debug, Clone, Default)]
pub struct RegionDirectory {
    regions: Vec<Region>,
}

impl RegionDirectory {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    pub fn list(&self) -> &[Region] {
        &self.regions
    }

    /// Case-insensitive lookup by region code.
    pub fn get(&self, code: &str) -> Option<&Region> {
        let code = code.trim();
        self.regions.iter().find(|r| r.code.eq_ignore_ascii_case(code))
    }

    pub fn country_for(&self, code: &str) -> Option<&str> {
        self.get(code).map(|r| r.country_code.as_str())
    }
}

// ============================================================================
// Country -> currency
// ============================================================================

#[derive(Debug, Clone)]
pub struct CurrencyDirectory {
    by_country: HashMap<String, String>,
}

impl CurrencyDirectory {
    pub fn empty() -> Self {
        Self {
            by_country: HashMap::new(),
        }
    }

    pub fn insert(&mut self, country_code: &str, currency_code: &str) {
        self.by_country.insert(
            country_code.trim().to_ascii_uppercase(),
            currency_code.trim().to_ascii_uppercase(),
        );
    }

    pub fn currency_for(&self, country_code: &str) -> Option<&str> {
        self.by_country
            .get(&country_code.trim().to_ascii_uppercase())
            .map(String::as_str)
    }
}

impl Default for CurrencyDirectory {
    fn default() -> Self {
        let mut directory = Self::empty();
        for (country, currency) in [
            ("US", "USD"),
            ("CA", "CAD"),
            ("GB", "GBP"),
            ("IE", "EUR"),
            ("DE", "EUR"),
            ("FR", "EUR"),
            ("NL", "EUR"),
            ("NG", "NGN"),
            ("GH", "GHS"),
            ("KE", "KES"),
            ("ZA", "ZAR"),
            ("IN", "INR"),
            ("SG", "SGD"),
            ("JP", "JPY"),
            ("AU", "AUD"),
            ("BR", "BRL"),
        ] {
            directory.insert(country, currency);
        }
        directory
    }
}

// ============================================================================
// Tenant / user assignment
// ============================================================================

/// A tenant or user an order can be assigned to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait AssignmentDirectory: Send + Sync {
    async fn tenant(&self, tenant_id: &str) -> Option<Party>;

    async fn user(&self, tenant_id: &str, user_id: &str) -> Option<Party>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAssignmentDirectory {
    tenants: HashMap<String, Party>,
    users: HashMap<(String, String), Party>,
}

impl InMemoryAssignmentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant: Party) -> Self {
        self.tenants.insert(tenant.id.clone(), tenant);
        self
    }

    pub fn with_user(mut self, tenant_id: &str, user: Party) -> Self {
        self.users
            .insert((tenant_id.to_string(), user.id.clone()), user);
        self
    }
}

#[async_trait]
impl AssignmentDirectory for InMemoryAssignmentDirectory {
    async fn tenant(&self, tenant_id: &str) -> Option<Party> {
        self.tenants.get(tenant_id).cloned()
    }

    async fn user(&self, tenant_id: &str, user_id: &str) -> Option<Party> {
        self.users
            .get(&(tenant_id.to_string(), user_id.to_string()))
            .cloned()
    }
}
