pub mod catalog;
pub mod pricing;
pub mod tier;

pub use catalog::{CatalogError, PricingBucket, TierCatalog, TierOption};
pub use pricing::{resolve_profile, resolve_profiles, ResolvedProfile, ServiceProfile};
pub use tier::{IdentitySource, TierCatalogEntry, GLOBAL_REGION};
