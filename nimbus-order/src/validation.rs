use nimbus_catalog::{ResolvedProfile, ServiceProfile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::CustomerType;

/// Who the capacity is being ordered for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Assignment {
    #[serde(rename = "type")]
    pub kind: CustomerType,
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
}

/// The operator's draft selection before submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSelection {
    pub assignment: Assignment,
    pub service_profiles: Vec<ServiceProfile>,
}

pub type FieldErrors = BTreeMap<String, String>;

/// Field-scoped, user-correctable errors. Empty means the selection may be
/// submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub workflow: FieldErrors,
    /// Keyed by service profile id.
    pub profiles: BTreeMap<String, FieldErrors>,
}

impl ValidationReport {
    pub fn can_submit(&self) -> bool {
        self.workflow.is_empty() && self.profiles.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.workflow.len() + self.profiles.values().map(BTreeMap::len).sum::<usize>()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Checks a selection against its resolved profiles. Pure; callers decide how
/// to surface the report.
pub fn validate_selection(
    selection: &WorkflowSelection,
    resolved: &[ResolvedProfile],
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let assignment = &selection.assignment;

    if selection.service_profiles.is_empty() {
        report.workflow.insert(
            "serviceProfiles".to_string(),
            "Add at least one service profile".to_string(),
        );
    }

    match assignment.kind {
        CustomerType::Tenant => {
            if is_blank(assignment.tenant_id.as_deref()) {
                report
                    .workflow
                    .insert("tenantId".to_string(), "Select a tenant".to_string());
            }
        }
        CustomerType::User => {
            if is_blank(assignment.tenant_id.as_deref()) {
                report
                    .workflow
                    .insert("tenantId".to_string(), "Select the user's tenant".to_string());
            }
            if is_blank(assignment.user_id.as_deref()) {
                report
                    .workflow
                    .insert("userId".to_string(), "Select a user".to_string());
            }
        }
        CustomerType::Unassigned => {}
    }

    let by_id: HashMap<&str, &ResolvedProfile> =
        resolved.iter().map(|r| (r.profile_id.as_str(), r)).collect();

    for profile in &selection.service_profiles {
        let errors = validate_profile(profile, by_id.get(profile.id.as_str()).copied());
        if !errors.is_empty() {
            report.profiles.insert(profile.id.clone(), errors);
        }
    }

    report
}

fn validate_profile(profile: &ServiceProfile, resolved: Option<&ResolvedProfile>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let has_override = profile.override_price().is_some();

    if profile.region.trim().is_empty() {
        errors.insert("region".to_string(), "Select a region".to_string());
    }

    if profile.tier_key.trim().is_empty() {
        if !has_override {
            errors.insert("tierKey".to_string(), "Select a tier".to_string());
        }
    } else if !has_override && !resolved.is_some_and(|r| r.has_tier_data) {
        errors.insert(
            "tierKey".to_string(),
            "No pricing found for this tier; enter a unit price".to_string(),
        );
    }

    // A missing term prices as one month and is accepted as such.
    if profile.months.is_some_and(|m| m < 1) {
        errors.insert("months".to_string(), "Term must be at least 1 month".to_string());
    }

    match resolved {
        Some(r) if r.price_out_of_range => {
            errors.insert(
                "unitPrice".to_string(),
                "Unit price times term is too large".to_string(),
            );
        }
        Some(r) if r.unit_price > Decimal::ZERO => {}
        _ => {
            errors.insert(
                "unitPrice".to_string(),
                "Unit price must be greater than zero".to_string(),
            );
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_catalog::{resolve_profiles, TierCatalog};
    use serde_json::json;

    fn catalog() -> TierCatalog {
        TierCatalog::from_rows(&[
            json!({ "id": "std", "name": "Standard", "price": 10, "region": "lagos-1" }),
            json!({ "id": "free", "name": "Trial", "price": 0, "region": "lagos-1" }),
        ])
    }

    fn profile(id: &str, tier_key: &str) -> ServiceProfile {
        ServiceProfile {
            id: id.to_string(),
            name: "Primary".to_string(),
            region: "lagos-1".to_string(),
            tier_key: tier_key.to_string(),
            months: Some(12),
            unit_price_override: None,
        }
    }

    fn check(selection: &WorkflowSelection) -> ValidationReport {
        let resolved = resolve_profiles(&selection.service_profiles, &catalog(), None);
        validate_selection(selection, &resolved)
    }

    #[test]
    fn test_valid_selection() {
        let selection = WorkflowSelection {
            assignment: Assignment {
                kind: CustomerType::Tenant,
                tenant_id: Some("t-1".to_string()),
                user_id: None,
            },
            service_profiles: vec![profile("p1", "lagos-1::std")],
        };
        let report = check(&selection);
        assert!(report.can_submit(), "{:?}", report);
    }

    #[test]
    fn test_zero_profiles_blocks_submission() {
        let report = check(&WorkflowSelection::default());
        assert!(!report.can_submit());
        assert!(report.workflow.contains_key("serviceProfiles"));
    }

    #[test]
    fn test_assignment_requirements() {
        let mut selection = WorkflowSelection {
            assignment: Assignment {
                kind: CustomerType::User,
                tenant_id: Some("  ".to_string()),
                user_id: None,
            },
            service_profiles: vec![profile("p1", "lagos-1::std")],
        };
        let report = check(&selection);
        assert!(report.workflow.contains_key("tenantId"));
        assert!(report.workflow.contains_key("userId"));

        selection.assignment.kind = CustomerType::Tenant;
        let report = check(&selection);
        assert_eq!(report.workflow.len(), 1);
        assert!(report.workflow.contains_key("tenantId"));
    }

    #[test]
    fn test_profile_errors_are_keyed_by_id() {
        let mut missing_region = profile("p1", "lagos-1::std");
        missing_region.region = String::new();
        let mut bad_term = profile("p2", "lagos-1::std");
        bad_term.months = Some(0);

        let selection = WorkflowSelection {
            assignment: Assignment::default(),
            service_profiles: vec![
                missing_region,
                bad_term,
                profile("p3", "lagos-1::unknown"),
                profile("p4", "lagos-1::free"),
            ],
        };
        let report = check(&selection);

        assert!(report.profiles["p1"].contains_key("region"));
        assert!(report.profiles["p2"].contains_key("months"));
        assert!(report.profiles["p3"].contains_key("tierKey"));
        assert!(report.profiles["p3"].contains_key("unitPrice"));
        assert!(!report.profiles["p4"].contains_key("tierKey"));
        assert!(report.profiles["p4"].contains_key("unitPrice"));
        assert!(report.workflow.is_empty());
        assert_eq!(report.error_count(), 5);
    }

    #[test]
    fn test_missing_term_counts_as_one_month() {
        let mut open_ended = profile("p1", "lagos-1::std");
        open_ended.months = None;

        let selection = WorkflowSelection {
            assignment: Assignment::default(),
            service_profiles: vec![open_ended],
        };
        let resolved = resolve_profiles(&selection.service_profiles, &catalog(), None);
        assert_eq!(resolved[0].months, 1);
        assert!(validate_selection(&selection, &resolved).can_submit());
    }

    #[test]
    fn test_oversized_price_is_reported() {
        let mut huge = profile("p1", "lagos-1::std");
        huge.months = Some(i64::from(u32::MAX));
        huge.unit_price_override = Some("100000000000000000000".to_string());

        let selection = WorkflowSelection {
            assignment: Assignment::default(),
            service_profiles: vec![huge],
        };
        let report = check(&selection);
        assert_eq!(report.profiles["p1"]["unitPrice"], "Unit price times term is too large");
        assert!(!report.can_submit());
    }

    #[test]
    fn test_override_covers_unknown_tier() {
        let mut custom = profile("p1", "lagos-1::bespoke");
        custom.unit_price_override = Some("40".to_string());

        let selection = WorkflowSelection {
            assignment: Assignment::default(),
            service_profiles: vec![custom],
        };
        assert!(check(&selection).can_submit());
    }
}
