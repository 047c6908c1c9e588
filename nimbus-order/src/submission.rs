use async_trait::async_trait;
use chrono::Utc;
use nimbus_catalog::{resolve_profiles, ResolvedProfile, TierCatalog};
use nimbus_core::{
    normalize_country_code, resolve_currency_code, AssignmentDirectory, CurrencyDirectory,
    LineItem, OrderSubmitter, Party, RegionDirectory, SubmissionReceipt, SubmissionRequest,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Billing, CustomerType, NewOrder};
use crate::store::OrderStore;
use crate::validation::{validate_selection, Assignment, ValidationReport, WorkflowSelection};

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPolicy {
    pub tax_rate: Decimal,
    pub default_currency: String,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::ZERO,
            default_currency: nimbus_core::codes::DEFAULT_CURRENCY_CODE.to_string(),
        }
    }
}

/// Everything the operator filled in before pressing submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionDraft {
    #[serde(flatten)]
    pub selection: WorkflowSelection,
    pub country_code: Option<String>,
    pub display_currency: Option<String>,
    pub fast_track: bool,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub submitted_by: Option<String>,
}

/// Priced and validated selection, not yet sent anywhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub country_code: String,
    pub display_currency: String,
    pub profiles: Vec<ResolvedProfile>,
    /// `None` when the sum does not fit in a `Decimal`.
    pub subtotal: Option<Decimal>,
    pub validation: ValidationReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub receipt: SubmissionReceipt,
    pub order_ids: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Selection has {} validation error(s)", .0.error_count())]
    Validation(ValidationReport),

    #[error("Order service rejected the submission: {0}")]
    Rejected(String),
}

/// Prices a draft, validates it, sends it downstream, and only on
/// confirmation records local orders.
pub struct SubmissionOrchestrator {
    submitter: Arc<dyn OrderSubmitter>,
    store: Arc<OrderStore>,
    assignments: Arc<dyn AssignmentDirectory>,
    regions: RegionDirectory,
    currencies: CurrencyDirectory,
    policy: SubmissionPolicy,
}

impl SubmissionOrchestrator {
    pub fn new(
        submitter: Arc<dyn OrderSubmitter>,
        store: Arc<OrderStore>,
        assignments: Arc<dyn AssignmentDirectory>,
        regions: RegionDirectory,
        currencies: CurrencyDirectory,
        policy: SubmissionPolicy,
    ) -> Self {
        Self {
            submitter,
            store,
            assignments,
            regions,
            currencies,
            policy,
        }
    }

    /// Country from the draft, else the country of the first profile's region.
    fn country_for(&self, draft: &SubmissionDraft) -> String {
        let requested = draft
            .country_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .or_else(|| {
                draft
                    .selection
                    .service_profiles
                    .first()
                    .and_then(|p| self.regions.country_for(&p.region))
            });
        normalize_country_code(requested)
    }

    fn billing_for(&self, profile: &ResolvedProfile) -> Option<Billing> {
        Billing::from_subtotal(profile.unit_price, profile.subtotal, self.policy.tax_rate)
    }

    pub fn quote(&self, draft: &SubmissionDraft, catalog: &TierCatalog) -> Quote {
        let country_code = self.country_for(draft);
        let display_currency = resolve_currency_code(draft.display_currency.as_deref())
            .or_else(|| {
                self.currencies
                    .currency_for(&country_code)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| self.policy.default_currency.clone());

        let profiles = resolve_profiles(
            &draft.selection.service_profiles,
            catalog,
            Some(display_currency.as_str()),
        );
        let mut validation = validate_selection(&draft.selection, &profiles);

        for profile in profiles.iter().filter(|p| !p.price_out_of_range) {
            if self.billing_for(profile).is_none() {
                validation
                    .profiles
                    .entry(profile.profile_id.clone())
                    .or_default()
                    .insert(
                        "unitPrice".to_string(),
                        "Total with tax is too large".to_string(),
                    );
            }
        }

        let subtotal = profiles
            .iter()
            .try_fold(Decimal::ZERO, |sum, p| sum.checked_add(p.subtotal));
        if subtotal.is_none() {
            validation.workflow.insert(
                "subtotal".to_string(),
                "Combined subtotal is too large".to_string(),
            );
        }

        Quote {
            country_code,
            display_currency,
            profiles,
            subtotal,
            validation,
        }
    }

    pub async fn submit(
        &self,
        draft: &SubmissionDraft,
        catalog: &TierCatalog,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let quote = self.quote(draft, catalog);
        if !quote.validation.can_submit() {
            return Err(SubmissionError::Validation(quote.validation));
        }

        let mut priced = Vec::with_capacity(quote.profiles.len());
        for profile in &quote.profiles {
            match self.billing_for(profile) {
                Some(billing) => priced.push((profile, billing)),
                None => return Err(SubmissionError::Validation(quote.validation)),
            }
        }

        let assignment = &draft.selection.assignment;
        let request = SubmissionRequest {
            reference: Uuid::new_v4(),
            country_code: quote.country_code.clone(),
            currency_code: quote.display_currency.clone(),
            line_items: quote
                .profiles
                .iter()
                .map(|p| line_item(p, assignment))
                .collect(),
            submitted_by: draft.submitted_by.clone(),
            created_at: Utc::now(),
        };

        let receipt = self.submitter.submit(&request).await.map_err(|e| {
            warn!("Submission {} rejected: {}", request.reference, e);
            SubmissionError::Rejected(e.to_string())
        })?;
        info!(
            "Submission {} accepted as {} with {} line items",
            request.reference,
            receipt.external_id,
            request.line_items.len()
        );

        let customer = self.customer_for(assignment).await;
        let mut order_ids = Vec::with_capacity(quote.profiles.len());

        for (profile, billing) in priced {
            let payload = NewOrder {
                customer_type: Some(assignment.kind),
                customer_name: customer.as_ref().map(|c| c.name.clone()),
                customer_email: customer.as_ref().and_then(|c| c.email.clone()),
                country_code: Some(quote.country_code.clone()),
                currency_code: Some(profile.currency.clone()),
                region: Some(profile.region.clone()),
                tier_id: Some(profile.tier_key.clone()),
                tier_name: profile.tier_name.clone().or_else(|| Some(profile.name.clone())),
                quantity: Some(profile.quantity),
                months: Some(profile.months),
                billing: Some(billing),
                payment_method: draft.payment_method.clone(),
                notes: draft.notes.clone(),
                created_by: draft.submitted_by.clone(),
                note: Some(format!("Submitted as {}", receipt.external_id)),
                ..NewOrder::default()
            };

            let id = if draft.fast_track {
                self.store.fast_track_order(payload).await
            } else {
                self.store.create_order(payload).await
            };
            order_ids.push(id);
        }

        Ok(SubmissionOutcome { receipt, order_ids })
    }

    async fn customer_for(&self, assignment: &Assignment) -> Option<Party> {
        let tenant_id = assignment.tenant_id.as_deref()?;
        match assignment.kind {
            CustomerType::Tenant => self.assignments.tenant(tenant_id).await,
            CustomerType::User => {
                let user_id = assignment.user_id.as_deref()?;
                self.assignments.user(tenant_id, user_id).await
            }
            CustomerType::Unassigned => None,
        }
    }
}

fn line_item(profile: &ResolvedProfile, assignment: &Assignment) -> LineItem {
    LineItem {
        profile_id: profile.profile_id.clone(),
        name: profile.name.clone(),
        region: profile.region.clone(),
        tier_key: profile.tier_key.clone(),
        quantity: profile.quantity,
        months: profile.months,
        unit_price: profile.unit_price,
        subtotal: profile.subtotal,
        currency: profile.currency.clone(),
        metadata: json!({
            "tierKey": profile.tier_key,
            "tierName": profile.tier_name,
            "assignmentType": assignment.kind,
            "tenantId": assignment.tenant_id,
            "userId": assignment.user_id,
            "currency": profile.currency,
            "unitPrice": profile.unit_price,
            "subtotal": profile.subtotal,
            "usingFallbackCatalog": profile.using_fallback_catalog,
            "overrideApplied": profile.override_applied,
        }),
    }
}

/// Acknowledges submissions without a remote order service.
pub struct LocalOrderSubmitter;

#[async_trait]
impl OrderSubmitter for LocalOrderSubmitter {
    async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, Box<dyn std::error::Error + Send + Sync>> {
        if request.line_items.is_empty() {
            return Err("Submission has no line items".into());
        }

        Ok(SubmissionReceipt {
            reference: request.reference,
            external_id: format!("local_{}", request.reference.simple()),
            accepted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, PaymentStatus};
    use crate::scheduler::ProvisioningDelays;
    use nimbus_catalog::ServiceProfile;
    use nimbus_core::{InMemoryAssignmentDirectory, Region};
    use nimbus_store::InMemorySnapshotRepository;
    use std::sync::Mutex;

    struct RecordingSubmitter {
        requests: Mutex<Vec<SubmissionRequest>>,
    }

    #[async_trait]
    impl OrderSubmitter for RecordingSubmitter {
        async fn submit(
            &self,
            request: &SubmissionRequest,
        ) -> Result<SubmissionReceipt, Box<dyn std::error::Error + Send + Sync>> {
            self.requests.lock().unwrap().push(request.clone());
            LocalOrderSubmitter.submit(request).await
        }
    }

    struct RejectingSubmitter;

    #[async_trait]
    impl OrderSubmitter for RejectingSubmitter {
        async fn submit(
            &self,
            _request: &SubmissionRequest,
        ) -> Result<SubmissionReceipt, Box<dyn std::error::Error + Send + Sync>> {
            Err("quota exceeded for tenant".into())
        }
    }

    fn catalog() -> TierCatalog {
        TierCatalog::from_rows(&[serde_json::json!({
            "id": "std",
            "product": { "name": "Standard 500GB" },
            "pricing": { "effective": { "price_local": "10.00", "currency": "NGN" } },
            "region": "lagos-1"
        })])
    }

    fn draft() -> SubmissionDraft {
        SubmissionDraft {
            selection: WorkflowSelection {
                assignment: Assignment {
                    kind: CustomerType::Tenant,
                    tenant_id: Some("t-1".to_string()),
                    user_id: None,
                },
                service_profiles: vec![
                    ServiceProfile {
                        id: "p1".to_string(),
                        name: "Backups".to_string(),
                        region: "lagos-1".to_string(),
                        tier_key: "lagos-1::std".to_string(),
                        months: Some(3),
                        unit_price_override: None,
                    },
                    ServiceProfile {
                        id: "p2".to_string(),
                        name: "Media".to_string(),
                        region: "lagos-1".to_string(),
                        tier_key: "lagos-1::std".to_string(),
                        months: Some(1),
                        unit_price_override: Some("25.00".to_string()),
                    },
                ],
            },
            country_code: Some("ng".to_string()),
            submitted_by: Some("ops@nimbus.test".to_string()),
            ..SubmissionDraft::default()
        }
    }

    async fn orchestrator(
        submitter: Arc<dyn OrderSubmitter>,
    ) -> (SubmissionOrchestrator, Arc<OrderStore>) {
        let store = OrderStore::hydrate(
            Arc::new(InMemorySnapshotRepository::new()),
            ProvisioningDelays::default(),
        )
        .await;
        let directory = InMemoryAssignmentDirectory::new().with_tenant(Party {
            id: "t-1".to_string(),
            name: "Acme Storage".to_string(),
            email: Some("billing@acme.test".to_string()),
        });
        let orchestrator = SubmissionOrchestrator::new(
            submitter,
            store.clone(),
            Arc::new(directory),
            RegionDirectory::new(vec![Region {
                code: "lagos-1".to_string(),
                name: "Lagos".to_string(),
                country_code: "NG".to_string(),
            }]),
            CurrencyDirectory::default(),
            SubmissionPolicy {
                tax_rate: Decimal::new(75, 3),
                default_currency: "USD".to_string(),
            },
        );
        (orchestrator, store)
    }

    #[tokio::test]
    async fn test_quote_uses_country_currency() {
        let (orchestrator, _) = orchestrator(Arc::new(LocalOrderSubmitter)).await;
        let mut draft = draft();
        draft.selection.service_profiles[0].tier_key = "lagos-1::unknown".to_string();

        let quote = orchestrator.quote(&draft, &catalog());
        assert_eq!(quote.country_code, "NG");
        assert_eq!(quote.display_currency, "NGN");
        assert_eq!(quote.profiles[0].currency, "NGN");
        assert!(!quote.validation.can_submit());
        assert_eq!(quote.subtotal, Some(Decimal::new(2500, 2)));
    }

    #[tokio::test]
    async fn test_quote_country_falls_back_to_region() {
        let (orchestrator, _) = orchestrator(Arc::new(LocalOrderSubmitter)).await;
        let mut draft = draft();
        draft.country_code = Some("  ".to_string());

        let quote = orchestrator.quote(&draft, &catalog());
        assert_eq!(quote.country_code, "NG");
        assert_eq!(quote.display_currency, "NGN");

        draft.selection.service_profiles[0].region = "nowhere-9".to_string();
        let quote = orchestrator.quote(&draft, &catalog());
        assert_eq!(quote.country_code, "US");
    }

    #[tokio::test]
    async fn test_oversized_combined_subtotal_blocks_submission() {
        let submitter = Arc::new(RecordingSubmitter {
            requests: Mutex::new(Vec::new()),
        });
        let (orchestrator, store) = orchestrator(submitter.clone()).await;

        let mut draft = draft();
        for profile in &mut draft.selection.service_profiles {
            profile.months = Some(1);
            profile.unit_price_override = Some("50000000000000000000000000000".to_string());
        }

        let quote = orchestrator.quote(&draft, &catalog());
        assert_eq!(quote.subtotal, None);
        assert!(quote.validation.workflow.contains_key("subtotal"));

        let err = orchestrator.submit(&draft, &catalog()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
        assert!(submitter.requests.lock().unwrap().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_oversized_tax_blocks_submission() {
        let (orchestrator, store) = orchestrator(Arc::new(LocalOrderSubmitter)).await;

        let mut draft = draft();
        draft.selection.service_profiles.truncate(1);
        draft.selection.service_profiles[0].months = Some(1);
        draft.selection.service_profiles[0].unit_price_override =
            Some("75000000000000000000000000000".to_string());

        let quote = orchestrator.quote(&draft, &catalog());
        assert!(quote.subtotal.is_some());
        assert_eq!(
            quote.validation.profiles["p1"]["unitPrice"],
            "Total with tax is too large"
        );

        let err = orchestrator.submit(&draft, &catalog()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_submit_creates_orders_after_confirmation() {
        let submitter = Arc::new(RecordingSubmitter {
            requests: Mutex::new(Vec::new()),
        });
        let (orchestrator, store) = orchestrator(submitter.clone()).await;

        let outcome = orchestrator.submit(&draft(), &catalog()).await.unwrap();
        assert_eq!(outcome.order_ids.len(), 2);

        let requests = submitter.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        let item = &requests[0].line_items[0];
        assert_eq!(item.subtotal, Decimal::new(3000, 2));
        assert_eq!(item.metadata["tierName"], "Standard 500GB");
        assert_eq!(item.metadata["tenantId"], "t-1");
        assert_eq!(item.metadata["assignmentType"], "tenant");

        let order = store.get_order(outcome.order_ids[0]).await.unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.customer_name.as_deref(), Some("Acme Storage"));
        assert_eq!(order.currency_code, "NGN");
        assert_eq!(order.billing.tax, Decimal::new(225, 2));
        assert_eq!(order.billing.total, Decimal::new(3225, 2));
        assert_eq!(order.created_by.as_deref(), Some("ops@nimbus.test"));
        assert!(order.timeline[0].note.contains(&outcome.receipt.external_id));

        let second = store.get_order(outcome.order_ids[1]).await.unwrap();
        assert_eq!(second.billing.unit_price, Decimal::new(2500, 2));
    }

    #[tokio::test]
    async fn test_validation_failure_sends_nothing() {
        let submitter = Arc::new(RecordingSubmitter {
            requests: Mutex::new(Vec::new()),
        });
        let (orchestrator, store) = orchestrator(submitter.clone()).await;

        let mut draft = draft();
        draft.selection.service_profiles.clear();

        let err = orchestrator.submit(&draft, &catalog()).await.unwrap_err();
        match err {
            SubmissionError::Validation(report) => {
                assert!(report.workflow.contains_key("serviceProfiles"))
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(submitter.requests.lock().unwrap().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_rejection_creates_no_orders() {
        let (orchestrator, store) = orchestrator(Arc::new(RejectingSubmitter)).await;

        let err = orchestrator.submit(&draft(), &catalog()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Rejected(ref msg) if msg.contains("quota")));
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_track_submission() {
        let (orchestrator, store) = orchestrator(Arc::new(LocalOrderSubmitter)).await;
        let mut draft = draft();
        draft.fast_track = true;

        let outcome = orchestrator.submit(&draft, &catalog()).await.unwrap();
        let order = store.get_order(outcome.order_ids[0]).await.unwrap();
        assert_eq!(order.status, OrderStatus::Provisioning);
        assert_eq!(order.payment_status, PaymentStatus::AdminApproved);

        tokio::time::sleep(ProvisioningDelays::default().total() * 2).await;
        let order = store.get_order(outcome.order_ids[0]).await.unwrap();
        assert_eq!(order.status, OrderStatus::Active);
    }
}
