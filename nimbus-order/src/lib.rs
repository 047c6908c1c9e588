pub mod models;
pub mod scheduler;
pub mod store;
pub mod submission;
pub mod timeline;
pub mod validation;

pub use models::{
    Billing, CustomerType, NewOrder, Order, OrderPatch, OrderStatus, PaymentStatus, TimelineEntry,
};
pub use scheduler::{ProvisioningDelays, TransitionScheduler};
pub use store::OrderStore;
pub use submission::{
    LocalOrderSubmitter, Quote, SubmissionDraft, SubmissionError, SubmissionOrchestrator,
    SubmissionOutcome, SubmissionPolicy,
};
pub use timeline::TimelineRecorder;
pub use validation::{validate_selection, Assignment, ValidationReport, WorkflowSelection};
