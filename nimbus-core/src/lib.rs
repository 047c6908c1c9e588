pub mod codes;
pub mod directory;
pub mod repository;
pub mod submission;

pub use codes::{normalize_country_code, normalize_currency_code, resolve_currency_code};
pub use directory::{
    AssignmentDirectory, CurrencyDirectory, InMemoryAssignmentDirectory, Party, Region,
    RegionDirectory,
};
pub use repository::SnapshotRepository;
pub use submission::{LineItem, OrderSubmitter, SubmissionReceipt, SubmissionRequest};
