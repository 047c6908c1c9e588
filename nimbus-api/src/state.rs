use nimbus_catalog::TierCatalog;
use nimbus_core::RegionDirectory;
use nimbus_order::{OrderStore, SubmissionOrchestrator};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<OrderStore>,
    /// Replaced wholesale when a new pricing feed arrives.
    pub catalog: Arc<RwLock<TierCatalog>>,
    pub orchestrator: Arc<SubmissionOrchestrator>,
    pub regions: Arc<RegionDirectory>,
}

impl AppState {
    pub fn new(
        store: Arc<OrderStore>,
        catalog: TierCatalog,
        orchestrator: SubmissionOrchestrator,
        regions: RegionDirectory,
    ) -> Self {
        Self {
            store,
            catalog: Arc::new(RwLock::new(catalog)),
            orchestrator: Arc::new(orchestrator),
            regions: Arc::new(regions),
        }
    }
}
