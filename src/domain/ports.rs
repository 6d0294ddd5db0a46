use async_trait::async_trait;

use crate::domain::job::ImportJob;
use crate::error::Result;

/// Keyed store for batch jobs. The orchestrator is the only writer per
/// job; progress pollers read snapshots concurrently. Injected rather than
/// global so a durable backing can be swapped in without touching the
/// orchestrator.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn save(&self, job: ImportJob) -> Result<()>;
    async fn get(&self, batch_id: &str) -> Result<Option<ImportJob>>;
    async fn all(&self) -> Result<Vec<ImportJob>>;
    /// Operator-triggered purge; only terminal jobs may be removed.
    async fn remove(&self, batch_id: &str) -> Result<()>;
}

/// Network-bound lookups used while enriching a transaction. Lookups are
/// independent and safe to await together.
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// 0-100 risk carried by the customer's history with us.
    async fn customer_risk(&self, customer_id: &str) -> Result<u8>;
    /// 0-100 risk attributed to the billing country.
    async fn geographic_risk(&self, country: Option<&str>) -> Result<u8>;
}

pub type JobRepositoryRef = std::sync::Arc<dyn JobRepository>;
pub type EnrichmentProviderRef = std::sync::Arc<dyn EnrichmentProvider>;
