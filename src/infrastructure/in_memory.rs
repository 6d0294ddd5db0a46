use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::job::ImportJob;
use crate::domain::ports::{EnrichmentProvider, JobRepository};
use crate::error::Result;

/// A thread-safe in-memory job registry.
///
/// Uses `Arc<RwLock<HashMap<String, ImportJob>>>` for shared concurrent
/// access: the orchestrator writes whole snapshots, progress pollers read.
/// Jobs do not survive a process restart.
#[derive(Default, Clone)]
pub struct InMemoryJobRepository {
    jobs: Arc<RwLock<HashMap<String, ImportJob>>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn save(&self, job: ImportJob) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.batch_id.clone(), job);
        Ok(())
    }

    async fn get(&self, batch_id: &str) -> Result<Option<ImportJob>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(batch_id).cloned())
    }

    async fn all(&self) -> Result<Vec<ImportJob>> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<ImportJob> = jobs.values().cloned().collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(all)
    }

    async fn remove(&self, batch_id: &str) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.remove(batch_id);
        Ok(())
    }
}

/// Billing countries the legacy gateway saw disproportionate fraud from.
const HIGH_RISK_COUNTRIES: &[&str] = &["NG", "PK", "RU", "BY", "VE"];

const UNKNOWN_COUNTRY_RISK: u8 = 40;
const HIGH_RISK_COUNTRY_RISK: u8 = 75;
const DEFAULT_COUNTRY_RISK: u8 = 5;
const UNKNOWN_CUSTOMER_RISK: u8 = 10;

/// Deterministic enrichment lookups backed by static tables. Stands in for
/// the external risk services while exercising the same port.
#[derive(Default, Clone)]
pub struct StaticEnrichment {
    customer_risk: HashMap<String, u8>,
    country_risk: HashMap<String, u8>,
}

impl StaticEnrichment {
    pub fn with_customer_risk(mut self, customer_id: &str, risk: u8) -> Self {
        self.customer_risk.insert(customer_id.to_string(), risk);
        self
    }

    pub fn with_country_risk(mut self, country: &str, risk: u8) -> Self {
        self.country_risk.insert(country.to_ascii_uppercase(), risk);
        self
    }
}

#[async_trait]
impl EnrichmentProvider for StaticEnrichment {
    async fn customer_risk(&self, customer_id: &str) -> Result<u8> {
        Ok(self
            .customer_risk
            .get(customer_id)
            .copied()
            .unwrap_or(UNKNOWN_CUSTOMER_RISK))
    }

    async fn geographic_risk(&self, country: Option<&str>) -> Result<u8> {
        let Some(country) = country else {
            return Ok(UNKNOWN_COUNTRY_RISK);
        };
        let upper = country.to_ascii_uppercase();
        if let Some(risk) = self.country_risk.get(&upper) {
            return Ok(*risk);
        }
        if HIGH_RISK_COUNTRIES.contains(&upper.as_str()) {
            Ok(HIGH_RISK_COUNTRY_RISK)
        } else {
            Ok(DEFAULT_COUNTRY_RISK)
        }
    }
}
