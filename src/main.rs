use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;
use vaultshift::application::orchestrator::{BatchConfig, BatchOrchestrator};
use vaultshift::domain::ports::{EnrichmentProviderRef, JobRepositoryRef};
use vaultshift::infrastructure::in_memory::{InMemoryJobRepository, StaticEnrichment};
use vaultshift::interfaces::http::{AppState, router};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to serve the migration API on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Records per batch chunk.
    #[arg(long, default_value_t = 75)]
    chunk_size: usize,

    /// Throttle between chunks, in milliseconds.
    #[arg(long, default_value_t = 200)]
    chunk_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let repo: JobRepositoryRef = Arc::new(InMemoryJobRepository::new());
    let enrichment: EnrichmentProviderRef = Arc::new(StaticEnrichment::default());
    let orchestrator = Arc::new(BatchOrchestrator::new(
        repo.clone(),
        BatchConfig {
            chunk_size: cli.chunk_size,
            chunk_delay: Duration::from_millis(cli.chunk_delay_ms),
            ..BatchConfig::default()
        },
    ));

    let state = AppState::new(repo, enrichment, orchestrator);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .into_diagnostic()?;
    tracing::info!(bind = %cli.bind, "migration service listening");
    axum::serve(listener, app).await.into_diagnostic()?;

    Ok(())
}
