pub mod types;
pub use types::*;
pub mod memory;
pub mod postgres;
pub mod rest;

use crate::config::{Backend, Settings};
use crate::snapshot::LiquiditySnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

pub const SNAPSHOT_TABLE: &str = "liquidity_snapshots";

/// Read access to the snapshot table.
///
/// Implementors provide the fallible queries; `fetch_recent` / `fetch_latest` layer the
/// "log and degrade to empty" contract on top of them.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Up to `limit` snapshots matching the filter, oldest first.
    async fn query_recent(&self, limit: usize) -> RepoResult<Vec<LiquiditySnapshot>>;

    /// The newest snapshot matching the filter.
    async fn query_latest(&self) -> RepoResult<Option<LiquiditySnapshot>>;

    /// Unfiltered raw rows plus the exact row count when the backend reports it.
    async fn probe(&self, limit: usize) -> RepoResult<Probe>;

    async fn fetch_recent(&self, limit: usize) -> Vec<LiquiditySnapshot> {
        match self.query_recent(limit).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Error fetching snapshots");
                Vec::new()
            }
        }
    }

    async fn fetch_latest(&self) -> Option<LiquiditySnapshot> {
        match self.query_latest().await {
            Ok(row) => row,
            Err(e) => {
                error!(error = %e, "Error fetching latest snapshot");
                None
            }
        }
    }
}

/// Build the repository the settings select.
pub fn connect(settings: &Settings) -> RepoResult<Arc<dyn SnapshotRepository>> {
    let table = settings.source.table.as_str();
    match settings.backend {
        Backend::Rest => {
            let repo = rest::RestSnapshotRepository::new(
                settings.supabase.url.as_deref(),
                settings.supabase.anon_key.as_deref(),
                table,
                settings.filter(),
            )?;
            info!(table, "Using REST snapshot repository");
            Ok(Arc::new(repo))
        }
        Backend::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or_else(|| RepoError::Config("DATABASE_URL is not set".into()))?;
            let repo = postgres::PostgresSnapshotRepository::new(url, table, settings.filter())?;
            info!(table, "Using Postgres snapshot repository");
            Ok(Arc::new(repo))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_backend_requires_credentials() {
        let settings = Settings::default();
        assert!(matches!(connect(&settings), Err(RepoError::Config(_))));
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let settings = Settings { backend: Backend::Postgres, ..Settings::default() };
        assert!(matches!(connect(&settings), Err(RepoError::Config(_))));
    }
}
