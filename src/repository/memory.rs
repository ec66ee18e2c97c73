//! In-process repository backed by a vector of rows.
//!
//! Applies the same filter and ordering rules as the hosted backends, and can be told
//! to fail either query. Used by tests and local demos.

use super::{Probe, RepoError, RepoResult, SnapshotFilter, SnapshotRepository};
use crate::snapshot::LiquiditySnapshot;
use async_trait::async_trait;
use parking_lot::RwLock;

#[derive(Default)]
pub struct MemorySnapshotRepository {
    rows: RwLock<Vec<LiquiditySnapshot>>,
    filter: SnapshotFilter,
    fail_recent: RwLock<Option<String>>,
    fail_latest: RwLock<Option<String>>,
}

impl MemorySnapshotRepository {
    pub fn new(filter: SnapshotFilter) -> Self {
        Self { filter, ..Default::default() }
    }

    pub fn with_rows(rows: Vec<LiquiditySnapshot>) -> Self {
        let repo = Self::default();
        *repo.rows.write() = rows;
        repo
    }

    pub fn insert(&self, snapshot: LiquiditySnapshot) {
        self.rows.write().push(snapshot);
    }

    /// Make `query_recent` and `probe` fail with `message` until cleared with `None`.
    pub fn fail_recent(&self, message: Option<&str>) {
        *self.fail_recent.write() = message.map(str::to_string);
    }

    /// Make `query_latest` fail with `message` until cleared with `None`.
    pub fn fail_latest(&self, message: Option<&str>) {
        *self.fail_latest.write() = message.map(str::to_string);
    }

    fn newest_first(&self) -> Vec<LiquiditySnapshot> {
        let mut rows: Vec<_> = self
            .rows
            .read()
            .iter()
            .filter(|s| s.exchange == self.filter.exchange)
            .filter(|s| self.filter.pair.as_deref().map_or(true, |p| s.pair == p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        rows
    }
}

fn injected(message: &RwLock<Option<String>>) -> RepoResult<()> {
    match message.read().as_ref() {
        Some(msg) => Err(RepoError::Config(msg.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl SnapshotRepository for MemorySnapshotRepository {
    async fn query_recent(&self, limit: usize) -> RepoResult<Vec<LiquiditySnapshot>> {
        injected(&self.fail_recent)?;
        let mut rows = self.newest_first();
        rows.truncate(limit);
        rows.reverse();
        Ok(rows)
    }

    async fn query_latest(&self) -> RepoResult<Option<LiquiditySnapshot>> {
        injected(&self.fail_latest)?;
        Ok(self.newest_first().into_iter().next())
    }

    async fn probe(&self, limit: usize) -> RepoResult<Probe> {
        injected(&self.fail_recent)?;
        let rows = self.rows.read();
        Ok(Probe {
            rows: rows
                .iter()
                .take(limit)
                .map(serde_json::to_value)
                .collect::<Result<_, _>>()?,
            total_count: Some(rows.len() as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::snapshot;

    #[tokio::test]
    async fn recent_is_oldest_first_and_limited() {
        let repo = MemorySnapshotRepository::with_rows(vec![
            snapshot(3, 1.0),
            snapshot(1, 1.0),
            snapshot(2, 1.0),
        ]);
        let ids: Vec<_> = repo.fetch_recent(2).await.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(repo.fetch_latest().await.map(|s| s.id), Some(3));
    }

    #[tokio::test]
    async fn failures_degrade_to_empty() {
        let repo = MemorySnapshotRepository::with_rows(vec![snapshot(1, 1.0)]);
        repo.fail_recent(Some("boom"));
        repo.fail_latest(Some("boom"));
        assert!(repo.fetch_recent(10).await.is_empty());
        assert!(repo.fetch_latest().await.is_none());
        assert!(repo.query_latest().await.is_err());
    }

    #[tokio::test]
    async fn other_exchanges_are_filtered_out() {
        let mut other = snapshot(5, 1.0);
        other.exchange = "kraken".into();
        let repo = MemorySnapshotRepository::with_rows(vec![snapshot(1, 1.0), other]);
        assert_eq!(repo.fetch_latest().await.map(|s| s.id), Some(1));
        assert_eq!(repo.probe(5).await.unwrap().total_count, Some(2));
    }
}
