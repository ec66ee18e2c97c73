use super::{Probe, RepoError, RepoResult, SnapshotFilter, SnapshotRepository};
use crate::snapshot::LiquiditySnapshot;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, instrument};

const NUMERIC_COLUMNS: [&str; 17] = [
    "mid_price",
    "spread_bps",
    "bid_10bps",
    "ask_10bps",
    "total_10bps",
    "bid_25bps",
    "ask_25bps",
    "total_25bps",
    "bid_50bps",
    "ask_50bps",
    "total_50bps",
    "bid_1pct",
    "ask_1pct",
    "total_1pct",
    "bid_2pct",
    "ask_2pct",
    "total_2pct",
];

/// Reads snapshots straight from the database behind the hosted REST interface.
pub struct PostgresSnapshotRepository {
    connection_pool: sqlx::PgPool,
    table: String,
    filter: SnapshotFilter,
}

impl PostgresSnapshotRepository {
    /// The pool connects on first use, so a bad host only shows up as failed queries.
    pub fn new(database_url: &str, table: &str, filter: SnapshotFilter) -> RepoResult<Self> {
        if !is_plain_identifier(table) {
            return Err(RepoError::Config(format!("invalid table name {table:?}")));
        }
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_lazy(database_url)?;
        Ok(Self {
            connection_pool: pool,
            table: table.to_string(),
            filter,
        })
    }

    fn select_sql(&self) -> String {
        // numeric/real columns are cast so they always decode as f64
        let numeric = NUMERIC_COLUMNS
            .iter()
            .map(|c| format!("{c}::float8 AS {c}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            r#"
            SELECT id::int8 AS id, "timestamp"::timestamptz AS "timestamp", exchange, pair, {numeric}
            FROM {table}
            WHERE exchange = $1 AND ($2::text IS NULL OR pair = $2)
            ORDER BY "timestamp" DESC
            LIMIT $3
            "#,
            table = self.table
        )
    }

    async fn newest_first(&self, limit: usize) -> RepoResult<Vec<LiquiditySnapshot>> {
        let rows = sqlx::query_as::<_, LiquiditySnapshot>(&self.select_sql())
            .bind(&self.filter.exchange)
            .bind(self.filter.pair.as_deref())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.connection_pool)
            .await?;
        Ok(rows)
    }
}

/// `name` or `schema.name`, ASCII letters, digits and underscores only.
fn is_plain_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[async_trait]
impl SnapshotRepository for PostgresSnapshotRepository {
    #[instrument(skip(self), fields(exchange = %self.filter.exchange))]
    async fn query_recent(&self, limit: usize) -> RepoResult<Vec<LiquiditySnapshot>> {
        let mut rows = self.newest_first(limit).await?;
        rows.reverse();
        debug!(rows = rows.len(), "Fetched recent snapshots");
        Ok(rows)
    }

    async fn query_latest(&self) -> RepoResult<Option<LiquiditySnapshot>> {
        Ok(self.newest_first(1).await?.into_iter().next())
    }

    async fn probe(&self, limit: usize) -> RepoResult<Probe> {
        let rows: Vec<serde_json::Value> =
            sqlx::query_scalar(&format!("SELECT to_jsonb(t) FROM {} t LIMIT $1", self.table))
                .bind(i64::try_from(limit).unwrap_or(i64::MAX))
                .fetch_all(&self.connection_pool)
                .await?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT count(*) FROM {}", self.table))
            .fetch_one(&self.connection_pool)
            .await?;
        Ok(Probe { rows, total_count: u64::try_from(total).ok() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(is_plain_identifier("liquidity_snapshots"));
        assert!(is_plain_identifier("public.liquidity_snapshots"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("1table"));
        assert!(!is_plain_identifier("snapshots; drop table x"));
        assert!(!is_plain_identifier("a.b.c"));
    }

    #[tokio::test]
    async fn rejects_bad_table_before_connecting() {
        let res = PostgresSnapshotRepository::new(
            "postgres://localhost/db",
            "x y",
            SnapshotFilter::default(),
        );
        assert!(matches!(res, Err(RepoError::Config(_))));
    }

    #[tokio::test]
    async fn select_casts_every_numeric_column() {
        let repo = PostgresSnapshotRepository::new(
            "postgres://localhost/db",
            "liquidity_snapshots",
            SnapshotFilter::default(),
        )
        .unwrap();
        let sql = repo.select_sql();
        for col in NUMERIC_COLUMNS {
            assert!(sql.contains(&format!("{col}::float8 AS {col}")));
        }
        assert!(sql.contains(r#"ORDER BY "timestamp" DESC"#));
    }
}
