//! Snapshot queries against the hosted REST interface (PostgREST dialect).

use super::{ApiError, Probe, RepoError, RepoResult, SnapshotFilter, SnapshotRepository, SNAPSHOT_TABLE};
use crate::snapshot::LiquiditySnapshot;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, instrument};

pub struct RestSnapshotRepository {
    client: Client,
    endpoint: String,
    filter: SnapshotFilter,
}

impl RestSnapshotRepository {
    /// Fails when either the project URL or the anonymous key is missing.
    pub fn new(
        url: Option<&str>,
        anon_key: Option<&str>,
        table: &str,
        filter: SnapshotFilter,
    ) -> RepoResult<Self> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| RepoError::Config("backend URL is not set".into()))?;
        let key = anon_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RepoError::Config("anonymous key is not set".into()))?;

        let mut headers = HeaderMap::new();
        let apikey = HeaderValue::from_str(key)
            .map_err(|_| RepoError::Config("anonymous key is not a valid header value".into()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| RepoError::Config("anonymous key is not a valid header value".into()))?;
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder().default_headers(headers).build()?;
        let table = if table.is_empty() { SNAPSHOT_TABLE } else { table };

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
            filter,
        })
    }

    fn select(&self, limit: usize) -> RequestBuilder {
        let mut query = vec![
            ("select", "*".to_string()),
            ("exchange", format!("eq.{}", self.filter.exchange)),
        ];
        if let Some(pair) = &self.filter.pair {
            query.push(("pair", format!("eq.{pair}")));
        }
        query.push(("order", "timestamp.desc".to_string()));
        query.push(("limit", limit.to_string()));
        self.client.get(&self.endpoint).query(&query)
    }

    async fn newest_first(&self, limit: usize) -> RepoResult<Vec<LiquiditySnapshot>> {
        let resp = check_status(self.select(limit).send().await?).await?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn check_status(resp: Response) -> RepoResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let error = serde_json::from_str::<ApiError>(&body).unwrap_or(ApiError {
        message: body,
        ..ApiError::default()
    });
    Err(RepoError::Api { status: status.as_u16(), error })
}

/// Total from a `Content-Range: 0-4/123` header; `*` means unknown.
fn total_from_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/').and_then(|(_, total)| total.trim().parse().ok())
}

#[async_trait]
impl SnapshotRepository for RestSnapshotRepository {
    #[instrument(skip(self), fields(exchange = %self.filter.exchange))]
    async fn query_recent(&self, limit: usize) -> RepoResult<Vec<LiquiditySnapshot>> {
        let mut rows = self.newest_first(limit).await?;
        rows.reverse();
        debug!(rows = rows.len(), "Fetched recent snapshots");
        Ok(rows)
    }

    #[instrument(skip(self), fields(exchange = %self.filter.exchange))]
    async fn query_latest(&self) -> RepoResult<Option<LiquiditySnapshot>> {
        Ok(self.newest_first(1).await?.into_iter().next())
    }

    async fn probe(&self, limit: usize) -> RepoResult<Probe> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("select", "*".to_string()), ("limit", limit.to_string())])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let total_count = resp
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(total_from_content_range);
        let body = resp.bytes().await?;
        Ok(Probe { rows: serde_json::from_slice(&body)?, total_count })
    }
}
