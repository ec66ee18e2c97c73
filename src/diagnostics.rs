//! Connection self-test: which credentials are present, and what an unfiltered sample
//! query against the snapshot table returns.

use crate::config::Settings;
use crate::repository::{self, ApiError, SnapshotRepository};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

pub const PROBE_LIMIT: usize = 5;
const KEY_PREFIX_LEN: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub env_vars: EnvReport,
    pub query: QueryReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvReport {
    /// `"✅ Set"` or `"❌ Missing"`.
    pub url: &'static str,
    pub key: &'static str,
    pub url_value: Option<String>,
    /// First 20 characters of the key followed by `...`. Never the whole key.
    pub key_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub success: bool,
    pub error: Option<ApiError>,
    pub data_count: usize,
    pub total_count: Option<u64>,
    pub sample_data: Option<Value>,
}

fn presence(value: Option<&str>) -> &'static str {
    if value.is_some_and(|v| !v.is_empty()) {
        "✅ Set"
    } else {
        "❌ Missing"
    }
}

pub fn env_report(settings: &Settings) -> EnvReport {
    let url = settings.supabase.url.as_deref();
    let key = settings.supabase.anon_key.as_deref();
    EnvReport {
        url: presence(url),
        key: presence(key),
        url_value: url.map(str::to_string),
        key_prefix: key.map(|k| format!("{}...", k.chars().take(KEY_PREFIX_LEN).collect::<String>())),
    }
}

/// Run the sample query against an existing repository.
pub async fn probe_with(repo: &dyn SnapshotRepository) -> QueryReport {
    match repo.probe(PROBE_LIMIT).await {
        Ok(probe) => QueryReport {
            success: true,
            error: None,
            data_count: probe.rows.len(),
            total_count: probe.total_count,
            sample_data: probe.rows.into_iter().next(),
        },
        Err(e) => {
            warn!(error = %e, "Diagnostic query failed");
            QueryReport { error: Some(e.to_api_error()), ..QueryReport::default() }
        }
    }
}

/// Build a fresh client from `settings` and run the full self-test.
pub async fn run(settings: &Settings) -> DiagnosticReport {
    let env_vars = env_report(settings);
    let query = match repository::connect(settings) {
        Ok(repo) => probe_with(repo.as_ref()).await,
        Err(e) => {
            warn!(error = %e, "Could not build repository for diagnostics");
            QueryReport { error: Some(e.to_api_error()), ..QueryReport::default() }
        }
    };
    info!(success = query.success, rows = query.data_count, total = ?query.total_count, "Diagnostics finished");
    DiagnosticReport { env_vars, query }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemorySnapshotRepository;
    use crate::snapshot::fixtures::snapshot;

    fn settings(url: Option<&str>, key: Option<&str>) -> Settings {
        let mut s = Settings::default();
        s.supabase.url = url.map(str::to_string);
        s.supabase.anon_key = key.map(str::to_string);
        s
    }

    #[test]
    fn key_is_truncated() {
        let report = env_report(&settings(
            Some("https://abc.supabase.co"),
            Some("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.secret"),
        ));
        assert_eq!(report.url, "✅ Set");
        assert_eq!(report.key, "✅ Set");
        assert_eq!(report.key_prefix.as_deref(), Some("eyJhbGciOiJIUzI1NiIs..."));
        assert_eq!(report.url_value.as_deref(), Some("https://abc.supabase.co"));
    }

    #[test]
    fn missing_credentials_reported() {
        let report = env_report(&settings(None, None));
        assert_eq!(report.url, "❌ Missing");
        assert_eq!(report.key, "❌ Missing");
        assert!(report.key_prefix.is_none());
    }

    #[tokio::test]
    async fn probe_reports_counts_and_sample() {
        let repo = MemorySnapshotRepository::with_rows((1..=8).map(|i| snapshot(i, 1.0)).collect());
        let report = probe_with(&repo).await;
        assert!(report.success);
        assert_eq!(report.data_count, PROBE_LIMIT);
        assert_eq!(report.total_count, Some(8));
        assert_eq!(report.sample_data.as_ref().and_then(|v| v["id"].as_i64()), Some(1));
    }

    #[tokio::test]
    async fn probe_failure_carries_message() {
        let repo = MemorySnapshotRepository::with_rows(vec![]);
        repo.fail_recent(Some("permission denied for table liquidity_snapshots"));
        let report = probe_with(&repo).await;
        assert!(!report.success);
        assert_eq!(report.data_count, 0);
        let message = report.error.map(|e| e.message).unwrap_or_default();
        assert!(message.contains("permission denied"));
    }

    #[tokio::test]
    async fn run_without_credentials_fails_cleanly() {
        let report = run(&settings(None, None)).await;
        assert!(!report.query.success);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["envVars"]["url"], "❌ Missing");
        assert_eq!(json["query"]["dataCount"], 0);
    }
}
