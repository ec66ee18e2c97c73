use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error object returned by the hosted REST interface.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code {code})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository not configured: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {error}")]
    Api { status: u16, error: ApiError },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    /// Structured view of the error for the diagnostic report.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            RepoError::Api { error, .. } => error.clone(),
            RepoError::Database(sqlx::Error::Database(db)) => ApiError {
                message: db.message().to_string(),
                code: db.code().map(|c| c.into_owned()),
                details: None,
                hint: None,
            },
            other => ApiError {
                message: other.to_string(),
                ..ApiError::default()
            },
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Raw, unfiltered sample of the table used by diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Probe {
    pub rows: Vec<serde_json::Value>,
    pub total_count: Option<u64>,
}

/// Rows shown by the dashboard: one exchange, optionally one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub exchange: String,
    pub pair: Option<String>,
}

impl Default for SnapshotFilter {
    fn default() -> Self {
        Self { exchange: "binance".into(), pair: None }
    }
}
