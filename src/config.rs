//! Layered settings: serde defaults, optional TOML file, `LIQMON__*` environment
//! variables, then the backend credentials from the usual Supabase variables.

use crate::repository::{SnapshotFilter, SNAPSHOT_TABLE};
use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "liquidity-monitor.toml";

pub const URL_VARS: [&str; 2] = ["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"];
pub const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hosted REST interface (needs URL + anonymous key)
    #[default]
    Rest,
    /// Direct Postgres connection (needs `database_url`)
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: Backend,
    pub database_url: Option<String>,
    pub log_filter: Option<String>,
    pub supabase: SupabaseSettings,
    pub source: SourceSettings,
    pub dashboard: DashboardSettings,
    pub live: LiveSettings,
    pub server: ServerSettings,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct SupabaseSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

impl std::fmt::Debug for SupabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseSettings")
            .field("url", &self.url)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub exchange: String,
    pub pair: Option<String>,
    pub table: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            exchange: "binance".into(),
            pair: None,
            table: SNAPSHOT_TABLE.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub window_capacity: usize,
    pub fetch_limit: usize,
    pub refresh_interval_secs: u64,
    pub table_rows: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            window_capacity: 100,
            fetch_limit: 100,
            refresh_interval_secs: 300,
            table_rows: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub enabled: bool,
    pub channel: String,
    pub schema: String,
    pub heartbeat_secs: u64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: "liquidity_changes".into(),
            schema: "public".into(),
            heartbeat_secs: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    /// Browser reload period for the dashboard page; 0 disables it.
    pub page_reload_secs: u64,
    /// Offset applied to timestamps on the page.
    pub utc_offset_minutes: i32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".into(),
            page_reload_secs: 30,
            utc_offset_minutes: 0,
        }
    }
}

impl Settings {
    /// Load `.env`, then layer `path` (if it exists) and the environment over the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let raw = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("LIQMON")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let mut settings: Settings = raw.try_deserialize()?;

        if settings.supabase.url.is_none() {
            settings.supabase.url = first_env(&URL_VARS);
        }
        if settings.supabase.anon_key.is_none() {
            settings.supabase.anon_key = first_env(&KEY_VARS);
        }
        if settings.database_url.is_none() {
            settings.database_url = std::env::var("DATABASE_URL").ok();
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.dashboard.window_capacity == 0 {
            return Err(ConfigError::Invalid("dashboard.window_capacity must be positive".into()));
        }
        if self.dashboard.fetch_limit == 0 {
            return Err(ConfigError::Invalid("dashboard.fetch_limit must be positive".into()));
        }
        if self.dashboard.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("dashboard.refresh_interval_secs must be positive".into()));
        }
        if self.live.heartbeat_secs == 0 {
            return Err(ConfigError::Invalid("live.heartbeat_secs must be positive".into()));
        }
        if self.source.exchange.trim().is_empty() {
            return Err(ConfigError::Invalid("source.exchange must not be empty".into()));
        }
        if FixedOffset::east_opt(self.server.utc_offset_minutes * 60).is_none() {
            return Err(ConfigError::Invalid(format!(
                "server.utc_offset_minutes out of range: {}",
                self.server.utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn filter(&self) -> SnapshotFilter {
        SnapshotFilter {
            exchange: self.source.exchange.clone(),
            pair: self.source.pair.clone(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard.refresh_interval_secs)
    }

    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.server.utc_offset_minutes * 60).unwrap_or(Utc.fix())
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_dashboard_contract() {
        let s = Settings::default();
        assert_eq!(s.backend, Backend::Rest);
        assert_eq!(s.dashboard.window_capacity, 100);
        assert_eq!(s.dashboard.fetch_limit, 100);
        assert_eq!(s.refresh_interval(), Duration::from_secs(300));
        assert_eq!(s.dashboard.table_rows, 20);
        assert_eq!(s.source.exchange, "binance");
        assert_eq!(s.source.table, "liquidity_snapshots");
        assert_eq!(s.live.schema, "public");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("liqmon-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "backend = \"postgres\"\n[dashboard]\nrefresh_interval_secs = 60\n[server]\nutc_offset_minutes = 120"
        )
        .unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.backend, Backend::Postgres);
        assert_eq!(s.refresh_interval(), Duration::from_secs(60));
        assert_eq!(s.dashboard.window_capacity, 100);
        assert_eq!(s.display_offset().local_minus_utc(), 7200);
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut s = Settings::default();
        s.dashboard.window_capacity = 0;
        assert!(matches!(s.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn debug_output_redacts_key() {
        let s = SupabaseSettings { url: Some("https://x.supabase.co".into()), anon_key: Some("secret".into()) };
        let out = format!("{s:?}");
        assert!(!out.contains("secret"));
        assert!(out.contains("<redacted>"));
    }
}
