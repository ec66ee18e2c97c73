//! Full HTML documents: the dashboard and the diagnostic report.

use super::escape_html;
use super::format::full_time;
use super::liquidity_chart::{liquidity_chart, LiquidityChart};
use super::spread_chart::{self, spread_chart, SpreadPoint};
use super::stats::{stats_view, StatsView};
use super::table::{self, table_rows, TableRow, DEFAULT_TABLE_ROWS};
use crate::config::Settings;
use crate::dashboard::DashboardState;
use crate::diagnostics::DiagnosticReport;
use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use std::fmt::Write;

const STYLE: &str = r#"<style>:root{--bg:#111827;--panel:#1f2937;--line:#374151;--ink:#f9fafb;--muted:#9ca3af}*{box-sizing:border-box}body{margin:0;min-height:100vh;color:var(--ink);font-family:"Inter","Segoe UI",sans-serif;background:linear-gradient(135deg,#111827 0%,#1f2937 50%,#111827 100%)}.shell{max-width:1280px;margin:0 auto;padding:32px}.hero{display:flex;justify-content:space-between;align-items:center;gap:16px;flex-wrap:wrap;margin-bottom:32px}.hero h1{margin:0 0 8px;font-size:2.6rem;background:linear-gradient(90deg,#60a5fa,#a855f7);-webkit-background-clip:text;background-clip:text;color:transparent}.hero p{margin:0;color:var(--muted)}.btn{background:#2563eb;color:#fff;border:0;border-radius:8px;padding:12px 24px;font-size:1rem;cursor:pointer}.btn:hover{background:#1d4ed8}.btn:disabled{background:#4b5563;cursor:not-allowed}.stats{display:grid;grid-template-columns:repeat(4,minmax(0,1fr));gap:16px;margin-bottom:32px}.card{background:var(--panel);border:1px solid var(--line);border-radius:12px;padding:20px}.card h3{margin:0 0 8px;font-size:.85rem;font-weight:500}.stat{margin:0;font-size:1.8rem;font-weight:700;font-family:"IBM Plex Mono",monospace}.accent-green{color:#34d399}.accent-blue{color:#60a5fa}.accent-purple{color:#c084fc}.accent-orange{color:#fb923c}.skeleton .bar{background:var(--line);border-radius:4px;height:14px;margin:6px 0}.skeleton .short{width:50%}.skeleton .long{width:80%;height:28px}.panel{background:var(--panel);border:1px solid var(--line);border-radius:12px;padding:24px;margin-bottom:32px}.panel h2{margin:0 0 24px;font-size:1.4rem}.empty{height:400px;display:flex;align-items:center;justify-content:center;color:var(--muted)}.chart{width:100%;height:auto}.chart .tick{fill:#9ca3af;font-size:12px}.chart .axis{fill:#9ca3af;font-size:13px}.chart .hover{fill:transparent}.chart .hover:hover{fill:rgba(255,255,255,.05)}.legend{display:flex;gap:16px;flex-wrap:wrap;justify-content:center;margin-top:8px;font-size:.85rem;color:var(--muted)}.legend i{display:inline-block;width:12px;height:3px;margin-right:6px;vertical-align:middle}.table-wrap{overflow-x:auto}table{width:100%;border-collapse:collapse;font-size:.875rem}th{color:var(--muted);font-weight:500;text-align:right;padding:12px 16px;border-bottom:1px solid var(--line)}th:first-child,td:first-child{text-align:left}td{padding:12px 16px;border-bottom:1px solid var(--line);text-align:right;font-family:"IBM Plex Mono",monospace}td:first-child{font-family:inherit;color:#d1d5db}footer{margin-top:32px;text-align:center;color:#6b7280;font-size:.875rem}pre{background:#f3f4f6;color:#111827;border-radius:8px;padding:16px;overflow:auto;font-size:.75rem}.ok{color:#16a34a}.bad{color:#dc2626}@media (max-width:760px){.stats{grid-template-columns:repeat(2,minmax(0,1fr))}.hero h1{font-size:1.9rem}.shell{padding:16px}}</style>"#;

/// Everything the dashboard page needs besides the state itself.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    pub subtitle: String,
    pub depth_title: String,
    pub tz: FixedOffset,
    pub table_rows: usize,
    /// Browser auto-reload period; 0 disables it.
    pub reload_secs: u64,
    pub refresh_minutes: u64,
}

impl PageOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        let asset = settings
            .source
            .pair
            .as_deref()
            .and_then(|p| p.split(['/', '-', '_']).next())
            .filter(|a| !a.is_empty())
            .unwrap_or("NEAR");
        let exchange = capitalize(&settings.source.exchange);
        Self {
            title: format!("{} Liquidity Monitor", asset.to_uppercase()),
            subtitle: format!("Real-time {exchange} orderbook analysis"),
            depth_title: format!("{exchange} Liquidity Depth Over Time"),
            tz: settings.display_offset(),
            table_rows: settings.dashboard.table_rows,
            reload_secs: settings.server.page_reload_secs,
            refresh_minutes: settings.dashboard.refresh_interval_secs.div_ceil(60),
        }
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "NEAR Liquidity Monitor".into(),
            subtitle: "Real-time Binance orderbook analysis".into(),
            depth_title: "Binance Liquidity Depth Over Time".into(),
            tz: Utc.fix(),
            table_rows: DEFAULT_TABLE_ROWS,
            reload_secs: 30,
            refresh_minutes: 5,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// All four view models for one published state.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub loading: bool,
    pub last_update: String,
    pub stats: StatsView,
    pub liquidity: LiquidityChart,
    pub spread: Vec<SpreadPoint>,
    pub table: Vec<TableRow>,
}

impl DashboardView {
    pub fn build(state: &DashboardState, options: &PageOptions) -> Self {
        Self {
            loading: state.loading,
            last_update: full_time(&state.last_update, &options.tz),
            stats: stats_view(state.latest.as_ref()),
            liquidity: liquidity_chart(&state.window, &options.tz),
            spread: spread_chart(&state.window, &options.tz),
            table: table_rows(&state.window, options.table_rows, &options.tz),
        }
    }
}

fn head(out: &mut String, title: &str, reload_secs: u64) {
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    if reload_secs > 0 {
        let _ = writeln!(out, "<meta http-equiv=\"refresh\" content=\"{reload_secs}\">");
    }
    let _ = writeln!(out, "<title>{}</title>", escape_html(title));
    out.push_str(STYLE);
    out.push_str("\n</head><body><main class=\"shell\">\n");
}

pub fn render_dashboard(state: &DashboardState, options: &PageOptions) -> String {
    let view = DashboardView::build(state, options);

    let mut out = String::new();
    head(&mut out, &options.title, options.reload_secs);

    out.push_str("<section class=\"hero\"><div>");
    let _ = write!(
        out,
        "<h1>{}</h1><p>{}</p>",
        escape_html(&options.title),
        escape_html(&options.subtitle)
    );
    out.push_str("</div><form method=\"post\" action=\"/refresh\">");
    if view.loading {
        out.push_str("<button class=\"btn\" type=\"submit\" disabled>Loading...</button>");
    } else {
        out.push_str("<button class=\"btn\" type=\"submit\">Refresh</button>");
    }
    out.push_str("</form></section>\n");

    out.push_str(&view.stats.render_html());
    out.push('\n');
    out.push_str(&view.liquidity.render_html(&options.depth_title));
    out.push('\n');
    out.push_str(&spread_chart::render_html(&view.spread, "Spread Trends"));
    out.push('\n');
    out.push_str(&table::render_html(&view.table));
    out.push('\n');

    let _ = write!(
        out,
        "<footer><p>Last updated: {}</p><p>Data updates automatically every {} minutes</p></footer>",
        escape_html(&view.last_update),
        options.refresh_minutes
    );
    out.push_str("</main></body></html>\n");
    out
}

fn status_span(value: &str) -> String {
    let class = if value.contains('✅') { "ok" } else { "bad" };
    format!("<span class=\"{class}\">{}</span>", escape_html(value))
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

pub fn render_diagnostics(report: &DiagnosticReport) -> String {
    let mut out = String::new();
    head(&mut out, "Supabase Connection Test", 0);
    out.push_str("<h1>🔍 Supabase Connection Test</h1>\n");

    let env = &report.env_vars;
    out.push_str("<section class=\"panel\"><h2>1. Environment Variables</h2>");
    let _ = write!(out, "<p><code>SUPABASE_URL:</code> {}</p>", status_span(env.url));
    let _ = write!(out, "<p><code>SUPABASE_ANON_KEY:</code> {}</p>", status_span(env.key));
    if let Some(url) = &env.url_value {
        let _ = write!(
            out,
            "<pre>URL: {}\nKey: {}</pre>",
            escape_html(url),
            escape_html(env.key_prefix.as_deref().unwrap_or("..."))
        );
    }
    out.push_str("</section>\n");

    let query = &report.query;
    out.push_str("<section class=\"panel\"><h2>2. Database Query</h2>");
    if query.success {
        out.push_str("<p class=\"ok\"><b>✅ Connection Successful!</b></p>");
        let total = query.total_count.map_or_else(|| "Unknown".to_string(), |n| n.to_string());
        let _ = write!(
            out,
            "<div class=\"stats\"><div class=\"card\"><h3>Records Retrieved</h3><p class=\"stat accent-green\">{}</p></div><div class=\"card\"><h3>Total in Database</h3><p class=\"stat accent-blue\">{}</p></div></div>",
            query.data_count,
            escape_html(&total)
        );
        if let Some(sample) = &query.sample_data {
            let _ = write!(out, "<h3>Sample Record:</h3><pre>{}</pre>", escape_html(&pretty(sample)));
        }
    } else {
        out.push_str("<p class=\"bad\"><b>❌ Query Failed</b></p>");
        if let Some(error) = &query.error {
            let _ = write!(out, "<pre>{}</pre>", escape_html(&pretty(error)));
        }
    }
    out.push_str("</section>\n");

    let _ = write!(
        out,
        "<section class=\"panel\"><h2>Full Debug Output</h2><pre>{}</pre></section>\n",
        escape_html(&pretty(report))
    );
    out.push_str("<a class=\"btn\" href=\"/test\">🔄 Run Test Again</a>\n");
    out.push_str("</main></body></html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{EnvReport, QueryReport};
    use crate::repository::ApiError;
    use crate::snapshot::fixtures::snapshot;
    use chrono::TimeZone;

    fn state(ids: std::ops::RangeInclusive<i64>, with_latest: bool) -> DashboardState {
        let window: Vec<_> = ids.map(|i| snapshot(i, 12_000.0)).collect();
        DashboardState {
            latest: if with_latest { window.last().cloned() } else { None },
            window,
            loading: false,
            last_update: Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_dashboard_shows_skeleton_and_empty_message() {
        let html = render_dashboard(&state(1..=0, false), &PageOptions::default());
        assert!(html.contains("NEAR Liquidity Monitor"));
        assert!(html.contains("card skeleton"));
        assert!(html.contains(super::super::liquidity_chart::EMPTY_MESSAGE));
        assert!(!html.contains("Spread Trends"));
        assert!(html.contains("Last updated: 5/1/2024, 1:00:00 PM"));
    }

    #[test]
    fn populated_dashboard_renders_every_section() {
        let html = render_dashboard(&state(1..=30, true), &PageOptions::default());
        assert!(!html.contains("card skeleton"));
        assert!(html.contains("Binance Liquidity Depth Over Time"));
        assert!(html.contains("Spread Trends"));
        assert_eq!(html.matches("<tr data-id").count(), 20);
        assert!(html.contains(">Refresh</button>"));
        assert!(html.contains("http-equiv=\"refresh\" content=\"30\""));
    }

    #[test]
    fn loading_state_disables_button() {
        let mut s = state(1..=2, true);
        s.loading = true;
        let html = render_dashboard(&s, &PageOptions::default());
        assert!(html.contains("disabled>Loading...</button>"));
    }

    #[test]
    fn window_without_latest_keeps_skeleton() {
        let view = DashboardView::build(&state(1..=3, false), &PageOptions::default());
        assert!(view.stats.is_skeleton());
        assert!(!view.liquidity.is_empty());
        assert_eq!(view.table.len(), 3);
    }

    #[test]
    fn title_follows_configured_pair() {
        let mut settings = Settings::default();
        settings.source.pair = Some("sol/usdt".into());
        settings.source.exchange = "okx".into();
        let options = PageOptions::from_settings(&settings);
        assert_eq!(options.title, "SOL Liquidity Monitor");
        assert_eq!(options.subtitle, "Real-time Okx orderbook analysis");
        assert_eq!(options.depth_title, "Okx Liquidity Depth Over Time");
        assert_eq!(options.refresh_minutes, 5);
    }

    #[test]
    fn diagnostics_page_shows_failure_object() {
        let report = DiagnosticReport {
            env_vars: EnvReport { url: "✅ Set", key: "❌ Missing", url_value: Some("https://x".into()), key_prefix: None },
            query: QueryReport {
                error: Some(ApiError { message: "JWT expired".into(), code: Some("PGRST301".into()), ..ApiError::default() }),
                ..QueryReport::default()
            },
        };
        let html = render_diagnostics(&report);
        assert!(html.contains("Query Failed"));
        assert!(html.contains("PGRST301"));
        assert!(html.contains("Run Test Again"));
        assert!(html.contains("class=\"bad\""));
    }

    #[test]
    fn diagnostics_page_shows_counts() {
        let report = DiagnosticReport {
            env_vars: EnvReport { url: "✅ Set", key: "✅ Set", url_value: None, key_prefix: None },
            query: QueryReport {
                success: true,
                data_count: 5,
                total_count: None,
                sample_data: Some(serde_json::json!({"id": 1})),
                ..QueryReport::default()
            },
        };
        let html = render_diagnostics(&report);
        assert!(html.contains("Connection Successful!"));
        assert!(html.contains("Unknown"));
        assert!(html.contains("Sample Record:"));
    }
}
