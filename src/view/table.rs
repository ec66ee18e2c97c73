use super::format::{bps, full_time, usd_price, usd_thousands};
use crate::snapshot::LiquiditySnapshot;
use chrono::FixedOffset;
use serde::Serialize;
use std::fmt::Write;

pub const DEFAULT_TABLE_ROWS: usize = 20;

const HEADERS: [&str; 6] = ["Time", "Mid Price", "Spread", "50bps", "1%", "2%"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub id: i64,
    pub time: String,
    pub mid_price: String,
    pub spread: String,
    pub depth_50bps: String,
    pub depth_1pct: String,
    pub depth_2pct: String,
}

/// The `limit` newest entries of an oldest-first window, newest first.
pub fn table_rows(window: &[LiquiditySnapshot], limit: usize, tz: &FixedOffset) -> Vec<TableRow> {
    window
        .iter()
        .rev()
        .take(limit)
        .map(|s| TableRow {
            id: s.id,
            time: full_time(&s.timestamp, tz),
            mid_price: usd_price(s.mid_price),
            spread: bps(s.spread_bps),
            depth_50bps: usd_thousands(s.total_50bps),
            depth_1pct: usd_thousands(s.total_1pct),
            depth_2pct: usd_thousands(s.total_2pct),
        })
        .collect()
}

pub fn render_html(rows: &[TableRow]) -> String {
    let mut out = String::from(
        r#"<section class="panel"><h2>Recent Snapshots</h2><div class="table-wrap"><table><thead><tr>"#,
    );
    for header in HEADERS {
        let _ = write!(out, "<th>{header}</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        let _ = write!(
            out,
            r#"<tr data-id="{}"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            row.id,
            super::escape_html(&row.time),
            super::escape_html(&row.mid_price),
            super::escape_html(&row.spread),
            super::escape_html(&row.depth_50bps),
            super::escape_html(&row.depth_1pct),
            super::escape_html(&row.depth_2pct),
        );
    }
    out.push_str("</tbody></table></div></section>");
    out
}
