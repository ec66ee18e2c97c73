//! View models derived from dashboard state, plus their HTML rendering.

pub mod format;
pub mod liquidity_chart;
pub mod page;
pub mod spread_chart;
pub mod stats;
pub mod svg;
pub mod table;

pub use liquidity_chart::{liquidity_chart, LiquidityChart, LiquidityPoint};
pub use page::{render_dashboard, render_diagnostics, DashboardView, PageOptions};
pub use spread_chart::{spread_chart, SpreadPoint};
pub use stats::{stats_view, StatCard, StatsView};
pub use table::{table_rows, TableRow};

pub(crate) fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
