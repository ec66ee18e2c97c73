use super::format::{bps, full_time, round_to, time_label};
use super::svg::{LineChart, Series};
use crate::snapshot::LiquiditySnapshot;
use chrono::FixedOffset;
use serde::Serialize;

const SPREAD_COLOR: &str = "#06B6D4";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadPoint {
    pub time: String,
    pub full_time: String,
    /// Basis points, two decimals.
    pub spread: f64,
}

pub fn spread_chart<'a, I>(snapshots: I, tz: &FixedOffset) -> Vec<SpreadPoint>
where
    I: IntoIterator<Item = &'a LiquiditySnapshot>,
{
    snapshots
        .into_iter()
        .map(|s| SpreadPoint {
            time: time_label(&s.timestamp, tz),
            full_time: full_time(&s.timestamp, tz),
            spread: round_to(s.spread_bps, 2),
        })
        .collect()
}

/// Renders nothing at all for an empty series.
pub fn render_html(points: &[SpreadPoint], title: &str) -> String {
    if points.is_empty() {
        return String::new();
    }
    let chart = LineChart {
        height: 300.0,
        y_label: "Spread (bps)",
        x_labels: points.iter().map(|p| p.time.clone()).collect(),
        tooltips: points
            .iter()
            .map(|p| format!("{}\nSpread: {}", p.full_time, bps(p.spread)))
            .collect(),
        series: vec![Series {
            name: "Spread",
            color: SPREAD_COLOR,
            stroke_width: 3.0,
            values: points.iter().map(|p| p.spread).collect(),
        }],
        legend: false,
    };
    format!(
        r#"<section class="panel"><h2>{}</h2>{}</section>"#,
        super::escape_html(title),
        chart.render()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fixtures::snapshot;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn empty_series_renders_nothing() {
        let points = spread_chart(&Vec::<LiquiditySnapshot>::new(), &utc());
        assert!(points.is_empty());
        assert_eq!(render_html(&points, "Spread Trends"), "");
    }

    #[test]
    fn spreads_rounded_to_two_decimals() {
        let mut a = snapshot(1, 1000.0);
        a.spread_bps = 3.14159;
        let mut b = snapshot(2, 1000.0);
        b.spread_bps = 2.005;
        let points = spread_chart(&[a, b], &utc());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].spread, 3.14);
        assert_eq!(points[1].time, "12:02 PM");

        let html = render_html(&points, "Spread Trends");
        assert!(html.contains("Spread Trends"));
        assert!(html.contains("Spread: 3.14 bps"));
        assert_eq!(html.matches("<polyline").count(), 1);
    }
}
