use super::format::{full_time, in_thousands, time_label, usd_thousands_1dp};
use super::svg::{LineChart, Series};
use crate::snapshot::{DepthBand, LiquiditySnapshot};
use chrono::FixedOffset;
use serde::Serialize;

pub const EMPTY_MESSAGE: &str = "No data available yet. Run your Python script to collect data.";

const BAND_COLORS: [&str; 5] = ["#EF4444", "#F59E0B", "#10B981", "#3B82F6", "#8B5CF6"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityPoint {
    pub time: String,
    pub full_time: String,
    /// Band totals in thousands, one decimal, narrowest band first.
    pub depth_k: [f64; 5],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "points", rename_all = "snake_case")]
pub enum LiquidityChart {
    Empty,
    Series(Vec<LiquidityPoint>),
}

pub fn liquidity_chart<'a, I>(snapshots: I, tz: &FixedOffset) -> LiquidityChart
where
    I: IntoIterator<Item = &'a LiquiditySnapshot>,
{
    let points: Vec<_> = snapshots
        .into_iter()
        .map(|s| LiquidityPoint {
            time: time_label(&s.timestamp, tz),
            full_time: full_time(&s.timestamp, tz),
            depth_k: DepthBand::ALL.map(|band| in_thousands(s.band(band).total, 1)),
        })
        .collect();

    if points.is_empty() {
        LiquidityChart::Empty
    } else {
        LiquidityChart::Series(points)
    }
}

impl LiquidityChart {
    pub fn is_empty(&self) -> bool {
        matches!(self, LiquidityChart::Empty)
    }

    pub fn render_html(&self, title: &str) -> String {
        let title = super::escape_html(title);
        let points = match self {
            LiquidityChart::Empty => {
                return format!(
                    r#"<section class="panel"><h2>{title}</h2><div class="empty">{EMPTY_MESSAGE}</div></section>"#
                );
            }
            LiquidityChart::Series(points) => points,
        };

        let series = DepthBand::ALL
            .iter()
            .enumerate()
            .map(|(i, band)| Series {
                name: band.label(),
                color: BAND_COLORS[i],
                stroke_width: if *band == DepthBand::Bps50 { 3.0 } else { 2.0 },
                values: points.iter().map(|p| p.depth_k[i]).collect(),
            })
            .collect();

        let tooltips = points
            .iter()
            .map(|p| {
                let bands = DepthBand::ALL
                    .iter()
                    .zip(p.depth_k)
                    .map(|(band, v)| format!("{}: {}", band.label(), usd_thousands_1dp(v)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("{}\n{}", p.full_time, bands)
            })
            .collect();

        let chart = LineChart {
            height: 400.0,
            y_label: "Liquidity (USD Thousands)",
            x_labels: points.iter().map(|p| p.time.clone()).collect(),
            tooltips,
            series,
            legend: true,
        };
        format!(r#"<section class="panel"><h2>{title}</h2>{}</section>"#, chart.render())
    }
}
