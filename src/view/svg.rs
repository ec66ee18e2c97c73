//! Minimal server-side line charts.

use super::escape_html;
use std::fmt::Write;

const WIDTH: f64 = 1000.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 36.0;
const GRID_LINES: usize = 4;
const MAX_X_LABELS: usize = 8;

pub struct Series<'a> {
    pub name: &'a str,
    pub color: &'a str,
    pub stroke_width: f64,
    pub values: Vec<f64>,
}

pub struct LineChart<'a> {
    pub height: f64,
    pub y_label: &'a str,
    /// One per x position.
    pub x_labels: Vec<String>,
    /// Hover text, one per x position.
    pub tooltips: Vec<String>,
    pub series: Vec<Series<'a>>,
    pub legend: bool,
}

impl LineChart<'_> {
    pub fn render(&self) -> String {
        let n = self.x_labels.len();
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = self.height - MARGIN_TOP - MARGIN_BOTTOM;

        let y_max = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

        let x_at = |i: usize| -> f64 {
            if n <= 1 {
                MARGIN_LEFT + plot_w / 2.0
            } else {
                MARGIN_LEFT + plot_w * i as f64 / (n - 1) as f64
            }
        };
        let y_at = |v: f64| -> f64 { MARGIN_TOP + plot_h - plot_h * (v.max(0.0) / y_max) };

        let mut out = String::new();
        let _ = write!(
            out,
            r#"<svg class="chart" viewBox="0 0 {WIDTH} {h}" preserveAspectRatio="none" role="img">"#,
            h = self.height
        );

        for g in 0..=GRID_LINES {
            let v = y_max * g as f64 / GRID_LINES as f64;
            let y = y_at(v);
            let _ = write!(
                out,
                r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{x2}" y2="{y:.1}" stroke="#374151" stroke-dasharray="3 3"/><text x="{tx}" y="{ty:.1}" class="tick" text-anchor="end">{label}</text>"##,
                x2 = WIDTH - MARGIN_RIGHT,
                tx = MARGIN_LEFT - 8.0,
                ty = y + 4.0,
                label = tick_label(v),
            );
        }

        let step = n.div_ceil(MAX_X_LABELS).max(1);
        for (i, label) in self.x_labels.iter().enumerate().step_by(step) {
            let _ = write!(
                out,
                r#"<text x="{x:.1}" y="{y:.1}" class="tick" text-anchor="middle">{label}</text>"#,
                x = x_at(i),
                y = self.height - MARGIN_BOTTOM + 18.0,
                label = escape_html(label),
            );
        }

        let _ = write!(
            out,
            r#"<text x="14" y="{y:.1}" class="axis" transform="rotate(-90 14 {y:.1})" text-anchor="middle">{label}</text>"#,
            y = MARGIN_TOP + plot_h / 2.0,
            label = escape_html(self.y_label),
        );

        for s in &self.series {
            let points = s
                .values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{:.1},{:.1}", x_at(i), y_at(*v)))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(
                out,
                r#"<polyline fill="none" stroke="{color}" stroke-width="{w}" points="{points}"><title>{name}</title></polyline>"#,
                color = s.color,
                w = s.stroke_width,
                name = escape_html(s.name),
            );
        }

        // hover bands carrying the tooltip text for each x position
        let band_w = if n <= 1 { plot_w } else { plot_w / (n - 1) as f64 };
        for (i, tip) in self.tooltips.iter().enumerate() {
            let _ = write!(
                out,
                r#"<rect class="hover" x="{x:.1}" y="{MARGIN_TOP}" width="{band_w:.1}" height="{plot_h:.1}"><title>{tip}</title></rect>"#,
                x = x_at(i) - band_w / 2.0,
                tip = escape_html(tip),
            );
        }
        out.push_str("</svg>");

        if self.legend {
            out.push_str(r#"<div class="legend">"#);
            for s in &self.series {
                let _ = write!(
                    out,
                    r#"<span><i style="background:{}"></i>{}</span>"#,
                    s.color,
                    escape_html(s.name)
                );
            }
            out.push_str("</div>");
        }
        out
    }
}

fn tick_label(v: f64) -> String {
    if v >= 100.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}
