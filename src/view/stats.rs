use super::format::{bps, usd_price, usd_thousands};
use crate::snapshot::LiquiditySnapshot;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCard {
    pub label: &'static str,
    pub value: String,
    pub accent: &'static str,
}

/// Headline cards for the newest snapshot, or a skeleton while there is none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "cards", rename_all = "snake_case")]
pub enum StatsView {
    Skeleton,
    Cards(Vec<StatCard>),
}

pub fn stats_view(latest: Option<&LiquiditySnapshot>) -> StatsView {
    let Some(s) = latest else {
        return StatsView::Skeleton;
    };
    StatsView::Cards(vec![
        StatCard { label: "Mid Price", value: usd_price(s.mid_price), accent: "green" },
        StatCard { label: "Spread", value: bps(s.spread_bps), accent: "blue" },
        StatCard { label: "50bps Depth", value: usd_thousands(s.total_50bps), accent: "purple" },
        StatCard { label: "2% Depth", value: usd_thousands(s.total_2pct), accent: "orange" },
    ])
}

impl StatsView {
    pub fn is_skeleton(&self) -> bool {
        matches!(self, StatsView::Skeleton)
    }

    pub fn render_html(&self) -> String {
        let mut out = String::from(r#"<section class="stats">"#);
        match self {
            StatsView::Skeleton => {
                for _ in 0..4 {
                    out.push_str(
                        r#"<div class="card skeleton"><div class="bar short"></div><div class="bar long"></div></div>"#,
                    );
                }
            }
            StatsView::Cards(cards) => {
                for card in cards {
                    let _ = write!(
                        out,
                        r#"<div class="card"><h3 class="accent-{}">{}</h3><p class="stat">{}</p></div>"#,
                        card.accent,
                        super::escape_html(card.label),
                        super::escape_html(&card.value),
                    );
                }
            }
        }
        out.push_str("</section>");
        out
    }
}
