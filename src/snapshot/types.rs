use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One row of the `liquidity_snapshots` table, as written by the external collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LiquiditySnapshot {
    pub id: i64,
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub exchange: String,
    pub pair: String,
    #[serde(deserialize_with = "de_number")]
    pub mid_price: f64,
    #[serde(deserialize_with = "de_number")]
    pub spread_bps: f64,

    #[serde(deserialize_with = "de_number")]
    pub bid_10bps: f64,
    #[serde(deserialize_with = "de_number")]
    pub ask_10bps: f64,
    #[serde(deserialize_with = "de_number")]
    pub total_10bps: f64,

    #[serde(deserialize_with = "de_number")]
    pub bid_25bps: f64,
    #[serde(deserialize_with = "de_number")]
    pub ask_25bps: f64,
    #[serde(deserialize_with = "de_number")]
    pub total_25bps: f64,

    #[serde(deserialize_with = "de_number")]
    pub bid_50bps: f64,
    #[serde(deserialize_with = "de_number")]
    pub ask_50bps: f64,
    #[serde(deserialize_with = "de_number")]
    pub total_50bps: f64,

    #[serde(deserialize_with = "de_number")]
    pub bid_1pct: f64,
    #[serde(deserialize_with = "de_number")]
    pub ask_1pct: f64,
    #[serde(deserialize_with = "de_number")]
    pub total_1pct: f64,

    #[serde(deserialize_with = "de_number")]
    pub bid_2pct: f64,
    #[serde(deserialize_with = "de_number")]
    pub ask_2pct: f64,
    #[serde(deserialize_with = "de_number")]
    pub total_2pct: f64,
}

/// Price range around mid over which bid/ask volume is summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DepthBand {
    Bps10,
    Bps25,
    Bps50,
    Pct1,
    Pct2,
}

impl DepthBand {
    /// Narrowest first.
    pub const ALL: [DepthBand; 5] = [
        DepthBand::Bps10,
        DepthBand::Bps25,
        DepthBand::Bps50,
        DepthBand::Pct1,
        DepthBand::Pct2,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DepthBand::Bps10 => "10 bps",
            DepthBand::Bps25 => "25 bps",
            DepthBand::Bps50 => "50 bps",
            DepthBand::Pct1 => "1%",
            DepthBand::Pct2 => "2%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandDepth {
    pub bid: f64,
    pub ask: f64,
    pub total: f64,
}

impl LiquiditySnapshot {
    pub fn band(&self, band: DepthBand) -> BandDepth {
        let (bid, ask, total) = match band {
            DepthBand::Bps10 => (self.bid_10bps, self.ask_10bps, self.total_10bps),
            DepthBand::Bps25 => (self.bid_25bps, self.ask_25bps, self.total_25bps),
            DepthBand::Bps50 => (self.bid_50bps, self.ask_50bps, self.total_50bps),
            DepthBand::Pct1 => (self.bid_1pct, self.ask_1pct, self.total_1pct),
            DepthBand::Pct2 => (self.bid_2pct, self.ask_2pct, self.total_2pct),
        };
        BandDepth { bid, ask, total }
    }
}

// PostgREST renders `numeric` columns as JSON numbers, the realtime feed sometimes as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn de_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid number {s:?}: {e}"))),
    }
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {raw:?}")))
}

/// Accepts RFC 3339 (`2024-05-01T12:00:00+00:00`) and naive timestamps, which are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Postgres `timestamptz` text output: "2024-05-01 12:00:00.123+00"
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row_json(timestamp: &str, mid: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "timestamp": timestamp,
            "exchange": "binance",
            "pair": "NEAR/USDT",
            "mid_price": mid,
            "spread_bps": 4.567,
            "bid_10bps": 100.0, "ask_10bps": 150.0, "total_10bps": 250.0,
            "bid_25bps": 200.0, "ask_25bps": 300.0, "total_25bps": 500.0,
            "bid_50bps": 6000.0, "ask_50bps": 6000.0, "total_50bps": 12000.0,
            "bid_1pct": 10000.0, "ask_1pct": 10000.0, "total_1pct": 20000.0,
            "bid_2pct": 20000, "ask_2pct": 25000, "total_2pct": 45000
        })
    }

    #[test]
    fn decodes_rest_row() {
        let snap: LiquiditySnapshot =
            serde_json::from_value(row_json("2024-05-01T12:30:00+00:00", serde_json::json!(5.1234)))
                .unwrap();
        assert_eq!(snap.id, 42);
        assert_eq!(snap.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
        assert_eq!(snap.mid_price, 5.1234);
        assert_eq!(snap.total_2pct, 45000.0);
        assert_eq!(snap.band(DepthBand::Bps50).total, 12000.0);
    }

    #[test]
    fn decodes_string_numbers_and_naive_timestamps() {
        let snap: LiquiditySnapshot =
            serde_json::from_value(row_json("2024-05-01T12:30:00.250", serde_json::json!("5.5")))
                .unwrap();
        assert_eq!(snap.mid_price, 5.5);
        assert_eq!(snap.timestamp.timestamp_millis() % 1000, 250);
    }

    #[test]
    fn rejects_garbage_number() {
        let res: Result<LiquiditySnapshot, _> =
            serde_json::from_value(row_json("2024-05-01T12:30:00Z", serde_json::json!("n/a")));
        assert!(res.is_err());
    }

    #[test]
    fn parses_postgres_text_timestamp() {
        let ts = parse_timestamp("2024-05-01 12:30:00.5+00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap() + chrono::Duration::milliseconds(500));
    }

    #[test]
    fn bands_are_listed_narrowest_first() {
        let labels: Vec<_> = DepthBand::ALL.iter().map(|b| b.label()).collect();
        assert_eq!(labels, ["10 bps", "25 bps", "50 bps", "1%", "2%"]);
    }
}
