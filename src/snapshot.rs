//! Per-cycle state snapshot, written atomically for external dashboards.

use std::io::Write;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use common::{
    ForecastSpread, MarketInfo, Orderbook, OrderRecord, PortfolioPosition, WeatherReading,
};
use serde::Serialize;
use strategy::OpportunityDecision;

/// Slim view of an event sibling market.
#[derive(Debug, Clone, Serialize)]
pub struct EventMarketSummary {
    pub ticker: String,
    pub title: String,
    pub yes_bid: i64,
    pub no_bid: i64,
    pub last_price: i64,
    pub volume: i64,
}

impl From<&MarketInfo> for EventMarketSummary {
    fn from(m: &MarketInfo) -> Self {
        Self {
            ticker: m.ticker.clone(),
            title: m.title.clone(),
            yes_bid: m.yes_bid,
            no_bid: m.no_bid,
            last_price: m.last_price,
            volume: m.volume,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventOrderbookEntry {
    pub ticker: String,
    pub orderbook: Orderbook,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSnapshot {
    pub balance_cents: Option<i64>,
    pub positions: Vec<PortfolioPosition>,
    pub executed_orders: Vec<OrderRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders_note: Option<String>,
}

/// Everything the bot saw and decided in one cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub market_ticker: String,
    pub market_title: Option<String>,
    pub market_status: Option<String>,
    pub last_price: Option<i64>,
    pub exchange_active: bool,
    pub weather: WeatherReading,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_meteo: Option<ForecastSpread>,
    pub orderbook: Orderbook,
    pub portfolio: PortfolioSnapshot,
    pub event_ticker: Option<String>,
    pub event_markets: Vec<EventMarketSummary>,
    pub event_orderbooks: Vec<EventOrderbookEntry>,
    pub decision: OpportunityDecision,
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Write the snapshot via a temp file and rename, so readers never see a
/// partially-written file.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> common::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            timestamp: now_timestamp(),
            market_ticker: "KXHIGHMIA-26JAN26".into(),
            market_title: Some("Will the high be at least 75°F?".into()),
            market_status: Some("open".into()),
            last_price: Some(90),
            exchange_active: true,
            weather: WeatherReading {
                current_temp: Some(76),
                high_today: Some(78),
                ..Default::default()
            },
            open_meteo: None,
            orderbook: Orderbook::default(),
            portfolio: PortfolioSnapshot {
                balance_cents: Some(10_000),
                positions: Vec::new(),
                executed_orders: Vec::new(),
                orders_note: None,
            },
            event_ticker: None,
            event_markets: Vec::new(),
            event_orderbooks: Vec::new(),
            decision: OpportunityDecision {
                has_opportunity: false,
                confidence: 0.0,
                recommendation: None,
                order: None,
                reasoning: vec!["Insufficient weather data".into()],
            },
        }
    }

    #[test]
    fn test_write_snapshot_round_trips_and_cleans_tmp() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("bot-snapshot-test-{}.json", std::process::id()));

        write_snapshot(&path, &sample_snapshot()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["market_ticker"], "KXHIGHMIA-26JAN26");
        assert_eq!(parsed["weather"]["current_temp"], 76);
        assert!(parsed["portfolio"]["executed_orders"].is_array());
        assert!(!path.with_extension("tmp").exists());

        // Overwriting an existing snapshot also goes through the rename.
        write_snapshot(&path, &sample_snapshot()).unwrap();
        assert!(path.exists());

        std::fs::remove_file(&path).ok();
    }
}
