//! Daily market ticker resolution.
//!
//! Temperature series list one market per day with tickers like
//! `KXHIGHMIA-26JAN26`. Resolution tries, in order: a configured override,
//! the canonical date-derived ticker confirmed against the series listing,
//! and the open-market listing. It always produces a ticker; a wrong guess
//! surfaces later as a failed market fetch, not as a crash.

use chrono::{Local, NaiveDate, Utc};
use common::MarketInfo;
use kalshi_client::KalshiRestClient;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TickerResolver {
    series_ticker: String,
    override_ticker: Option<String>,
}

/// Earliest-closing market that is still open, else the first listed.
fn select_open_market(markets: &[MarketInfo], now_ts: i64) -> Option<String> {
    if markets.is_empty() {
        return None;
    }

    let upcoming = markets
        .iter()
        .filter(|m| m.close_time.map_or(false, |ts| ts >= now_ts))
        .min_by_key(|m| m.close_time);

    match upcoming {
        Some(m) => Some(m.ticker.clone()),
        None => Some(markets[0].ticker.clone()),
    }
}

impl TickerResolver {
    pub fn new(series_ticker: impl Into<String>, override_ticker: Option<String>) -> Self {
        Self {
            series_ticker: series_ticker.into(),
            override_ticker,
        }
    }

    /// The date-derived ticker, e.g. `KXHIGHMIA-26JAN26` for 2026-01-26.
    pub fn canonical_ticker(&self, date: NaiveDate) -> String {
        format!(
            "{}-{}",
            self.series_ticker,
            date.format("%d%b%y").to_string().to_uppercase()
        )
    }

    /// Pure resolution over already-fetched listings.
    pub fn resolve_from_listings(
        &self,
        today: NaiveDate,
        now_ts: i64,
        series_tickers: Option<&[String]>,
        open_markets: Option<&[MarketInfo]>,
    ) -> String {
        if let Some(t) = &self.override_ticker {
            return t.clone();
        }

        let canonical = self.canonical_ticker(today);
        if let Some(tickers) = series_tickers {
            if tickers.iter().any(|t| t == &canonical) {
                return canonical;
            }
        }
        if let Some(markets) = open_markets {
            if let Some(ticker) = select_open_market(markets, now_ts) {
                return ticker;
            }
        }
        canonical
    }

    /// Resolve today's market ticker against the live API.
    ///
    /// Lookup failures degrade to the next source; this never errors.
    pub async fn resolve(&self, client: &KalshiRestClient) -> String {
        if let Some(t) = &self.override_ticker {
            debug!("Using configured market ticker override: {}", t);
            return t.clone();
        }

        let today = Local::now().date_naive();
        let now_ts = Utc::now().timestamp();
        let canonical = self.canonical_ticker(today);

        let series_tickers = match client.get_series_market_tickers(&self.series_ticker).await {
            Ok(tickers) => Some(tickers),
            Err(e) => {
                warn!("Series lookup for {} failed: {}", self.series_ticker, e);
                None
            }
        };
        if let Some(ref tickers) = series_tickers {
            if tickers.iter().any(|t| t == &canonical) {
                debug!("Resolved {} via series listing", canonical);
                return canonical;
            }
        }

        let open_markets = match client
            .get_markets(Some(&self.series_ticker), None, Some("open"), 200)
            .await
        {
            Ok(markets) => Some(markets),
            Err(e) => {
                warn!("Open-market lookup for {} failed: {}", self.series_ticker, e);
                None
            }
        };

        let resolved = self.resolve_from_listings(
            today,
            now_ts,
            series_tickers.as_deref(),
            open_markets.as_deref(),
        );
        debug!("Resolved market ticker: {}", resolved);
        resolved
    }
}
