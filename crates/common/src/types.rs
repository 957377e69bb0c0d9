//! Domain types shared across the bot.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};

// ── Kalshi Market Types ───────────────────────────────────────────────

/// A Kalshi market as returned by GET /trade-api/v2/markets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInfo {
    pub ticker: String,
    #[serde(default)]
    pub event_ticker: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub yes_bid: i64,
    #[serde(default)]
    pub yes_ask: i64,
    #[serde(default)]
    pub no_bid: i64,
    #[serde(default)]
    pub no_ask: i64,
    #[serde(default)]
    pub last_price: i64,
    #[serde(default)]
    pub volume: i64,
    #[serde(default)]
    pub open_interest: i64,
    /// Close time as epoch seconds. The wire sends either an integer
    /// timestamp or an ISO-8601 string depending on the endpoint.
    #[serde(
        default,
        alias = "close_ts",
        alias = "close_timestamp",
        deserialize_with = "de_epoch_or_iso"
    )]
    pub close_time: Option<i64>,
    #[serde(default)]
    pub result: Option<String>,
}

/// Paginated response from GET /trade-api/v2/markets.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketsResponse {
    #[serde(default)]
    pub markets: Vec<MarketInfo>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Parse a close-time value that may be epoch seconds, a stringified
/// integer, or an ISO-8601 timestamp. Anything else is `None`.
pub fn parse_close_ts(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => {
            if let Ok(ts) = s.parse::<i64>() {
                return Some(ts);
            }
            DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp())
        }
        _ => None,
    }
}

fn de_epoch_or_iso<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_close_ts))
}

/// Response from GET /trade-api/v2/series/{ticker}.
///
/// Older payloads list markets at the top level, newer ones nest them
/// under `series`; entries are either bare tickers or market objects.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResponse {
    #[serde(default)]
    markets: Vec<SeriesMarketRef>,
    #[serde(default)]
    series: Option<SeriesBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct SeriesBody {
    #[serde(default)]
    markets: Vec<SeriesMarketRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SeriesMarketRef {
    Ticker(String),
    Market { ticker: String },
}

impl SeriesResponse {
    /// All market tickers named by the series, regardless of payload shape.
    pub fn market_tickers(self) -> Vec<String> {
        let refs = if !self.markets.is_empty() {
            self.markets
        } else {
            self.series.map(|s| s.markets).unwrap_or_default()
        };
        refs.into_iter()
            .map(|r| match r {
                SeriesMarketRef::Ticker(t) => t,
                SeriesMarketRef::Market { ticker } => ticker,
            })
            .collect()
    }
}

// ── Order Book Types ──────────────────────────────────────────────────

/// One resting bid level, normalized. Price is in cents (1–99).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: i64,
    #[serde(default)]
    pub count: i64,
}

/// Normalized order book: resting buy-side levels per side, best first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Orderbook {
    pub yes: Vec<OrderBookLevel>,
    pub no: Vec<OrderBookLevel>,
}

impl Orderbook {
    pub fn best_yes_bid(&self) -> Option<i64> {
        self.yes.first().map(|l| l.price)
    }

    pub fn best_no_bid(&self) -> Option<i64> {
        self.no.first().map(|l| l.price)
    }

    pub fn is_empty(&self) -> bool {
        self.yes.is_empty() && self.no.is_empty()
    }
}

/// Raw response from GET /trade-api/v2/markets/{ticker}/orderbook.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookResponse {
    #[serde(default)]
    pub orderbook: Option<RawOrderbook>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOrderbook {
    #[serde(default)]
    pub yes: Vec<RawLevel>,
    #[serde(default)]
    pub no: Vec<RawLevel>,
}

/// A wire-format bid level: either a `{price, count}` object or a
/// `[price, count]` pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLevel {
    Entry {
        #[serde(default)]
        price: Option<i64>,
        #[serde(default)]
        count: Option<i64>,
    },
    Pair(Vec<i64>),
}

impl RawLevel {
    fn normalize(&self) -> Option<OrderBookLevel> {
        match self {
            RawLevel::Entry { price, count } => price.map(|p| OrderBookLevel {
                price: p,
                count: count.unwrap_or(0),
            }),
            RawLevel::Pair(values) => values.first().map(|p| OrderBookLevel {
                price: *p,
                count: values.get(1).copied().unwrap_or(0),
            }),
        }
    }
}

/// Normalize raw bid levels into the fixed shape, keeping at most `depth`
/// levels and dropping malformed entries without a price.
pub fn normalize_levels(raw: &[RawLevel], depth: usize) -> Vec<OrderBookLevel> {
    raw.iter().take(depth).filter_map(RawLevel::normalize).collect()
}

// ── Exchange Status ───────────────────────────────────────────────────

/// Response from GET /trade-api/v2/exchange/status.
///
/// Missing fields are treated as active: an incomplete payload must not
/// halt trading on its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExchangeStatus {
    #[serde(default = "default_true")]
    pub exchange_active: bool,
    #[serde(default = "default_true")]
    pub trading_active: bool,
}

impl ExchangeStatus {
    pub fn is_active(&self) -> bool {
        self.exchange_active && self.trading_active
    }
}

fn default_true() -> bool {
    true
}

// ── Order Types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Limit,
    Market,
}

/// An order to be placed.
#[derive(Debug, Clone, Serialize)]
pub struct OrderIntent {
    /// Market ticker.
    pub ticker: String,
    /// "yes" or "no".
    pub side: Side,
    /// "buy" or "sell".
    pub action: Action,
    /// Limit price in cents (1-99).
    pub price_cents: i64,
    /// Number of contracts.
    pub count: i64,
    /// Reason for the trade (for logging).
    pub reason: String,
}

/// Order request body for the Kalshi API.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub ticker: String,
    pub side: Side,
    pub action: Action,
    pub client_order_id: String,
    pub count: i64,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_price: Option<i64>,
}

/// Response from POST /trade-api/v2/portfolio/orders.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    pub order: OrderRecord,
}

/// An order as returned by the Kalshi API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub yes_price: i64,
    #[serde(default)]
    pub no_price: i64,
    #[serde(default)]
    pub fill_count: i64,
    #[serde(default)]
    pub remaining_count: i64,
}

/// Portfolio orders response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
    #[serde(default)]
    pub cursor: Option<String>,
}

// ── Position Types ────────────────────────────────────────────────────

/// A portfolio position. Field names vary across API revisions, so every
/// count-like field is optional and resolved via [`PortfolioPosition::contracts`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortfolioPosition {
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub net_position: Option<i64>,
    #[serde(default, alias = "yes_position")]
    pub yes: Option<i64>,
    #[serde(default, alias = "no_position")]
    pub no: Option<i64>,
}

impl PortfolioPosition {
    /// Contracts held, as a non-negative magnitude.
    ///
    /// Reads the first present of position/count/size/quantity/net_position,
    /// falling back to |yes| + |no| when only per-side counts exist.
    pub fn contracts(&self) -> i64 {
        for value in [
            self.position,
            self.count,
            self.size,
            self.quantity,
            self.net_position,
        ] {
            if let Some(v) = value {
                return v.abs();
            }
        }
        if self.yes.is_some() || self.no.is_some() {
            return self.yes.unwrap_or(0).abs() + self.no.unwrap_or(0).abs();
        }
        0
    }
}

/// Portfolio positions response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionsResponse {
    #[serde(default, alias = "positions")]
    pub market_positions: Vec<PortfolioPosition>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Balance response.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Balance in cents.
    pub balance: i64,
}

// ── Weather Types ─────────────────────────────────────────────────────

/// A merged weather observation, all temperatures in °F.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherReading {
    pub current_temp: Option<i64>,
    pub high_today: Option<i64>,
    pub low_today: Option<i64>,
    pub observation_time: Option<String>,
    pub source: Option<String>,
}

/// Daily-high forecasts from two Open-Meteo models, plus their spread.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ForecastSpread {
    pub gfs_high: Option<f64>,
    pub ecmwf_high: Option<f64>,
    pub spread: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_ts_accepts_epoch_and_iso() {
        let epoch = serde_json::json!(1767139200);
        assert_eq!(parse_close_ts(&epoch), Some(1767139200));

        let epoch_str = serde_json::json!("1767139200");
        assert_eq!(parse_close_ts(&epoch_str), Some(1767139200));

        let iso = serde_json::json!("2026-01-26T23:00:00Z");
        let parsed = parse_close_ts(&iso).expect("ISO close time should parse");
        assert_eq!(parsed, 1769468400);

        let junk = serde_json::json!({"nested": true});
        assert_eq!(parse_close_ts(&junk), None);
    }

    #[test]
    fn test_market_close_time_field_variants() {
        let with_iso: MarketInfo = serde_json::from_value(serde_json::json!({
            "ticker": "KXHIGHMIA-26JAN26",
            "close_time": "2026-01-26T23:00:00Z"
        }))
        .unwrap();
        assert!(with_iso.close_time.is_some());

        let with_epoch: MarketInfo = serde_json::from_value(serde_json::json!({
            "ticker": "KXHIGHMIA-26JAN26",
            "close_ts": 1769468400
        }))
        .unwrap();
        assert_eq!(with_epoch.close_time, Some(1769468400));
    }

    #[test]
    fn test_orderbook_levels_object_and_pair_forms() {
        let raw: RawOrderbook = serde_json::from_value(serde_json::json!({
            "yes": [{"price": 42, "count": 10}, [40, 5], {"count": 3}],
            "no": [[55, 7]]
        }))
        .unwrap();

        let yes = normalize_levels(&raw.yes, 10);
        assert_eq!(
            yes,
            vec![
                OrderBookLevel { price: 42, count: 10 },
                OrderBookLevel { price: 40, count: 5 },
            ]
        );

        let no = normalize_levels(&raw.no, 10);
        assert_eq!(no, vec![OrderBookLevel { price: 55, count: 7 }]);
    }

    #[test]
    fn test_normalize_levels_respects_depth() {
        let raw: Vec<RawLevel> =
            serde_json::from_value(serde_json::json!([[50, 1], [49, 1], [48, 1]])).unwrap();
        assert_eq!(normalize_levels(&raw, 2).len(), 2);
    }

    #[test]
    fn test_series_tickers_both_payload_shapes() {
        let top: SeriesResponse = serde_json::from_value(serde_json::json!({
            "markets": ["KXHIGHMIA-26JAN26", {"ticker": "KXHIGHMIA-27JAN26"}]
        }))
        .unwrap();
        assert_eq!(
            top.market_tickers(),
            vec!["KXHIGHMIA-26JAN26", "KXHIGHMIA-27JAN26"]
        );

        let nested: SeriesResponse = serde_json::from_value(serde_json::json!({
            "series": {"markets": [{"ticker": "KXHIGHMIA-28JAN26"}]}
        }))
        .unwrap();
        assert_eq!(nested.market_tickers(), vec!["KXHIGHMIA-28JAN26"]);
    }

    #[test]
    fn test_exchange_status_defaults_active() {
        let status: ExchangeStatus = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(status.is_active());

        let paused: ExchangeStatus =
            serde_json::from_value(serde_json::json!({"trading_active": false})).unwrap();
        assert!(!paused.is_active());
    }

    #[test]
    fn test_position_contracts_fallback_chain() {
        let by_position: PortfolioPosition =
            serde_json::from_value(serde_json::json!({"ticker": "T", "position": -7})).unwrap();
        assert_eq!(by_position.contracts(), 7);

        let by_quantity: PortfolioPosition =
            serde_json::from_value(serde_json::json!({"ticker": "T", "quantity": 4})).unwrap();
        assert_eq!(by_quantity.contracts(), 4);

        let by_sides: PortfolioPosition = serde_json::from_value(
            serde_json::json!({"ticker": "T", "yes_position": 3, "no": -2}),
        )
        .unwrap();
        assert_eq!(by_sides.contracts(), 5);

        let empty: PortfolioPosition =
            serde_json::from_value(serde_json::json!({"ticker": "T"})).unwrap();
        assert_eq!(empty.contracts(), 0);
    }
}
