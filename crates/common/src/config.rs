//! Bot configuration types.

use serde::{Deserialize, Serialize};

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Kalshi API key ID.
    #[serde(default)]
    pub api_key: String,

    /// RSA private key PEM (with literal \n for newlines).
    #[serde(default)]
    pub secret_key: String,

    /// Use demo environment (true) or production (false).
    #[serde(default)]
    pub use_demo: bool,

    /// Series of daily contracts to trade (e.g. KXHIGHMIA).
    #[serde(default = "default_series_ticker")]
    pub series_ticker: String,

    /// Optional event ticker for the summary context (e.g. KXHIGHMIA-26JAN26).
    #[serde(default)]
    pub event_ticker: Option<String>,

    /// Force an exact market ticker instead of resolving one.
    #[serde(default)]
    pub market_ticker_override: Option<String>,

    /// Order book depth for snapshots and pricing.
    #[serde(default = "default_orderbook_depth")]
    pub orderbook_depth: usize,

    /// Max markets to pull for the configured event.
    #[serde(default = "default_event_market_limit")]
    pub event_market_limit: u32,

    /// Max event markets to fetch order books for per refresh.
    #[serde(default = "default_event_orderbook_limit")]
    pub event_orderbook_limit: usize,

    /// Trading limits and thresholds.
    #[serde(default)]
    pub trading: TradingConfig,

    /// Poll/refresh intervals (seconds).
    #[serde(default)]
    pub timing: TimingConfig,

    /// Weather observation source settings.
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Open-Meteo forecast cross-check settings.
    #[serde(default)]
    pub open_meteo: OpenMeteoConfig,

    /// Path the snapshot document is written to.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Optional operator note embedded in the snapshot.
    #[serde(default)]
    pub orders_note: Option<String>,
}

/// Trading limits and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Max contracts per order.
    #[serde(default = "default_max_order_size")]
    pub max_order_size: i64,

    /// Max total contracts held per ticker.
    #[serde(default = "default_max_position")]
    pub max_position: i64,

    /// Minimum expected edge in cents to trade.
    #[serde(default = "default_min_edge_cents")]
    pub min_edge_cents: i64,

    /// Estimated fee per contract in cents.
    #[serde(default)]
    pub fee_cents: f64,

    /// Submit orders automatically when an opportunity is found.
    #[serde(default)]
    pub trade_enabled: bool,
}

/// Poll/refresh intervals, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Seconds between run-loop cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Seconds between event market listing refreshes.
    #[serde(default = "default_event_markets_interval")]
    pub event_markets_interval_secs: i64,

    /// Seconds between event order book refreshes.
    #[serde(default = "default_event_orderbook_interval")]
    pub event_orderbook_interval_secs: i64,

    /// Seconds between Open-Meteo forecast refreshes.
    #[serde(default = "default_open_meteo_interval")]
    pub open_meteo_interval_secs: i64,
}

/// NWS observation source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// NWS station to read observations from (e.g. "KMIA").
    #[serde(default = "default_station_id")]
    pub station_id: String,

    /// User-Agent sent to api.weather.gov (they require a contact).
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Open-Meteo forecast cross-check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Latitude of the market's settlement station.
    #[serde(default = "default_lat")]
    pub lat: f64,

    /// Longitude of the market's settlement station.
    #[serde(default = "default_lon")]
    pub lon: f64,
}

fn default_true() -> bool {
    true
}

fn default_series_ticker() -> String {
    "KXHIGHMIA".to_string()
}

fn default_orderbook_depth() -> usize {
    10
}

fn default_event_market_limit() -> u32 {
    200
}

fn default_event_orderbook_limit() -> usize {
    50
}

fn default_max_order_size() -> i64 {
    5
}

fn default_max_position() -> i64 {
    20
}

fn default_min_edge_cents() -> i64 {
    2
}

fn default_poll_interval() -> u64 {
    60
}

fn default_event_markets_interval() -> i64 {
    300
}

fn default_event_orderbook_interval() -> i64 {
    120
}

fn default_open_meteo_interval() -> i64 {
    900
}

fn default_station_id() -> String {
    "KMIA".to_string()
}

fn default_user_agent() -> String {
    "kalshi-temp-bot/0.1 (contact: ops@example.com)".to_string()
}

// Miami International Airport, the settlement station for KXHIGHMIA.
fn default_lat() -> f64 {
    25.78805
}

fn default_lon() -> f64 {
    -80.31694
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            use_demo: false,
            series_ticker: default_series_ticker(),
            event_ticker: None,
            market_ticker_override: None,
            orderbook_depth: default_orderbook_depth(),
            event_market_limit: default_event_market_limit(),
            event_orderbook_limit: default_event_orderbook_limit(),
            trading: TradingConfig::default(),
            timing: TimingConfig::default(),
            weather: WeatherConfig::default(),
            open_meteo: OpenMeteoConfig::default(),
            snapshot_path: default_snapshot_path(),
            orders_note: None,
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_order_size: default_max_order_size(),
            max_position: default_max_position(),
            min_edge_cents: default_min_edge_cents(),
            fee_cents: 0.0,
            trade_enabled: false,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            event_markets_interval_secs: default_event_markets_interval(),
            event_orderbook_interval_secs: default_event_orderbook_interval(),
            open_meteo_interval_secs: default_open_meteo_interval(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            station_id: default_station_id(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lat: default_lat(),
            lon: default_lon(),
        }
    }
}

fn default_snapshot_path() -> String {
    "snapshot.json".to_string()
}
