//! Configuration loader — merges env vars, .env file, and config.toml.

use common::config::BotConfig;
use common::Error;
use std::path::Path;

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

fn parse_positive_i64(raw: &str, env_name: &str) -> Result<i64, Error> {
    let parsed = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed <= 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_non_negative_i64(raw: &str, env_name: &str) -> Result<i64, Error> {
    let parsed = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))?;
    if parsed < 0 {
        return Err(Error::Config(format!("{env_name} must be an integer >= 0")));
    }
    Ok(parsed)
}

fn parse_non_negative_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number >= 0")))?;
    if parsed < 0.0 {
        return Err(Error::Config(format!("{env_name} must be a number >= 0")));
    }
    Ok(parsed)
}

fn parse_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number")))
}

fn validate_config(config: &BotConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.series_ticker.trim().is_empty() {
        issues.push("series_ticker must not be empty".into());
    }
    if config.orderbook_depth == 0 {
        issues.push("orderbook_depth must be > 0".into());
    }
    if config.event_market_limit == 0 {
        issues.push("event_market_limit must be > 0".into());
    }
    if config.event_orderbook_limit == 0 {
        issues.push("event_orderbook_limit must be > 0".into());
    }

    if config.trading.max_order_size <= 0 {
        issues.push("trading.max_order_size must be > 0".into());
    }
    if config.trading.max_position <= 0 {
        issues.push("trading.max_position must be > 0".into());
    }
    if config.trading.min_edge_cents < 0 {
        issues.push("trading.min_edge_cents must be >= 0".into());
    }
    if config.trading.fee_cents < 0.0 {
        issues.push("trading.fee_cents must be >= 0".into());
    }
    if config.trading.max_position < config.trading.max_order_size {
        issues.push("trading.max_position must be >= trading.max_order_size".into());
    }

    if config.timing.poll_interval_secs == 0 {
        issues.push("timing.poll_interval_secs must be > 0".into());
    }
    if config.timing.event_markets_interval_secs <= 0 {
        issues.push("timing.event_markets_interval_secs must be > 0".into());
    }
    if config.timing.event_orderbook_interval_secs <= 0 {
        issues.push("timing.event_orderbook_interval_secs must be > 0".into());
    }
    if config.timing.open_meteo_interval_secs <= 0 {
        issues.push("timing.open_meteo_interval_secs must be > 0".into());
    }

    if config.weather.station_id.trim().is_empty() {
        issues.push("weather.station_id must not be empty".into());
    }
    if config.weather.user_agent.trim().is_empty() {
        issues.push("weather.user_agent must not be empty".into());
    }

    if !(-90.0..=90.0).contains(&config.open_meteo.lat) {
        issues.push("open_meteo.lat must be in [-90, 90]".into());
    }
    if !(-180.0..=180.0).contains(&config.open_meteo.lon) {
        issues.push("open_meteo.lon must be in [-180, 180]".into());
    }

    if config.snapshot_path.trim().is_empty() {
        issues.push("snapshot_path must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load bot configuration from environment and optional config file.
pub fn load_config() -> Result<BotConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = BotConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(key) = std::env::var("KALSHI_API_KEY") {
        config.api_key = key;
    }
    if let Ok(secret) = std::env::var("KALSHI_SECRET_KEY") {
        config.secret_key = secret;
    }
    if let Ok(path) = std::env::var("KALSHI_PRIVATE_KEY_FILE") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            config.secret_key = std::fs::read_to_string(trimmed).map_err(|e| {
                Error::Config(format!("Failed to read KALSHI_PRIVATE_KEY_FILE: {}", e))
            })?;
        }
    }
    if let Ok(demo) = std::env::var("USE_DEMO") {
        config.use_demo = parse_bool(&demo);
    }
    if let Ok(series) = std::env::var("KALSHI_SERIES_TICKER") {
        config.series_ticker = series.trim().to_string();
    }
    if let Ok(event) = std::env::var("KALSHI_EVENT_TICKER") {
        let trimmed = event.trim();
        config.event_ticker = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Ok(ticker) = std::env::var("KALSHI_MARKET_TICKER") {
        let trimmed = ticker.trim();
        config.market_ticker_override = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Ok(raw) = std::env::var("BOT_INTERVAL") {
        config.timing.poll_interval_secs = parse_positive_i64(&raw, "BOT_INTERVAL")? as u64;
    }
    if let Ok(raw) = std::env::var("ORDERBOOK_DEPTH") {
        config.orderbook_depth = parse_positive_i64(&raw, "ORDERBOOK_DEPTH")? as usize;
    }
    if let Ok(raw) = std::env::var("EVENT_MARKET_LIMIT") {
        config.event_market_limit = parse_positive_i64(&raw, "EVENT_MARKET_LIMIT")? as u32;
    }
    if let Ok(raw) = std::env::var("EVENT_ORDERBOOK_LIMIT") {
        config.event_orderbook_limit = parse_positive_i64(&raw, "EVENT_ORDERBOOK_LIMIT")? as usize;
    }
    if let Ok(raw) = std::env::var("EVENT_MARKETS_INTERVAL") {
        config.timing.event_markets_interval_secs =
            parse_positive_i64(&raw, "EVENT_MARKETS_INTERVAL")?;
    }
    if let Ok(raw) = std::env::var("EVENT_ORDERBOOK_INTERVAL") {
        config.timing.event_orderbook_interval_secs =
            parse_positive_i64(&raw, "EVENT_ORDERBOOK_INTERVAL")?;
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_ENABLED") {
        config.open_meteo.enabled = parse_bool(&raw);
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_LAT") {
        config.open_meteo.lat = parse_f64(&raw, "OPEN_METEO_LAT")?;
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_LON") {
        config.open_meteo.lon = parse_f64(&raw, "OPEN_METEO_LON")?;
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_INTERVAL") {
        config.timing.open_meteo_interval_secs = parse_positive_i64(&raw, "OPEN_METEO_INTERVAL")?;
    }
    if let Ok(station) = std::env::var("NWS_STATION_ID") {
        config.weather.station_id = station.trim().to_string();
    }
    if let Ok(agent) = std::env::var("NWS_USER_AGENT") {
        config.weather.user_agent = agent.trim().to_string();
    }
    if let Ok(raw) = std::env::var("MAX_ORDER_SIZE") {
        config.trading.max_order_size = parse_positive_i64(&raw, "MAX_ORDER_SIZE")?;
    }
    if let Ok(raw) = std::env::var("MAX_POSITION") {
        config.trading.max_position = parse_positive_i64(&raw, "MAX_POSITION")?;
    }
    if let Ok(raw) = std::env::var("MIN_EDGE_CENTS") {
        config.trading.min_edge_cents = parse_non_negative_i64(&raw, "MIN_EDGE_CENTS")?;
    }
    if let Ok(raw) = std::env::var("FEE_CENTS") {
        config.trading.fee_cents = parse_non_negative_f64(&raw, "FEE_CENTS")?;
    }
    if let Ok(raw) = std::env::var("TRADE_ENABLED") {
        config.trading.trade_enabled = parse_bool(&raw);
    }
    if let Ok(path) = std::env::var("BOT_SNAPSHOT_FILE") {
        config.snapshot_path = path.trim().to_string();
    }
    if let Ok(note) = std::env::var("ORDERS_NOTE") {
        let trimmed = note.trim();
        config.orders_note = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    // 5. Validate required fields.
    if config.api_key.is_empty() {
        return Err(Error::Config(
            "KALSHI_API_KEY is required (set in .env or environment)".into(),
        ));
    }
    if config.secret_key.is_empty() {
        return Err(Error::Config(
            "KALSHI_SECRET_KEY or KALSHI_PRIVATE_KEY_FILE is required (set in .env or environment)"
                .into(),
        ));
    }

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(" no "));
        assert!(!parse_bool("off"));
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let mut config = BotConfig::default();
        config.series_ticker.clear();
        config.trading.max_order_size = 0;
        config.timing.poll_interval_secs = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("series_ticker must not be empty"));
        assert!(err.contains("trading.max_order_size must be > 0"));
        assert!(err.contains("timing.poll_interval_secs must be > 0"));
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert!(validate_config(&BotConfig::default()).is_ok());
    }
}
