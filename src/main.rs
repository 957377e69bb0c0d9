//! Kalshi daily-high temperature bot.
//!
//! Single-binary Tokio application that each cycle:
//! 1. Gates on exchange availability
//! 2. Fetches the latest NWS observation (plus Open-Meteo cross-checks)
//! 3. Resolves today's market in the configured temperature series
//! 4. Pulls market, order book, and portfolio state
//! 5. Runs the EV opportunity engine and optionally places one order
//! 6. Writes an atomic state snapshot for dashboards

mod config;
mod snapshot;

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, SecondsFormat, Timelike, Utc};
use clap::Parser;
use futures_util::future::join_all;
use serde_json::json;
use tokio::time::sleep;
use tracing::{error, info, warn};

use common::config::BotConfig;
use common::{Action, ForecastSpread, MarketInfo, OrderIntent, Orderbook, WeatherReading};
use kalshi_client::{KalshiAuth, KalshiRestClient};
use nws_client::NwsClient;
use open_meteo_client::OpenMeteoClient;
use snapshot::{EventMarketSummary, EventOrderbookEntry, PortfolioSnapshot, Snapshot};
use strategy::{position_exposure, OpportunityEngine, RefreshCache, TickerResolver};

/// Kalshi Daily-High Temperature Bot
#[derive(Parser)]
#[command(name = "kalshi-temp-bot", about = "Kalshi daily-high temperature bot")]
struct Cli {
    /// Just test authentication and print balance, then exit.
    #[arg(long)]
    check_auth: bool,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

const BOT_TRADE_DIR: &str = "kalshi-temp-bot";

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn side_label(side: common::Side) -> &'static str {
    match side {
        common::Side::Yes => "yes",
        common::Side::No => "no",
    }
}

fn resolve_repo_root() -> Option<PathBuf> {
    let mut cursor = std::env::current_dir().ok()?;
    loop {
        if cursor.join(".git").is_dir() {
            return Some(cursor);
        }
        if !cursor.pop() {
            return None;
        }
    }
}

fn resolve_trades_dir() -> PathBuf {
    if let Ok(raw) = std::env::var("TRADES_DIR") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed).join(BOT_TRADE_DIR);
        }
    }

    if let Some(root) = resolve_repo_root() {
        return root.join("TRADES").join(BOT_TRADE_DIR);
    }

    PathBuf::from("TRADES").join(BOT_TRADE_DIR)
}

struct TradeJournal {
    dir: PathBuf,
    day_key: String,
    file: File,
}

impl TradeJournal {
    fn open(dir: PathBuf) -> std::io::Result<Self> {
        create_dir_all(&dir)?;
        let day_key = Utc::now().format("%Y-%m-%d").to_string();
        let file = Self::open_day_file(&dir, &day_key)?;
        Ok(Self { dir, day_key, file })
    }

    fn open_day_file(dir: &Path, day_key: &str) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(format!("trades-{}.jsonl", day_key)))
    }

    fn rotate_if_needed(&mut self) -> std::io::Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        if today != self.day_key {
            self.file = Self::open_day_file(&self.dir, &today)?;
            self.day_key = today;
        }
        Ok(())
    }

    fn write_event(&mut self, event: serde_json::Value) {
        let write_result = (|| -> std::io::Result<()> {
            self.rotate_if_needed()?;
            let line = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            writeln!(self.file, "{}", line)?;
            self.file.flush()?;
            Ok(())
        })();

        if let Err(e) = write_result {
            warn!("Trade journal write failed: {}", e);
        }
    }

    fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Per-data-source refresh caches; each holds the last fetched value
/// and re-fetches on its own interval.
struct CycleCaches {
    event_markets: RefreshCache<Vec<MarketInfo>>,
    event_orderbooks: RefreshCache<Vec<EventOrderbookEntry>>,
    open_meteo: RefreshCache<ForecastSpread>,
}

impl CycleCaches {
    fn new() -> Self {
        Self {
            event_markets: RefreshCache::new(),
            event_orderbooks: RefreshCache::new(),
            open_meteo: RefreshCache::new(),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kalshi_temp_bot=info,kalshi_client=info,nws_client=info,open_meteo_client=info,strategy=info"
                    .into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("🌡️  Kalshi Temp Bot starting up...");

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let env_label = if cfg.use_demo { "DEMO" } else { "PRODUCTION" };
    info!("Environment: {}", env_label);
    info!(
        "Series: {} (station {}, poll every {}s)",
        cfg.series_ticker, cfg.weather.station_id, cfg.timing.poll_interval_secs
    );
    info!(
        "Trading: enabled={}, max_order={}, max_position={}, min_edge={}¢, fee={:.2}¢",
        cfg.trading.trade_enabled,
        cfg.trading.max_order_size,
        cfg.trading.max_position,
        cfg.trading.min_edge_cents,
        cfg.trading.fee_cents,
    );

    let trades_dir = resolve_trades_dir();
    let mut journal = match TradeJournal::open(trades_dir) {
        Ok(j) => j,
        Err(e) => {
            error!("Failed to initialize trade journal: {}", e);
            std::process::exit(1);
        }
    };
    info!("Trade journal path: {}", journal.dir().display());
    journal.write_event(json!({
        "ts": now_iso(),
        "kind": "bot_start",
        "bot": "kalshi-temp-bot",
        "mode": if cli.once { "once" } else { "live" },
        "use_demo": cfg.use_demo,
        "series_ticker": cfg.series_ticker,
        "trading": {
            "trade_enabled": cfg.trading.trade_enabled,
            "max_order_size": cfg.trading.max_order_size,
            "max_position": cfg.trading.max_position,
            "min_edge_cents": cfg.trading.min_edge_cents,
            "fee_cents": cfg.trading.fee_cents
        },
        "timing": {
            "poll_interval_secs": cfg.timing.poll_interval_secs,
            "event_markets_interval_secs": cfg.timing.event_markets_interval_secs,
            "event_orderbook_interval_secs": cfg.timing.event_orderbook_interval_secs,
            "open_meteo_interval_secs": cfg.timing.open_meteo_interval_secs
        }
    }));

    // Initialize auth.
    let auth = match KalshiAuth::new(&cfg.api_key, &cfg.secret_key) {
        Ok(a) => a,
        Err(e) => {
            error!("Auth initialization failed: {}", e);
            journal.write_event(json!({
                "ts": now_iso(),
                "kind": "auth_init",
                "status": "error",
                "error": e.to_string()
            }));
            std::process::exit(1);
        }
    };

    let rest_client = KalshiRestClient::new(auth, cfg.use_demo);

    // ── Check-auth mode ──────────────────────────────────────────────
    if cli.check_auth {
        info!("Running auth check...");
        match rest_client.get_balance().await {
            Ok(balance) => {
                info!(
                    "✅ Auth successful! Balance: {}¢ (${:.2})",
                    balance,
                    balance as f64 / 100.0
                );
                journal.write_event(json!({
                    "ts": now_iso(),
                    "kind": "auth_check",
                    "status": "ok",
                    "balance_cents": balance
                }));
            }
            Err(e) => {
                error!("❌ Auth check failed: {}", e);
                journal.write_event(json!({
                    "ts": now_iso(),
                    "kind": "auth_check",
                    "status": "error",
                    "error": e.to_string()
                }));
                std::process::exit(1);
            }
        }
        return;
    }

    // ── Startup connectivity probe ───────────────────────────────────
    match rest_client.get_exchange_status().await {
        Ok(status) => {
            info!(
                "Exchange reachable: exchange_active={} trading_active={}",
                status.exchange_active, status.trading_active
            );
        }
        Err(e) => {
            error!("Exchange connectivity check failed: {}", e);
            journal.write_event(json!({
                "ts": now_iso(),
                "kind": "connectivity_check",
                "status": "error",
                "error": e.to_string()
            }));
            std::process::exit(1);
        }
    }

    let nws = NwsClient::new(&cfg.weather.user_agent);
    let meteo = OpenMeteoClient::new();
    let resolver = TickerResolver::new(
        cfg.series_ticker.clone(),
        cfg.market_ticker_override.clone(),
    );
    let engine = OpportunityEngine::new(cfg.trading.clone());
    let mut caches = CycleCaches::new();

    info!("🚀 Kalshi Temp Bot is running. Press Ctrl+C to stop.");

    let mut cycle_id: u64 = 0;
    let shutdown_reason = loop {
        cycle_id = cycle_id.saturating_add(1);
        run_cycle(
            &rest_client,
            &nws,
            &meteo,
            &resolver,
            &engine,
            &cfg,
            &mut caches,
            &mut journal,
            cycle_id,
            !cli.once,
        )
        .await;

        if cli.once {
            info!("Single cycle complete (--once)");
            break "once";
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break "ctrl_c";
            }
            _ = sleep(Duration::from_secs(cfg.timing.poll_interval_secs)) => {}
        }
    };

    journal.write_event(json!({
        "ts": now_iso(),
        "kind": "bot_shutdown",
        "reason": shutdown_reason
    }));

    info!("Kalshi Temp Bot shut down.");
}

// ── Cycle implementation ────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn run_cycle(
    rest: &KalshiRestClient,
    nws: &NwsClient,
    meteo: &OpenMeteoClient,
    resolver: &TickerResolver,
    engine: &OpportunityEngine,
    cfg: &BotConfig,
    caches: &mut CycleCaches,
    journal: &mut TradeJournal,
    cycle_id: u64,
    allow_orders: bool,
) {
    let now = Utc::now();

    // 1. Exchange gate. A failed status fetch is treated as active; only
    //    an explicit inactive answer pauses the bot.
    let exchange_active = match rest.get_exchange_status().await {
        Ok(status) => {
            if !status.is_active() {
                info!("Exchange inactive; skipping cycle");
                journal.write_event(json!({
                    "ts": now_iso(),
                    "kind": "exchange_inactive",
                    "cycle_id": cycle_id
                }));
                return;
            }
            true
        }
        Err(e) => {
            warn!("Exchange status fetch failed (assuming active): {}", e);
            true
        }
    };

    // 2. Fresh weather every cycle.
    let weather = match nws.get_latest_observation(&cfg.weather.station_id).await {
        Ok(reading) => {
            info!(
                "Weather {}: current={:?}°F high={:?}°F",
                cfg.weather.station_id, reading.current_temp, reading.high_today
            );
            reading
        }
        Err(e) => {
            warn!("Weather fetch failed: {}", e);
            WeatherReading::default()
        }
    };

    // 3. Cached context: event siblings, their books, Open-Meteo models.
    let event_markets = match cfg.event_ticker.as_deref() {
        Some(event_ticker) => {
            caches
                .event_markets
                .get_or_refresh(
                    chrono::Duration::seconds(cfg.timing.event_markets_interval_secs),
                    now,
                    || async move {
                        match rest
                            .get_markets(
                                None,
                                Some(event_ticker),
                                Some("open"),
                                cfg.event_market_limit,
                            )
                            .await
                        {
                            Ok(markets) => markets,
                            Err(e) => {
                                warn!("Event market fetch failed for {}: {}", event_ticker, e);
                                Vec::new()
                            }
                        }
                    },
                )
                .await
        }
        None => Vec::new(),
    };

    let event_orderbooks = if event_markets.is_empty() {
        Vec::new()
    } else {
        let markets = &event_markets;
        caches
            .event_orderbooks
            .get_or_refresh(
                chrono::Duration::seconds(cfg.timing.event_orderbook_interval_secs),
                now,
                || async move {
                    let fetches = markets.iter().take(cfg.event_orderbook_limit).map(|m| {
                        let ticker = m.ticker.clone();
                        async move {
                            match rest.get_orderbook(&ticker, cfg.orderbook_depth).await {
                                Ok(orderbook) => Some(EventOrderbookEntry { ticker, orderbook }),
                                Err(e) => {
                                    warn!("Event orderbook fetch failed for {}: {}", ticker, e);
                                    None
                                }
                            }
                        }
                    });
                    join_all(fetches).await.into_iter().flatten().collect()
                },
            )
            .await
    };

    let open_meteo = if cfg.open_meteo.enabled {
        Some(
            caches
                .open_meteo
                .get_or_refresh(
                    chrono::Duration::seconds(cfg.timing.open_meteo_interval_secs),
                    now,
                    || async move {
                        meteo
                            .get_daily_highs(
                                cfg.open_meteo.lat,
                                cfg.open_meteo.lon,
                                Local::now().date_naive(),
                            )
                            .await
                    },
                )
                .await,
        )
    } else {
        None
    };
    if let Some(spread) = &open_meteo {
        if let Some(gap) = spread.spread {
            info!(
                "Open-Meteo highs: gfs={:?} ecmwf={:?} spread={:.1}°F",
                spread.gfs_high, spread.ecmwf_high, gap
            );
        }
    }

    // 4. Resolve today's market.
    let ticker = resolver.resolve(rest).await;

    // 5. Market, book, and portfolio state; each leg degrades on its own.
    let (market_res, orderbook_res, balance_res, positions_res, orders_res) = tokio::join!(
        rest.get_market(&ticker),
        rest.get_orderbook(&ticker, cfg.orderbook_depth),
        rest.get_balance(),
        rest.get_positions(),
        rest.get_orders(Some("executed")),
    );

    let market = match market_res {
        Ok(m) => Some(m),
        Err(e) => {
            warn!("Market fetch failed for {}: {}", ticker, e);
            None
        }
    };
    let orderbook = match orderbook_res {
        Ok(book) => book,
        Err(e) => {
            warn!("Orderbook fetch failed for {}: {}", ticker, e);
            Orderbook::default()
        }
    };
    let balance = match balance_res {
        Ok(b) => Some(b),
        Err(e) => {
            warn!("Balance fetch failed: {}", e);
            None
        }
    };
    let positions = match positions_res {
        Ok(p) => p,
        Err(e) => {
            warn!("Positions fetch failed: {}", e);
            Vec::new()
        }
    };
    let orders = match orders_res {
        Ok(o) => o,
        Err(e) => {
            warn!("Orders fetch failed: {}", e);
            Vec::new()
        }
    };

    let exposure = position_exposure(&positions, &ticker);

    // 6. Decide.
    let decision = engine.analyze(
        &weather,
        market.as_ref(),
        &orderbook,
        exposure,
        Local::now().hour(),
    );
    for line in &decision.reasoning {
        info!("  {}", line);
    }
    journal.write_event(json!({
        "ts": now_iso(),
        "kind": "cycle_summary",
        "cycle_id": cycle_id,
        "ticker": &ticker,
        "exposure": exposure,
        "balance_cents": balance,
        "has_opportunity": decision.has_opportunity,
        "confidence": decision.confidence,
        "recommendation": decision.recommendation
    }));

    // 7. Optionally trade. One order per cycle, no retry on failure.
    if decision.has_opportunity {
        if let Some(order) = decision.order {
            if cfg.trading.trade_enabled && allow_orders {
                let intent = OrderIntent {
                    ticker: ticker.clone(),
                    side: order.side,
                    action: Action::Buy,
                    price_cents: order.price,
                    count: order.count,
                    reason: decision.recommendation.clone().unwrap_or_default(),
                };
                match rest.create_order(&intent).await {
                    Ok(resp) => {
                        info!(
                            "✅ Order placed: BUY {} {} @ {}¢ x{} — id={}, status={}",
                            side_label(order.side).to_uppercase(),
                            ticker,
                            order.price,
                            order.count,
                            resp.order.order_id,
                            resp.order.status,
                        );
                        journal.write_event(json!({
                            "ts": now_iso(),
                            "kind": "order_placed",
                            "cycle_id": cycle_id,
                            "ticker": &ticker,
                            "side": side_label(order.side),
                            "price_cents": order.price,
                            "count": order.count,
                            "order_id": resp.order.order_id,
                            "status": resp.order.status,
                            "fill_count": resp.order.fill_count
                        }));
                    }
                    Err(e) => {
                        error!("❌ Order failed for {}: {}", ticker, e);
                        journal.write_event(json!({
                            "ts": now_iso(),
                            "kind": "order_failed",
                            "cycle_id": cycle_id,
                            "ticker": &ticker,
                            "side": side_label(order.side),
                            "price_cents": order.price,
                            "count": order.count,
                            "error": e.to_string()
                        }));
                    }
                }
            } else {
                info!(
                    "Order submission disabled; would BUY {} {} @ {}¢ x{}",
                    side_label(order.side).to_uppercase(),
                    ticker,
                    order.price,
                    order.count,
                );
            }
        }
    }

    // 8. Snapshot.
    let snap = Snapshot {
        timestamp: snapshot::now_timestamp(),
        market_ticker: ticker.clone(),
        market_title: market.as_ref().map(|m| m.title.clone()),
        market_status: market.as_ref().map(|m| m.status.clone()),
        last_price: market.as_ref().map(|m| m.last_price),
        exchange_active,
        weather,
        open_meteo,
        orderbook,
        portfolio: PortfolioSnapshot {
            balance_cents: balance,
            positions,
            executed_orders: orders,
            orders_note: cfg.orders_note.clone(),
        },
        event_ticker: cfg.event_ticker.clone(),
        event_markets: event_markets.iter().map(EventMarketSummary::from).collect(),
        event_orderbooks,
        decision,
    };
    if let Err(e) = snapshot::write_snapshot(Path::new(&cfg.snapshot_path), &snap) {
        warn!("Snapshot write failed: {}", e);
    }
}
