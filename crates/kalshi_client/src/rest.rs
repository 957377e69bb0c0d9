//! REST client for the Kalshi API.
//!
//! Covers: exchange status, market/series discovery, order books,
//! portfolio queries, and order management. All methods are rate-limited
//! and authenticated via RSA-PSS.

use common::{
    BalanceResponse, CreateOrderRequest, CreateOrderResponse, Error, ExchangeStatus, MarketInfo,
    MarketsResponse, Orderbook, OrderbookResponse, OrderIntent, OrderRecord, OrdersResponse,
    OrderType, PortfolioPosition, PositionsResponse, SeriesResponse, Side,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::KalshiAuth;
use crate::rate_limit::RateLimiter;

/// Async REST client for the Kalshi trade API.
#[derive(Debug, Clone)]
pub struct KalshiRestClient {
    client: reqwest::Client,
    auth: KalshiAuth,
    base_url: String,
    limiter: RateLimiter,
}

impl KalshiRestClient {
    /// Create a new REST client.
    ///
    /// * `use_demo` — if true, points to `https://demo-api.kalshi.co`.
    pub fn new(auth: KalshiAuth, use_demo: bool) -> Self {
        let base_url = if use_demo {
            "https://demo-api.kalshi.co".to_string()
        } else {
            "https://api.elections.kalshi.com".to_string()
        };

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            auth,
            base_url,
            limiter: RateLimiter::new(),
        }
    }

    /// URL helper.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Rate-limited, authenticated GET returning parsed JSON.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        self.limiter.wait_read().await;

        let headers = self.auth.headers("GET", path);
        let resp = self
            .client
            .get(self.url(path))
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status_code = resp.status().as_u16();
        if status_code != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::KalshiApi {
                status: status_code,
                message: body,
            });
        }

        resp.json().await.map_err(|e| Error::Http(e.to_string()))
    }

    // ── Read endpoints ────────────────────────────────────────────────

    /// Fetch exchange availability.
    ///
    /// Some API revisions nest the flags under `exchange_status`.
    pub async fn get_exchange_status(&self) -> Result<ExchangeStatus, Error> {
        let value: serde_json::Value = self.get_json("/trade-api/v2/exchange/status", &[]).await?;

        let status = if let Some(inner) = value.get("exchange_status") {
            serde_json::from_value(inner.clone())?
        } else {
            serde_json::from_value(value)?
        };

        Ok(status)
    }

    /// Fetch the market tickers a series currently lists, normalized
    /// across payload shapes.
    pub async fn get_series_market_tickers(&self, series_ticker: &str) -> Result<Vec<String>, Error> {
        let path = format!("/trade-api/v2/series/{}", series_ticker);
        let series: SeriesResponse = self.get_json(&path, &[]).await?;
        Ok(series.market_tickers())
    }

    /// Fetch markets matching the given filters.
    ///
    /// Handles cursor pagination automatically and returns all matches.
    pub async fn get_markets(
        &self,
        series_ticker: Option<&str>,
        event_ticker: Option<&str>,
        status: Option<&str>,
        limit: u32,
    ) -> Result<Vec<MarketInfo>, Error> {
        let mut all_markets = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
            if let Some(st) = series_ticker {
                query.push(("series_ticker", st.to_string()));
            }
            if let Some(ev) = event_ticker {
                query.push(("event_ticker", ev.to_string()));
            }
            if let Some(s) = status {
                query.push(("status", s.to_string()));
            }
            if let Some(ref c) = cursor {
                query.push(("cursor", c.clone()));
            }

            let body: MarketsResponse = self.get_json("/trade-api/v2/markets", &query).await?;

            let count = body.markets.len();
            all_markets.extend(body.markets);

            debug!("Fetched {} markets (total: {})", count, all_markets.len());

            match body.cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }

        Ok(all_markets)
    }

    /// Fetch a single market by ticker.
    pub async fn get_market(&self, ticker: &str) -> Result<MarketInfo, Error> {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            market: MarketInfo,
        }

        let path = format!("/trade-api/v2/markets/{}", ticker);
        let w: Wrapper = self.get_json(&path, &[]).await?;
        Ok(w.market)
    }

    /// Fetch a market's order book, normalized to fixed `{price, count}`
    /// levels (best first, truncated to `depth`).
    pub async fn get_orderbook(&self, ticker: &str, depth: usize) -> Result<Orderbook, Error> {
        let path = format!("/trade-api/v2/markets/{}/orderbook", ticker);
        let body: OrderbookResponse = self
            .get_json(&path, &[("depth", depth.to_string())])
            .await?;

        let raw = body.orderbook.unwrap_or_default();
        Ok(Orderbook {
            yes: common::normalize_levels(&raw.yes, depth),
            no: common::normalize_levels(&raw.no, depth),
        })
    }

    /// Get portfolio balance in cents.
    pub async fn get_balance(&self) -> Result<i64, Error> {
        let bal: BalanceResponse = self.get_json("/trade-api/v2/portfolio/balance", &[]).await?;
        Ok(bal.balance)
    }

    /// Get all portfolio positions.
    pub async fn get_positions(&self) -> Result<Vec<PortfolioPosition>, Error> {
        let mut all_positions = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("limit", "200".to_string())];
            if let Some(ref c) = cursor {
                query.push(("cursor", c.clone()));
            }

            let body: PositionsResponse = self
                .get_json("/trade-api/v2/portfolio/positions", &query)
                .await?;

            let count = body.market_positions.len();
            all_positions.extend(body.market_positions);

            debug!("Fetched {} positions (total: {})", count, all_positions.len());

            match body.cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => break,
            }
        }

        Ok(all_positions)
    }

    /// Get portfolio orders, optionally filtered by status.
    pub async fn get_orders(&self, status: Option<&str>) -> Result<Vec<OrderRecord>, Error> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(s) = status {
            query.push(("status", s.to_string()));
        }

        let body: OrdersResponse = self.get_json("/trade-api/v2/portfolio/orders", &query).await?;
        Ok(body.orders)
    }

    // ── Write endpoints ───────────────────────────────────────────────

    /// Place a limit order via the Kalshi API.
    pub async fn create_order(&self, intent: &OrderIntent) -> Result<CreateOrderResponse, Error> {
        self.limiter.wait_write().await;

        let path = "/trade-api/v2/portfolio/orders";
        let headers = self.auth.headers("POST", path);

        let client_order_id = Uuid::new_v4().to_string();

        let (yes_price, no_price) = match intent.side {
            Side::Yes => (Some(intent.price_cents), None),
            Side::No => (None, Some(intent.price_cents)),
        };

        let body = CreateOrderRequest {
            ticker: intent.ticker.clone(),
            side: intent.side,
            action: intent.action,
            client_order_id: client_order_id.clone(),
            count: intent.count,
            order_type: OrderType::Limit,
            yes_price,
            no_price,
        };

        debug!(
            "Creating order: {:?} {:?} {} @ {}¢ x{} ({})",
            intent.action, intent.side, intent.ticker, intent.price_cents, intent.count,
            intent.reason,
        );

        let resp = self
            .client
            .post(self.url(path))
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status_code = resp.status().as_u16();
        if status_code == 429 {
            warn!("Rate limited on order creation");
            return Err(Error::RateLimited { retry_after_ms: 1000 });
        }
        if status_code != 200 && status_code != 201 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::KalshiApi {
                status: status_code,
                message: body,
            });
        }

        let order_resp: CreateOrderResponse =
            resp.json().await.map_err(|e| Error::Http(e.to_string()))?;

        debug!(
            "Order placed: id={} status={} fill={}",
            order_resp.order.order_id, order_resp.order.status, order_resp.order.fill_count,
        );

        Ok(order_resp)
    }

    /// Cancel an order by its order ID.
    pub async fn cancel_order(&self, order_id: &str) -> Result<(), Error> {
        self.limiter.wait_write().await;

        let path = format!("/trade-api/v2/portfolio/orders/{}", order_id);
        let headers = self.auth.headers("DELETE", &path);

        let resp = self
            .client
            .delete(self.url(&path))
            .headers(headers)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status_code = resp.status().as_u16();
        if status_code != 200 && status_code != 204 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::KalshiApi {
                status: status_code,
                message: body,
            });
        }

        debug!("Cancelled order: {}", order_id);
        Ok(())
    }
}
