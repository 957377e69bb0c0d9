//! Expected-value opportunity engine.
//!
//! Compares the heuristic P(YES) against resting bid prices on both sides
//! and recommends the single best-EV buy, subject to edge and position
//! limits. Every decision carries a human-readable reasoning trace that
//! ends up in the snapshot.

use common::config::TradingConfig;
use common::{MarketInfo, Orderbook, PortfolioPosition, Side, WeatherReading};
use serde::Serialize;

use crate::condition::{self, Condition};
use crate::probability;

/// A recommended limit order, prices in cents.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OrderRequest {
    pub side: Side,
    pub price: i64,
    pub count: i64,
}

/// The outcome of one analysis pass.
#[derive(Debug, Clone, Serialize)]
pub struct OpportunityDecision {
    pub has_opportunity: bool,
    /// Best expected edge in cents, rounded to two decimals.
    pub confidence: f64,
    pub recommendation: Option<String>,
    pub order: Option<OrderRequest>,
    pub reasoning: Vec<String>,
}

impl OpportunityDecision {
    fn pass(reasoning: Vec<String>) -> Self {
        Self {
            has_opportunity: false,
            confidence: 0.0,
            recommendation: None,
            order: None,
            reasoning,
        }
    }
}

/// Contracts currently held in `ticker`, zero when not present.
pub fn position_exposure(positions: &[PortfolioPosition], ticker: &str) -> i64 {
    positions
        .iter()
        .find(|p| p.ticker == ticker)
        .map(|p| p.contracts())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct OpportunityEngine {
    trading: TradingConfig,
}

impl OpportunityEngine {
    pub fn new(trading: TradingConfig) -> Self {
        Self { trading }
    }

    /// Analyze one market snapshot and decide whether to trade.
    ///
    /// `hour` is the local hour of day feeding the probability heuristics.
    /// Pure and synchronous so scenarios are easy to pin down in tests.
    pub fn analyze(
        &self,
        weather: &WeatherReading,
        market: Option<&MarketInfo>,
        orderbook: &Orderbook,
        current_exposure: i64,
        hour: u32,
    ) -> OpportunityDecision {
        let mut reasoning = Vec::new();

        let (Some(current_temp), Some(high_today)) = (weather.current_temp, weather.high_today)
        else {
            reasoning.push("Insufficient weather data".to_string());
            return OpportunityDecision::pass(reasoning);
        };

        reasoning.push(format!("Current temp: {}°F", current_temp));
        reasoning.push(format!("Today's high so far: {}°F", high_today));

        let title = market.map(|m| m.title.as_str()).unwrap_or("");
        if !title.is_empty() {
            reasoning.push(format!("Market title: {}", title));
        }

        if let Some(bid) = orderbook.best_yes_bid() {
            reasoning.push(format!("Best YES bid: {}¢", bid));
        }
        if let Some(bid) = orderbook.best_no_bid() {
            reasoning.push(format!("Best NO bid: {}¢", bid));
        }

        let parsed = match condition::parse_market_condition(title) {
            Some(c) if !matches!(c, Condition::Unknown { .. }) => c,
            _ => {
                reasoning.push("Market condition not parsed; skipping EV model".to_string());
                return OpportunityDecision::pass(reasoning);
            }
        };

        // Parsed but thresholdless (e.g. keyword with no temperature).
        let Some(prob) = probability::prob_yes(&parsed, high_today, hour) else {
            reasoning.push("Probability model could not estimate outcome".to_string());
            return OpportunityDecision::pass(reasoning);
        };
        reasoning.push(format!("Heuristic P(YES): {:.2}", prob));

        // A last price of zero means the market has never traded.
        let last_price = market.and_then(|m| (m.last_price > 0).then_some(m.last_price));
        let yes_price = orderbook.best_yes_bid().or(last_price);
        let no_price = orderbook.best_no_bid().or_else(|| yes_price.map(|y| 100 - y));

        if yes_price.is_none() && no_price.is_none() {
            reasoning.push("No usable price data; skipping EV model".to_string());
            return OpportunityDecision::pass(reasoning);
        }

        let fee = self.trading.fee_cents;
        let ev_yes = yes_price.map(|p| prob * 100.0 - p as f64 - fee);
        let ev_no = no_price.map(|p| (1.0 - prob) * 100.0 - p as f64 - fee);

        match ev_yes {
            Some(ev) => reasoning.push(format!("EV YES: {:.2}¢", ev)),
            None => reasoning.push("EV YES: N/A".to_string()),
        }
        match ev_no {
            Some(ev) => reasoning.push(format!("EV NO: {:.2}¢", ev)),
            None => reasoning.push("EV NO: N/A".to_string()),
        }

        // YES is evaluated first and keeps ties.
        let mut best: Option<(Side, f64, i64)> = None;
        if let (Some(ev), Some(price)) = (ev_yes, yes_price) {
            best = Some((Side::Yes, ev, price));
        }
        if let (Some(ev), Some(price)) = (ev_no, no_price) {
            if best.map_or(true, |(_, b, _)| ev > b) {
                best = Some((Side::No, ev, price));
            }
        }
        let Some((side, best_ev, best_price)) = best else {
            reasoning.push("No usable price data; skipping EV model".to_string());
            return OpportunityDecision::pass(reasoning);
        };

        if best_ev < self.trading.min_edge_cents as f64 {
            reasoning.push(format!(
                "No edge >= {}¢; skipping trade",
                self.trading.min_edge_cents
            ));
            return OpportunityDecision::pass(reasoning);
        }

        let remaining = (self.trading.max_position - current_exposure).max(0);
        let count = self.trading.max_order_size.min(remaining);
        if count <= 0 {
            reasoning.push("Position limit reached; skipping trade".to_string());
            return OpportunityDecision::pass(reasoning);
        }

        let label = match side {
            Side::Yes => "YES",
            Side::No => "NO",
        };
        let recommendation = format!("Buy {} (edge {:.2}¢)", label, best_ev);
        reasoning.push(recommendation.clone());

        OpportunityDecision {
            has_opportunity: true,
            confidence: (best_ev * 100.0).round() / 100.0,
            recommendation: Some(recommendation),
            order: Some(OrderRequest {
                side,
                price: best_price.clamp(1, 99),
                count,
            }),
            reasoning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderBookLevel;

    fn trading(fee_cents: f64) -> TradingConfig {
        TradingConfig {
            max_order_size: 5,
            max_position: 20,
            min_edge_cents: 2,
            fee_cents,
            trade_enabled: false,
        }
    }

    fn weather(current: i64, high: i64) -> WeatherReading {
        WeatherReading {
            current_temp: Some(current),
            high_today: Some(high),
            ..Default::default()
        }
    }

    fn market(title: &str, last_price: i64) -> MarketInfo {
        serde_json::from_value(serde_json::json!({
            "ticker": "KXHIGHMIA-26JAN26",
            "title": title,
            "last_price": last_price,
        }))
        .unwrap()
    }

    fn book(yes: &[i64], no: &[i64]) -> Orderbook {
        Orderbook {
            yes: yes.iter().map(|&p| OrderBookLevel { price: p, count: 10 }).collect(),
            no: no.iter().map(|&p| OrderBookLevel { price: p, count: 10 }).collect(),
        }
    }

    #[test]
    fn test_edge_below_min_is_skipped() {
        // High already reached: P(YES)=0.99, EV = 99 - 97 - 0.5 = 1.5¢.
        let engine = OpportunityEngine::new(trading(0.5));
        let m = market("Will the high be at least 75°F?", 0);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[97], &[]), 0, 14);

        assert!(!d.has_opportunity);
        assert!(d.order.is_none());
        assert!(d
            .reasoning
            .iter()
            .any(|r| r == "No edge >= 2¢; skipping trade"));
    }

    #[test]
    fn test_edge_above_min_buys_yes() {
        // EV = 99 - 96 - 0.5 = 2.5¢, above the 2¢ floor.
        let engine = OpportunityEngine::new(trading(0.5));
        let m = market("Will the high be at least 75°F?", 0);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[96], &[]), 0, 14);

        assert!(d.has_opportunity);
        assert_eq!(d.confidence, 2.5);
        assert_eq!(d.recommendation.as_deref(), Some("Buy YES (edge 2.50¢)"));

        let order = d.order.unwrap();
        assert_eq!(order.side, Side::Yes);
        assert_eq!(order.price, 96);
        assert_eq!(order.count, 5);
    }

    #[test]
    fn test_no_side_wins_when_high_already_busted_threshold() {
        // High of 75 busts a "70 or lower" contract: P(YES)=0.01, NO is rich.
        let engine = OpportunityEngine::new(trading(0.0));
        let m = market("Will the high be 70°F or lower?", 0);
        let d = engine.analyze(&weather(75, 75), Some(&m), &book(&[5], &[90]), 0, 14);

        assert!(d.has_opportunity);
        let order = d.order.unwrap();
        assert_eq!(order.side, Side::No);
        assert_eq!(order.price, 90);
        assert_eq!(d.recommendation.as_deref(), Some("Buy NO (edge 9.00¢)"));
    }

    #[test]
    fn test_position_limit_blocks_order() {
        let engine = OpportunityEngine::new(trading(0.5));
        let m = market("Will the high be at least 75°F?", 0);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[96], &[]), 20, 14);

        assert!(!d.has_opportunity);
        assert!(d.order.is_none());
        assert!(d
            .reasoning
            .iter()
            .any(|r| r == "Position limit reached; skipping trade"));
    }

    #[test]
    fn test_order_size_capped_by_remaining_headroom() {
        let engine = OpportunityEngine::new(trading(0.5));
        let m = market("Will the high be at least 75°F?", 0);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[96], &[]), 18, 14);

        assert_eq!(d.order.unwrap().count, 2);
    }

    #[test]
    fn test_missing_weather_short_circuits() {
        let engine = OpportunityEngine::new(trading(0.0));
        let m = market("Will the high be at least 75°F?", 50);
        let incomplete = WeatherReading {
            current_temp: Some(70),
            high_today: None,
            ..Default::default()
        };
        let d = engine.analyze(&incomplete, Some(&m), &book(&[50], &[50]), 0, 14);

        assert!(!d.has_opportunity);
        assert_eq!(d.reasoning, vec!["Insufficient weather data"]);
    }

    #[test]
    fn test_unparseable_title_skips_model() {
        let engine = OpportunityEngine::new(trading(0.0));
        let m = market("Will it rain in Miami today?", 50);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[50], &[50]), 0, 14);

        assert!(!d.has_opportunity);
        assert!(d
            .reasoning
            .iter()
            .any(|r| r == "Market condition not parsed; skipping EV model"));
    }

    #[test]
    fn test_unclassified_temps_count_as_unparsed() {
        // Temperatures present but no comparison keyword.
        let engine = OpportunityEngine::new(trading(0.0));
        let m = market("Will the high hit 75°F?", 50);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[50], &[50]), 0, 14);

        assert!(!d.has_opportunity);
        assert!(d
            .reasoning
            .iter()
            .any(|r| r == "Market condition not parsed; skipping EV model"));
    }

    #[test]
    fn test_thresholdless_condition_reports_no_estimate() {
        // Keyword matched, so the title parses, but with no temperature the
        // model has nothing to price; this is a distinct decision point.
        let engine = OpportunityEngine::new(trading(0.0));
        let m = market("Will it be at least that warm?", 50);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[50], &[50]), 0, 14);

        assert!(!d.has_opportunity);
        assert!(d
            .reasoning
            .iter()
            .any(|r| r == "Probability model could not estimate outcome"));
        assert!(!d
            .reasoning
            .iter()
            .any(|r| r == "Market condition not parsed; skipping EV model"));
    }

    #[test]
    fn test_no_price_data_skips_model() {
        // Empty book and an untraded market (last_price 0).
        let engine = OpportunityEngine::new(trading(0.0));
        let m = market("Will the high be at least 75°F?", 0);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[], &[]), 0, 14);

        assert!(!d.has_opportunity);
        assert!(d
            .reasoning
            .iter()
            .any(|r| r == "No usable price data; skipping EV model"));
    }

    #[test]
    fn test_last_price_backfills_empty_book() {
        // No resting bids, but a last trade at 90¢ still prices the market.
        let engine = OpportunityEngine::new(trading(0.0));
        let m = market("Will the high be at least 75°F?", 90);
        let d = engine.analyze(&weather(76, 76), Some(&m), &book(&[], &[]), 0, 14);

        assert!(d.has_opportunity);
        let order = d.order.unwrap();
        assert_eq!(order.side, Side::Yes);
        assert_eq!(order.price, 90);
    }

    #[test]
    fn test_reasoning_trace_contents() {
        let engine = OpportunityEngine::new(trading(0.5));
        let m = market("Will the high be at least 75°F?", 0);
        let d = engine.analyze(&weather(74, 76), Some(&m), &book(&[96], &[3]), 0, 14);

        assert!(d.reasoning.iter().any(|r| r == "Current temp: 74°F"));
        assert!(d.reasoning.iter().any(|r| r == "Today's high so far: 76°F"));
        assert!(d
            .reasoning
            .iter()
            .any(|r| r == "Market title: Will the high be at least 75°F?"));
        assert!(d.reasoning.iter().any(|r| r == "Best YES bid: 96¢"));
        assert!(d.reasoning.iter().any(|r| r == "Best NO bid: 3¢"));
        assert!(d.reasoning.iter().any(|r| r == "Heuristic P(YES): 0.99"));
        assert!(d.reasoning.iter().any(|r| r == "EV YES: 2.50¢"));
    }

    #[test]
    fn test_position_exposure_lookup() {
        let positions: Vec<PortfolioPosition> = serde_json::from_value(serde_json::json!([
            {"ticker": "OTHER", "position": 9},
            {"ticker": "KXHIGHMIA-26JAN26", "position": -4},
        ]))
        .unwrap();

        assert_eq!(position_exposure(&positions, "KXHIGHMIA-26JAN26"), 4);
        assert_eq!(position_exposure(&positions, "MISSING"), 0);
    }
}
