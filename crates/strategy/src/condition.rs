//! Contract-title condition parsing.
//!
//! Kalshi temperature market titles read like "Will the high temperature
//! in Miami be 75°F or above today?". This module extracts a structured
//! threshold/range condition from that free text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Signed integers immediately followed by a degree/Fahrenheit marker.
static TEMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(-?\d+)\s*°?\s*F").expect("temperature regex"));

const GTE_KEYWORDS: [&str; 6] = [
    "at least",
    "or higher",
    "or above",
    "greater than",
    "above",
    ">=",
];

const LTE_KEYWORDS: [&str; 6] = [
    "at most",
    "or lower",
    "or below",
    "less than",
    "below",
    "<=",
];

/// A temperature condition extracted from a contract title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Settles YES when the daily high reaches the threshold.
    Gte { threshold: Option<i64> },
    /// Settles YES when the daily high stays at or under the threshold.
    Lte { threshold: Option<i64> },
    /// Settles YES when the daily high lands inside [low, high].
    Range { low: i64, high: i64 },
    /// Temperatures were present but the comparison could not be classified.
    Unknown { temps: Vec<i64> },
}

/// Best-effort parse of a market title into a temperature condition.
///
/// Classification is a fixed precedence, not a best match: range, then
/// gte, then lte, then unknown. Titles matching several keyword sets take
/// the first rule that applies.
pub fn parse_market_condition(title: &str) -> Option<Condition> {
    if title.is_empty() {
        return None;
    }

    let temps: Vec<i64> = TEMP_RE
        .captures_iter(title)
        .filter_map(|c| c[1].parse::<i64>().ok())
        .collect();
    let title_l = title.to_lowercase();

    if temps.len() >= 2 && (title_l.contains("between") || title_l.contains(" to ")) {
        let low = temps[0].min(temps[1]);
        let high = temps[0].max(temps[1]);
        return Some(Condition::Range { low, high });
    }
    if GTE_KEYWORDS.iter().any(|k| title_l.contains(k)) {
        return Some(Condition::Gte {
            threshold: temps.first().copied(),
        });
    }
    if LTE_KEYWORDS.iter().any(|k| title_l.contains(k)) {
        return Some(Condition::Lte {
            threshold: temps.first().copied(),
        });
    }
    if !temps.is_empty() {
        return Some(Condition::Unknown { temps });
    }
    None
}
