//! Heuristic probability model for daily-high temperature contracts.
//!
//! These are deliberately crude hour-of-day heuristics, not a calibrated
//! forecast model. They encode two facts about daily highs: the high is
//! monotone non-decreasing through the day, and most of the day's warming
//! happens by mid-afternoon.

use crate::condition::Condition;

/// Probability that the daily high climbs another `diff` degrees above the
/// observed high, given the local hour.
pub fn prob_reach_threshold(diff: i64, hour: u32) -> f64 {
    if diff <= 0 {
        return 0.95;
    }

    let diff_factor = (1.0 - diff as f64 / 10.0).max(0.05);
    let time_factor = if hour < 10 {
        1.1
    } else if hour < 14 {
        1.15
    } else if hour < 17 {
        0.95
    } else if hour < 20 {
        0.7
    } else {
        0.4
    };

    (diff_factor * time_factor).clamp(0.05, 0.95)
}

/// Probability that no new daily high is set after the given local hour.
pub fn prob_no_new_high(hour: u32) -> f64 {
    if hour >= 22 {
        0.98
    } else if hour >= 20 {
        0.95
    } else if hour >= 18 {
        0.9
    } else if hour >= 16 {
        0.8
    } else if hour >= 14 {
        0.7
    } else if hour >= 12 {
        0.6
    } else {
        0.4
    }
}

/// Heuristic P(YES) for a parsed condition given the observed daily high.
///
/// Returns `None` when the condition carries no usable threshold.
pub fn prob_yes(condition: &Condition, high_today: i64, hour: u32) -> Option<f64> {
    match condition {
        Condition::Gte { threshold: Some(t) } => {
            if high_today >= *t {
                Some(0.99)
            } else {
                Some(prob_reach_threshold(t - high_today, hour))
            }
        }
        Condition::Lte { threshold: Some(t) } => {
            if high_today > *t {
                Some(0.01)
            } else if high_today == *t {
                Some(prob_no_new_high(hour))
            } else {
                Some((1.0 - prob_reach_threshold(t - high_today, hour)).max(0.01))
            }
        }
        Condition::Range { low, high } => {
            if high_today > *high {
                Some(0.01)
            } else if high_today < *low {
                let p = prob_reach_threshold(low - high_today, hour) * prob_no_new_high(hour);
                Some(p.clamp(0.01, 0.99))
            } else {
                Some(prob_no_new_high(hour).clamp(0.01, 0.99))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reach_threshold_met_is_high_at_any_hour() {
        for hour in [0, 9, 13, 16, 19, 23] {
            assert_eq!(prob_reach_threshold(0, hour), 0.95);
            assert_eq!(prob_reach_threshold(-5, hour), 0.95);
        }
    }

    #[test]
    fn test_reach_threshold_bounded() {
        for diff in 1..30 {
            for hour in 0..24 {
                let p = prob_reach_threshold(diff, hour);
                assert!((0.05..=0.95).contains(&p), "p={} diff={} hour={}", p, diff, hour);
            }
        }
    }

    #[test]
    fn test_reach_threshold_decays_with_distance() {
        assert!(prob_reach_threshold(1, 12) > prob_reach_threshold(5, 12));
        assert!(prob_reach_threshold(5, 12) > prob_reach_threshold(9, 12));
    }

    #[test]
    fn test_reach_threshold_evening_discount() {
        // Same gap is less likely to close late in the day.
        assert!(prob_reach_threshold(3, 12) > prob_reach_threshold(3, 18));
        assert!(prob_reach_threshold(3, 18) > prob_reach_threshold(3, 22));
    }

    #[test]
    fn test_no_new_high_monotone_in_hour() {
        let mut prev = 0.0;
        for hour in 0..24 {
            let p = prob_no_new_high(hour);
            assert!((0.4..=0.98).contains(&p));
            assert!(p >= prev, "not monotone at hour {}", hour);
            prev = p;
        }
        assert_eq!(prob_no_new_high(0), 0.4);
        assert_eq!(prob_no_new_high(23), 0.98);
    }

    #[test]
    fn test_prob_yes_gte() {
        let cond = Condition::Gte { threshold: Some(75) };
        // Already reached: near-certain.
        assert_eq!(prob_yes(&cond, 76, 12), Some(0.99));
        assert_eq!(prob_yes(&cond, 75, 12), Some(0.99));
        // One degree away at noon: a live question, not a coin flip extreme.
        let p = prob_yes(&cond, 74, 12).unwrap();
        assert!((0.05..=0.95).contains(&p));
    }

    #[test]
    fn test_prob_yes_lte() {
        let cond = Condition::Lte { threshold: Some(70) };
        assert_eq!(prob_yes(&cond, 71, 12), Some(0.01));
        assert_eq!(prob_yes(&cond, 70, 15), Some(prob_no_new_high(15)));

        let p = prob_yes(&cond, 65, 12).unwrap();
        assert_eq!(p, (1.0 - prob_reach_threshold(5, 12)).max(0.01));
    }

    #[test]
    fn test_prob_yes_range() {
        let cond = Condition::Range { low: 72, high: 74 };
        assert_eq!(prob_yes(&cond, 75, 12), Some(0.01));

        // Inside the band: depends only on no new high being set.
        assert_eq!(prob_yes(&cond, 73, 18), Some(0.9));

        // Below the band: must climb in and then hold.
        let p = prob_yes(&cond, 70, 12).unwrap();
        let expected = (prob_reach_threshold(2, 12) * prob_no_new_high(12)).clamp(0.01, 0.99);
        assert_eq!(p, expected);
    }

    #[test]
    fn test_prob_yes_undefined_conditions() {
        assert_eq!(prob_yes(&Condition::Gte { threshold: None }, 75, 12), None);
        assert_eq!(prob_yes(&Condition::Lte { threshold: None }, 75, 12), None);
        assert_eq!(prob_yes(&Condition::Unknown { temps: vec![75] }, 75, 12), None);
    }
}
