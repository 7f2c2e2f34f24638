//! Time-decay relevance scoring.
//!
//! A pure function of an observation and an explicit `now`. Callers must score
//! every observation in one response against the same `now`.
//!
//! ```text
//! score = max(MIN_RELEVANCE, relevance * 0.5^(age/HALF_LIFE) * access_boost * recency_boost)
//! ```

use chrono::{DateTime, Utc};

use super::types::Observation;

/// Days for the decay factor to halve.
pub const HALF_LIFE_DAYS: f64 = 30.0;
/// Multiplicative boost per recorded access. Unbounded.
pub const ACCESS_BOOST_PER_HIT: f64 = 0.1;
/// Accesses younger than this many days earn a recency boost.
pub const RECENCY_WINDOW_DAYS: f64 = 7.0;
/// Recency boost at the instant of access; ramps linearly to zero at the window edge.
pub const RECENCY_MAX_BOOST: f64 = 0.5;
/// Scores never fall below this floor.
pub const MIN_RELEVANCE: f64 = 0.01;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Relevance of `observation` at `now`.
pub fn score(observation: &Observation, now: DateTime<Utc>) -> f64 {
    let observed_at = observation.observed_at.unwrap_or(now);
    let age_days = days_between(observed_at, now);
    let decay = 0.5_f64.powf(age_days / HALF_LIFE_DAYS);

    let access_boost = 1.0 + f64::from(observation.access_count) * ACCESS_BOOST_PER_HIT;

    let recency_boost = match observation.last_accessed {
        Some(accessed) => {
            let since = days_between(accessed, now);
            if since < RECENCY_WINDOW_DAYS {
                1.0 + (1.0 - since / RECENCY_WINDOW_DAYS) * RECENCY_MAX_BOOST
            } else {
                1.0
            }
        }
        None => 1.0,
    };

    (observation.relevance * decay * access_boost * recency_boost).max(MIN_RELEVANCE)
}

/// Round to three decimals for display.
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// Mean of `scores`, or 0 when empty.
pub fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-06-15T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn aged(days: i64) -> Observation {
        Observation::new("fact", now() - Duration::days(days))
    }

    #[test]
    fn fresh_baseline_scores_one() {
        assert_eq!(score(&aged(0), now()), 1.0);
    }

    #[test]
    fn one_half_life_scores_half() {
        assert!((score(&aged(30), now()) - 0.5).abs() < 1e-12);
        assert!((score(&aged(60), now()) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn strictly_decreasing_with_age_until_floor() {
        let mut previous = f64::INFINITY;
        for days in [0, 1, 7, 30, 90, 180] {
            let s = score(&aged(days), now());
            assert!(s < previous, "score at {days} days should drop");
            previous = s;
        }
    }

    #[test]
    fn never_below_floor() {
        let ancient = aged(365 * 20);
        assert_eq!(score(&ancient, now()), MIN_RELEVANCE);

        let mut zero_weight = aged(0);
        zero_weight.relevance = 0.0;
        assert_eq!(score(&zero_weight, now()), MIN_RELEVANCE);
    }

    #[test]
    fn missing_observed_at_counts_as_now() {
        let mut obs = aged(100);
        obs.observed_at = None;
        assert_eq!(score(&obs, now()), 1.0);
    }

    #[test]
    fn access_boost_is_unbounded() {
        let mut obs = aged(0);
        obs.access_count = 20;
        assert!((score(&obs, now()) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn recency_boost_ramps_over_window() {
        let mut obs = aged(0);
        obs.last_accessed = Some(now());
        assert!((score(&obs, now()) - 1.5).abs() < 1e-12);

        obs.last_accessed = Some(now() - Duration::hours(84));
        assert!((score(&obs, now()) - 1.25).abs() < 1e-12);

        obs.last_accessed = Some(now() - Duration::days(7));
        assert_eq!(score(&obs, now()), 1.0);
    }

    #[test]
    fn scores_fall_as_clock_advances() {
        let obs = aged(3);
        let earlier = score(&obs, now());
        let later = score(&obs, now() + Duration::days(1));
        assert_eq!(earlier, score(&obs, now()));
        assert!(later < earlier);
    }

    #[test]
    fn rounding_and_mean() {
        assert_eq!(round_score(0.123_456), 0.123);
        assert_eq!(round_score(0.5), 0.5);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 0.5]), 0.75);
    }
}
