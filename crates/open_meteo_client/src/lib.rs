//! Open-Meteo client for forecast cross-checks.
//!
//! Pulls hourly 2m temperature from the GFS and ECMWF models and reduces
//! each to the forecast daily high for a target date. The two models
//! disagreeing (a wide spread) is a signal the heuristic pricing should
//! not be trusted, so the spread is surfaced alongside the highs.

use chrono::{NaiveDate, NaiveDateTime};
use common::{Error, ForecastSpread};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    hourly: Option<HourlySeries>,
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
}

/// First `max` bytes of an error body, backed off to a char boundary.
fn truncate_body(body: &str, max: usize) -> &str {
    let mut end = body.len().min(max);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Max temperature among hourly samples falling on `target_date`.
///
/// Timestamps are local to the queried coordinates (`timezone=auto`) and
/// carry no offset, so they compare directly against a local calendar date.
fn daily_high_from_hourly(hourly: &HourlySeries, target_date: NaiveDate) -> Option<f64> {
    if hourly.time.is_empty() || hourly.time.len() != hourly.temperature_2m.len() {
        return None;
    }

    let mut max_temp: Option<f64> = None;
    for (ts, temp) in hourly.time.iter().zip(hourly.temperature_2m.iter()) {
        let Ok(dt) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M") else {
            continue;
        };
        if dt.date() != target_date {
            continue;
        }
        let Some(t) = temp else { continue };
        max_temp = Some(match max_temp {
            Some(m) if m >= *t => m,
            _ => *t,
        });
    }
    max_temp
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build Open-Meteo HTTP client");

        Self { client }
    }

    async fn fetch_hourly(&self, model: &str, lat: f64, lon: f64) -> Result<ForecastResponse, Error> {
        let url = format!("https://api.open-meteo.com/v1/{}", model);

        debug!("Fetching Open-Meteo {} forecast", model);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("hourly", "temperature_2m".to_string()),
                ("forecast_days", "2".to_string()),
                ("temperature_unit", "fahrenheit".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::OpenMeteo(format!("HTTP error for {}: {}", model, e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::OpenMeteo(format!(
                "Open-Meteo returned {} for {}: {}",
                status,
                model,
                truncate_body(&body, 500)
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::OpenMeteo(format!("JSON parse error for {}: {}", model, e)))
    }

    /// Model daily high for one model, degraded to `None` on any failure.
    async fn daily_high(&self, model: &str, lat: f64, lon: f64, date: NaiveDate) -> Option<f64> {
        match self.fetch_hourly(model, lat, lon).await {
            Ok(body) => body
                .hourly
                .as_ref()
                .and_then(|h| daily_high_from_hourly(h, date)),
            Err(e) => {
                warn!("Open-Meteo {} fetch failed: {}", model, e);
                None
            }
        }
    }

    /// Fetch GFS and ECMWF daily highs for `target_date` concurrently.
    ///
    /// Each model is fault-isolated; the spread is only present when both
    /// models produced a value.
    pub async fn get_daily_highs(
        &self,
        lat: f64,
        lon: f64,
        target_date: NaiveDate,
    ) -> ForecastSpread {
        let (gfs_high, ecmwf_high) = tokio::join!(
            self.daily_high("gfs", lat, lon, target_date),
            self.daily_high("ecmwf", lat, lon, target_date),
        );

        let spread = match (gfs_high, ecmwf_high) {
            (Some(g), Some(e)) => Some((g - e).abs()),
            _ => None,
        };

        ForecastSpread {
            gfs_high,
            ecmwf_high,
            spread,
        }
    }
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(entries: &[(&str, Option<f64>)]) -> HourlySeries {
        HourlySeries {
            time: entries.iter().map(|(t, _)| t.to_string()).collect(),
            temperature_2m: entries.iter().map(|(_, v)| *v).collect(),
        }
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = format!("{}°tail", "x".repeat(499));
        let cut = truncate_body(&body, 500);
        assert_eq!(cut.len(), 499);
        assert!(cut.chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_daily_high_picks_max_for_target_date() {
        let hourly = series(&[
            ("2026-01-26T10:00", Some(74.0)),
            ("2026-01-26T14:00", Some(81.5)),
            ("2026-01-26T18:00", Some(79.0)),
            ("2026-01-27T14:00", Some(90.0)),
        ]);
        let date = NaiveDate::from_ymd_opt(2026, 1, 26).unwrap();
        assert_eq!(daily_high_from_hourly(&hourly, date), Some(81.5));
    }

    #[test]
    fn test_daily_high_skips_nulls_and_bad_timestamps() {
        let hourly = series(&[
            ("garbage", Some(99.0)),
            ("2026-01-26T12:00", None),
            ("2026-01-26T15:00", Some(77.0)),
        ]);
        let date = NaiveDate::from_ymd_opt(2026, 1, 26).unwrap();
        assert_eq!(daily_high_from_hourly(&hourly, date), Some(77.0));
    }

    #[test]
    fn test_daily_high_empty_or_mismatched_series() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 26).unwrap();
        assert_eq!(daily_high_from_hourly(&series(&[]), date), None);

        let mismatched = HourlySeries {
            time: vec!["2026-01-26T12:00".into()],
            temperature_2m: vec![],
        };
        assert_eq!(daily_high_from_hourly(&mismatched, date), None);
    }
}
