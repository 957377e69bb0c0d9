//! NWS (api.weather.gov) station observation client.
//!
//! Reads the latest observation for a station and normalizes it into a
//! [`WeatherReading`]: current temperature plus the trailing-24h high and
//! low, all converted to whole °F.

use common::{Error, WeatherReading};
use serde::Deserialize;
use tracing::debug;

/// NWS API client with connection pooling and a contact User-Agent
/// (api.weather.gov rejects anonymous clients).
#[derive(Debug, Clone)]
pub struct NwsClient {
    client: reqwest::Client,
}

// ── NWS response types ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ObservationResponse {
    #[serde(default)]
    properties: Option<ObservationProperties>,
}

#[derive(Debug, Deserialize)]
struct ObservationProperties {
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    temperature: Option<QuantValue>,
    #[serde(rename = "maxTemperatureLast24Hours", default)]
    max_temperature_last_24_hours: Option<QuantValue>,
    #[serde(rename = "minTemperatureLast24Hours", default)]
    min_temperature_last_24_hours: Option<QuantValue>,
}

/// NWS quantitative value: `{unitCode, value}` with nullable value.
#[derive(Debug, Deserialize)]
struct QuantValue {
    #[serde(default)]
    value: Option<f64>,
}

// ── Implementation ────────────────────────────────────────────────────

/// Convert a Celsius reading to whole °F.
fn c_to_f(value_c: Option<f64>) -> Option<i64> {
    value_c.map(|c| (c * 9.0 / 5.0 + 32.0).round() as i64)
}

/// First `max` bytes of an error body, backed off to a char boundary.
fn truncate_body(body: &str, max: usize) -> &str {
    let mut end = body.len().min(max);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

impl NwsClient {
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .pool_max_idle_per_host(4)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build NWS HTTP client");

        Self { client }
    }

    /// Fetch the latest observation for a station as a normalized reading.
    pub async fn get_latest_observation(&self, station_id: &str) -> Result<WeatherReading, Error> {
        if station_id.is_empty() {
            return Err(Error::Nws("empty station id".into()));
        }

        let url = format!(
            "https://api.weather.gov/stations/{}/observations/latest",
            station_id
        );

        debug!("Fetching NWS observation: {}", url);

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/geo+json")
            .send()
            .await
            .map_err(|e| Error::Nws(format!("HTTP error for {}: {}", station_id, e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Nws(format!(
                "NWS returned {} for {}: {}",
                status,
                station_id,
                truncate_body(&body, 500)
            )));
        }

        let data: ObservationResponse = resp
            .json()
            .await
            .map_err(|e| Error::Nws(format!("JSON parse error for {}: {}", station_id, e)))?;

        let props = data
            .properties
            .ok_or_else(|| Error::Nws(format!("no properties in observation for {}", station_id)))?;

        let reading = WeatherReading {
            current_temp: c_to_f(props.temperature.and_then(|q| q.value)),
            high_today: c_to_f(props.max_temperature_last_24_hours.and_then(|q| q.value)),
            low_today: c_to_f(props.min_temperature_last_24_hours.and_then(|q| q.value)),
            observation_time: props.timestamp,
            source: Some("nws".to_string()),
        };

        debug!(
            "{}: current={:?}°F high={:?}°F low={:?}°F",
            station_id, reading.current_temp, reading.high_today, reading.low_today
        );

        Ok(reading)
    }
}
