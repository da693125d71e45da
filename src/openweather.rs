/*
 *  openweather.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use chrono::{DateTime, Local};
use log::{info, warn};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::conditions::{Conditions, ConditionsCache, Provider};
use crate::http::{FetchError, RetryPolicy, build_client, get_with_retries};

pub const OPENWEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Current weather from OpenWeatherMap; feeds the conditions cache that the
/// dashboard and the fallback lightning source read.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    url: String,
    api_key: String,
    lat: f64,
    lng: f64,
    retry: RetryPolicy,
}

impl OpenWeatherClient {
    pub fn new(api_key: &str, lat: f64, lng: f64, timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: OPENWEATHER_URL.to_string(),
            api_key: api_key.to_string(),
            lat,
            lng,
            retry,
        })
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub async fn fetch_current(&self, now: DateTime<Local>) -> Result<Conditions, FetchError> {
        let params = [
            ("lat", self.lat.to_string()),
            ("lon", self.lng.to_string()),
            ("appid", self.api_key.clone()),
            ("units", "imperial".to_string()),
        ];
        let body = get_with_retries(&self.client, &self.url, &params, self.retry).await?;
        parse_current(&body, now)
    }

    /// Fetch and cache. On failure the previous entry is left to age out.
    pub async fn refresh(&self, cache: &ConditionsCache, now: DateTime<Local>) -> bool {
        match self.fetch_current(now).await {
            Ok(conditions) => {
                info!("Weather updated: {} (code {:?})", conditions.description, conditions.weather_code);
                cache.store(conditions);
                true
            }
            Err(e) => {
                warn!("Weather update failed: {}", e);
                false
            }
        }
    }
}

/// `{"weather": [{"id": 211, "description": "thunderstorm"}], ..}`
pub fn parse_current(body: &str, now: DateTime<Local>) -> Result<Conditions, FetchError> {
    let v: Value = serde_json::from_str(body)?;
    let first = v["weather"]
        .as_array()
        .and_then(|w| w.first())
        .ok_or_else(|| FetchError::MissingData("weather[0]".to_string()))?;
    Ok(Conditions {
        description: first["description"].as_str().unwrap_or("").to_string(),
        weather_code: first["id"].as_i64(),
        provider: Provider::OpenWeatherMap,
        observed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_current() {
        let now = Local::now();
        let body = r#"{"coord":{"lon":-97.34,"lat":31.1},
            "weather":[{"id":211,"main":"Thunderstorm","description":"thunderstorm","icon":"11d"}],
            "main":{"temp":78.2}}"#;
        let c = parse_current(body, now).unwrap();
        assert_eq!(c.weather_code, Some(211));
        assert_eq!(c.provider, Provider::OpenWeatherMap);
        assert_eq!(c.observed_at, now);
        assert!(c.is_thunderstorm());
    }

    #[test]
    fn test_parse_current_without_weather_block() {
        let now = Local::now();
        assert!(matches!(parse_current(r#"{"cod":401}"#, now), Err(FetchError::MissingData(_))));
        assert!(matches!(parse_current(r#"{"weather":[]}"#, now), Err(FetchError::MissingData(_))));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entry() {
        let now = Local::now();
        let cache = ConditionsCache::new(Duration::from_secs(1800));
        cache.store(parse_current(r#"{"weather":[{"id":800,"description":"clear sky"}]}"#, now).unwrap());

        let retry = RetryPolicy { max_attempts: 1, delay: Duration::from_millis(1) };
        let client = OpenWeatherClient::new("k", 31.08, -97.36, Duration::from_secs(2), retry)
            .unwrap()
            .with_url("http://127.0.0.1:9/data/2.5/weather");
        assert!(!client.refresh(&cache, now).await);
        assert_eq!(cache.latest().unwrap().description, "clear sky");
    }
}
