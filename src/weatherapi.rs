/*
 *  weatherapi.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	weatherapi.com client: active alerts and current conditions
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
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::conditions::{Conditions, Provider, WeatherAlert};
use crate::http::{FetchError, RetryPolicy, build_client, get_with_retries};

pub const WEATHERAPI_BASE_URL: &str = "http://api.weatherapi.com/v1";

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    lat: f64,
    lng: f64,
    retry: RetryPolicy,
}

impl WeatherApiClient {
    pub fn new(api_key: &str, lat: f64, lng: f64, timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: WEATHERAPI_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            lat,
            lng,
            retry,
        })
    }

    /// Point at another host (proxy, or a dead port in tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn params(&self) -> [(&'static str, String); 2] {
        [
            ("key", self.api_key.clone()),
            ("q", format!("{},{}", self.lat, self.lng)),
        ]
    }

    pub async fn fetch_alerts(&self) -> Result<Vec<WeatherAlert>, FetchError> {
        let url = format!("{}/alerts.json", self.base_url);
        let body = get_with_retries(&self.client, &url, &self.params(), self.retry).await?;
        let alerts = parse_alerts(&body)?;
        debug!("WeatherAPI returned {} active alert(s)", alerts.len());
        Ok(alerts)
    }

    pub async fn fetch_current(&self, now: DateTime<Local>) -> Result<Conditions, FetchError> {
        let url = format!("{}/current.json", self.base_url);
        let body = get_with_retries(&self.client, &url, &self.params(), self.retry).await?;
        parse_current(&body, now)
    }
}

/// `{"alerts": {"alert": [{"event": .., "severity": ..}, ..]}}`; a missing
/// block means no alerts.
pub fn parse_alerts(body: &str) -> Result<Vec<WeatherAlert>, FetchError> {
    let v: Value = serde_json::from_str(body)?;
    let alerts = v["alerts"]["alert"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|a| WeatherAlert {
                    event: a["event"].as_str().unwrap_or("").to_string(),
                    severity: a["severity"].as_str()
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(alerts)
}

/// `{"current": {"condition": {"text": .., "code": ..}}}`
pub fn parse_current(body: &str, now: DateTime<Local>) -> Result<Conditions, FetchError> {
    let v: Value = serde_json::from_str(body)?;
    let condition = &v["current"]["condition"];
    let description = condition["text"]
        .as_str()
        .ok_or_else(|| FetchError::MissingData("current.condition.text".to_string()))?;
    Ok(Conditions {
        description: description.to_string(),
        weather_code: condition["code"].as_i64(),
        provider: Provider::WeatherApi,
        observed_at: now,
    })
}
