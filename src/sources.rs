/*
 *  sources.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Storm signal sources, consulted in order by the strike ingestor
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
use async_trait::async_trait;
use chrono::{DateTime, Local};
use log::{debug, warn};

use crate::conditions::ConditionsCache;
use crate::http::FetchError;
use crate::weatherapi::WeatherApiClient;

pub const DEFAULT_INTENSITY: &str = "Moderate";

/// How to turn one detection into strikes: positional jitter around the
/// site, how many strikes, and how far back they may be dated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Burst {
    pub jitter_deg: f64,
    pub min_strikes: u32,
    pub max_strikes: u32,
    pub max_age_minutes: u32,
}

impl Burst {
    /// an active alert is happening now
    pub const ALERT: Burst = Burst { jitter_deg: 0.1, min_strikes: 1, max_strikes: 1, max_age_minutes: 0 };
    pub const CURRENT: Burst = Burst { jitter_deg: 0.2, min_strikes: 1, max_strikes: 3, max_age_minutes: 15 };
    pub const CACHED: Burst = Burst { jitter_deg: 0.15, min_strikes: 1, max_strikes: 2, max_age_minutes: 20 };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub source: String,
    pub intensity: String,
    pub burst: Burst,
}

/// One place storm indicators can come from. Implementations report
/// failure as an error; the ingestor decides what a failure means.
#[async_trait]
pub trait StormSource: Send + Sync {
    fn name(&self) -> &str;

    async fn detect(&self, now: DateTime<Local>) -> Result<Vec<Detection>, FetchError>;
}

/// weatherapi.com alerts plus current condition text.
pub struct WeatherApiSource {
    client: WeatherApiClient,
}

impl WeatherApiSource {
    pub fn new(client: WeatherApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StormSource for WeatherApiSource {
    fn name(&self) -> &str {
        "WeatherAPI"
    }

    async fn detect(&self, now: DateTime<Local>) -> Result<Vec<Detection>, FetchError> {
        let mut detections = Vec::new();

        // either endpoint alone is still useful; only both failing fails the source
        let alerts = self.client.fetch_alerts().await;
        let current = self.client.fetch_current(now).await;
        let (alerts, current) = match (alerts, current) {
            (Err(alerts_err), Err(current_err)) => {
                warn!("WeatherAPI current conditions failed: {}", current_err);
                return Err(alerts_err);
            }
            pair => pair,
        };

        match alerts {
            Ok(alerts) => {
                for alert in alerts.into_iter().filter(|a| a.is_lightning()) {
                    debug!("Lightning alert active: {}", alert.event);
                    detections.push(Detection {
                        source: "WeatherAPI Alert".to_string(),
                        intensity: alert.severity.unwrap_or_else(|| DEFAULT_INTENSITY.to_string()),
                        burst: Burst::ALERT,
                    });
                }
            }
            Err(e) => warn!("WeatherAPI alerts failed, using current conditions only: {}", e),
        }

        match current {
            Ok(conditions) if conditions.is_thunderstorm() => {
                debug!("Thunderstorm in current conditions: {}", conditions.description);
                detections.push(Detection {
                    source: "WeatherAPI Current".to_string(),
                    intensity: DEFAULT_INTENSITY.to_string(),
                    burst: Burst::CURRENT,
                });
            }
            Ok(_) => {}
            Err(e) => warn!("WeatherAPI current conditions failed, using alerts only: {}", e),
        }

        Ok(detections)
    }
}

/// Falls back on whatever the weather refresh last cached. Stale entries
/// are ignored, so an old storm can't keep the timer running.
pub struct CachedConditionsSource {
    cache: ConditionsCache,
}

impl CachedConditionsSource {
    pub fn new(cache: ConditionsCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl StormSource for CachedConditionsSource {
    fn name(&self) -> &str {
        "OpenWeatherMap cache"
    }

    async fn detect(&self, now: DateTime<Local>) -> Result<Vec<Detection>, FetchError> {
        let Some(conditions) = self.cache.fresh(now) else {
            debug!("No fresh cached conditions");
            return Ok(Vec::new());
        };
        if !conditions.is_thunderstorm() {
            return Ok(Vec::new());
        }
        Ok(vec![Detection {
            source: "OpenWeatherMap".to_string(),
            intensity: DEFAULT_INTENSITY.to_string(),
            burst: Burst::CACHED,
        }])
    }
}
