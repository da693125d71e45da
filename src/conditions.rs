/*
 *  conditions.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Weather signals the lightning check consumes: current conditions,
 *	active alerts, and the last-conditions cache
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
use chrono::{DateTime, Duration as ChronoDuration, Local};
use mini_moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONDITION_WORDS: [&str; 3] = ["thunder", "lightning", "storm"];
const ALERT_WORDS: [&str; 2] = ["thunder", "lightning"];

// weatherapi.com condition codes that carry thunder
const WEATHERAPI_THUNDER_CODES: [i64; 5] = [1087, 1273, 1276, 1279, 1282];

/// Who produced a conditions record; the weather codes are provider specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    WeatherApi,
    OpenWeatherMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    pub description: String,
    pub weather_code: Option<i64>,
    pub provider: Provider,
    pub observed_at: DateTime<Local>,
}

impl Conditions {
    pub fn mentions_thunder(&self) -> bool {
        let text = self.description.to_lowercase();
        CONDITION_WORDS.iter().any(|w| text.contains(w))
    }

    pub fn thunder_code(&self) -> bool {
        match (self.provider, self.weather_code) {
            // OpenWeatherMap group 2xx: Thunderstorm
            (Provider::OpenWeatherMap, Some(code)) => (200..=299).contains(&code),
            (Provider::WeatherApi, Some(code)) => WEATHERAPI_THUNDER_CODES.contains(&code),
            (_, None) => false,
        }
    }

    pub fn is_thunderstorm(&self) -> bool {
        self.thunder_code() || self.mentions_thunder()
    }

    pub fn age(&self, now: DateTime<Local>) -> ChronoDuration {
        now - self.observed_at
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub severity: Option<String>,
}

impl WeatherAlert {
    pub fn is_lightning(&self) -> bool {
        let event = self.event.to_lowercase();
        ALERT_WORDS.iter().any(|w| event.contains(w))
    }
}

/// Last current-conditions record from the weather refresh. Entries expire
/// after `ttl`; anything older than that relative to the caller's clock is
/// also treated as missing.
#[derive(Clone)]
pub struct ConditionsCache {
    cache: Cache<String, Conditions>,
    key: String,
    max_age: ChronoDuration,
}

impl ConditionsCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(4)
            .time_to_live(ttl)
            .build();
        Self {
            cache,
            key: "current".to_string(),
            max_age: ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX),
        }
    }

    pub fn store(&self, conditions: Conditions) {
        self.cache.insert(self.key.clone(), conditions);
    }

    /// Whatever is cached, however old.
    pub fn latest(&self) -> Option<Conditions> {
        self.cache.get(&self.key)
    }

    /// Cached conditions no older than the cache TTL at `now`.
    pub fn fresh(&self, now: DateTime<Local>) -> Option<Conditions> {
        self.latest().filter(|c| c.age(now) <= self.max_age)
    }
}

#[cfg(test)]
pub(crate) fn conditions(description: &str, code: Option<i64>, provider: Provider, observed_at: DateTime<Local>) -> Conditions {
    Conditions {
        description: description.to_string(),
        weather_code: code,
        provider,
        observed_at,
    }
}
