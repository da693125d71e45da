/*
 *  strike.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Synthetic strike records and the rolling in-memory strike window
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
use chrono::{DateTime, Duration, Local};
use log::debug;
use serde::Serialize;

/// A lightning-activity record synthesised from weather signals. Not a
/// sensor reading: position, distance and time are approximations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strike {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Local>,
    #[serde(rename = "distance_miles")]
    pub distance_from_center_miles: f64,
    #[serde(rename = "intensity")]
    pub intensity_label: String,
    #[serde(rename = "source")]
    pub source_label: String,
}

impl Strike {
    pub fn age(&self, now: DateTime<Local>) -> Duration {
        now - self.timestamp
    }
}

/// Rolling window of strikes, pruned by age. Also remembers the most recent
/// strike time, which outlives the strikes themselves.
#[derive(Debug)]
pub struct StrikeStore {
    strikes: Vec<Strike>,
    retention: Duration,
    last_strike: Option<DateTime<Local>>,
}

impl StrikeStore {
    pub fn new(retention_minutes: u32) -> Self {
        Self {
            strikes: Vec::new(),
            retention: Duration::minutes(i64::from(retention_minutes)),
            last_strike: None,
        }
    }

    /// Drop strikes at or beyond the retention age. Returns how many went.
    pub fn prune(&mut self, now: DateTime<Local>) -> usize {
        let cutoff = now - self.retention;
        let before = self.strikes.len();
        self.strikes.retain(|s| s.timestamp > cutoff);
        let dropped = before - self.strikes.len();
        if dropped > 0 {
            debug!("Pruned {} strike(s) older than {} minutes", dropped, self.retention.num_minutes());
        }
        dropped
    }

    /// Append new strikes, advance the last-strike time, then prune.
    pub fn record(&mut self, now: DateTime<Local>, strikes: Vec<Strike>) {
        for strike in &strikes {
            if self.last_strike.is_none_or(|last| strike.timestamp > last) {
                self.last_strike = Some(strike.timestamp);
            }
        }
        self.strikes.extend(strikes);
        self.prune(now);
    }

    /// Strikes newer than `window_minutes`, newest first. Never returns
    /// anything past retention, whatever the window.
    pub fn recent(&self, now: DateTime<Local>, window_minutes: u32) -> Vec<Strike> {
        let window = Duration::minutes(i64::from(window_minutes)).min(self.retention);
        let cutoff = now - window;
        let mut recent: Vec<Strike> = self.strikes
            .iter()
            .filter(|s| s.timestamp > cutoff)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent
    }

    pub fn last_strike(&self) -> Option<DateTime<Local>> {
        self.last_strike
    }

    pub fn len(&self) -> usize {
        self.strikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strikes.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn strike_at(timestamp: DateTime<Local>) -> Strike {
    Strike {
        latitude: 31.1,
        longitude: -97.4,
        timestamp,
        distance_from_center_miles: 4.2,
        intensity_label: "Moderate".to_string(),
        source_label: "test".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tracks_latest_strike() {
        let now = Local::now();
        let mut store = StrikeStore::new(120);
        assert!(store.is_empty());
        assert_eq!(store.last_strike(), None);

        store.record(now, vec![strike_at(now - Duration::minutes(12)), strike_at(now - Duration::minutes(3))]);
        assert_eq!(store.last_strike(), Some(now - Duration::minutes(3)));

        // an older strike arriving later must not move the timer backwards
        store.record(now, vec![strike_at(now - Duration::minutes(20))]);
        assert_eq!(store.last_strike(), Some(now - Duration::minutes(3)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_prune_drops_strikes_past_retention() {
        let now = Local::now();
        let mut store = StrikeStore::new(120);
        store.record(now, vec![
            strike_at(now - Duration::minutes(5)),
            strike_at(now - Duration::minutes(119)),
        ]);
        assert_eq!(store.len(), 2);

        let later = now + Duration::minutes(2);
        assert_eq!(store.prune(later), 1);
        assert_eq!(store.len(), 1);
        // last strike time survives pruning
        assert_eq!(store.last_strike(), Some(now - Duration::minutes(5)));
    }

    #[test]
    fn test_record_never_keeps_expired_strikes() {
        let now = Local::now();
        let mut store = StrikeStore::new(120);
        store.record(now, vec![strike_at(now - Duration::minutes(121)), strike_at(now - Duration::hours(5))]);
        assert!(store.is_empty());
        assert!(store.recent(now, 24 * 60).is_empty());
    }

    #[test]
    fn test_recent_window_sorted_newest_first() {
        let now = Local::now();
        let mut store = StrikeStore::new(120);
        store.record(now, vec![
            strike_at(now - Duration::minutes(40)),
            strike_at(now - Duration::minutes(2)),
            strike_at(now - Duration::minutes(75)),
            strike_at(now - Duration::minutes(14)),
        ]);
        let recent = store.recent(now, 60);
        let ages: Vec<i64> = recent.iter().map(|s| s.age(now).num_minutes()).collect();
        assert_eq!(ages, vec![2, 14, 40]);

        // window wider than retention is clamped
        let later = now + Duration::minutes(50);
        assert!(store.recent(later, 600).iter().all(|s| s.age(later) < Duration::minutes(120)));
    }
}
