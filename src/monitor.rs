/*
 *  monitor.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Lightning monitor - owns the strike store, safety timer inputs and
 *	cadence controller; all mutation goes through here
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
use log::{debug, info};
use serde::Serialize;

use crate::cadence::{CadenceConfig, CadenceController, CadenceState, CadenceTransition};
use crate::config::{
    DEFAULT_ACTIVE_WINDOW_MINUTES, DEFAULT_ADDRESS, DEFAULT_COVERAGE_RADIUS_MILES, DEFAULT_LATITUDE,
    DEFAULT_LIGHTNING_INTERVAL_MINUTES, DEFAULT_LONGITUDE, DEFAULT_NORMAL_INTERVAL_MINUTES,
    DEFAULT_RETENTION_MINUTES, DEFAULT_SAFETY_MINUTES, Settings,
};
use crate::geo::{self, CenterLocation};
use crate::ingest::StrikeIngestor;
use crate::safety::{SafetyStatus, safety_status};
use crate::strike::{Strike, StrikeStore};

const RECENT_WINDOW_MINUTES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightningStatus {
    Clear,
    ActiveLightning,
    RecentActivity,
}

/// A strike as the dashboard shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeView {
    #[serde(flatten)]
    pub strike: Strike,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_ago: Option<i64>,
}

impl StrikeView {
    fn new(strike: Strike, center: &CenterLocation, now: DateTime<Local>) -> Self {
        let direction = geo::direction(center, strike.latitude, strike.longitude);
        let minutes_ago = Some(strike.age(now).num_minutes()).filter(|m| *m >= 0);
        Self { strike, direction, minutes_ago }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LightningReport {
    pub strikes: Vec<StrikeView>,
    pub total_strikes_60min: usize,
    pub recent_strikes_15min: usize,
    pub last_strike_time: Option<DateTime<Local>>,
    pub safety_timer: SafetyStatus,
    pub status: LightningStatus,
    pub message: String,
    pub last_updated: DateTime<Local>,
    pub coverage_radius_miles: f64,
    pub center_location: CenterLocation,
    pub cadence: CadenceState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub center: CenterLocation,
    pub coverage_radius_miles: f64,
    pub safety_minutes: u32,
    pub active_window_minutes: u32,
    pub retention_minutes: u32,
    pub normal_interval_minutes: u32,
    pub lightning_interval_minutes: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            center: CenterLocation {
                latitude: DEFAULT_LATITUDE,
                longitude: DEFAULT_LONGITUDE,
                address: DEFAULT_ADDRESS.to_string(),
            },
            coverage_radius_miles: DEFAULT_COVERAGE_RADIUS_MILES,
            safety_minutes: DEFAULT_SAFETY_MINUTES,
            active_window_minutes: DEFAULT_ACTIVE_WINDOW_MINUTES,
            retention_minutes: DEFAULT_RETENTION_MINUTES,
            normal_interval_minutes: DEFAULT_NORMAL_INTERVAL_MINUTES,
            lightning_interval_minutes: DEFAULT_LIGHTNING_INTERVAL_MINUTES,
        }
    }
}

impl From<&Settings> for MonitorSettings {
    fn from(s: &Settings) -> Self {
        Self {
            center: s.center.clone(),
            coverage_radius_miles: s.coverage_radius_miles,
            safety_minutes: s.safety_minutes,
            active_window_minutes: s.active_window_minutes,
            retention_minutes: s.retention_minutes,
            normal_interval_minutes: s.normal_interval_minutes,
            lightning_interval_minutes: s.lightning_interval_minutes,
        }
    }
}

impl MonitorSettings {
    fn cadence(&self) -> CadenceConfig {
        CadenceConfig {
            normal_interval_minutes: self.normal_interval_minutes,
            lightning_interval_minutes: self.lightning_interval_minutes,
            active_window_minutes: self.active_window_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub report: LightningReport,
    pub transition: Option<CadenceTransition>,
}

pub struct LightningMonitor {
    settings: MonitorSettings,
    store: StrikeStore,
    cadence: CadenceController,
    ingestor: StrikeIngestor,
    last_report: Option<LightningReport>,
}

impl LightningMonitor {
    pub fn new(settings: MonitorSettings, ingestor: StrikeIngestor) -> Self {
        Self {
            store: StrikeStore::new(settings.retention_minutes),
            cadence: CadenceController::new(settings.cadence()),
            settings,
            ingestor,
            last_report: None,
        }
    }

    /// One lightning poll: prune, ingest, record, re-evaluate cadence and
    /// build the report. Source failures only mean fewer strikes.
    pub async fn check(&mut self, now: DateTime<Local>) -> CheckOutcome {
        self.store.prune(now);
        let strikes = self.ingestor.ingest(now).await;
        if !strikes.is_empty() {
            info!("{} new strike(s) near {}", strikes.len(), self.settings.center);
        }
        self.record_strikes(now, strikes);
        if self.store.is_empty() {
            debug!("No strikes held");
        } else {
            debug!("{} strike(s) held, last at {:?}", self.store.len(), self.store.last_strike());
        }

        let transition = self.refresh_cadence(now);
        let report = self.status(now);
        debug!("Lightning check: {:?}, {} strike(s) in last hour",
            report.status, report.total_strikes_60min);
        self.last_report = Some(report.clone());

        CheckOutcome { report, transition }
    }

    /// Add strikes without polling any source.
    pub fn record_strikes(&mut self, now: DateTime<Local>, strikes: Vec<Strike>) {
        self.store.record(now, strikes);
    }

    pub fn refresh_cadence(&mut self, now: DateTime<Local>) -> Option<CadenceTransition> {
        self.cadence.evaluate(now, self.store.last_strike())
    }

    /// Current report from stored state; does not poll or change anything.
    /// The cadence shown is what the strike age calls for at `now`, even if
    /// no poll has applied it yet.
    pub fn status(&self, now: DateTime<Local>) -> LightningReport {
        let last_strike_time = self.store.last_strike();
        let safety_timer = safety_status(now, last_strike_time, self.settings.safety_minutes);

        let hour = self.store.recent(now, self.settings.active_window_minutes);
        let recent_cutoff = now - Duration::minutes(i64::from(RECENT_WINDOW_MINUTES));
        let recent_strikes_15min = hour.iter().filter(|s| s.timestamp > recent_cutoff).count();
        let total_strikes_60min = hour.len();

        let (status, message) = if hour.is_empty() {
            (
                LightningStatus::Clear,
                format!("No lightning activity detected within {} miles", self.settings.coverage_radius_miles),
            )
        } else {
            let status = if safety_timer.is_wait() {
                LightningStatus::ActiveLightning
            } else {
                LightningStatus::RecentActivity
            };
            (status, format!("{} strikes in last hour. {}", total_strikes_60min, safety_timer.message))
        };

        let center = &self.settings.center;
        LightningReport {
            strikes: hour.into_iter().map(|s| StrikeView::new(s, center, now)).collect(),
            total_strikes_60min,
            recent_strikes_15min,
            last_strike_time,
            safety_timer,
            status,
            message,
            last_updated: now,
            coverage_radius_miles: self.settings.coverage_radius_miles,
            center_location: center.clone(),
            cadence: self.cadence.state_at(now, last_strike_time),
        }
    }

    pub fn last_report(&self) -> Option<&LightningReport> {
        self.last_report.as_ref()
    }

    pub fn cadence(&self) -> &CadenceController {
        &self.cadence
    }

    pub fn last_strike_time(&self) -> Option<DateTime<Local>> {
        self.store.last_strike()
    }
}
