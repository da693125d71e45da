/*
 *  cadence.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Polling cadence controller - normal vs lightning update frequency,
 *	keyed to how recently the last strike landed
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
use log::info;
use serde::Serialize;

use crate::config::{
    DEFAULT_ACTIVE_WINDOW_MINUTES, DEFAULT_LIGHTNING_INTERVAL_MINUTES, DEFAULT_NORMAL_INTERVAL_MINUTES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CadenceMode {
    Normal,
    Lightning,
}

/// Configuration for the cadence controller
#[derive(Debug, Clone)]
pub struct CadenceConfig {
    /// Poll interval with no recent strikes
    pub normal_interval_minutes: u32,

    /// Poll interval while a strike is within the active window
    pub lightning_interval_minutes: u32,

    /// How long after the last strike we stay in lightning mode
    pub active_window_minutes: u32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            normal_interval_minutes: DEFAULT_NORMAL_INTERVAL_MINUTES,
            lightning_interval_minutes: DEFAULT_LIGHTNING_INTERVAL_MINUTES,
            active_window_minutes: DEFAULT_ACTIVE_WINDOW_MINUTES,
        }
    }
}

/// A mode change; the polling job must be rescheduled at `interval_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceTransition {
    pub from: CadenceMode,
    pub to: CadenceMode,
    pub interval_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CadenceState {
    pub mode: CadenceMode,
    pub is_lightning_mode: bool,
    pub interval_minutes: u32,
    pub normal_interval_minutes: u32,
    pub lightning_interval_minutes: u32,
    pub last_transition: Option<DateTime<Local>>,
}

/// Two-state controller. No hysteresis: the mode follows the last strike age
/// across the window boundary on every evaluation.
#[derive(Debug)]
pub struct CadenceController {
    config: CadenceConfig,
    mode: CadenceMode,
    last_transition: Option<DateTime<Local>>,
}

impl CadenceController {
    pub fn new(config: CadenceConfig) -> Self {
        Self {
            config,
            mode: CadenceMode::Normal,
            last_transition: None,
        }
    }

    pub fn mode(&self) -> CadenceMode {
        self.mode
    }

    pub fn is_lightning_mode(&self) -> bool {
        self.mode == CadenceMode::Lightning
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_for(self.mode)
    }

    pub fn last_transition(&self) -> Option<DateTime<Local>> {
        self.last_transition
    }

    /// Mode the given strike recency calls for.
    fn mode_for(&self, now: DateTime<Local>, last_strike: Option<DateTime<Local>>) -> CadenceMode {
        let window = Duration::minutes(i64::from(self.config.active_window_minutes));
        match last_strike {
            Some(last) if now - last < window => CadenceMode::Lightning,
            _ => CadenceMode::Normal,
        }
    }

    /// Re-evaluate the mode. Returns the transition if it changed.
    pub fn evaluate(&mut self, now: DateTime<Local>, last_strike: Option<DateTime<Local>>) -> Option<CadenceTransition> {
        let new_mode = self.mode_for(now, last_strike);
        if new_mode == self.mode {
            return None;
        }

        let from = self.mode();
        self.mode = new_mode;
        self.last_transition = Some(now);
        let interval_minutes = self.interval_minutes();
        match new_mode {
            CadenceMode::Lightning => info!("LIGHTNING MODE ACTIVATED - switching to {}-minute updates", interval_minutes),
            CadenceMode::Normal => info!("Lightning mode deactivated - returning to {}-minute updates", interval_minutes),
        }
        Some(CadenceTransition { from, to: new_mode, interval_minutes })
    }

    fn interval_for(&self, mode: CadenceMode) -> u32 {
        match mode {
            CadenceMode::Normal => self.config.normal_interval_minutes,
            CadenceMode::Lightning => self.config.lightning_interval_minutes,
        }
    }

    /// State the strike recency calls for at `now`, without transitioning.
    /// Straight after `evaluate(now, last_strike)` this is the current mode.
    pub fn state_at(&self, now: DateTime<Local>, last_strike: Option<DateTime<Local>>) -> CadenceState {
        self.state_for(self.mode_for(now, last_strike))
    }

    fn state_for(&self, mode: CadenceMode) -> CadenceState {
        CadenceState {
            mode,
            is_lightning_mode: mode == CadenceMode::Lightning,
            interval_minutes: self.interval_for(mode),
            normal_interval_minutes: self.config.normal_interval_minutes,
            lightning_interval_minutes: self.config.lightning_interval_minutes,
            last_transition: self.last_transition(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_normal_and_stays_without_strikes() {
        let mut controller = CadenceController::new(CadenceConfig::default());
        assert_eq!(controller.mode(), CadenceMode::Normal);
        assert_eq!(controller.interval_minutes(), 10);
        assert_eq!(controller.evaluate(Local::now(), None), None);
        assert_eq!(controller.interval_minutes(), 10);
    }

    #[test]
    fn test_fresh_strike_enters_lightning_mode() {
        let now = Local::now();
        let mut controller = CadenceController::new(CadenceConfig::default());
        let t = controller.evaluate(now, Some(now - Duration::minutes(5))).unwrap();
        assert_eq!(t.from, CadenceMode::Normal);
        assert_eq!(t.to, CadenceMode::Lightning);
        assert_eq!(t.interval_minutes, 2);
        assert!(controller.is_lightning_mode());
        assert_eq!(controller.last_transition(), Some(now));

        // still inside the window, no further transition
        assert_eq!(controller.evaluate(now + Duration::minutes(30), Some(now - Duration::minutes(5))), None);
    }

    #[test]
    fn test_window_boundary() {
        let now = Local::now();
        let mut controller = CadenceController::new(CadenceConfig::default());

        controller.evaluate(now, Some(now - Duration::minutes(45)));
        assert_eq!(controller.interval_minutes(), 2);

        let last = Some(now - Duration::minutes(59) - Duration::seconds(59));
        assert_eq!(controller.evaluate(now, last), None);

        let t = controller.evaluate(now, Some(now - Duration::minutes(60))).unwrap();
        assert_eq!(t.to, CadenceMode::Normal);
        assert_eq!(t.interval_minutes, 10);
    }

    #[test]
    fn test_interval_follows_strike_age() {
        let now = Local::now();
        let mut controller = CadenceController::new(CadenceConfig::default());
        for age in [0, 1, 15, 59, 60, 61, 90, 200, 30, 2] {
            controller.evaluate(now, Some(now - Duration::minutes(age)));
            let expected = if age < 60 { 2 } else { 10 };
            assert_eq!(controller.interval_minutes(), expected, "age {age}");
            assert_eq!(controller.state_at(now, Some(now - Duration::minutes(age))).is_lightning_mode, age < 60);
        }
    }

    #[test]
    fn test_custom_intervals() {
        let config = CadenceConfig {
            normal_interval_minutes: 15,
            lightning_interval_minutes: 1,
            active_window_minutes: 20,
        };
        let now = Local::now();
        let mut controller = CadenceController::new(config);
        controller.evaluate(now, Some(now - Duration::minutes(19)));
        let state = controller.state_at(now, Some(now - Duration::minutes(19)));
        assert_eq!(state.mode, CadenceMode::Lightning);
        assert_eq!(state.interval_minutes, 1);
        assert_eq!(state.normal_interval_minutes, 15);
    }

    #[test]
    fn test_state_at_follows_clock_without_transition() {
        let now = Local::now();
        let last = Some(now - Duration::minutes(10));
        let mut controller = CadenceController::new(CadenceConfig::default());
        controller.evaluate(now, last);
        let current = controller.state_at(now, last);
        assert_eq!(current.mode, controller.mode());
        assert_eq!(current.interval_minutes, 2);

        let later = controller.state_at(now + Duration::minutes(55), last);
        assert_eq!(later.mode, CadenceMode::Normal);
        assert!(!later.is_lightning_mode);
        assert_eq!(later.interval_minutes, 10);
        assert_eq!(later.last_transition, Some(now));
        // the controller itself has not moved
        assert!(controller.is_lightning_mode());
    }
}
