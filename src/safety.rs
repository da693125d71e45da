/*
 *  safety.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	30 minute rule: nobody goes outside until half an hour has passed
 *	without a strike
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
use serde::Serialize;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyState {
    Safe,
    Wait,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyStatus {
    pub status: SafetyState,
    pub minutes_remaining: u32,
    pub message: String,
}

impl SafetyStatus {
    pub fn is_wait(&self) -> bool {
        self.status == SafetyState::Wait
    }
}

/// Milliseconds from `last` to `now`, clamped at zero so a strike stamped in
/// the future (clock skew) counts as "just now".
fn elapsed_ms(now: DateTime<Local>, last: DateTime<Local>) -> i64 {
    (now - last).num_milliseconds().max(0)
}

/// Safety timer for the given last strike time.
///
/// `minutes_remaining` is `max(0, quiet_minutes - elapsed)` rounded up to a
/// whole minute, so the panel never shows 0 while still waiting: status is
/// `wait` exactly when `minutes_remaining > 0`.
pub fn safety_status(now: DateTime<Local>, last_strike: Option<DateTime<Local>>, quiet_minutes: u32) -> SafetyStatus {
    let Some(last) = last_strike else {
        return SafetyStatus {
            status: SafetyState::Safe,
            minutes_remaining: 0,
            message: "No recent lightning activity - Safe to proceed".to_string(),
        };
    };

    let elapsed = elapsed_ms(now, last);
    let remaining = i64::from(quiet_minutes) * MS_PER_MINUTE - elapsed;

    if remaining <= 0 {
        SafetyStatus {
            status: SafetyState::Safe,
            minutes_remaining: 0,
            message: format!("Safe - {} minutes since last strike", elapsed / MS_PER_MINUTE),
        }
    } else {
        let minutes = ((remaining + MS_PER_MINUTE - 1) / MS_PER_MINUTE) as u32;
        SafetyStatus {
            status: SafetyState::Wait,
            minutes_remaining: minutes,
            message: format!("WAIT - {} minutes until safe ({} min rule)", minutes, quiet_minutes),
        }
    }
}
