/*
 *  schedule.rs
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
use chrono::{DateTime, Duration, Local};
use log::info;
use serde::Serialize;

/// The one recurring weather/lightning poll. Checked against a coarse tick.
#[derive(Debug)]
pub struct PollSchedule {
    interval_minutes: u32,
    next_run: DateTime<Local>,
    last_run: Option<DateTime<Local>>,
    runs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSnapshot {
    pub interval_minutes: u32,
    pub next_run: DateTime<Local>,
    pub last_run: Option<DateTime<Local>>,
    pub runs: u64,
}

impl PollSchedule {
    /// First run is due immediately.
    pub fn new(now: DateTime<Local>, interval_minutes: u32) -> Self {
        Self {
            interval_minutes,
            next_run: now,
            last_run: None,
            runs: 0,
        }
    }

    fn period(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        now >= self.next_run
    }

    pub fn mark_run(&mut self, now: DateTime<Local>) {
        self.last_run = Some(now);
        self.runs += 1;
        self.next_run = now + self.period();
    }

    /// Cancel the pending run and start over at the new interval.
    pub fn reschedule(&mut self, now: DateTime<Local>, interval_minutes: u32) {
        self.interval_minutes = interval_minutes;
        self.next_run = now + self.period();
        info!("Rescheduling weather updates: every {} minutes (next {})",
            interval_minutes, self.next_run.format("%H:%M:%S"));
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn next_run(&self) -> DateTime<Local> {
        self.next_run
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            interval_minutes: self.interval_minutes,
            next_run: self.next_run,
            last_run: self.last_run,
            runs: self.runs,
        }
    }
}
