/*
 *  publish.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Status file for the dashboard: latest report plus the poll schedule
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
use log::{debug, error};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::monitor::LightningReport;
use crate::schedule::ScheduleSnapshot;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to write status file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode status: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    #[serde(flatten)]
    report: &'a LightningReport,
    schedule: &'a ScheduleSnapshot,
}

/// Writes the status file. Without a path configured every publish is a
/// no-op, so the poller doesn't need to care.
#[derive(Debug, Clone, Default)]
pub struct StatusPublisher {
    path: Option<PathBuf>,
}

impl StatusPublisher {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Publish the report; failures are logged and swallowed.
    pub fn publish(&self, report: &LightningReport, schedule: &ScheduleSnapshot) {
        if let Err(e) = self.try_publish(report, schedule) {
            error!("{}", e);
        }
    }

    pub fn try_publish(&self, report: &LightningReport, schedule: &ScheduleSnapshot) -> Result<(), PublishError> {
        let body = serde_json::to_string_pretty(&StatusDocument { report, schedule })?;
        self.write(&body)
    }

    /// Placeholder written before the first poll completes.
    pub fn publish_no_data(&self) {
        let body = json!({"status": "no_data", "message": "Lightning data not available"});
        let result = serde_json::to_string_pretty(&body)
            .map_err(PublishError::from)
            .and_then(|b| self.write(&b));
        if let Err(e) = result {
            error!("{}", e);
        }
    }

    /// temp file + rename, so the dashboard never reads a half-written file
    fn write(&self, body: &str) -> Result<(), PublishError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        debug!("Status written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{StrikeIngestor, tests::temple};
    use crate::monitor::{LightningMonitor, MonitorSettings};
    use crate::schedule::PollSchedule;
    use crate::strike::strike_at;
    use chrono::{Duration, Local};
    use serde_json::Value;

    fn temp_status(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("boltwatch-{}-{}", name, std::process::id()))
            .join("status.json")
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_no_data_placeholder() {
        let path = temp_status("nodata");
        let publisher = StatusPublisher::new(Some(path.clone()));
        publisher.publish_no_data();
        let v = read_json(&path);
        assert_eq!(v["status"], "no_data");
        assert_eq!(v["message"], "Lightning data not available");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_report_and_schedule_written() {
        let now = Local::now();
        let path = temp_status("report");
        let settings = MonitorSettings { center: temple(), ..MonitorSettings::default() };
        let mut monitor = LightningMonitor::new(settings, StrikeIngestor::new(temple(), 10.0, Vec::new()));
        monitor.record_strikes(now, vec![strike_at(now - Duration::minutes(10))]);
        let mut schedule = PollSchedule::new(now, 10);
        schedule.mark_run(now);

        let publisher = StatusPublisher::new(Some(path.clone()));
        publisher.try_publish(&monitor.status(now), &schedule.snapshot()).unwrap();

        let v = read_json(&path);
        assert_eq!(v["status"], "active_lightning");
        assert_eq!(v["safety_timer"]["minutes_remaining"], 20);
        assert_eq!(v["total_strikes_60min"], 1);
        assert_eq!(v["schedule"]["interval_minutes"], 10);
        assert_eq!(v["schedule"]["runs"], 1);
        assert!(!path.with_extension("json.tmp").exists());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_without_path_is_a_no_op() {
        let now = Local::now();
        let publisher = StatusPublisher::default();
        assert!(publisher.path().is_none());
        let monitor = LightningMonitor::new(MonitorSettings::default(), StrikeIngestor::new(temple(), 10.0, Vec::new()));
        assert!(publisher.try_publish(&monitor.status(now), &PollSchedule::new(now, 10).snapshot()).is_ok());
    }
}
