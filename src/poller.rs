/*
 *  poller.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Poll loop - refresh weather, check lightning, follow the cadence
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
use log::{debug, info};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};

use crate::conditions::ConditionsCache;
use crate::monitor::{CheckOutcome, LightningMonitor};
use crate::openweather::OpenWeatherClient;
use crate::publish::StatusPublisher;
use crate::schedule::PollSchedule;

pub struct Poller {
    monitor: LightningMonitor,
    schedule: PollSchedule,
    weather: Option<OpenWeatherClient>,
    cache: ConditionsCache,
    publisher: StatusPublisher,
}

impl Poller {
    pub fn new(
        monitor: LightningMonitor,
        weather: Option<OpenWeatherClient>,
        cache: ConditionsCache,
        publisher: StatusPublisher,
        now: DateTime<Local>,
    ) -> Self {
        let schedule = PollSchedule::new(now, monitor.cadence().interval_minutes());
        Self { monitor, schedule, weather, cache, publisher }
    }

    pub fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    pub fn monitor(&self) -> &LightningMonitor {
        &self.monitor
    }

    /// Weather first so the fallback source sees this poll's conditions,
    /// then lightning. A cadence change restarts the schedule.
    pub async fn poll_once(&mut self, now: DateTime<Local>) -> CheckOutcome {
        if let Some(weather) = &self.weather {
            weather.refresh(&self.cache, now).await;
        }

        let outcome = self.monitor.check(now).await;
        self.schedule.mark_run(now);
        if let Some(transition) = &outcome.transition {
            debug!("Cadence {:?} -> {:?}", transition.from, transition.to);
            self.schedule.reschedule(now, transition.interval_minutes);
        }

        self.publisher.publish(&outcome.report, &self.schedule.snapshot());
        outcome
    }

    /// Tick until cancelled, polling whenever the schedule is due.
    pub async fn run(&mut self, tick: Duration) {
        info!("Polling every {} minutes, checked every {}s",
            self.schedule.interval_minutes(), tick.as_secs());
        let mut ticker = time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let now = Local::now();
            if !self.schedule.is_due(now) {
                continue;
            }
            let outcome = self.poll_once(now).await;
            debug!("{} - next poll {}", outcome.report.message,
                self.schedule.next_run().format("%H:%M:%S"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cadence::CadenceMode;
    use crate::http::{FetchError, RetryPolicy};
    use crate::ingest::StrikeIngestor;
    use crate::ingest::tests::{detection, temple};
    use crate::monitor::MonitorSettings;
    use crate::sources::{Burst, CachedConditionsSource, Detection, StormSource};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports a storm on the first call only.
    struct PassingStorm {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StormSource for PassingStorm {
        fn name(&self) -> &str {
            "passing storm"
        }

        async fn detect(&self, _now: DateTime<Local>) -> Result<Vec<Detection>, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![detection("WeatherAPI Alert", Burst::ALERT)])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn cache() -> ConditionsCache {
        ConditionsCache::new(Duration::from_secs(1800))
    }

    fn poller(
        sources: Vec<Box<dyn StormSource>>,
        weather: Option<OpenWeatherClient>,
        cache: ConditionsCache,
        now: DateTime<Local>,
    ) -> Poller {
        let settings = MonitorSettings { center: temple(), ..MonitorSettings::default() };
        let ingestor = StrikeIngestor::new(temple(), 10.0, sources).with_seed(3);
        Poller::new(LightningMonitor::new(settings, ingestor), weather, cache, StatusPublisher::default(), now)
    }

    #[tokio::test]
    async fn test_quiet_poll_keeps_normal_interval() {
        let now = Local::now();
        let mut poller = poller(Vec::new(), None, cache(), now);
        assert!(poller.schedule().is_due(now));

        let outcome = poller.poll_once(now).await;
        assert!(outcome.transition.is_none());
        assert_eq!(poller.schedule().interval_minutes(), 10);
        assert_eq!(poller.schedule().next_run(), now + ChronoDuration::minutes(10));
        assert!(!poller.schedule().is_due(now + ChronoDuration::minutes(9)));
    }

    #[tokio::test]
    async fn test_transitions_reschedule_the_poll() {
        let now = Local::now();
        let storm: Box<dyn StormSource> = Box::new(PassingStorm { calls: AtomicUsize::new(0) });
        let mut poller = poller(vec![storm], None, cache(), now);

        let outcome = poller.poll_once(now).await;
        assert_eq!(outcome.transition.map(|t| t.to), Some(CadenceMode::Lightning));
        assert_eq!(poller.schedule().interval_minutes(), 2);
        assert_eq!(poller.schedule().next_run(), now + ChronoDuration::minutes(2));

        // still inside the hour: no change
        let later = now + ChronoDuration::minutes(30);
        assert!(poller.poll_once(later).await.transition.is_none());
        assert_eq!(poller.schedule().interval_minutes(), 2);

        let clear = now + ChronoDuration::minutes(61);
        let outcome = poller.poll_once(clear).await;
        assert_eq!(outcome.transition.map(|t| t.to), Some(CadenceMode::Normal));
        assert_eq!(poller.schedule().interval_minutes(), 10);
        assert_eq!(poller.schedule().next_run(), clear + ChronoDuration::minutes(10));
        assert_eq!(poller.schedule().snapshot().runs, 3);
    }

    #[tokio::test]
    async fn test_unreachable_weather_still_polls() {
        let now = Local::now();
        let retry = RetryPolicy { max_attempts: 1, delay: Duration::from_millis(1) };
        let weather = OpenWeatherClient::new("k", 31.08, -97.36, Duration::from_secs(2), retry)
            .unwrap()
            .with_url("http://127.0.0.1:9/data/2.5/weather");
        let cache = cache();
        let sources: Vec<Box<dyn StormSource>> = vec![Box::new(CachedConditionsSource::new(cache.clone()))];
        let mut poller = poller(sources, Some(weather), cache.clone(), now);

        let outcome = poller.poll_once(now).await;
        assert!(outcome.report.strikes.is_empty());
        assert!(cache.latest().is_none());
        assert_eq!(poller.monitor().last_report(), Some(&outcome.report));
        assert_eq!(poller.schedule().snapshot().runs, 1);
    }
}
