/*
 *  ingest.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Strike ingestor - walks the source list in order and synthesises
 *	strikes from the first source reporting storm activity
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
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo::CenterLocation;
use crate::sources::{Detection, StormSource};
use crate::strike::Strike;

pub struct StrikeIngestor {
    center: CenterLocation,
    radius_miles: f64,
    sources: Vec<Box<dyn StormSource>>,
    rng: StdRng,
}

impl StrikeIngestor {
    /// `sources` is the fallback order: the first entry is the primary.
    pub fn new(center: CenterLocation, radius_miles: f64, sources: Vec<Box<dyn StormSource>>) -> Self {
        Self {
            center,
            radius_miles,
            sources,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic jitter for tests and replays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Query sources in order until one reports storm activity. A failing
    /// source is logged and skipped; this never errors.
    pub async fn ingest(&mut self, now: DateTime<Local>) -> Vec<Strike> {
        let mut found: Option<Vec<Detection>> = None;

        for source in &self.sources {
            match source.detect(now).await {
                Ok(detections) if !detections.is_empty() => {
                    debug!("{} reported {} detection(s)", source.name(), detections.len());
                    found = Some(detections);
                    break;
                }
                Ok(_) => debug!("{}: no storm activity", source.name()),
                Err(e) => warn!("{} lightning check failed: {}", source.name(), e),
            }
        }

        let Some(detections) = found else {
            return Vec::new();
        };

        let strikes: Vec<Strike> = detections
            .iter()
            .flat_map(|d| self.synthesize(now, d))
            .collect();
        info!("{} simulated strike(s) added from {}", strikes.len(), detections[0].source);
        strikes
    }

    fn synthesize(&mut self, now: DateTime<Local>, detection: &Detection) -> Vec<Strike> {
        let burst = detection.burst;
        let count = self.rng.random_range(burst.min_strikes..=burst.max_strikes.max(burst.min_strikes));
        let jitter = burst.jitter_deg.abs();

        (0..count)
            .map(|_| {
                let age = self.rng.random_range(0..=burst.max_age_minutes);
                Strike {
                    latitude: self.center.latitude + self.rng.random_range(-jitter..=jitter),
                    longitude: self.center.longitude + self.rng.random_range(-jitter..=jitter),
                    timestamp: now - Duration::minutes(i64::from(age)),
                    distance_from_center_miles: self.rng.random_range(0.0..=self.radius_miles),
                    intensity_label: detection.intensity.clone(),
                    source_label: detection.source.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::FetchError;
    use crate::sources::Burst;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned source for tests: fails, or returns fixed detections. Counts calls.
    pub(crate) struct ScriptedSource {
        pub name: &'static str,
        pub detections: Option<Vec<Detection>>,
        pub calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        pub(crate) fn failing(name: &'static str) -> Self {
            Self { name, detections: None, calls: Arc::new(AtomicUsize::new(0)) }
        }

        pub(crate) fn reporting(name: &'static str, detections: Vec<Detection>) -> Self {
            Self { name, detections: Some(detections), calls: Arc::new(AtomicUsize::new(0)) }
        }
    }

    #[async_trait]
    impl StormSource for ScriptedSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn detect(&self, _now: DateTime<Local>) -> Result<Vec<Detection>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.detections
                .clone()
                .ok_or_else(|| FetchError::MissingData("simulated network error".to_string()))
        }
    }

    pub(crate) fn detection(source: &str, burst: Burst) -> Detection {
        Detection { source: source.to_string(), intensity: "Moderate".to_string(), burst }
    }

    pub(crate) fn temple() -> CenterLocation {
        CenterLocation { latitude: 31.0847, longitude: -97.3678, address: "2310 Eberhardt Rd, Temple, TX".into() }
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_nothing() {
        let mut ingestor = StrikeIngestor::new(temple(), 10.0, vec![
            Box::new(ScriptedSource::failing("primary")),
            Box::new(ScriptedSource::failing("fallback")),
        ]);
        assert!(ingestor.ingest(Local::now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_sources_yields_nothing() {
        let mut ingestor = StrikeIngestor::new(temple(), 10.0, Vec::new());
        assert!(ingestor.source_names().is_empty());
        assert!(ingestor.ingest(Local::now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_primary_falls_through() {
        let fallback = ScriptedSource::reporting("fallback", vec![detection("OpenWeatherMap", Burst::CACHED)]);
        let fallback_calls = fallback.calls.clone();
        let mut ingestor = StrikeIngestor::new(temple(), 10.0, vec![
            Box::new(ScriptedSource::failing("primary")),
            Box::new(fallback),
        ]).with_seed(7);

        let strikes = ingestor.ingest(Local::now()).await;
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert!((1..=2).contains(&strikes.len()));
        assert!(strikes.iter().all(|s| s.source_label == "OpenWeatherMap"));
    }

    #[tokio::test]
    async fn test_primary_with_detections_skips_fallback() {
        let primary = ScriptedSource::reporting("primary", vec![
            detection("WeatherAPI Alert", Burst::ALERT),
            detection("WeatherAPI Current", Burst::CURRENT),
        ]);
        let fallback = ScriptedSource::reporting("fallback", vec![detection("OpenWeatherMap", Burst::CACHED)]);
        let fallback_calls = fallback.calls.clone();
        let mut ingestor = StrikeIngestor::new(temple(), 10.0, vec![Box::new(primary), Box::new(fallback)])
            .with_seed(42);

        let strikes = ingestor.ingest(Local::now()).await;
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
        assert!((2..=4).contains(&strikes.len()));
        assert_eq!(strikes.iter().filter(|s| s.source_label == "WeatherAPI Alert").count(), 1);
    }

    #[tokio::test]
    async fn test_quiet_primary_consults_fallback() {
        let primary = ScriptedSource::reporting("primary", Vec::new());
        let fallback = ScriptedSource::reporting("fallback", Vec::new());
        let fallback_calls = fallback.calls.clone();
        let mut ingestor = StrikeIngestor::new(temple(), 10.0, vec![Box::new(primary), Box::new(fallback)]);
        assert!(ingestor.ingest(Local::now()).await.is_empty());
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_synthesised_strikes_stay_within_burst() {
        let now = Local::now();
        let center = temple();
        let mut ingestor = StrikeIngestor::new(center.clone(), 10.0, Vec::new()).with_seed(1234);
        for _ in 0..50 {
            let strikes = ingestor.synthesize(now, &detection("WeatherAPI Current", Burst::CURRENT));
            assert!((1..=3).contains(&strikes.len()));
            for s in strikes {
                let age = s.age(now);
                assert!(age >= Duration::zero() && age <= Duration::minutes(15));
                assert!((s.latitude - center.latitude).abs() <= 0.2 + 1e-9);
                assert!((s.longitude - center.longitude).abs() <= 0.2 + 1e-9);
                assert!((0.0..=10.0).contains(&s.distance_from_center_miles));
            }
        }

        let alert = ingestor.synthesize(now, &detection("WeatherAPI Alert", Burst::ALERT));
        assert_eq!(alert.len(), 1);
        assert_eq!(alert[0].timestamp, now);
    }
}
