/*
 *  main.rs
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

use chrono::Local;
use env_logger::Env;
use log::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

mod cadence;
mod conditions;
mod config;
mod geo;
mod http;
mod ingest;
mod monitor;
mod openweather;
mod poller;
mod publish;
mod safety;
mod schedule;
mod sources;
mod strike;
mod weatherapi;

use conditions::ConditionsCache;
use http::RetryPolicy;
use ingest::StrikeIngestor;
use monitor::{LightningMonitor, MonitorSettings};
use openweather::OpenWeatherClient;
use poller::Poller;
use publish::StatusPublisher;
use sources::{CachedConditionsSource, StormSource, WeatherApiSource};
use weatherapi::WeatherApiClient;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP, logs which one, and returns so
/// main can shut down.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = config::load()?.resolve();

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("{} keeping the office safe", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    info!("Monitoring {} within {} miles", settings.center, settings.coverage_radius_miles);

    let retry = RetryPolicy { max_attempts: settings.http_retries, ..RetryPolicy::default() };
    let (lat, lng) = (settings.center.latitude, settings.center.longitude);
    let cache = ConditionsCache::new(settings.cache_ttl);

    // primary first; the ingestor stops at the first source with activity
    let mut sources: Vec<Box<dyn StormSource>> = Vec::new();
    match &settings.weatherapi_key {
        Some(key) => {
            let client = WeatherApiClient::new(key, lat, lng, settings.http_timeout, retry)?;
            sources.push(Box::new(WeatherApiSource::new(client)));
        }
        None => warn!("No WeatherAPI key configured, alerts unavailable"),
    }
    sources.push(Box::new(CachedConditionsSource::new(cache.clone())));

    let weather = match &settings.openweather_key {
        Some(key) => Some(OpenWeatherClient::new(key, lat, lng, settings.http_timeout, retry)?),
        None => {
            warn!("No OpenWeatherMap key configured, current conditions unavailable");
            None
        }
    };

    let ingestor = StrikeIngestor::new(settings.center.clone(), settings.coverage_radius_miles, sources);
    info!("Lightning sources: {}", ingestor.source_names().join(" -> "));
    let monitor = LightningMonitor::new(MonitorSettings::from(&settings), ingestor);

    let publisher = StatusPublisher::new(settings.status_file.clone());
    if let Some(path) = publisher.path() {
        info!("Publishing status to {}", path.display());
    }
    publisher.publish_no_data();

    let mut poller = Poller::new(monitor, weather, cache, publisher, Local::now());

    tokio::select! {
        result = signal_handler() => {
            if let Err(e) = result {
                warn!("Signal handling unavailable: {}", e);
            }
        }
        _ = poller.run(settings.tick) => {}
    }

    if let Some(report) = poller.monitor().last_report() {
        info!("Last status: {}", report.message);
    }
    if let Some(last) = poller.monitor().last_strike_time() {
        info!("Last strike {}", last.format("%Y-%m-%d %H:%M:%S"));
    }
    info!("{} stopped after {} poll(s)", env!("CARGO_PKG_NAME"), poller.schedule().snapshot().runs);
    Ok(())
}
