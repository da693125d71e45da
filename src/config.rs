/*
 *  config.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	Layered configuration: defaults, YAML file, then CLI/env overrides
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
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::geo::CenterLocation;

/// Value shipped in the sample config; treated as "no key".
pub const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

// 2310 Eberhardt Rd, Temple, TX
pub const DEFAULT_LATITUDE: f64 = 31.0847;
pub const DEFAULT_LONGITUDE: f64 = -97.3678;
pub const DEFAULT_ADDRESS: &str = "2310 Eberhardt Rd, Temple, TX";

pub const DEFAULT_SAFETY_MINUTES: u32 = 30;
pub const DEFAULT_ACTIVE_WINDOW_MINUTES: u32 = 60;
pub const DEFAULT_RETENTION_MINUTES: u32 = 120;
pub const DEFAULT_NORMAL_INTERVAL_MINUTES: u32 = 10;
pub const DEFAULT_LIGHTNING_INTERVAL_MINUTES: u32 = 2;
pub const DEFAULT_COVERAGE_RADIUS_MILES: f64 = 10.0;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HTTP_RETRIES: u8 = 3;
pub const DEFAULT_CACHE_TTL_MINUTES: u32 = 30;
pub const MAX_CACHE_TTL_MINUTES: u32 = 24 * 60;
pub const DEFAULT_TICK_SECS: u64 = 60;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration as read from YAML. Every field is optional so
/// files and CLI flags can be layered; `resolve()` fills in the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub location: Option<LocationConfig>,
    pub keys: Option<KeysConfig>,
    pub lightning: Option<LightningConfig>,
    pub http: Option<HttpConfig>,
    /// JSON status file the weather dashboard reads
    pub status_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeysConfig {
    /// weatherapi.com key (alerts + current conditions)
    pub weatherapi: Option<String>,
    /// openweathermap.org key (current conditions cache)
    pub openweather: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LightningConfig {
    pub safety_minutes: Option<u32>,
    pub active_window_minutes: Option<u32>,
    pub retention_minutes: Option<u32>,
    pub normal_interval_minutes: Option<u32>,
    pub lightning_interval_minutes: Option<u32>,
    pub coverage_radius_miles: Option<f64>,
    pub cache_ttl_minutes: Option<u32>,
    pub tick_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HttpConfig {
    pub timeout_secs: Option<u64>,
    pub retries: Option<u8>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "boltwatch", about = "Lightning safety monitor for the office signage", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// shorthand for --log-level debug
    #[arg(long, short = 'd', action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,
    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true)]
    pub weatherapi_key: Option<String>,
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub openweather_key: Option<String>,
    #[arg(long)]
    pub normal_interval: Option<u32>,
    #[arg(long)]
    pub lightning_interval: Option<u32>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub status_file: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_level: String,
    pub center: CenterLocation,
    pub weatherapi_key: Option<String>,
    pub openweather_key: Option<String>,
    pub safety_minutes: u32,
    pub active_window_minutes: u32,
    pub retention_minutes: u32,
    pub normal_interval_minutes: u32,
    pub lightning_interval_minutes: u32,
    pub coverage_radius_miles: f64,
    pub cache_ttl: Duration,
    pub tick: Duration,
    pub http_timeout: Duration,
    pub http_retries: u8,
    pub status_file: Option<PathBuf>,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_from(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

pub fn load_from(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/boltwatch/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/boltwatch.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["boltwatch.yaml", "config/boltwatch.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()   { dst.log_level = src.log_level; }
    if src.status_file.is_some() { dst.status_file = src.status_file; }

    match (&mut dst.location, src.location) {
        (None, Some(s)) => dst.location = Some(s),
        (Some(d), Some(s)) => {
            if s.latitude.is_some()  { d.latitude = s.latitude; }
            if s.longitude.is_some() { d.longitude = s.longitude; }
            if s.address.is_some()   { d.address = s.address; }
        }
        _ => {}
    }
    match (&mut dst.keys, src.keys) {
        (None, Some(s)) => dst.keys = Some(s),
        (Some(d), Some(s)) => {
            if s.weatherapi.is_some()  { d.weatherapi = s.weatherapi; }
            if s.openweather.is_some() { d.openweather = s.openweather; }
        }
        _ => {}
    }
    match (&mut dst.lightning, src.lightning) {
        (None, Some(s)) => dst.lightning = Some(s),
        (Some(d), Some(s)) => merge_lightning(d, s),
        _ => {}
    }
    match (&mut dst.http, src.http) {
        (None, Some(s)) => dst.http = Some(s),
        (Some(d), Some(s)) => {
            if s.timeout_secs.is_some() { d.timeout_secs = s.timeout_secs; }
            if s.retries.is_some()      { d.retries = s.retries; }
        }
        _ => {}
    }
}

fn merge_lightning(dst: &mut LightningConfig, src: LightningConfig) {
    if src.safety_minutes.is_some()             { dst.safety_minutes = src.safety_minutes; }
    if src.active_window_minutes.is_some()      { dst.active_window_minutes = src.active_window_minutes; }
    if src.retention_minutes.is_some()          { dst.retention_minutes = src.retention_minutes; }
    if src.normal_interval_minutes.is_some()    { dst.normal_interval_minutes = src.normal_interval_minutes; }
    if src.lightning_interval_minutes.is_some() { dst.lightning_interval_minutes = src.lightning_interval_minutes; }
    if src.coverage_radius_miles.is_some()      { dst.coverage_radius_miles = src.coverage_radius_miles; }
    if src.cache_ttl_minutes.is_some()          { dst.cache_ttl_minutes = src.cache_ttl_minutes; }
    if src.tick_secs.is_some()                  { dst.tick_secs = src.tick_secs; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()   { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                 { cfg.log_level = Some("debug".to_string()); }
    if cli.status_file.is_some() { cfg.status_file = cli.status_file.clone(); }

    if cli.latitude.is_some() || cli.longitude.is_some() {
        let location = cfg.location.get_or_insert_with(LocationConfig::default);
        if cli.latitude.is_some()  { location.latitude = cli.latitude; }
        if cli.longitude.is_some() { location.longitude = cli.longitude; }
    }
    if cli.weatherapi_key.is_some() || cli.openweather_key.is_some() {
        let keys = cfg.keys.get_or_insert_with(KeysConfig::default);
        if cli.weatherapi_key.is_some()  { keys.weatherapi = cli.weatherapi_key.clone(); }
        if cli.openweather_key.is_some() { keys.openweather = cli.openweather_key.clone(); }
    }
    if cli.normal_interval.is_some() || cli.lightning_interval.is_some() {
        let lightning = cfg.lightning.get_or_insert_with(LightningConfig::default);
        if cli.normal_interval.is_some()    { lightning.normal_interval_minutes = cli.normal_interval; }
        if cli.lightning_interval.is_some() { lightning.lightning_interval_minutes = cli.lightning_interval; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(location) = cfg.location.as_ref() {
        if let Some(lat) = location.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ConfigError::Validation(format!("latitude {lat} out of range -90..=90")));
            }
        }
        if let Some(lon) = location.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ConfigError::Validation(format!("longitude {lon} out of range -180..=180")));
            }
        }
    }
    if let Some(l) = cfg.lightning.as_ref() {
        for (name, value) in [
            ("safety_minutes", l.safety_minutes),
            ("active_window_minutes", l.active_window_minutes),
            ("retention_minutes", l.retention_minutes),
            ("normal_interval_minutes", l.normal_interval_minutes),
            ("lightning_interval_minutes", l.lightning_interval_minutes),
            ("cache_ttl_minutes", l.cache_ttl_minutes),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Validation(format!("lightning.{name} must be > 0")));
            }
        }
        if let Some(ttl) = l.cache_ttl_minutes {
            if ttl > MAX_CACHE_TTL_MINUTES {
                return Err(ConfigError::Validation(format!(
                    "lightning.cache_ttl_minutes ({ttl}) must be at most {MAX_CACHE_TTL_MINUTES}"
                )));
            }
        }
        if l.tick_secs == Some(0) {
            return Err(ConfigError::Validation("lightning.tick_secs must be > 0".into()));
        }
        if let Some(r) = l.coverage_radius_miles {
            if !(r > 0.0) {
                return Err(ConfigError::Validation("lightning.coverage_radius_miles must be > 0".into()));
            }
        }
        let window = l.active_window_minutes.unwrap_or(DEFAULT_ACTIVE_WINDOW_MINUTES);
        let retention = l.retention_minutes.unwrap_or(DEFAULT_RETENTION_MINUTES);
        if retention < window {
            return Err(ConfigError::Validation(format!(
                "lightning.retention_minutes ({retention}) must cover the active window ({window})"
            )));
        }
    }
    if let Some(http) = cfg.http.as_ref() {
        if http.timeout_secs == Some(0) {
            return Err(ConfigError::Validation("http.timeout_secs must be > 0".into()));
        }
    }
    Ok(())
}

/// Keys left empty or at the placeholder are treated as not configured.
fn live_key(key: Option<&String>) -> Option<String> {
    key.map(|k| k.trim())
        .filter(|k| !k.is_empty() && *k != PLACEHOLDER_KEY)
        .map(str::to_string)
}

impl Config {
    pub fn resolve(&self) -> Settings {
        let location = self.location.clone().unwrap_or_default();
        let keys = self.keys.clone().unwrap_or_default();
        let lightning = self.lightning.clone().unwrap_or_default();
        let http = self.http.clone().unwrap_or_default();

        Settings {
            log_level: self.log_level.clone().unwrap_or_else(|| "info".to_string()),
            center: CenterLocation {
                latitude: location.latitude.unwrap_or(DEFAULT_LATITUDE),
                longitude: location.longitude.unwrap_or(DEFAULT_LONGITUDE),
                address: location.address.unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            },
            weatherapi_key: live_key(keys.weatherapi.as_ref()),
            openweather_key: live_key(keys.openweather.as_ref()),
            safety_minutes: lightning.safety_minutes.unwrap_or(DEFAULT_SAFETY_MINUTES),
            active_window_minutes: lightning.active_window_minutes.unwrap_or(DEFAULT_ACTIVE_WINDOW_MINUTES),
            retention_minutes: lightning.retention_minutes.unwrap_or(DEFAULT_RETENTION_MINUTES),
            normal_interval_minutes: lightning.normal_interval_minutes.unwrap_or(DEFAULT_NORMAL_INTERVAL_MINUTES),
            lightning_interval_minutes: lightning.lightning_interval_minutes.unwrap_or(DEFAULT_LIGHTNING_INTERVAL_MINUTES),
            coverage_radius_miles: lightning.coverage_radius_miles.unwrap_or(DEFAULT_COVERAGE_RADIUS_MILES),
            cache_ttl: Duration::from_secs(
                u64::from(lightning.cache_ttl_minutes.unwrap_or(DEFAULT_CACHE_TTL_MINUTES)) * 60,
            ),
            tick: Duration::from_secs(lightning.tick_secs.unwrap_or(DEFAULT_TICK_SECS)),
            http_timeout: Duration::from_secs(http.timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)),
            http_retries: http.retries.unwrap_or(DEFAULT_HTTP_RETRIES),
            status_file: self.status_file.clone(),
        }
    }
}
