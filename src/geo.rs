/*
 *  geo.rs
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
//! Compass bearings from the monitored site, for the strike display fields.

use serde::{Deserialize, Serialize};
use std::fmt;

const COMPASS_POINTS: [&str; 16] = [
    "N",  "NNE", "NE", "ENE", "E",  "ESE",
    "SE", "SSE", "S",  "SSW", "SW", "WSW",
    "W",  "WNW", "NW", "NNW"];

/// The fixed site being protected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl fmt::Display for CenterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4}, {:.4})", self.address, self.latitude, self.longitude)
    }
}

/// Flat bearing from center to target in degrees [0, 360). Good enough over
/// a ten mile radius. None when either point is not a real coordinate.
pub fn bearing_deg(center_lat: f64, center_lon: f64, target_lat: f64, target_lon: f64) -> Option<f64> {
    let deg = (target_lon - center_lon).atan2(target_lat - center_lat).to_degrees();
    let deg = (deg + 360.0) % 360.0;
    deg.is_finite().then_some(deg)
}

/// 16-point compass name for a bearing.
pub fn compass_point(deg: f64) -> &'static str {
    let mut d16 = ((deg.rem_euclid(360.0) / 22.5) + 0.5) as u8;
    d16 %= 16;
    COMPASS_POINTS[d16 as usize]
}

pub fn direction(center: &CenterLocation, target_lat: f64, target_lon: f64) -> Option<&'static str> {
    bearing_deg(center.latitude, center.longitude, target_lat, target_lon).map(compass_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temple() -> CenterLocation {
        CenterLocation { latitude: 31.0847, longitude: -97.3678, address: "Temple".into() }
    }

    #[test]
    fn test_compass_points() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(11.0), "N");
        assert_eq!(compass_point(12.0), "NNE");
        assert_eq!(compass_point(90.0), "E");
        assert_eq!(compass_point(180.0), "S");
        assert_eq!(compass_point(270.0), "W");
        assert_eq!(compass_point(355.0), "N");
        assert_eq!(compass_point(-90.0), "W");
    }

    #[test]
    fn test_direction_from_center() {
        let c = temple();
        assert_eq!(direction(&c, c.latitude + 0.1, c.longitude), Some("N"));
        assert_eq!(direction(&c, c.latitude, c.longitude + 0.1), Some("E"));
        assert_eq!(direction(&c, c.latitude - 0.1, c.longitude - 0.1), Some("SW"));
        assert_eq!(direction(&c, f64::NAN, c.longitude), None);
    }
}
