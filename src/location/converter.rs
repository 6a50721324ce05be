//! WGS-84 to GCJ-02 conversion.
//!
//! Map tiles inside mainland China are drawn in GCJ-02, an obfuscated frame
//! offset from WGS-84 by a few hundred meters. Fixes inside the correction
//! zone are shifted so the rendered route lines up with the map; everything
//! outside the zone passes through untouched.

use std::f64::consts::PI;

use crate::models::{Gcj02Position, Wgs84Position};

/// Krasovsky 1940 semi-major axis.
const SEMI_MAJOR_AXIS: f64 = 6_378_245.0;
/// Krasovsky 1940 first eccentricity squared.
const ECCENTRICITY_SQ: f64 = 0.006_693_421_622_965_943_23;

const MIN_LONGITUDE: f64 = 72.004;
const MAX_LONGITUDE: f64 = 137.8347;
const MIN_LATITUDE: f64 = 0.8293;
const MAX_LATITUDE: f64 = 55.8271;

pub fn is_outside_correction_zone(position: Wgs84Position) -> bool {
    position.longitude < MIN_LONGITUDE
        || position.longitude > MAX_LONGITUDE
        || position.latitude < MIN_LATITUDE
        || position.latitude > MAX_LATITUDE
}

pub fn wgs84_to_gcj02(position: Wgs84Position) -> Gcj02Position {
    if is_outside_correction_zone(position) {
        return Gcj02Position::new(position.latitude, position.longitude);
    }

    let x = position.longitude - 105.0;
    let y = position.latitude - 35.0;
    let mut d_lat = transform_lat(x, y);
    let mut d_lon = transform_lon(x, y);

    let rad_lat = position.latitude / 180.0 * PI;
    let sin_lat = rad_lat.sin();
    let magic = 1.0 - ECCENTRICITY_SQ * sin_lat * sin_lat;
    let sqrt_magic = magic.sqrt();

    d_lat = (d_lat * 180.0)
        / ((SEMI_MAJOR_AXIS * (1.0 - ECCENTRICITY_SQ)) / (magic * sqrt_magic) * PI);
    d_lon = (d_lon * 180.0) / (SEMI_MAJOR_AXIS / sqrt_magic * rad_lat.cos() * PI);

    Gcj02Position::new(position.latitude + d_lat, position.longitude + d_lon)
}

fn transform_lat(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn transform_lon(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-6;

    fn assert_close(actual: Gcj02Position, latitude: f64, longitude: f64) {
        assert!(
            (actual.latitude - latitude).abs() < TOLERANCE,
            "latitude {} != {}",
            actual.latitude,
            latitude
        );
        assert!(
            (actual.longitude - longitude).abs() < TOLERANCE,
            "longitude {} != {}",
            actual.longitude,
            longitude
        );
    }

    #[test]
    fn converts_beijing_reference_point() {
        let converted = wgs84_to_gcj02(Wgs84Position::new(39.9, 116.4));
        assert_close(converted, 39.901_403_529_849, 116.406_242_784_911);
    }

    #[test]
    fn converts_shanghai_and_shenzhen() {
        assert_close(
            wgs84_to_gcj02(Wgs84Position::new(31.2304, 121.4737)),
            31.228_457_737_577,
            121.478_223_059_277,
        );
        assert_close(
            wgs84_to_gcj02(Wgs84Position::new(22.5431, 114.0579)),
            22.540_382_814_222,
            114.063_013_998_565,
        );
    }

    #[test]
    fn passes_through_positions_outside_zone() {
        let outside = [
            Wgs84Position::new(48.8566, 2.3522),
            Wgs84Position::new(39.9, 72.003_999),
            Wgs84Position::new(39.9, 137.834_8),
            Wgs84Position::new(0.829_2, 116.4),
            Wgs84Position::new(55.827_2, 116.4),
            Wgs84Position::new(-33.8688, 151.2093),
        ];

        for position in outside {
            let converted = wgs84_to_gcj02(position);
            assert_eq!(converted.latitude, position.latitude);
            assert_eq!(converted.longitude, position.longitude);
        }
    }

    #[test]
    fn zone_bounds_are_inclusive() {
        assert!(!is_outside_correction_zone(Wgs84Position::new(MIN_LATITUDE, MIN_LONGITUDE)));
        assert!(!is_outside_correction_zone(Wgs84Position::new(MAX_LATITUDE, MAX_LONGITUDE)));
    }

    #[test]
    fn conversion_is_deterministic() {
        let position = Wgs84Position::new(30.5728, 104.0668);
        let first = wgs84_to_gcj02(position);
        let second = wgs84_to_gcj02(position);
        assert_eq!(first.latitude.to_bits(), second.latitude.to_bits());
        assert_eq!(first.longitude.to_bits(), second.longitude.to_bits());
    }
}
