//! Low precision analytical Sun and Moon ephemerides (Montenbruck & Gill,
//! Satellite Orbits, 3.3.2). Accurate to ~0.1% in distance and ~1 arcmin
//! in direction, which is ample for third body and radiation pressure
//! perturbations.
use nalgebra::{Rotation3, Vector3};

use crate::{prelude::Epoch, time::julian_centuries_j2000};

/// Obliquity of the ecliptic at J2000 (deg)
const OBLIQUITY_J2000_DEG: f64 = 23.43929111;

const ARCSEC_TO_DEG: f64 = 1.0 / 3600.0;

fn ecliptic_to_inertial(longitude: f64, latitude: f64, distance_km: f64) -> Vector3<f64> {
    let ecliptic = Vector3::new(
        distance_km * longitude.cos() * latitude.cos(),
        distance_km * longitude.sin() * latitude.cos(),
        distance_km * latitude.sin(),
    );
    Rotation3::from_axis_angle(&Vector3::x_axis(), OBLIQUITY_J2000_DEG.to_radians()) * ecliptic
}

/// Sun position (km), geocentric inertial frame.
pub fn sun_position(t: Epoch) -> Vector3<f64> {
    let centuries = julian_centuries_j2000(t);

    let m = (357.5256 + 35999.049 * centuries).to_radians();
    let longitude = (282.9400
        + m.to_degrees()
        + (6892.0 * m.sin() + 72.0 * (2.0 * m).sin()) * ARCSEC_TO_DEG)
        .to_radians();
    let distance_km = (149.619 - 2.499 * m.cos() - 0.021 * (2.0 * m).cos()) * 1.0E6;

    ecliptic_to_inertial(longitude, 0.0, distance_km)
}

/// Moon position (km), geocentric inertial frame.
pub fn moon_position(t: Epoch) -> Vector3<f64> {
    let centuries = julian_centuries_j2000(t);

    // mean longitude, anomalies, argument of latitude and elongation
    let l0 = 218.31617 + 481267.88088 * centuries - 1.3972 * centuries;
    let l = (134.96292 + 477198.86753 * centuries).to_radians();
    let lp = (357.52543 + 35999.04944 * centuries).to_radians();
    let f = (93.27283 + 483202.01873 * centuries).to_radians();
    let d = (297.85027 + 445267.11135 * centuries).to_radians();

    let dlon = 22640.0 * l.sin() + 769.0 * (2.0 * l).sin() - 4586.0 * (l - 2.0 * d).sin()
        + 2370.0 * (2.0 * d).sin()
        - 668.0 * lp.sin()
        - 412.0 * (2.0 * f).sin()
        - 212.0 * (2.0 * l - 2.0 * d).sin()
        - 206.0 * (l + lp - 2.0 * d).sin()
        + 192.0 * (l + 2.0 * d).sin()
        - 165.0 * (lp - 2.0 * d).sin()
        + 148.0 * (l - lp).sin()
        - 125.0 * d.sin()
        - 110.0 * (l + lp).sin()
        - 55.0 * (2.0 * f - 2.0 * d).sin();

    let longitude = (l0 + dlon * ARCSEC_TO_DEG).to_radians();

    let lat_arg = f + (dlon + 412.0 * (2.0 * f).sin() + 541.0 * lp.sin()) * ARCSEC_TO_DEG.to_radians();

    let latitude = (18520.0 * lat_arg.sin() - 526.0 * (f - 2.0 * d).sin()
        + 44.0 * (l + f - 2.0 * d).sin()
        - 31.0 * (-l + f - 2.0 * d).sin()
        - 25.0 * (-2.0 * l + f).sin()
        - 23.0 * (lp + f - 2.0 * d).sin()
        + 21.0 * (-l + f).sin()
        + 11.0 * (-lp + f - 2.0 * d).sin())
        * ARCSEC_TO_DEG.to_radians();

    let distance_km = 385000.0
        - 20905.0 * l.cos()
        - 3699.0 * (2.0 * d - l).cos()
        - 2956.0 * (2.0 * d).cos()
        - 570.0 * (2.0 * l).cos()
        + 246.0 * (2.0 * l - 2.0 * d).cos()
        - 205.0 * (lp - 2.0 * d).cos()
        - 171.0 * (l + 2.0 * d).cos()
        - 152.0 * (l + lp - 2.0 * d).cos();

    ecliptic_to_inertial(longitude, latitude, distance_km)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::AU_KM;
    use std::str::FromStr;

    #[test]
    fn sun_distance_and_season() {
        let t = Epoch::from_str("2024-06-21T00:00:00 UTC").unwrap();
        let sun = sun_position(t);
        let distance = sun.norm() / AU_KM;
        assert!((distance - 1.016).abs() < 2.0E-3, "sun distance {} AU", distance);

        // June solstice: sun close to max declination
        let declination = (sun.z / sun.norm()).asin().to_degrees();
        assert!((declination - 23.44).abs() < 0.1, "declination {}", declination);
    }

    #[test]
    fn moon_distance() {
        for day in 0..30 {
            let t = Epoch::from_str("2024-01-01T00:00:00 UTC").unwrap() + day as f64 * hifitime::Unit::Day;
            let distance = moon_position(t).norm();
            assert!(distance > 356_000.0 && distance < 407_000.0, "moon distance {}", distance);
        }
    }
}
