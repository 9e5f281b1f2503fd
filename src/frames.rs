//! Inertial ⇄ Earth fixed rotations and WGS84 geodetic coordinates.
use map_3d::{ecef2geodetic, geodetic2ecef, Ellipsoid};
use nalgebra::{Rotation3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    cfg::CentralBody,
    kepler::wrap_two_pi,
    prelude::{CartesianState, Epoch},
    time::julian_centuries_j2000,
};

/// Greenwich mean sidereal time (rad, in [0, 2π)), IAU-82 model.
/// UTC is used in place of UT1.
pub fn gmst(epoch: Epoch) -> f64 {
    let t = julian_centuries_j2000(epoch);
    let seconds = 67310.54841 + (876600.0 * 3600.0 + 8640184.812866) * t + 0.093104 * t * t
        - 6.2E-6 * t * t * t;
    // 240 sidereal seconds per degree
    wrap_two_pi((seconds / 240.0).to_radians())
}

fn earth_rotation(epoch: Epoch) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), gmst(epoch))
}

/// Rotates an inertial position (km) and velocity (km s⁻¹) to the Earth fixed frame.
pub fn eci_to_ecef(
    epoch: Epoch,
    body: &CentralBody,
    r: &Vector3<f64>,
    v: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let rot = earth_rotation(epoch).inverse();
    let r_f = rot * r;
    let v_f = rot * v - body.rotation().cross(&r_f);
    (r_f, v_f)
}

/// Rotates an Earth fixed position (km) and velocity (km s⁻¹) to the inertial frame.
pub fn ecef_to_eci(
    epoch: Epoch,
    body: &CentralBody,
    r: &Vector3<f64>,
    v: &Vector3<f64>,
) -> (Vector3<f64>, Vector3<f64>) {
    let rot = earth_rotation(epoch);
    let v_rot = v + body.rotation().cross(r);
    (rot * r, rot * v_rot)
}

/// WGS84 geodetic coordinates to Earth fixed position (km).
pub fn geodetic_to_ecef(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Vector3<f64> {
    let (x, y, z) = geodetic2ecef(
        latitude_deg.to_radians(),
        longitude_deg.to_radians(),
        altitude_m,
        Ellipsoid::WGS84,
    );
    Vector3::new(x, y, z) / 1.0E3
}

/// Earth fixed position (km) to WGS84 geodetic coordinates:
/// latitude (deg), longitude (deg, in [-180, 180]) and altitude (km).
pub fn ecef_to_geodetic(r_km: &Vector3<f64>) -> (f64, f64, f64) {
    let (lat, lon, alt) = ecef2geodetic(
        r_km.x * 1.0E3,
        r_km.y * 1.0E3,
        r_km.z * 1.0E3,
        Ellipsoid::WGS84,
    );
    (lat.to_degrees(), lon.to_degrees(), alt / 1.0E3)
}

/// Point of the Earth surface right below the satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubSatellitePoint {
    pub epoch: Epoch,
    /// Geodetic latitude (deg)
    pub latitude_deg: f64,
    /// Longitude (deg), in [-180, 180]
    pub longitude_deg: f64,
    /// Altitude above the ellipsoid (km)
    pub altitude_km: f64,
}

impl SubSatellitePoint {
    /// Sub satellite point of the given state, in any frame.
    pub fn from_state(state: &CartesianState, body: &CentralBody) -> Self {
        let fixed = state.to_earth_fixed(body);
        let (latitude_deg, longitude_deg, altitude_km) = ecef_to_geodetic(&fixed.position_km);
        Self {
            epoch: state.epoch,
            latitude_deg,
            longitude_deg,
            altitude_km,
        }
    }
}

impl std::fmt::Display for SubSatellitePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} lat={:.4}° lon={:.4}° alt={:.3}km",
            self.epoch, self.latitude_deg, self.longitude_deg, self.altitude_km
        )
    }
}
