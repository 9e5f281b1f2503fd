//! Force model: central attraction and additive perturbations.
use nalgebra::{Vector3, Vector6};

use crate::{
    cfg::{CentralBody, DragParams, OblatenessParams, SrpParams, ThirdBodyParams},
    constants::{
        AU_KM, MOON_GRAVITATION_MU_KM3_S2, SOLAR_PRESSURE_1AU_N_M2, SUN_GRAVITATION_MU_KM3_S2,
    },
    prelude::{Epoch, Error, PerturbationConfig},
    propagator::numerical::bodies::{moon_position, sun_position},
};

/// Perturbing acceleration, on top of the central body attraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Perturbation {
    /// Zonal harmonics J2 (up to J4)
    Oblateness(OblatenessParams),
    /// Atmospheric drag, co-rotating atmosphere
    Drag(DragParams),
    /// Sun and/or Moon point mass attraction
    ThirdBody(ThirdBodyParams),
    /// Solar radiation pressure
    SolarRadiationPressure(SrpParams),
}

impl std::fmt::Display for Perturbation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Oblateness(params) => write!(f, "J2..J{}", params.max_degree),
            Self::Drag(_) => write!(f, "drag"),
            Self::ThirdBody(params) => match (params.sun, params.moon) {
                (true, true) => write!(f, "sun+moon"),
                (true, false) => write!(f, "sun"),
                _ => write!(f, "moon"),
            },
            Self::SolarRadiationPressure(_) => write!(f, "srp"),
        }
    }
}

impl Perturbation {
    /// True when this perturbation depends on Sun or Moon positions.
    fn is_time_dependent(&self) -> bool {
        matches!(self, Self::ThirdBody(_) | Self::SolarRadiationPressure(_))
    }

    /// Acceleration (km.s⁻²) at inertial position (km) and velocity (km.s⁻¹).
    pub fn acceleration(
        &self,
        body: &CentralBody,
        epoch: Epoch,
        r: &Vector3<f64>,
        v: &Vector3<f64>,
    ) -> Vector3<f64> {
        match self {
            Self::Oblateness(params) => zonal_acceleration(body, params.max_degree, r),
            Self::Drag(params) => drag_acceleration(body, params, r, v),
            Self::ThirdBody(params) => {
                let mut acc = Vector3::zeros();
                if params.sun {
                    acc += third_body_acceleration(SUN_GRAVITATION_MU_KM3_S2, &sun_position(epoch), r);
                }
                if params.moon {
                    acc +=
                        third_body_acceleration(MOON_GRAVITATION_MU_KM3_S2, &moon_position(epoch), r);
                }
                acc
            },
            Self::SolarRadiationPressure(params) => {
                srp_acceleration(body, params, &sun_position(epoch), r)
            },
        }
    }
}

/// Zonal harmonics acceleration, degree 2 to `max_degree`.
fn zonal_acceleration(body: &CentralBody, max_degree: u8, r: &Vector3<f64>) -> Vector3<f64> {
    let (x, y, z) = (r.x, r.y, r.z);
    let r2 = r.norm_squared();
    let r_norm = r2.sqrt();
    let z2_r2 = z * z / r2;
    let mu = body.mu_km3_s2;
    let re = body.equatorial_radius_km;

    let factor = -1.5 * body.j2 * mu * re.powi(2) / r_norm.powi(5);
    let mut acc = Vector3::new(
        factor * x * (1.0 - 5.0 * z2_r2),
        factor * y * (1.0 - 5.0 * z2_r2),
        factor * z * (3.0 - 5.0 * z2_r2),
    );

    if max_degree >= 3 {
        let factor = -2.5 * body.j3 * mu * re.powi(3) / r_norm.powi(7);
        let xy = 3.0 * z - 7.0 * z.powi(3) / r2;
        acc += Vector3::new(
            factor * x * xy,
            factor * y * xy,
            factor * (6.0 * z * z - 7.0 * z.powi(4) / r2 - 0.6 * r2),
        );
    }

    if max_degree >= 4 {
        let factor = 1.875 * body.j4 * mu * re.powi(4) / r_norm.powi(7);
        let xy = 1.0 - 14.0 * z2_r2 + 21.0 * z2_r2 * z2_r2;
        acc += Vector3::new(
            factor * x * xy,
            factor * y * xy,
            factor * z * (5.0 - 70.0 / 3.0 * z2_r2 + 21.0 * z2_r2 * z2_r2),
        );
    }

    acc
}

/// Altitude (km) above the reference ellipsoid, geocentric latitude approximation.
pub(crate) fn ellipsoidal_altitude(body: &CentralBody, r: &Vector3<f64>) -> f64 {
    let r_norm = r.norm();
    let sin_lat = r.z / r_norm;
    r_norm - body.equatorial_radius_km * (1.0 - body.flattening * sin_lat * sin_lat)
}

/// a = -½ ρ |v_rel| v_rel Cd A/m
fn drag_acceleration(
    body: &CentralBody,
    params: &DragParams,
    r: &Vector3<f64>,
    v: &Vector3<f64>,
) -> Vector3<f64> {
    let rho = params.atmosphere.density(ellipsoidal_altitude(body, r));
    if rho <= 0.0 {
        return Vector3::zeros();
    }

    let v_rel = v - body.rotation().cross(r);

    // kg.m⁻³ x m².kg⁻¹ x (km/s)² = 1E3 km.s⁻²
    -0.5 * rho * params.drag_coefficient * params.area_to_mass_m2_kg * 1.0E3 * v_rel.norm() * v_rel
}

/// Direct minus indirect term of a point mass at `body_position`.
fn third_body_acceleration(
    mu: f64,
    body_position: &Vector3<f64>,
    r: &Vector3<f64>,
) -> Vector3<f64> {
    let d = body_position - r;
    mu * (d / d.norm().powi(3) - body_position / body_position.norm().powi(3))
}

/// True when the Sun is hidden by the central body (cylindrical shadow).
fn in_shadow(body: &CentralBody, sun: &Vector3<f64>, r: &Vector3<f64>) -> bool {
    let sun_dir = sun.normalize();
    let along = r.dot(&sun_dir);
    along < 0.0 && (r - along * sun_dir).norm() < body.equatorial_radius_km
}

fn srp_acceleration(
    body: &CentralBody,
    params: &SrpParams,
    sun: &Vector3<f64>,
    r: &Vector3<f64>,
) -> Vector3<f64> {
    if params.shadow && in_shadow(body, sun, r) {
        return Vector3::zeros();
    }

    let from_sun = r - sun;
    let distance = from_sun.norm();

    // N.m⁻² x m².kg⁻¹ = m.s⁻², 1E-3 km.s⁻²
    let magnitude = SOLAR_PRESSURE_1AU_N_M2
        * params.cr()
        * params.area_to_mass_m2_kg
        * (AU_KM / distance).powi(2)
        * 1.0E-3;

    magnitude * from_sun / distance
}

/// Central attraction and enabled perturbations, summed.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceModel {
    body: CentralBody,
    perturbations: Vec<Perturbation>,
    time_dependent: bool,
}

impl ForceModel {
    /// Builds a [ForceModel], verifying the [PerturbationConfig] first.
    pub fn new(body: CentralBody, cfg: &PerturbationConfig) -> Result<Self, Error> {
        let perturbations = cfg.perturbations()?;
        Ok(Self {
            body,
            time_dependent: perturbations.iter().any(|p| p.is_time_dependent()),
            perturbations,
        })
    }

    /// Central attraction only
    pub fn two_body(body: CentralBody) -> Self {
        Self {
            body,
            perturbations: Vec::new(),
            time_dependent: false,
        }
    }

    pub fn body(&self) -> &CentralBody {
        &self.body
    }

    pub fn perturbations(&self) -> &[Perturbation] {
        &self.perturbations
    }

    /// True when accelerations depend on the epoch
    pub(crate) fn is_time_dependent(&self) -> bool {
        self.time_dependent
    }

    fn central_acceleration(&self, r: &Vector3<f64>) -> Vector3<f64> {
        -self.body.mu_km3_s2 / r.norm().powi(3) * r
    }

    /// Total acceleration (km.s⁻²)
    pub fn acceleration(&self, epoch: Epoch, r: &Vector3<f64>, v: &Vector3<f64>) -> Vector3<f64> {
        self.perturbations
            .iter()
            .fold(self.central_acceleration(r), |acc, perturbation| {
                acc + perturbation.acceleration(&self.body, epoch, r, v)
            })
    }

    /// Individual contributions, central attraction first.
    pub fn acceleration_breakdown(
        &self,
        epoch: Epoch,
        r: &Vector3<f64>,
        v: &Vector3<f64>,
    ) -> Vec<(String, Vector3<f64>)> {
        let mut breakdown = vec![("central".to_string(), self.central_acceleration(r))];
        for perturbation in self.perturbations.iter() {
            breakdown.push((
                perturbation.to_string(),
                perturbation.acceleration(&self.body, epoch, r, v),
            ));
        }
        breakdown
    }

    /// State derivative [v, a]
    pub(crate) fn derivative(&self, epoch: Epoch, y: &Vector6<f64>) -> Vector6<f64> {
        let r = y.fixed_rows::<3>(0).into_owned();
        let v = y.fixed_rows::<3>(3).into_owned();
        let a = self.acceleration(epoch, &r, &v);
        Vector6::new(v.x, v.y, v.z, a.x, a.y, a.z)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::Atmosphere;
    use std::str::FromStr;

    fn epoch() -> Epoch {
        Epoch::from_str("2024-03-01T12:00:00 UTC").unwrap()
    }

    #[test]
    fn j2_equatorial_pull() {
        let body = CentralBody::earth();
        let r = Vector3::new(7000.0, 0.0, 0.0);
        let acc = zonal_acceleration(&body, 2, &r);

        // extra inward pull in the equatorial plane
        let expected = -1.5 * body.j2 * body.mu_km3_s2 * body.equatorial_radius_km.powi(2)
            / 7000.0_f64.powi(4);
        assert!((acc.x - expected).abs() < 1.0E-15);
        assert!(acc.y.abs() < 1.0E-20);
        assert!(acc.z.abs() < 1.0E-20);

        // J2 is three orders of magnitude below central attraction
        let ratio = acc.norm() / (body.mu_km3_s2 / 7000.0_f64.powi(2));
        assert!(ratio > 1.0E-3 && ratio < 2.0E-3, "ratio {}", ratio);
    }

    #[test]
    fn zonal_higher_degrees_are_small() {
        let body = CentralBody::earth();
        let r = Vector3::new(4000.0, 3000.0, 4500.0);
        let j2 = zonal_acceleration(&body, 2, &r);
        let j4 = zonal_acceleration(&body, 4, &r);
        let delta = (j4 - j2).norm();
        assert!(delta > 0.0);
        assert!(delta < 0.01 * j2.norm());
    }

    #[test]
    fn drag_opposes_relative_velocity() {
        let body = CentralBody::earth();
        let params = DragParams::default();
        let r = Vector3::new(6778.0, 0.0, 0.0);
        let v = Vector3::new(0.0, 7.67, 0.0);

        let acc = drag_acceleration(&body, &params, &r, &v);
        let v_rel = v - body.rotation().cross(&r);

        assert!(acc.dot(&v_rel) < 0.0);
        assert!(acc.cross(&v_rel).norm() < 1.0E-20);
        // ~1E-10 km/s² at 400 km
        assert!(acc.norm() > 1.0E-11 && acc.norm() < 1.0E-8, "{}", acc.norm());

        let vacuum = DragParams {
            atmosphere: Atmosphere::exponential(0.0, 0.0, 8.5),
            ..DragParams::default()
        };
        assert_eq!(drag_acceleration(&body, &vacuum, &r, &v), Vector3::zeros());
    }

    #[test]
    fn third_body_magnitude() {
        let r = Vector3::new(42164.0, 0.0, 0.0);
        let moon = third_body_acceleration(MOON_GRAVITATION_MU_KM3_S2, &moon_position(epoch()), &r);
        let sun = third_body_acceleration(SUN_GRAVITATION_MU_KM3_S2, &sun_position(epoch()), &r);
        // GEO: lunisolar accelerations are ~1E-8 km/s²
        assert!(moon.norm() > 1.0E-9 && moon.norm() < 5.0E-8);
        assert!(sun.norm() > 1.0E-9 && sun.norm() < 5.0E-8);
    }

    #[test]
    fn radiation_pressure_and_shadow() {
        let body = CentralBody::earth();
        let params = SrpParams {
            reflectivity: 0.5,
            ..SrpParams::default()
        };
        let sun = sun_position(epoch());
        let sun_dir = sun.normalize();

        let lit = 7000.0 * sun_dir;
        let acc = srp_acceleration(&body, &params, &sun, &lit);
        assert!(acc.dot(&sun_dir) < 0.0, "pushed away from the sun");
        let scale = (AU_KM / (lit - sun).norm()).powi(2);
        let expected = 4.56E-6 * 1.5 * 0.02 * scale * 1.0E-3;
        assert!((acc.norm() - expected).abs() < 1.0E-12 * expected);

        let hidden = -7000.0 * sun_dir;
        assert_eq!(srp_acceleration(&body, &params, &sun, &hidden), Vector3::zeros());

        let no_shadow = SrpParams {
            shadow: false,
            ..params
        };
        assert!(srp_acceleration(&body, &no_shadow, &sun, &hidden).norm() > 0.0);
    }

    #[test]
    fn composition() {
        let body = CentralBody::earth();
        let cfg = PerturbationConfig::all();
        let model = ForceModel::new(body, &cfg).unwrap();
        assert_eq!(model.perturbations().len(), 4);
        assert!(model.is_time_dependent());

        let r = Vector3::new(6778.0, 0.0, 100.0);
        let v = Vector3::new(0.0, 7.67, 0.1);

        let total = model.acceleration(epoch(), &r, &v);
        let sum = model
            .acceleration_breakdown(epoch(), &r, &v)
            .iter()
            .fold(Vector3::zeros(), |acc, (_, a)| acc + a);

        assert!((total - sum).norm() < 1.0E-15);
        assert!(!ForceModel::two_body(body).is_time_dependent());
    }
}
