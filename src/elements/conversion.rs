//! Keplerian elements ⇄ Cartesian state conversions.
use std::f64::consts::PI;

use log::trace;
use nalgebra::{Rotation3, Vector3};

use crate::{
    cfg::{CentralBody, ConversionOpts, OrbitRegime, SingularityPolicy},
    error::Singularity,
    kepler::wrap_two_pi,
    prelude::{Anomaly, CartesianState, Epoch, Error, KeplerianElements},
};

// below this |h| / (|r| |v|), the trajectory is considered rectilinear
const RECTILINEAR_THRESHOLD: f64 = 1.0E-12;

// |e - 1| under which the trajectory is considered parabolic
const PARABOLIC_THRESHOLD: f64 = 1.0E-10;

/// Identifies the singularity (if any) of an orbit with eccentricity `e`
/// and inclination `i` (rad), given the configured tolerances.
pub(crate) fn singularity(e: f64, i: f64, opts: &ConversionOpts) -> Option<Singularity> {
    let circular = e < opts.eccentricity_tolerance;
    let equatorial = i < opts.inclination_tolerance_rad || PI - i < opts.inclination_tolerance_rad;

    match (circular, equatorial) {
        (true, true) => Some(Singularity::CircularEquatorial {
            eccentricity: e,
            inclination_deg: i.to_degrees(),
        }),
        (true, false) => Some(Singularity::Circular { eccentricity: e }),
        (false, true) => Some(Singularity::Equatorial {
            inclination_deg: i.to_degrees(),
        }),
        (false, false) => None,
    }
}

/// Perifocal to inertial rotation: Rz(Ω) Rx(i) Rz(ω)
fn perifocal_rotation(raan: f64, i: f64, aop: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), raan)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), i)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), aop)
}

/// Converts [KeplerianElements] to an inertial [CartesianState] at `epoch`.
///
/// Under [SingularityPolicy::Reject], near circular and near equatorial
/// elements are rejected with [Error::DegenerateOrbit]. Under
/// [SingularityPolicy::Substitute], the elements are interpreted with the
/// substitution conventions: ω = 0 and the anomaly holds the argument of
/// latitude (circular), Ω = 0 and ω holds the longitude of periapsis (equatorial).
pub fn keplerian_to_cartesian(
    elements: &KeplerianElements,
    epoch: Epoch,
    body: &CentralBody,
    opts: &ConversionOpts,
) -> Result<CartesianState, Error> {
    if let Some(singularity) = singularity(elements.e, elements.i, opts) {
        if opts.singularity == SingularityPolicy::Reject {
            return Err(Error::DegenerateOrbit(singularity));
        }
    }

    let e = elements.e;
    let nu = elements.anomaly.to_true(e, &opts.kepler)?;

    let denom = 1.0 + e * nu.cos();
    if denom <= 0.0 {
        return Err(Error::InvalidState(format!(
            "true anomaly {:.3}° beyond hyperbolic asymptote",
            nu.to_degrees()
        )));
    }

    let p = elements.semi_latus_rectum();
    let r = p / denom;
    let sqrt_mu_p = (body.mu_km3_s2 / p).sqrt();

    let r_pqw = Vector3::new(r * nu.cos(), r * nu.sin(), 0.0);
    let v_pqw = Vector3::new(-sqrt_mu_p * nu.sin(), sqrt_mu_p * (e + nu.cos()), 0.0);

    let rotation = perifocal_rotation(elements.raan, elements.i, elements.aop);

    Ok(CartesianState::new(
        epoch,
        rotation * r_pqw,
        rotation * v_pqw,
    ))
}

/// Signed angle from `from` to `to`, measured about the `normal` axis.
fn signed_angle(from: &Vector3<f64>, to: &Vector3<f64>, normal: &Vector3<f64>) -> f64 {
    normal.dot(&from.cross(to)).atan2(from.dot(to))
}

/// Converts a [CartesianState] to [KeplerianElements], expressed with
/// the true anomaly. Earth fixed states are first rotated to the inertial frame.
///
/// Fails with [Error::InvalidState] for rectilinear or parabolic
/// trajectories, and for unbound states under [OrbitRegime::Bound].
/// Near circular and near equatorial orbits either fail with
/// [Error::DegenerateOrbit] or follow the substitution conventions,
/// depending on the [SingularityPolicy].
pub fn cartesian_to_keplerian(
    state: &CartesianState,
    body: &CentralBody,
    opts: &ConversionOpts,
) -> Result<KeplerianElements, Error> {
    let state = state.to_inertial(body);
    let (r, v) = (state.position_km, state.velocity_km_s);
    let mu = body.mu_km3_s2;

    let r_mag = r.norm();
    let v_mag = v.norm();

    if !(r_mag.is_finite() && v_mag.is_finite()) || r_mag == 0.0 {
        return Err(Error::InvalidState(format!("invalid state vector {}", state)));
    }

    let h = r.cross(&v);
    let h_mag = h.norm();

    if h_mag <= RECTILINEAR_THRESHOLD * r_mag * v_mag.max(f64::EPSILON) {
        return Err(Error::InvalidState("rectilinear trajectory".to_string()));
    }

    let h_hat = h / h_mag;
    let energy = v_mag * v_mag / 2.0 - mu / r_mag;

    let e_vec = ((v_mag * v_mag - mu / r_mag) * r - r.dot(&v) * v) / mu;
    let e = e_vec.norm();

    if (e - 1.0).abs() < PARABOLIC_THRESHOLD {
        return Err(Error::InvalidState(format!("parabolic trajectory (e={})", e)));
    }

    if energy >= 0.0 && opts.regime == OrbitRegime::Bound {
        return Err(Error::InvalidState(format!(
            "unbound state (energy={:.6} km²/s², e={:.6})",
            energy, e
        )));
    }

    let a = -mu / (2.0 * energy);
    let i = (h.z / h_mag).clamp(-1.0, 1.0).acos();

    // node line
    let n = Vector3::new(-h.y, h.x, 0.0);
    let sign_hz = if h.z < 0.0 { -1.0 } else { 1.0 };

    let singular = singularity(e, i, opts);

    let (raan, aop, nu) = match singular {
        None => {
            let raan = n.y.atan2(n.x);
            let aop = signed_angle(&n, &e_vec, &h_hat);
            let nu = signed_angle(&e_vec, &r, &h_hat);
            (raan, aop, nu)
        },
        Some(singularity) if opts.singularity == SingularityPolicy::Reject => {
            return Err(Error::DegenerateOrbit(singularity));
        },
        Some(Singularity::Circular { .. }) => {
            trace!("circular orbit: argument of latitude substitution");
            let raan = n.y.atan2(n.x);
            let u = signed_angle(&n, &r, &h_hat);
            (raan, 0.0, u)
        },
        Some(Singularity::Equatorial { .. }) => {
            trace!("equatorial orbit: longitude of periapsis substitution");
            let aop = sign_hz * e_vec.y.atan2(e_vec.x);
            let nu = signed_angle(&e_vec, &r, &h_hat);
            (0.0, aop, nu)
        },
        Some(Singularity::CircularEquatorial { .. }) => {
            trace!("circular equatorial orbit: true longitude substitution");
            let lambda = sign_hz * r.y.atan2(r.x);
            (0.0, 0.0, lambda)
        },
    };

    KeplerianElements::new(a, e, i, raan, aop, Anomaly::True(wrap_two_pi(nu)))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        elements::angular_distance,
        prelude::{AnomalyKind, Epoch},
    };
    use rstest::*;

    fn epoch() -> Epoch {
        Epoch::from_gregorian_utc_at_midnight(2025, 1, 1)
    }

    fn assert_elements_close(lhs: &KeplerianElements, rhs: &KeplerianElements, opts: &ConversionOpts) {
        assert!(
            ((lhs.a - rhs.a) / rhs.a).abs() < 1.0E-8,
            "a: {} vs {}",
            lhs.a,
            rhs.a
        );
        assert!((lhs.e - rhs.e).abs() < 1.0E-8, "e: {} vs {}", lhs.e, rhs.e);
        assert!((lhs.i - rhs.i).abs() < 1.0E-8, "i: {} vs {}", lhs.i, rhs.i);
        assert!(angular_distance(lhs.raan, rhs.raan) < 1.0E-8, "Ω: {} vs {}", lhs, rhs);
        assert!(angular_distance(lhs.aop, rhs.aop) < 1.0E-7, "ω: {} vs {}", lhs, rhs);

        let lhs_nu = lhs.anomaly.to_true(lhs.e, &opts.kepler).unwrap();
        let rhs_nu = rhs.anomaly.to_true(rhs.e, &opts.kepler).unwrap();
        assert!(angular_distance(lhs_nu, rhs_nu) < 1.0E-7, "ν: {} vs {}", lhs, rhs);
    }

    #[test]
    fn leo_state_vector() {
        let body = CentralBody::earth();
        let opts = ConversionOpts::default();
        let elements =
            KeplerianElements::from_degrees(7000.0, 0.001, 45.0, 90.0, 0.0, Anomaly::true_deg(0.0))
                .unwrap();

        let state = keplerian_to_cartesian(&elements, epoch(), &body, &opts).unwrap();

        // periapsis lies on the node line, itself along +Y
        let rp = 7000.0 * (1.0 - 0.001);
        assert!((state.position_km - Vector3::new(0.0, rp, 0.0)).norm() < 1.0E-8);

        let vp = (body.mu_km3_s2 / (7000.0 * (1.0 - 0.001 * 0.001))).sqrt() * 1.001;
        let expected = vp * Vector3::new(-(PI / 4.0).cos(), 0.0, (PI / 4.0).sin());
        assert!((state.velocity_km_s - expected).norm() < 1.0E-10);

        let back = cartesian_to_keplerian(&state, &body, &opts).unwrap();
        assert_elements_close(&back, &elements, &opts);
    }

    #[rstest]
    #[case(7000.0, 0.001, 45.0, 90.0, 0.0, 10.0)]
    #[case(6800.0, 0.01, 98.0, 300.0, 45.0, 200.0)]
    #[case(26560.0, 0.7, 63.4, 10.0, 270.0, 180.0)]
    #[case(42164.0, 0.0005, 0.1, 75.0, 120.0, 359.0)]
    #[case(12000.0, 0.3, 179.9, 180.0, 90.0, 45.0)]
    fn round_trip(
        #[case] a: f64,
        #[case] e: f64,
        #[case] i: f64,
        #[case] raan: f64,
        #[case] aop: f64,
        #[case] mean: f64,
    ) {
        let body = CentralBody::earth();
        let opts = ConversionOpts::default();
        let elements =
            KeplerianElements::from_degrees(a, e, i, raan, aop, Anomaly::mean_deg(mean)).unwrap();

        let state = keplerian_to_cartesian(&elements, epoch(), &body, &opts).unwrap();
        let back = cartesian_to_keplerian(&state, &body, &opts).unwrap();
        assert_eq!(back.anomaly.kind(), AnomalyKind::True);

        let back = back.to_anomaly_kind(AnomalyKind::Mean, &opts.kepler).unwrap();
        assert_elements_close(&back, &elements, &opts);
    }

    #[test]
    fn singular_elements_rejected() {
        let body = CentralBody::earth();
        let opts = ConversionOpts::default();

        let circular =
            KeplerianElements::from_degrees(7000.0, 0.0, 45.0, 10.0, 0.0, Anomaly::true_deg(0.0))
                .unwrap();
        match keplerian_to_cartesian(&circular, epoch(), &body, &opts) {
            Err(Error::DegenerateOrbit(Singularity::Circular { .. })) => {},
            other => panic!("expected circular singularity, got {:?}", other),
        }

        let equatorial =
            KeplerianElements::from_degrees(7000.0, 0.1, 0.0, 0.0, 30.0, Anomaly::true_deg(0.0))
                .unwrap();
        match keplerian_to_cartesian(&equatorial, epoch(), &body, &opts) {
            Err(Error::DegenerateOrbit(Singularity::Equatorial { .. })) => {},
            other => panic!("expected equatorial singularity, got {:?}", other),
        }

        let both =
            KeplerianElements::from_degrees(7000.0, 0.0, 0.0, 0.0, 0.0, Anomaly::true_deg(0.0))
                .unwrap();
        match keplerian_to_cartesian(&both, epoch(), &body, &opts) {
            Err(Error::DegenerateOrbit(Singularity::CircularEquatorial { .. })) => {},
            other => panic!("expected circular equatorial singularity, got {:?}", other),
        }

        // circular state vector
        let state = CartesianState::new(
            epoch(),
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, (body.mu_km3_s2 / 7000.0).sqrt()),
        );
        assert!(matches!(
            cartesian_to_keplerian(&state, &body, &opts),
            Err(Error::DegenerateOrbit(Singularity::Circular { .. }))
        ));
    }

    #[rstest]
    #[case(0.0, 45.0, 20.0, 0.0, 130.0)]
    #[case(0.2, 0.0, 0.0, 75.0, 30.0)]
    #[case(0.2, 180.0, 0.0, 75.0, 30.0)]
    #[case(0.0, 0.0, 0.0, 0.0, 250.0)]
    #[case(0.0, 180.0, 0.0, 0.0, 250.0)]
    fn substitution_round_trip(
        #[case] e: f64,
        #[case] i: f64,
        #[case] raan: f64,
        #[case] aop: f64,
        #[case] nu: f64,
    ) {
        let body = CentralBody::earth();
        let opts = ConversionOpts::default().with_singularity(SingularityPolicy::Substitute);
        let elements =
            KeplerianElements::from_degrees(8000.0, e, i, raan, aop, Anomaly::true_deg(nu)).unwrap();

        let state = keplerian_to_cartesian(&elements, epoch(), &body, &opts).unwrap();
        let back = cartesian_to_keplerian(&state, &body, &opts).unwrap();
        assert_elements_close(&back, &elements, &opts);

        let again = keplerian_to_cartesian(&back, epoch(), &body, &opts).unwrap();
        assert!((again.position_km - state.position_km).norm() < 1.0E-7);
        assert!((again.velocity_km_s - state.velocity_km_s).norm() < 1.0E-10);
    }

    #[test]
    fn unbound_states() {
        let body = CentralBody::earth();
        let escape = (2.0 * body.mu_km3_s2 / 7000.0).sqrt();
        let state = CartesianState::new(
            epoch(),
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, 1.2 * escape * 0.8, 1.2 * escape * 0.6),
        );

        let bound = ConversionOpts::default();
        assert!(matches!(
            cartesian_to_keplerian(&state, &body, &bound),
            Err(Error::InvalidState(_))
        ));

        let any = bound.with_regime(OrbitRegime::Any);
        let elements = cartesian_to_keplerian(&state, &body, &any).unwrap();
        assert!(elements.is_hyperbolic());
        assert!(elements.a < 0.0);

        let back = keplerian_to_cartesian(&elements, epoch(), &body, &any).unwrap();
        assert!((back.position_km - state.position_km).norm() < 1.0E-6);
        assert!((back.velocity_km_s - state.velocity_km_s).norm() < 1.0E-9);

        // escape velocity exactly: parabolic
        let parabolic = CartesianState::new(
            epoch(),
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(0.0, escape, 0.0),
        );
        assert!(matches!(
            cartesian_to_keplerian(&parabolic, &body, &any),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn rectilinear_state() {
        let body = CentralBody::earth();
        let state = CartesianState::new(
            epoch(),
            Vector3::new(7000.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        );
        assert!(matches!(
            cartesian_to_keplerian(&state, &body, &ConversionOpts::default()),
            Err(Error::InvalidState(_))
        ));
    }
}
