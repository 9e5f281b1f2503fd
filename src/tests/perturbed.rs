use crate::{
    prelude::{
        cartesian_to_keplerian, keplerian_to_cartesian, Anomaly, Config, ConversionOpts,
        Divergence, DragParams, Error, KeplerianElements, NumericalPropagator,
        PerturbationConfig, Propagator, SrpParams, Unit,
    },
    tests::{init_logger, leo_state, reference_epoch},
};

/// Signed angular difference (deg), in ]-180, 180]
fn angle_difference_deg(to: f64, from: f64) -> f64 {
    let d = (to - from).rem_euclid(360.0);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

#[test]
fn oblateness_nodal_regression() {
    init_logger();

    let mut cfg = Config::default();
    cfg.perturbations = PerturbationConfig::none().with_oblateness(2);

    let propagator = NumericalPropagator::from_config(&cfg).unwrap();

    let initial = leo_state();
    let state = propagator
        .propagate(&initial, initial.epoch + 1.0 * Unit::Day)
        .unwrap();

    let opts = ConversionOpts::default();
    let before = cartesian_to_keplerian(&initial, &cfg.body, &opts).unwrap();
    let after = cartesian_to_keplerian(&state, &cfg.body, &opts).unwrap();

    // secular rate: -3/2 n J2 (R/p)² cos(i), about -4.5°/day
    let drift = angle_difference_deg(after.raan_deg(), before.raan_deg());
    assert!(drift < -4.0 && drift > -5.0, "nodal drift {}°/day", drift);

    // no secular effect on the semi major axis
    assert!((after.a - before.a).abs() < 30.0, "a: {} -> {}", before.a, after.a);
}

#[test]
fn leo_preset_stays_close_to_two_body() {
    init_logger();

    let cfg = Config::leo_preset();
    let propagator = NumericalPropagator::from_config(&cfg).unwrap();
    assert_eq!(propagator.force_model().perturbations().len(), 4);

    let initial = leo_state();
    let ephemeris = propagator
        .ephemeris(
            &initial,
            &[
                initial.epoch + 30.0 * Unit::Minute,
                initial.epoch + 60.0 * Unit::Minute,
                initial.epoch + 90.0 * Unit::Minute,
            ],
        )
        .unwrap();

    assert_eq!(ephemeris.len(), 3);

    for state in ephemeris.iter() {
        let radius = state.radius();
        assert!(radius > 6900.0 && radius < 7100.0, "{}", state);
    }
}

#[test]
fn atmospheric_decay() {
    init_logger();

    let mut cfg = Config::default();
    cfg.perturbations = PerturbationConfig::none().with_drag(DragParams {
        drag_coefficient: 2.2,
        area_to_mass_m2_kg: 1.0,
        ..Default::default()
    });

    let propagator = NumericalPropagator::from_config(&cfg).unwrap();

    // 200 km circular orbit
    let elements = KeplerianElements::from_degrees(
        cfg.body.equatorial_radius_km + 200.0,
        0.001,
        30.0,
        0.0,
        0.0,
        Anomaly::true_deg(0.0),
    )
    .unwrap();

    let initial =
        keplerian_to_cartesian(&elements, reference_epoch(), &cfg.body, &ConversionOpts::default())
            .unwrap();

    match propagator.propagate(&initial, initial.epoch + 2.0 * Unit::Day) {
        Err(Error::DivergentIntegration { epoch, cause }) => {
            assert!(epoch > initial.epoch);
            assert!(epoch < initial.epoch + 2.0 * Unit::Day);
            if let Divergence::Decayed { altitude_km } = cause {
                assert!(altitude_km < cfg.integrator.collision_altitude_km);
            }
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn invalid_perturbations() {
    init_logger();

    for perturbations in [
        PerturbationConfig::none().with_oblateness(1),
        PerturbationConfig::none().with_third_body(false, false),
        PerturbationConfig::none().with_drag(DragParams {
            drag_coefficient: -1.0,
            ..Default::default()
        }),
        PerturbationConfig::none().with_srp(SrpParams {
            reflectivity: 1.5,
            ..Default::default()
        }),
    ] {
        let mut cfg = Config::default();
        cfg.perturbations = perturbations;

        match NumericalPropagator::from_config(&cfg) {
            Err(Error::UnsupportedPerturbation(_)) => {},
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn geo_preset_keeps_geostationary_radius() {
    init_logger();

    let cfg = Config::geo_preset();
    let propagator = NumericalPropagator::from_config(&cfg).unwrap();

    let elements =
        KeplerianElements::from_degrees(42164.0, 0.0002, 0.05, 0.0, 0.0, Anomaly::true_deg(0.0))
            .unwrap();

    let initial =
        keplerian_to_cartesian(&elements, reference_epoch(), &cfg.body, &ConversionOpts::default())
            .unwrap();

    let state = propagator
        .propagate(&initial, initial.epoch + 1.0 * Unit::Day)
        .unwrap();

    assert!((state.radius() - 42164.0).abs() < 20.0, "{}", state);
}
