use std::str::FromStr;

use crate::prelude::{
    Config, Error, IntegratorKind, IntegratorOpts, IodOpts, OrbitRegime, PerturbationConfig,
    SingularityPolicy,
};

#[test]
fn presets() {
    let two_body = Config::two_body_preset();
    assert!(two_body.perturbations.is_two_body());
    assert_eq!(two_body.iod, IodOpts::default());
    assert!(!two_body.iod.light_time);

    let leo = Config::leo_preset();
    assert_eq!(leo.perturbations, PerturbationConfig::all());
    assert_eq!(leo.perturbations.perturbations().unwrap().len(), 4);

    let geo = Config::geo_preset();
    assert!(geo.perturbations.drag.is_none());
    assert_eq!(geo.perturbations.oblateness.map(|o| o.max_degree), Some(4));
    assert!(geo.integrator.max_step_s > IntegratorOpts::default().max_step_s);
}

#[test]
fn parsing() {
    assert_eq!(IntegratorKind::from_str("RK4").unwrap(), IntegratorKind::Rk4);
    assert_eq!(
        IntegratorKind::from_str(" dopri45 ").unwrap(),
        IntegratorKind::DormandPrince45
    );
    assert_eq!(
        IntegratorKind::from_str("euler"),
        Err(Error::UnknownIntegrator("euler".to_string()))
    );

    for policy in [SingularityPolicy::Reject, SingularityPolicy::Substitute] {
        assert_eq!(
            SingularityPolicy::from_str(&policy.to_string()).unwrap(),
            policy
        );
    }

    assert_eq!(OrbitRegime::from_str("Any").unwrap(), OrbitRegime::Any);
    assert_eq!(OrbitRegime::from_str("elliptic").unwrap(), OrbitRegime::Bound);
    assert_eq!(OrbitRegime::from_str(" Bound ").unwrap(), OrbitRegime::Bound);
    assert_eq!(
        OrbitRegime::from_str("parabolic"),
        Err(Error::UnknownOrbitRegime("parabolic".to_string()))
    );
    assert_eq!(
        SingularityPolicy::from_str("ignore"),
        Err(Error::UnknownSingularityPolicy("ignore".to_string()))
    );
}

#[test]
#[cfg(feature = "serde")]
fn serdes() {
    let cfg = Config::leo_preset();
    let content = serde_json::to_string_pretty(&cfg).unwrap();
    let parsed: Config = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed, cfg);

    // omitted fields take their default value
    let parsed: Config = serde_json::from_str(
        r#"{
            "iod": {
                "light_time": true,
                "prior_radius_km": 7000.0
            },
            "perturbations": {
                "oblateness": {
                    "max_degree": 3
                }
            }
        }"#,
    )
    .unwrap();

    assert!(parsed.iod.light_time);
    assert_eq!(parsed.iod.prior_radius_km, Some(7000.0));
    assert_eq!(parsed.iod.max_iterations, IodOpts::default().max_iterations);
    assert_eq!(parsed.integrator, IntegratorOpts::default());
    assert_eq!(
        parsed.perturbations,
        PerturbationConfig::none().with_oblateness(3)
    );

    // flags default to enabled
    let parsed: PerturbationConfig = serde_json::from_str(
        r#"{
            "third_body": { "moon": false },
            "srp": { "reflectivity": 0.3 }
        }"#,
    )
    .unwrap();

    let third_body = parsed.third_body.unwrap();
    assert!(third_body.sun);
    assert!(!third_body.moon);

    let srp = parsed.srp.unwrap();
    assert!(srp.shadow);
    assert_eq!(srp.reflectivity, 0.3);
}
