mod cfg;
mod perturbed;

use log::LevelFilter;
use std::sync::Once;

use crate::prelude::{
    keplerian_to_cartesian, Anomaly, CartesianState, CentralBody, ConversionOpts, Epoch,
    KeplerianElements,
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// 2025-01-01T00:00:00 UTC
pub fn reference_epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2025, 1, 1)
}

/// Slightly eccentric low Earth orbit, inclined at 51.6°
pub fn leo_elements() -> KeplerianElements {
    KeplerianElements::from_degrees(7000.0, 0.01, 51.6, 30.0, 60.0, Anomaly::true_deg(10.0))
        .unwrap()
}

/// Inertial state of [leo_elements] at [reference_epoch]
pub fn leo_state() -> CartesianState {
    keplerian_to_cartesian(
        &leo_elements(),
        reference_epoch(),
        &CentralBody::earth(),
        &ConversionOpts::default(),
    )
    .unwrap()
}

/// Position (km) and velocity (km/s) deviations between two states
pub fn deviations(lhs: &CartesianState, rhs: &CartesianState) -> (f64, f64) {
    (
        (lhs.position_km - rhs.position_km).norm(),
        (lhs.velocity_km_s - rhs.velocity_km_s).norm(),
    )
}
