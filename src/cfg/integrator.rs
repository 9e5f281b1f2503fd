use crate::prelude::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numerical integration scheme
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntegratorKind {
    /// Classic 4th order Runge-Kutta, fixed step.
    /// No error control: accuracy solely depends on the step size.
    Rk4,
    /// Dormand-Prince 5(4) embedded pair, adaptive step
    /// driven by absolute and relative tolerances.
    #[default]
    DormandPrince45,
}

impl std::fmt::Display for IntegratorKind {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Rk4 => write!(fmt, "RK4"),
            Self::DormandPrince45 => write!(fmt, "DOPRI45"),
        }
    }
}

impl std::str::FromStr for IntegratorKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rk4" => Ok(Self::Rk4),
            "dopri45" | "dp45" | "dormand-prince" => Ok(Self::DormandPrince45),
            _ => Err(Error::UnknownIntegrator(s.to_string())),
        }
    }
}

fn default_initial_step() -> f64 {
    60.0
}

fn default_min_step() -> f64 {
    1.0E-3
}

fn default_max_step() -> f64 {
    300.0
}

fn default_abs_tol() -> f64 {
    1.0E-9
}

fn default_rel_tol() -> f64 {
    1.0E-12
}

fn default_safety() -> f64 {
    0.9
}

fn default_max_steps() -> usize {
    1_000_000
}

fn default_collision_altitude() -> f64 {
    100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntegratorOpts {
    /// Integration scheme
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: IntegratorKind,
    /// First trial step (s). This is the constant step of [IntegratorKind::Rk4].
    #[cfg_attr(feature = "serde", serde(default = "default_initial_step"))]
    pub initial_step_s: f64,
    /// Minimal step (s). Error control requesting smaller steps
    /// aborts the integration.
    #[cfg_attr(feature = "serde", serde(default = "default_min_step"))]
    pub min_step_s: f64,
    /// Maximal step (s)
    #[cfg_attr(feature = "serde", serde(default = "default_max_step"))]
    pub max_step_s: f64,
    /// Absolute tolerance (km, km/s)
    #[cfg_attr(feature = "serde", serde(default = "default_abs_tol"))]
    pub abs_tol: f64,
    /// Relative tolerance
    #[cfg_attr(feature = "serde", serde(default = "default_rel_tol"))]
    pub rel_tol: f64,
    /// Safety factor applied to the optimal step
    #[cfg_attr(feature = "serde", serde(default = "default_safety"))]
    pub safety: f64,
    /// Maximal number of steps (accepted and rejected) per propagation leg
    #[cfg_attr(feature = "serde", serde(default = "default_max_steps"))]
    pub max_steps: usize,
    /// Altitude (km) below which the orbit is considered decayed
    #[cfg_attr(feature = "serde", serde(default = "default_collision_altitude"))]
    pub collision_altitude_km: f64,
}

impl Default for IntegratorOpts {
    fn default() -> Self {
        Self {
            kind: IntegratorKind::default(),
            initial_step_s: default_initial_step(),
            min_step_s: default_min_step(),
            max_step_s: default_max_step(),
            abs_tol: default_abs_tol(),
            rel_tol: default_rel_tol(),
            safety: default_safety(),
            max_steps: default_max_steps(),
            collision_altitude_km: default_collision_altitude(),
        }
    }
}

impl IntegratorOpts {
    /// Fixed step RK4 integration
    pub fn rk4(step_s: f64) -> Self {
        let mut s = Self::default();
        s.kind = IntegratorKind::Rk4;
        s.initial_step_s = step_s;
        s
    }

    /// Copies and returns [IntegratorOpts] with updated tolerances
    pub fn with_tolerances(&self, abs_tol: f64, rel_tol: f64) -> Self {
        let mut s = *self;
        s.abs_tol = abs_tol;
        s.rel_tol = rel_tol;
        s
    }

    /// Copies and returns [IntegratorOpts] with updated step boundaries
    pub fn with_step_limits(&self, min_step_s: f64, max_step_s: f64) -> Self {
        let mut s = *self;
        s.min_step_s = min_step_s;
        s.max_step_s = max_step_s;
        s
    }
}
