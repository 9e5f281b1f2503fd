use thiserror::Error;

use crate::prelude::Epoch;

/// Iterative solver that failed to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    /// Elliptic or hyperbolic Kepler equation
    Kepler,
    /// Universal variable formulation of Kepler's equation
    UniversalKepler,
    /// Gauss iterative refinement
    GaussRefinement,
    /// Batch least squares over angle residuals
    DifferentialCorrection,
}

impl std::fmt::Display for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Kepler => write!(f, "kepler"),
            Self::UniversalKepler => write!(f, "universal kepler"),
            Self::GaussRefinement => write!(f, "gauss refinement"),
            Self::DifferentialCorrection => write!(f, "differential correction"),
        }
    }
}

/// Orbital element singularity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Singularity {
    /// Argument of periapsis undefined
    Circular { eccentricity: f64 },
    /// Right ascension of the ascending node undefined
    Equatorial { inclination_deg: f64 },
    /// Both angles undefined
    CircularEquatorial {
        eccentricity: f64,
        inclination_deg: f64,
    },
}

impl std::fmt::Display for Singularity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Circular { eccentricity } => {
                write!(f, "near circular orbit (e={:.3E})", eccentricity)
            },
            Self::Equatorial { inclination_deg } => {
                write!(f, "near equatorial orbit (i={:.3E}°)", inclination_deg)
            },
            Self::CircularEquatorial {
                eccentricity,
                inclination_deg,
            } => write!(
                f,
                "near circular equatorial orbit (e={:.3E}, i={:.3E}°)",
                eccentricity, inclination_deg
            ),
        }
    }
}

/// Reason a numerical integration was aborted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Divergence {
    /// Orbit decayed below the collision altitude
    Decayed { altitude_km: f64 },
    /// State vector turned NaN or infinite
    NonFinite,
    /// Error control requested a step below the minimal step
    StepUnderflow { step_s: f64 },
    /// Step budget exhausted before reaching the target epoch
    StepBudget { steps: usize },
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Decayed { altitude_km } => {
                write!(f, "decayed to {:.3} km altitude", altitude_km)
            },
            Self::NonFinite => write!(f, "non finite state"),
            Self::StepUnderflow { step_s } => write!(f, "step size underflow ({:.3E} s)", step_s),
            Self::StepBudget { steps } => write!(f, "step budget exhausted ({} steps)", steps),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Calendar field out of range, unsupported year, date inside the
    /// Gregorian reform gap, or unparsable date description.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Orbital elements with undefined angles were either
    /// requested or produced, while the singularity policy
    /// asks to reject them.
    #[error("degenerate orbit: {0}")]
    DegenerateOrbit(Singularity),

    /// State or elements that do not describe a valid orbit
    /// for the requested regime.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Iterative solver did not converge within its iteration budget.
    #[error("{solver} did not converge after {iterations} iterations (last residual: {residual:.3E})")]
    ConvergenceError {
        solver: Solver,
        iterations: usize,
        residual: f64,
    },

    /// Numerical integration had to be aborted.
    #[error("divergent integration at {epoch}: {cause}")]
    DivergentIntegration { epoch: Epoch, cause: Divergence },

    /// Perturbation configuration is out of its physical domain.
    #[error("unsupported perturbation: {0}")]
    UnsupportedPerturbation(String),

    /// Target and station share the same position:
    /// azimuth and elevation are undefined.
    #[error("degenerate geometry: target coincides with station")]
    DegenerateGeometry,

    /// Gauss polynomial exposes no physically acceptable root.
    #[error("no physical solution amongst {candidates} positive root(s)")]
    NoPhysicalSolution { candidates: usize },

    /// Several physically acceptable roots and no prior to pick one.
    #[error("ambiguous solution: {} physical roots", .0.len())]
    AmbiguousSolution(Vec<f64>),

    /// Observation geometry does not allow a numerically stable solution.
    #[error("ill conditioned geometry: {0}")]
    IllConditionedGeometry(String),

    /// Initial orbit determination requires at least 3 observations.
    #[error("not enough observations ({0}), at least 3 required")]
    NotEnoughObservations(usize),

    /// Epochs were expected in strictly increasing order.
    #[error("epochs are not strictly increasing")]
    UnorderedEpochs,

    /// Failed to parse integration scheme
    #[error("unknown integrator \"{0}\"")]
    UnknownIntegrator(String),

    /// Failed to parse orbit regime
    #[error("unknown orbit regime \"{0}\"")]
    UnknownOrbitRegime(String),

    /// Failed to parse singularity policy
    #[error("unknown singularity policy \"{0}\"")]
    UnknownSingularityPolicy(String),

    /// Epoch outside of the ephemeris time span.
    #[error("{0} is out of ephemeris time span")]
    OutOfEphemerisRange(Epoch),
}
