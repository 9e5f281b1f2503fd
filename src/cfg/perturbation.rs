#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    prelude::{Atmosphere, Error},
    propagator::Perturbation,
};

fn default_degree() -> u8 {
    2
}

fn default_drag_coefficient() -> f64 {
    2.2
}

fn default_area_to_mass() -> f64 {
    0.02
}

#[cfg(feature = "serde")]
fn default_true() -> bool {
    true
}

/// Zonal harmonics of the central body
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OblatenessParams {
    /// Highest zonal degree: 2 (J2) up to 4 (J2, J3 and J4)
    #[cfg_attr(feature = "serde", serde(default = "default_degree"))]
    pub max_degree: u8,
}

impl Default for OblatenessParams {
    fn default() -> Self {
        Self {
            max_degree: default_degree(),
        }
    }
}

/// Atmospheric drag, cannonball model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DragParams {
    /// Drag coefficient Cd
    #[cfg_attr(feature = "serde", serde(default = "default_drag_coefficient"))]
    pub drag_coefficient: f64,
    /// Cross section area to mass ratio (m².kg⁻¹)
    #[cfg_attr(feature = "serde", serde(default = "default_area_to_mass"))]
    pub area_to_mass_m2_kg: f64,
    /// Density model
    #[cfg_attr(feature = "serde", serde(default))]
    pub atmosphere: Atmosphere,
}

impl Default for DragParams {
    fn default() -> Self {
        Self {
            drag_coefficient: default_drag_coefficient(),
            area_to_mass_m2_kg: default_area_to_mass(),
            atmosphere: Atmosphere::default(),
        }
    }
}

/// Third body point mass attraction
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThirdBodyParams {
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub sun: bool,
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub moon: bool,
}

impl Default for ThirdBodyParams {
    fn default() -> Self {
        Self {
            sun: true,
            moon: true,
        }
    }
}

/// Solar radiation pressure, cannonball model
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SrpParams {
    /// Surface reflectivity ε in [0, 1]. Radiation pressure
    /// coefficient is Cr = 1 + ε.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reflectivity: f64,
    /// Exposed area to mass ratio (m².kg⁻¹)
    #[cfg_attr(feature = "serde", serde(default = "default_area_to_mass"))]
    pub area_to_mass_m2_kg: f64,
    /// Cylindrical Earth shadow
    #[cfg_attr(feature = "serde", serde(default = "default_true"))]
    pub shadow: bool,
}

impl Default for SrpParams {
    fn default() -> Self {
        Self {
            reflectivity: 0.0,
            area_to_mass_m2_kg: default_area_to_mass(),
            shadow: true,
        }
    }
}

impl SrpParams {
    /// Radiation pressure coefficient
    pub fn cr(&self) -> f64 {
        1.0 + self.reflectivity
    }
}

/// Perturbations applied on top of the central body attraction.
/// Each block is independently enabled: `None` means disabled.
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerturbationConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub oblateness: Option<OblatenessParams>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub drag: Option<DragParams>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub third_body: Option<ThirdBodyParams>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub srp: Option<SrpParams>,
}

impl PerturbationConfig {
    /// Pure central body attraction
    pub fn none() -> Self {
        Self::default()
    }

    /// All perturbations with their default parameters
    pub fn all() -> Self {
        Self {
            oblateness: Some(OblatenessParams::default()),
            drag: Some(DragParams::default()),
            third_body: Some(ThirdBodyParams::default()),
            srp: Some(SrpParams::default()),
        }
    }

    /// Copies and returns [PerturbationConfig] with zonal harmonics up to `max_degree`
    pub fn with_oblateness(&self, max_degree: u8) -> Self {
        let mut s = self.clone();
        s.oblateness = Some(OblatenessParams { max_degree });
        s
    }

    /// Copies and returns [PerturbationConfig] with atmospheric drag
    pub fn with_drag(&self, drag: DragParams) -> Self {
        let mut s = self.clone();
        s.drag = Some(drag);
        s
    }

    /// Copies and returns [PerturbationConfig] with Sun and/or Moon attraction
    pub fn with_third_body(&self, sun: bool, moon: bool) -> Self {
        let mut s = self.clone();
        s.third_body = Some(ThirdBodyParams { sun, moon });
        s
    }

    /// Copies and returns [PerturbationConfig] with solar radiation pressure
    pub fn with_srp(&self, srp: SrpParams) -> Self {
        let mut s = self.clone();
        s.srp = Some(srp);
        s
    }

    /// Returns true when no perturbation is enabled
    pub fn is_two_body(&self) -> bool {
        self.oblateness.is_none()
            && self.drag.is_none()
            && self.third_body.is_none()
            && self.srp.is_none()
    }

    /// Verifies all enabled blocks lie within their physical domain.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(oblateness) = &self.oblateness {
            if !(2..=4).contains(&oblateness.max_degree) {
                return Err(Error::UnsupportedPerturbation(format!(
                    "zonal degree {} (supported: 2 to 4)",
                    oblateness.max_degree
                )));
            }
        }

        if let Some(drag) = &self.drag {
            if !(drag.drag_coefficient > 0.0) {
                return Err(Error::UnsupportedPerturbation(format!(
                    "drag coefficient {}",
                    drag.drag_coefficient
                )));
            }
            if !(drag.area_to_mass_m2_kg > 0.0) {
                return Err(Error::UnsupportedPerturbation(format!(
                    "drag area to mass ratio {}",
                    drag.area_to_mass_m2_kg
                )));
            }
            drag.atmosphere.validate()?;
        }

        if let Some(third_body) = &self.third_body {
            if !third_body.sun && !third_body.moon {
                return Err(Error::UnsupportedPerturbation(
                    "third body enabled without any body".to_string(),
                ));
            }
        }

        if let Some(srp) = &self.srp {
            if !(0.0..=1.0).contains(&srp.reflectivity) {
                return Err(Error::UnsupportedPerturbation(format!(
                    "reflectivity {}",
                    srp.reflectivity
                )));
            }
            if !(srp.area_to_mass_m2_kg > 0.0) {
                return Err(Error::UnsupportedPerturbation(format!(
                    "radiation area to mass ratio {}",
                    srp.area_to_mass_m2_kg
                )));
            }
        }

        Ok(())
    }

    /// Validates and lists the enabled [Perturbation]s.
    pub fn perturbations(&self) -> Result<Vec<Perturbation>, Error> {
        self.validate()?;

        let mut perturbations = Vec::with_capacity(4);

        if let Some(oblateness) = &self.oblateness {
            perturbations.push(Perturbation::Oblateness(*oblateness));
        }
        if let Some(drag) = &self.drag {
            perturbations.push(Perturbation::Drag(drag.clone()));
        }
        if let Some(third_body) = &self.third_body {
            perturbations.push(Perturbation::ThirdBody(*third_body));
        }
        if let Some(srp) = &self.srp {
            perturbations.push(Perturbation::SolarRadiationPressure(*srp));
        }

        Ok(perturbations)
    }
}
