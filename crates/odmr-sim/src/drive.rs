//! Optical and microwave drive values.

use odmr_model::{DriveNames, RateParams};

/// Drive strengths in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Drive {
    /// Optical excitation rate (GS -> ES)
    pub gamma: f64,
    /// Microwave rate on |0> <-> |->
    pub kmw_minus: f64,
    /// Microwave rate on |0> <-> |+>
    pub kmw_plus: f64,
}

impl Drive {
    pub fn new(gamma: f64, kmw_minus: f64, kmw_plus: f64) -> Self {
        Self {
            gamma,
            kmw_minus,
            kmw_plus,
        }
    }

    /// Laser only.
    pub fn optical(gamma: f64) -> Self {
        Self::new(gamma, 0.0, 0.0)
    }

    pub fn without_microwave(self) -> Self {
        Self::optical(self.gamma)
    }

    /// Bind the drive under the system's parameter names on top of `extra`.
    /// Drive values win over an `extra` binding of the same name.
    pub fn params(&self, names: &DriveNames, extra: &RateParams) -> RateParams {
        let mut params = extra.clone();
        params.set(names.gamma.as_str(), self.gamma);
        params.set(names.kmw_minus.as_str(), self.kmw_minus);
        params.set(names.kmw_plus.as_str(), self.kmw_plus);
        params
    }
}
