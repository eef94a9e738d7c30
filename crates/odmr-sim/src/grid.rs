//! Time grids for sampled protocols.

use odmr_core::{linspace, logspace};

use crate::error::{SimError, SimResult};

/// Smallest start time for a logarithmic grid (s); log(0) is undefined.
pub const LOG_TIME_FLOOR_S: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Spacing {
    #[default]
    Linear,
    Log,
}

/// `n_points` sample times on `[t_min, t_max]` (s), endpoints included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    pub t_min: f64,
    pub t_max: f64,
    pub n_points: usize,
    pub spacing: Spacing,
}

impl TimeGrid {
    pub fn linear(t_min: f64, t_max: f64, n_points: usize) -> Self {
        Self {
            t_min,
            t_max,
            n_points,
            spacing: Spacing::Linear,
        }
    }

    pub fn log(t_min: f64, t_max: f64, n_points: usize) -> Self {
        Self {
            t_min,
            t_max,
            n_points,
            spacing: Spacing::Log,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if !self.t_min.is_finite() || !self.t_max.is_finite() {
            return Err(SimError::InvalidArg {
                what: format!("time grid bounds must be finite, got [{}, {}]", self.t_min, self.t_max),
            });
        }
        if self.t_min < 0.0 || self.t_max < self.t_min {
            return Err(SimError::InvalidArg {
                what: format!(
                    "time grid needs 0 <= t_min <= t_max, got [{}, {}]",
                    self.t_min, self.t_max
                ),
            });
        }
        if self.n_points == 0 || (self.n_points == 1 && self.t_min != self.t_max) {
            return Err(SimError::InvalidArg {
                what: format!(
                    "time grid over a non-empty interval needs at least 2 points, got {}",
                    self.n_points
                ),
            });
        }
        if self.spacing == Spacing::Log && self.t_min <= 0.0 {
            return Err(SimError::InvalidArg {
                what: format!(
                    "logarithmic time grid needs t_min > 0 (e.g. {LOG_TIME_FLOOR_S:e} s), got {}",
                    self.t_min
                ),
            });
        }
        Ok(())
    }

    pub fn points(&self) -> SimResult<Vec<f64>> {
        self.validate()?;
        match self.spacing {
            Spacing::Linear => Ok(linspace(self.t_min, self.t_max, self.n_points)),
            Spacing::Log => Ok(logspace(self.t_min, self.t_max, self.n_points)?),
        }
    }
}
