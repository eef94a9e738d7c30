//! Solver tolerances.

/// How output populations are checked against the initial vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationPolicy {
    /// Largest tolerated negative component, relative to `|P0|_1`
    pub negativity_tol: f64,
    /// Largest tolerated drift of `sum(P)`, relative to `max(1, |sum(P0)|)`
    pub sum_rel_tol: f64,
    /// Clamp tolerated negative components to zero
    pub clamp_negative: bool,
}

impl Default for PopulationPolicy {
    fn default() -> Self {
        Self {
            negativity_tol: 1e-6,
            sum_rel_tol: 1e-6,
            clamp_negative: true,
        }
    }
}

/// Adaptive Dormand-Prince configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdeConfig {
    /// Relative tolerance per component
    pub rtol: f64,
    /// Absolute tolerance per component
    pub atol: f64,
    /// First trial step (s); estimated from the initial slope when `None`
    pub h_init: Option<f64>,
    /// Smallest step before giving up (s)
    pub h_min: f64,
    /// Step budget, accepted and rejected combined
    pub max_steps: usize,
    /// Safety factor on the step-size controller
    pub safety: f64,
}

impl Default for OdeConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-10,
            atol: 1e-14,
            h_init: None,
            h_min: 1e-30,
            max_steps: 1_000_000,
            safety: 0.9,
        }
    }
}

/// Solver configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Singular values at or below `null_space_tol * sigma_max` count as zero
    pub null_space_tol: f64,
    /// Steady-state residual bound, relative to the largest generator entry
    pub residual_tol: f64,
    pub population: PopulationPolicy,
    pub ode: OdeConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            null_space_tol: 1e-12,
            residual_tol: 1e-8,
            population: PopulationPolicy::default(),
            ode: OdeConfig::default(),
        }
    }
}
