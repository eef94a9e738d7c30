//! odmr-solver: time evolution and steady state of rate-equation generators.
//!
//! Three routes are offered and are expected to agree to solver tolerance:
//! - matrix exponential (`solve_expm`), exact for constant generators
//! - adaptive Dormand-Prince 5(4) integration (`solve_ode`, `solve_ode_system`),
//!   which also handles time-dependent generators
//! - SVD null space (`steady_state`)

pub mod config;
pub mod error;
pub mod expm;
pub mod ode;
pub mod population;
pub mod solver;
pub mod steady;
pub mod trajectory;

pub use config::{OdeConfig, PopulationPolicy, SolverConfig};
pub use error::{SolverError, SolverResult};
pub use ode::{RateSystem, TimeDependentGenerator};
pub use solver::RateSolver;
pub use trajectory::{Trajectory, photon_emission};
