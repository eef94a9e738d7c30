//! odmr-model: N-level rate-equation topology.
//!
//! Provides:
//! - `RateModel`: state space, static rate table, dynamic (named) rate slots
//! - `RateParams`: runtime values for the dynamic slots
//! - `SpinSystem`: a model annotated with ground/excited manifolds, drive
//!   parameter names and symbolic state aliases
//!
//! # Example
//!
//! ```
//! use odmr_model::{RateModel, RateParams};
//!
//! let mut model = RateModel::with_labels(["Ground", "Excited", "Metastable"]).unwrap();
//! model.set_rates([((1, 0), 50.0), ((1, 2), 10.0), ((2, 0), 5.0)]).unwrap();
//! model.add_dynamic_rate("gamma", 0, 1).unwrap();
//!
//! let w = model.build_rate_matrix_mhz(&RateParams::new().with("gamma", 1.0)).unwrap();
//! assert_eq!(w.nrows(), 3);
//! assert_eq!(w[(1, 0)], 1.0);
//! ```

pub mod error;
pub mod model;
pub mod params;
pub mod system;

pub use error::{ModelError, ModelResult};
pub use model::{DynamicSlot, RateModel, RateSource, UnboundPolicy};
pub use params::{GAMMA, KMW_MINUS, KMW_PLUS, RateParams};
pub use system::{DriveNames, SpinSystem};
