//! odmr-core: shared foundation for the ODMR rate-equation workspace.
//!
//! Contains:
//! - units (uom-backed conversions between MHz rates, seconds and nanoseconds)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
