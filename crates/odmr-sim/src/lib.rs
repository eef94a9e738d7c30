//! odmr-sim: optical and microwave protocols on top of the rate solver.
//!
//! Each protocol follows the same shape: bind drive values, build the
//! generator, propagate (or take the steady state), reduce to an observable.
//!
//! - [`InitializationSimulation`]: spin polarisation buildup under pumping
//! - [`ReadoutSimulation`]: fluorescence transient from a chosen ground state
//! - [`OdmrSimulation`]: contrast, gamma sweeps and spectra

pub mod drive;
pub mod error;
pub mod grid;
pub mod initial;
pub mod initialization;
pub mod lineshape;
pub mod odmr;
pub mod propagate;
pub mod readout;

pub use drive::Drive;
pub use error::{SimError, SimResult};
pub use grid::{LOG_TIME_FLOOR_S, Spacing, TimeGrid};
pub use initial::InitialState;
pub use initialization::{InitializationOptions, InitializationResult, InitializationSimulation};
pub use lineshape::Lineshape;
pub use odmr::{
    ContrastMethod, DEFAULT_INTEGRATION_POINTS, FluorescenceProxy, GammaSweep, OdmrSimulation,
    Spectrum, SpectrumConfig,
};
pub use propagate::Propagator;
pub use readout::{ReadoutOptions, ReadoutResult, ReadoutSimulation};
