// odmr-core/src/units.rs
//
// Rates are specified in MHz, the generator handed to the solvers is in
// s^-1, and trajectories are sampled in seconds with a nanosecond view.

use uom::si::f64::{Frequency as UomFrequency, Time as UomTime};

pub type Frequency = UomFrequency;
pub type Time = UomTime;

#[inline]
pub fn mhz(v: f64) -> Frequency {
    use uom::si::frequency::megahertz;
    Frequency::new::<megahertz>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn ns(v: f64) -> Time {
    use uom::si::time::nanosecond;
    Time::new::<nanosecond>(v)
}

/// Convert a rate in MHz to an inverse-seconds rate.
#[inline]
pub fn mhz_to_per_second(rate_mhz: f64) -> f64 {
    use uom::si::frequency::hertz;
    mhz(rate_mhz).get::<hertz>()
}

/// Seconds -> nanoseconds.
#[inline]
pub fn seconds_to_ns(t_s: f64) -> f64 {
    use uom::si::time::nanosecond;
    s(t_s).get::<nanosecond>()
}

/// Nanoseconds -> seconds.
#[inline]
pub fn ns_to_seconds(t_ns: f64) -> f64 {
    use uom::si::time::second;
    ns(t_ns).get::<second>()
}

pub mod constants {
    /// MHz -> s^-1 scale applied when building generators.
    pub const PER_SECOND_PER_MHZ: f64 = 1e6;
}
