//! Resonance profiles for spectrum sweeps.

/// Peak-normalised resonance lineshape; `hwhm` is the half width at half
/// maximum, in the same unit as the frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lineshape {
    #[default]
    Lorentzian,
    Gaussian,
}

impl Lineshape {
    pub fn value(self, x: f64, x0: f64, hwhm: f64) -> f64 {
        let dx = x - x0;
        match self {
            Lineshape::Lorentzian => hwhm * hwhm / (dx * dx + hwhm * hwhm),
            Lineshape::Gaussian => (-std::f64::consts::LN_2 * dx * dx / (hwhm * hwhm)).exp(),
        }
    }
}
