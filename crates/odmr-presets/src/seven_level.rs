//! Seven-level rate model of an NV-like spin-1 defect.
//!
//! | index | state   |
//! |-------|---------|
//! | 0     | GS\|0>  |
//! | 1     | GS\|->  |
//! | 2     | GS\|+>  |
//! | 3     | ES\|0>  |
//! | 4     | ES\|->  |
//! | 5     | ES\|+>  |
//! | 6     | singlet |
//!
//! Fixed rates (MHz) are radiative decay ES -> GS (`k41`, `k52`, `k63`),
//! upper intersystem crossing ES -> SS (`k47`, `k57`, `k67`) and lower
//! intersystem crossing SS -> GS (`k71`, `k72`, `k73`). Optical pumping
//! (`gamma`) and the two microwave transitions (`kmw_minus`, `kmw_plus`)
//! are dynamic.

use odmr_model::{GAMMA, KMW_MINUS, KMW_PLUS, RateModel, SpinSystem};

use crate::error::{PresetError, PresetResult};

pub const GS_0: usize = 0;
pub const GS_MINUS: usize = 1;
pub const GS_PLUS: usize = 2;
pub const ES_0: usize = 3;
pub const ES_MINUS: usize = 4;
pub const ES_PLUS: usize = 5;
pub const SINGLET: usize = 6;

pub const N_STATES: usize = 7;

pub const LABELS_SPLIT: [&str; N_STATES] =
    ["GS|0>", "GS|->", "GS|+>", "ES|0>", "ES|->", "ES|+>", "SS"];
pub const LABELS_DEGENERATE: [&str; N_STATES] =
    ["GS|0>", "GS|-1>", "GS|+1>", "ES|0>", "ES|-1>", "ES|+1>", "SS"];

/// Which label set to attach to the states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelStyle {
    /// `|+>` / `|->`: spin sublevels split by a field or strain.
    #[default]
    Split,
    /// `|+1>` / `|-1>`: zero-field degenerate sublevels.
    Degenerate,
}

impl LabelStyle {
    pub fn labels(self) -> [&'static str; N_STATES] {
        match self {
            LabelStyle::Split => LABELS_SPLIT,
            LabelStyle::Degenerate => LABELS_DEGENERATE,
        }
    }
}

/// Fixed transition rates of the seven-level model, MHz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SevenLevelRates {
    pub k41: f64,
    pub k52: f64,
    pub k63: f64,
    pub k47: f64,
    pub k57: f64,
    pub k67: f64,
    pub k71: f64,
    pub k72: f64,
    pub k73: f64,
}

impl Default for SevenLevelRates {
    fn default() -> Self {
        Self::with_radiative(62.5)
    }
}

impl SevenLevelRates {
    /// Default ISC rates with one radiative rate shared by all three spins.
    pub fn with_radiative(k41: f64) -> Self {
        Self {
            k41,
            k52: k41,
            k63: k41,
            k47: 4.4,
            k57: 0.005,
            k67: 44.1,
            k71: 2336.0,
            k72: 3.1,
            k73: 0.001,
        }
    }

    /// Constants in display order with their names.
    pub fn named(&self) -> [(&'static str, f64); 9] {
        [
            ("k41", self.k41),
            ("k52", self.k52),
            ("k63", self.k63),
            ("k47", self.k47),
            ("k57", self.k57),
            ("k67", self.k67),
            ("k71", self.k71),
            ("k72", self.k72),
            ("k73", self.k73),
        ]
    }

    pub fn get(&self, name: &str) -> PresetResult<f64> {
        self.named()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|&(_, v)| v)
            .ok_or_else(|| PresetError::UnknownRate {
                name: name.to_string(),
            })
    }

    /// Override one constant by name (case-insensitive).
    pub fn set(&mut self, name: &str, value: f64) -> PresetResult<()> {
        let slot = match name.to_ascii_lowercase().as_str() {
            "k41" => &mut self.k41,
            "k52" => &mut self.k52,
            "k63" => &mut self.k63,
            "k47" => &mut self.k47,
            "k57" => &mut self.k57,
            "k67" => &mut self.k67,
            "k71" => &mut self.k71,
            "k72" => &mut self.k72,
            "k73" => &mut self.k73,
            _ => {
                return Err(PresetError::UnknownRate {
                    name: name.to_string(),
                });
            }
        };
        *slot = value;
        Ok(())
    }

    /// Three-line summary grouped by process.
    pub fn rate_summary(&self) -> String {
        format!(
            "Radiative rates: k41={}, k52={}, k63={} MHz\n\
             Upper ISC rates: k47={}, k57={}, k67={} MHz\n\
             Lower ISC rates: k71={}, k72={}, k73={} MHz",
            self.k41, self.k52, self.k63, self.k47, self.k57, self.k67, self.k71, self.k72, self.k73
        )
    }

    /// The bare rate model: fixed rates plus the three dynamic drives.
    pub fn rate_model(&self, style: LabelStyle) -> PresetResult<RateModel> {
        let mut model = RateModel::with_labels(style.labels())?;
        model.set_rates([
            ((ES_0, GS_0), self.k41),
            ((ES_MINUS, GS_MINUS), self.k52),
            ((ES_PLUS, GS_PLUS), self.k63),
            ((ES_0, SINGLET), self.k47),
            ((ES_MINUS, SINGLET), self.k57),
            ((ES_PLUS, SINGLET), self.k67),
            ((SINGLET, GS_0), self.k71),
            ((SINGLET, GS_MINUS), self.k72),
            ((SINGLET, GS_PLUS), self.k73),
        ])?;

        for (gs, es) in [(GS_0, ES_0), (GS_MINUS, ES_MINUS), (GS_PLUS, ES_PLUS)] {
            model.add_dynamic_rate(GAMMA, gs, es)?;
        }
        model.add_dynamic_rate(KMW_MINUS, GS_0, GS_MINUS)?;
        model.add_dynamic_rate(KMW_MINUS, GS_MINUS, GS_0)?;
        model.add_dynamic_rate(KMW_PLUS, GS_0, GS_PLUS)?;
        model.add_dynamic_rate(KMW_PLUS, GS_PLUS, GS_0)?;
        Ok(model)
    }
}

/// Seven-level model annotated for the simulation protocols.
pub fn seven_level_system(rates: &SevenLevelRates, style: LabelStyle) -> PresetResult<SpinSystem> {
    let model = rates.rate_model(style)?;
    let system = SpinSystem::new(model)
        .with_ground_states([GS_0, GS_MINUS, GS_PLUS])?
        .with_excited_states([ES_0, ES_MINUS, ES_PLUS])?
        .with_radiative_rates(vec![rates.k41, rates.k52, rates.k63])?
        .with_readout_state("gs0", GS_0)?
        .with_readout_state("gs_minus", GS_MINUS)?
        .with_readout_state("gs_plus", GS_PLUS)?
        .with_alias("gs_0", GS_0)?
        .with_alias("100", GS_0)?
        .with_alias("gs-", GS_MINUS)?
        .with_alias("010", GS_MINUS)?
        .with_alias("gs+", GS_PLUS)?
        .with_alias("001", GS_PLUS)?
        .with_alias("ss", SINGLET)?
        .with_alias("singlet", SINGLET)?;
    Ok(system)
}
