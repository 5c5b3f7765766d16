use crate::correction::CorrectionMethod;
use crate::error::{Result, SignificanceError};
use crate::fisher::Alternative;
use serde::{Deserialize, Serialize};

/// Which p-values are corrected together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionFamilies {
    /// Disruption and emergence p-values form two independent families
    #[default]
    Separate,
    /// All disruption p-values followed by all emergence p-values form a
    /// single family
    Joint,
}

/// Settings of one significance run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    pub correction_method: CorrectionMethod,
    /// Random-cohort counts and underfitting counts are multiplied by this
    pub control_set_multiplier: u64,
    /// Drop underfitting counts entirely
    pub ignore_underfitting: bool,
    pub correction_families: CorrectionFamilies,
    pub alternative: Alternative,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        SignificanceConfig {
            correction_method: CorrectionMethod::BenjaminiHochberg,
            control_set_multiplier: 1,
            ignore_underfitting: false,
            correction_families: CorrectionFamilies::Separate,
            alternative: Alternative::TwoSided,
        }
    }
}

impl SignificanceConfig {
    /// Builds a config from a correction method name, failing before any
    /// computation when the name is unknown.
    pub fn with_method_name(name: &str) -> Result<Self> {
        Ok(SignificanceConfig {
            correction_method: CorrectionMethod::from_name(name)?,
            ..SignificanceConfig::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.control_set_multiplier == 0 {
            return Err(SignificanceError::invalid_parameter(
                "control_set_multiplier",
                self.control_set_multiplier,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
