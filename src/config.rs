//! Tolerances and configuration loading

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::extraction::plausibility::DEFAULT_SIMILARITY_THRESHOLD;
use crate::extraction::profile::LayoutProfile;
use crate::types::*;
use crate::utils::validation::validate_profile;

/// Numeric tolerances used across the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Largest balance deviation still treated as equal
    pub balance_epsilon: BigDecimal,
    /// Similarity ratio above which a correction is believable
    pub similarity_threshold: f64,
    /// Minimum length of a reference number shared by cancelling labels
    pub reference_min_digits: usize,
    /// Decimal places kept when pairing journal reversals
    pub cancellation_scale: i64,
    /// Differences at or below this are left out of the rectified balance
    pub rectify_threshold: BigDecimal,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            balance_epsilon: BigDecimal::from(1),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            reference_min_digits: 3,
            cancellation_scale: 4,
            rectify_threshold: BigDecimal::new(1.into(), 3),
        }
    }
}

impl ReconcileSettings {
    /// Check that tolerances are usable
    pub fn validate(&self) -> ReconcileResult<()> {
        let zero = BigDecimal::from(0);
        if self.balance_epsilon < zero || self.rectify_threshold < zero {
            return Err(ReconcileError::Config(
                "Tolerances cannot be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ReconcileError::Config(format!(
                "Similarity threshold must lie in [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.cancellation_scale < 0 {
            return Err(ReconcileError::Config(
                "Cancellation scale cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// A built-in layout by name, or a full custom profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutSelection {
    Named(String),
    Custom(LayoutProfile),
}

/// Run configuration: which statement layout to read and the tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub layout: LayoutSelection,
    #[serde(default)]
    pub settings: ReconcileSettings,
}

impl ReconcileConfig {
    /// Configuration using a built-in layout and default tolerances
    pub fn for_layout(name: &str) -> Self {
        Self {
            layout: LayoutSelection::Named(name.to_string()),
            settings: ReconcileSettings::default(),
        }
    }

    /// Parse a TOML document
    ///
    /// ```toml
    /// layout = "orabank"
    ///
    /// [settings]
    /// balance_epsilon = 1
    /// similarity_threshold = 0.85
    /// ```
    pub fn from_toml_str(text: &str) -> ReconcileResult<Self> {
        let config: ReconcileConfig = toml::from_str(text)?;
        config.settings.validate()?;
        Ok(config)
    }

    /// Resolve and validate the selected layout profile
    pub fn profile(&self) -> ReconcileResult<LayoutProfile> {
        match &self.layout {
            LayoutSelection::Named(name) => LayoutProfile::named(name),
            LayoutSelection::Custom(profile) => {
                validate_profile(profile)?;
                Ok(profile.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ReconcileSettings::default();
        assert_eq!(settings.balance_epsilon, BigDecimal::from(1));
        assert_eq!(settings.rectify_threshold, "0.001".parse::<BigDecimal>().unwrap());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_named_layout_from_toml() {
        let config = ReconcileConfig::from_toml_str(
            r#"
            layout = "orabank"

            [settings]
            similarity_threshold = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.similarity_threshold, 0.9);
        assert_eq!(config.settings.reference_min_digits, 3);
        assert_eq!(config.profile().unwrap().name, "orabank");
    }

    #[test]
    fn test_unknown_layout_is_fatal() {
        let config = ReconcileConfig::for_layout("unknown-bank");
        assert!(matches!(
            config.profile(),
            Err(ReconcileError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let result = ReconcileConfig::from_toml_str(
            r#"
            layout = "orabank"

            [settings]
            similarity_threshold = 1.5
            "#,
        );
        assert!(matches!(result, Err(ReconcileError::Config(_))));

        let result = ReconcileConfig::from_toml_str("layout = 3");
        assert!(matches!(result, Err(ReconcileError::ConfigParse(_))));
    }
}
