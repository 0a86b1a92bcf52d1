use serde::Deserialize;
use thiserror::Error;

/// Default number of bins per half-axis.
pub const DEFAULT_UNITS: usize = 30;
/// Default half side length of the simulation cube.
pub const DEFAULT_LENGTH: f64 = 15.0;
/// Default pairwise reach; zero disables pairwise factors.
pub const DEFAULT_PAIRWISE_MAX: f64 = 0.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `name` is the key as written in a TOML configuration.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Failed to parse collection configuration: {source}")]
    Toml {
        #[from]
        source: toml::de::Error,
    },
}

/// Geometry of a nucleon collection.
///
/// The simulation region is the cube `[-length, length)^3`, partitioned into `2 * units`
/// bins per axis. Pairwise factors are considered for nucleons whose bins lie within
/// `ceil(pairwise_max / cube_length)` bins of each other.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case", default)]
pub struct CollectionConfig {
    pub pairwise_max: f64,
    pub units: usize,
    pub length: f64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            pairwise_max: DEFAULT_PAIRWISE_MAX,
            units: DEFAULT_UNITS,
            length: DEFAULT_LENGTH,
        }
    }
}

impl CollectionConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if any value is out of range.
    pub fn new(pairwise_max: f64, units: usize, length: f64) -> Result<Self, ConfigError> {
        let config = Self {
            pairwise_max,
            units,
            length,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// Missing keys fall back to their defaults; unknown keys are rejected.
    ///
    /// ```toml
    /// pairwise-max = 2.5
    /// units = 30
    /// length = 15.0
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "units",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "length",
                reason: format!("must be a positive finite number, got {}", self.length),
            });
        }
        if !self.pairwise_max.is_finite() || self.pairwise_max < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "pairwise-max",
                reason: format!(
                    "must be a non-negative finite number, got {}",
                    self.pairwise_max
                ),
            });
        }
        Ok(())
    }

    /// Side length of a single bin.
    pub fn cube_length(&self) -> f64 {
        self.length / self.units as f64
    }

    /// The pairwise reach expressed in bins.
    pub fn pairwise_units(&self) -> usize {
        (self.pairwise_max / self.cube_length()).ceil() as usize
    }
}

#[derive(Default)]
pub struct CollectionConfigBuilder {
    pairwise_max: Option<f64>,
    units: Option<usize>,
    length: Option<f64>,
}

impl CollectionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pairwise_max(mut self, pairwise_max: f64) -> Self {
        self.pairwise_max = Some(pairwise_max);
        self
    }
    pub fn units(mut self, units: usize) -> Self {
        self.units = Some(units);
        self
    }
    pub fn length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn build(self) -> Result<CollectionConfig, ConfigError> {
        CollectionConfig::new(
            self.pairwise_max.unwrap_or(DEFAULT_PAIRWISE_MAX),
            self.units.unwrap_or(DEFAULT_UNITS),
            self.length.unwrap_or(DEFAULT_LENGTH),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CollectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.units, DEFAULT_UNITS);
        assert_eq!(config.length, DEFAULT_LENGTH);
        assert_eq!(config.pairwise_units(), 0);
    }

    #[test]
    fn derived_quantities_are_computed_from_geometry() {
        let config = CollectionConfig::new(0.5, 1, 1.0).unwrap();
        assert_eq!(config.cube_length(), 1.0);
        assert_eq!(config.pairwise_units(), 1);

        let config = CollectionConfig::new(2.5, 30, 15.0).unwrap();
        assert_eq!(config.cube_length(), 0.5);
        assert_eq!(config.pairwise_units(), 5);

        let config = CollectionConfig::new(2.6, 30, 15.0).unwrap();
        assert_eq!(config.pairwise_units(), 6);
    }

    #[test]
    fn builder_falls_back_to_defaults_for_unset_values() {
        let config = CollectionConfigBuilder::new().pairwise_max(1.0).build().unwrap();
        assert_eq!(config.pairwise_max, 1.0);
        assert_eq!(config.units, DEFAULT_UNITS);
        assert_eq!(config.length, DEFAULT_LENGTH);

        let config = CollectionConfigBuilder::new()
            .pairwise_max(0.5)
            .units(4)
            .length(2.0)
            .build()
            .unwrap();
        assert_eq!(config, CollectionConfig::new(0.5, 4, 2.0).unwrap());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            CollectionConfig::new(0.0, 0, 1.0),
            Err(ConfigError::InvalidParameter { name: "units", .. })
        ));
        assert!(matches!(
            CollectionConfig::new(0.0, 1, 0.0),
            Err(ConfigError::InvalidParameter { name: "length", .. })
        ));
        assert!(matches!(
            CollectionConfig::new(0.0, 1, f64::INFINITY),
            Err(ConfigError::InvalidParameter { name: "length", .. })
        ));
        assert!(matches!(
            CollectionConfig::new(-1.0, 1, 1.0),
            Err(ConfigError::InvalidParameter {
                name: "pairwise-max",
                ..
            })
        ));
        assert!(matches!(
            CollectionConfig::new(f64::NAN, 1, 1.0),
            Err(ConfigError::InvalidParameter {
                name: "pairwise-max",
                ..
            })
        ));
    }

    #[test]
    fn toml_config_parses_with_kebab_case_keys() {
        let config = CollectionConfig::from_toml_str(
            r#"
            pairwise-max = 2.5
            units = 10
            length = 5.0
            "#,
        )
        .unwrap();
        assert_eq!(config, CollectionConfig::new(2.5, 10, 5.0).unwrap());
    }

    #[test]
    fn toml_config_defaults_missing_keys() {
        let config = CollectionConfig::from_toml_str("pairwise-max = 1.0").unwrap();
        assert_eq!(config.pairwise_max, 1.0);
        assert_eq!(config.units, DEFAULT_UNITS);
        assert_eq!(config.length, DEFAULT_LENGTH);
    }

    #[test]
    fn toml_config_rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            CollectionConfig::from_toml_str("cutoff = 1.0"),
            Err(ConfigError::Toml { .. })
        ));
        assert!(matches!(
            CollectionConfig::from_toml_str("units = 0"),
            Err(ConfigError::InvalidParameter { name: "units", .. })
        ));

        let error = CollectionConfig::from_toml_str("pairwise-max = -1.0").unwrap_err();
        assert!(matches!(
            error,
            ConfigError::InvalidParameter {
                name: "pairwise-max",
                ..
            }
        ));
        assert!(error.to_string().contains("'pairwise-max'"));
    }
}
