//! Serializable view settings, kept next to a trained model so scoring can
//! rebuild exactly the same feature space.

use super::view::MissingPolicy;
use crate::layout::LayoutOptions;
use crate::transform::TransformKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write view configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML view configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize view configuration to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Everything needed to build a [`RowView`](super::view::RowView) from a schema.
/// Absent keys take their defaults; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewConfig {
    /// How many trailing schema columns are responses.
    pub responses: usize,
    pub use_all_levels: bool,
    pub missing_bucket: bool,
    pub intercept: bool,
    pub binary_columns: bool,
    pub missing: MissingPolicy,
    pub predictor_transform: TransformKind,
    pub response_transform: TransformKind,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            responses: 1,
            use_all_levels: false,
            missing_bucket: false,
            intercept: true,
            binary_columns: false,
            missing: MissingPolicy::Skip,
            predictor_transform: TransformKind::Standardize,
            response_transform: TransformKind::None,
        }
    }
}

impl ViewConfig {
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            use_all_levels: self.use_all_levels,
            missing_bucket: self.missing_bucket,
            intercept: self.intercept,
            binary_columns: self.binary_columns,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_toml_str(&fs::read_to_string(path)?)?;
        log::info!("Loaded view configuration from {}.", path.display());
        Ok(config)
    }

    /// Saves the configuration to a file in a human-readable TOML format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let text = self.to_toml_string()?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}
