use crate::error::PgenError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_THRESHOLD: f32 = 0.9;

/// Zero-based column indices into each input row. Chromosome and position are always
/// columns 0 and 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ColumnLayout {
    pub reference: usize,
    pub alt: usize,
    #[serde(default)]
    pub id: Option<usize>,
    pub values: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            reference: 2,
            alt: 3,
            id: Some(4),
            values: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WriterConfig {
    #[serde(default)]
    pub columns: ColumnLayout,
    /// Group consecutive single-ALT rows of one site into multi-allelic variants.
    #[serde(default)]
    pub group: bool,
    /// Value columns hold imputed probability pairs rather than hard-call digits.
    #[serde(default)]
    pub imputed: bool,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_skip_header")]
    pub skip_header: bool,
    /// Where variable-width block files go. Defaults to the output directory.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_skip_header() -> bool {
    true
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            columns: ColumnLayout::default(),
            group: false,
            imputed: false,
            threshold: DEFAULT_THRESHOLD,
            skip_header: true,
            temp_dir: None,
        }
    }
}

impl WriterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, PgenError> {
        let config: WriterConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, PgenError> {
        let text = fs::read_to_string(path).map_err(|e| PgenError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Rejects combinations the writers cannot honour.
    pub fn validate(&self) -> Result<(), PgenError> {
        if self.group && self.imputed {
            return Err(PgenError::ImputedGrouping);
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(PgenError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = WriterConfig::from_toml_str("group = true").unwrap();
        assert!(config.group);
        assert!(!config.imputed);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert!(config.skip_header);
        assert_eq!(config.columns, ColumnLayout::default());
        assert_eq!(config.temp_dir, None);
    }

    #[test]
    fn full_toml_round_trip_of_fields() {
        let text = r#"
            imputed = true
            threshold = 0.75
            skip_header = false
            temp_dir = "/scratch"

            [columns]
            reference = 3
            alt = 4
            values = 6
        "#;
        let config = WriterConfig::from_toml_str(text).unwrap();
        assert!(config.imputed);
        assert_eq!(config.threshold, 0.75);
        assert!(!config.skip_header);
        assert_eq!(config.temp_dir, Some(PathBuf::from("/scratch")));
        assert_eq!(
            config.columns,
            ColumnLayout {
                reference: 3,
                alt: 4,
                id: None,
                values: 6
            }
        );
    }

    #[test]
    fn grouped_imputed_output_is_rejected() {
        let result = WriterConfig::from_toml_str("group = true\nimputed = true");
        assert!(matches!(result, Err(PgenError::ImputedGrouping)));
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let config = WriterConfig {
            threshold: 1.2,
            ..WriterConfig::default()
        };
        assert!(matches!(config.validate(), Err(PgenError::InvalidThreshold(_))));
    }

    #[test]
    fn malformed_toml_surfaces_as_config_error() {
        assert!(matches!(
            WriterConfig::from_toml_str("group = \"yes\""),
            Err(PgenError::Config(_))
        ));
    }
}
