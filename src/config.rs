//! Decoder configuration
//!
//! Stored as TOML at `<config_dir>/hid-decode/config.toml`:
//!
//! ```toml
//! [layout]
//! pointer_width = "64"
//!
//! [output]
//! format = "text"
//! hex = false
//! trace = false
//! ```

use std::path::{Path, PathBuf};

use hid_event::{EnvelopeLayout, PointerWidth};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::printer::OutputFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// How decoded events are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Print the raw input image of every notification
    pub hex: bool,
    /// Print the decoder's diagnostic lines
    pub trace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub layout: EnvelopeLayout,
    pub output: OutputConfig,
}

/// Command-line values taking precedence over the config file
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub format: Option<OutputFormat>,
    pub pointer_width: Option<PointerWidth>,
    pub hex: bool,
    pub trace: bool,
}

impl DecoderConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hid-decode")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        if let Some(width) = overrides.pointer_width {
            self.layout.pointer_width = width;
        }
        self.output.hex |= overrides.hex;
        self.output.trace |= overrides.trace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serialization() {
        let toml_str = toml::to_string_pretty(&DecoderConfig::default()).unwrap();
        assert!(toml_str.contains("pointer_width = \"64\""));
        assert!(toml_str.contains("format = \"text\""));
        let parsed: DecoderConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, DecoderConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DecoderConfig = toml::from_str(
            r#"
[layout]
pointer_width = "32"
"#,
        )
        .unwrap();
        assert_eq!(config.layout.pointer_width, PointerWidth::Bits32);
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_overrides_win() {
        let config = DecoderConfig::default().apply(&Overrides {
            format: Some(OutputFormat::Json),
            pointer_width: Some(PointerWidth::Bits32),
            hex: true,
            trace: false,
        });
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.layout.header_size(), 16);
        assert!(config.output.hex);
        assert!(!config.output.trace);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let path = std::env::temp_dir().join("hid-decode-test-missing/none.toml");
        assert_eq!(DecoderConfig::load(&path).unwrap(), DecoderConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("hid-decode-test-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let config = DecoderConfig {
            layout: EnvelopeLayout::new(PointerWidth::Bits32),
            output: OutputConfig {
                format: OutputFormat::Json,
                hex: true,
                trace: true,
            },
        };
        config.save(&path).unwrap();
        assert_eq!(DecoderConfig::load(&path).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = std::env::temp_dir().join(format!("hid-decode-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[output]\nformat = \"xml\"\n").unwrap();
        let err = DecoderConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
