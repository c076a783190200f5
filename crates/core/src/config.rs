use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// OCR engine tuning. Defaults match the receipts this app was built around:
/// Spanish-language tickets, block-of-text page segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Tesseract page segmentation mode.
    #[serde(default = "default_psm")]
    pub psm: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig { lang: default_lang(), psm: default_psm() }
    }
}

fn default_lang() -> String {
    "spa".to_string()
}

fn default_psm() -> u8 {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Overrides the platform data directory when set.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_tip")]
    pub default_tip_percentage: Decimal,
    #[serde(default)]
    pub ocr: OcrConfig,
}

fn default_tip() -> Decimal {
    Decimal::from(15)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AppConfig {
    /// Load from a TOML file. A missing file is not an error; the defaults
    /// apply until the user writes one.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(AppConfig::with_defaults());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn with_defaults() -> Self {
        AppConfig {
            data_dir: None,
            default_tip_percentage: default_tip(),
            ocr: OcrConfig::default(),
        }
    }
}
