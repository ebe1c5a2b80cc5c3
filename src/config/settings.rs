//! Runtime settings shared by all front ends.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default archive holding the pretrained converter and base speaker embeddings.
pub const DEFAULT_CHECKPOINT_URL: &str =
    "https://myshell-public-repo-host.s3.amazonaws.com/openvoice/checkpoints_v2_0417.zip";

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Language served by the text-to-speech model.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[value(name = "EN")]
    #[serde(rename = "EN")]
    En,

    #[value(name = "EN_NEWEST")]
    #[serde(rename = "EN_NEWEST")]
    EnNewest,

    #[value(name = "ES")]
    #[serde(rename = "ES")]
    Es,

    #[value(name = "FR")]
    #[serde(rename = "FR")]
    Fr,

    #[value(name = "ZH")]
    #[serde(rename = "ZH")]
    Zh,

    #[value(name = "JP")]
    #[serde(rename = "JP")]
    Jp,

    /// Korean
    #[default]
    #[value(name = "KR")]
    #[serde(rename = "KR")]
    Kr,
}

impl Language {
    /// Language code as the model server expects it.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::EnNewest => "EN_NEWEST",
            Language::Es => "ES",
            Language::Fr => "FR",
            Language::Zh => "ZH",
            Language::Jp => "JP",
            Language::Kr => "KR",
        }
    }
}

/// Compute device requested for inference.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// GPU if the model server reports one, else CPU
    #[default]
    Auto,
    Cuda,
    Cpu,
}

impl DevicePreference {
    /// Resolve to a concrete device string given what the server offers.
    pub fn resolve(&self, cuda_available: bool) -> &'static str {
        match self {
            DevicePreference::Auto if cuda_available => "cuda:0",
            DevicePreference::Auto => "cpu",
            DevicePreference::Cuda => "cuda:0",
            DevicePreference::Cpu => "cpu",
        }
    }
}

/// What to convert toward when no reference voice has been loaded.
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Conversion fails until a reference voice is loaded
    Require,
    /// Convert toward the base speaker's own embedding
    FallbackToSource,
}

/// What to do with the output directory when a session starts.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputDirPolicy {
    /// Remove previous results
    Clear,
    #[default]
    Reuse,
}

/// Settings resolved from defaults, an optional JSON file and CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub model_root: PathBuf,
    pub output_dir: PathBuf,
    pub language: Language,
    pub device: DevicePreference,
    pub host: String,
    pub port: u16,
    pub checkpoint_url: String,
    pub vad: bool,
    pub playback_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player: Option<String>,
    /// Overrides the front end's own policy when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_policy: Option<ReferencePolicy>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_root: PathBuf::from("checkpoints_v2"),
            output_dir: PathBuf::from("output"),
            language: Language::default(),
            device: DevicePreference::default(),
            host: "localhost".to_string(),
            port: 9280,
            checkpoint_url: DEFAULT_CHECKPOINT_URL.to_string(),
            vad: true,
            playback_timeout_secs: 30,
            player: None,
            reference_policy: None,
        }
    }
}

impl Settings {
    /// Default config file location (`<config_dir>/tone-tts/config.json`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tone-tts").join("config.json"))
    }

    /// Load settings from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load from an explicit file, or from the default location if one
    /// exists there, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Base URL of the model server.
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
