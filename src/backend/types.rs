//! Backend request/response types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when communicating with the model server.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Model not loaded")]
    NotLoaded,

    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Health check response from the model server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub cuda_available: bool,
    pub gpu: Option<String>,
    pub device: String,
}

/// Request to load the conversion and text-to-speech models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadRequest {
    pub converter_config: PathBuf,
    pub converter_checkpoint: PathBuf,
    pub language: String,
    pub device: String,
}

/// A base speaker as listed by the text-to-speech model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeakerInfo {
    pub key: String,
    pub id: u32,
}

/// Response after loading models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    pub device: String,
    /// Speakers in the order the model lists them.
    pub speakers: Vec<SpeakerInfo>,
}

/// Request for plain speech synthesis with a base voice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthesizeRequest {
    pub text: String,
    pub speaker_id: u32,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

impl SynthesizeRequest {
    /// Create a new synthesis request for the given voice id.
    pub fn new(text: impl Into<String>, speaker_id: u32) -> Self {
        Self {
            text: text.into(),
            speaker_id,
            speed: 1.0,
        }
    }

    /// Set the speech speed.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}
