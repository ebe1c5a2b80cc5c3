//! Backend communication with the model server.
//!
//! The text-to-speech model, the tone color converter and the embedding
//! extractor run out of process. This module provides the trait that the
//! session talks to and an HTTP implementation of it.

mod client;
mod types;

pub use client::HttpBackend;
pub use types::{
    BackendError, HealthResponse, LoadRequest, LoadResponse, SpeakerInfo, SynthesizeRequest,
};

use std::path::Path;

use crate::config::Settings;
use crate::voice::ToneEmbedding;

/// Trait for model server communication.
///
/// This trait abstracts the HTTP communication with the model server,
/// allowing for mock implementations in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send {
    /// Check server health and device availability.
    fn health(&self) -> Result<HealthResponse, BackendError>;

    /// Load the tone converter and the text-to-speech model.
    fn load_models(&self, request: &LoadRequest) -> Result<LoadResponse, BackendError>;

    /// Load a stored base speaker embedding.
    ///
    /// The file is read by the model server, not uploaded.
    fn load_embedding(&self, path: &Path) -> Result<ToneEmbedding, BackendError>;

    /// Extract a tone embedding from a reference audio sample.
    ///
    /// # Arguments
    /// * `audio_path` - Path to the reference audio file
    /// * `vad` - Trim non-speech segments before extraction
    fn extract_embedding(&self, audio_path: &Path, vad: bool)
    -> Result<ToneEmbedding, BackendError>;

    /// Synthesize speech with a base voice.
    ///
    /// # Returns
    /// Raw WAV audio data
    fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, BackendError>;

    /// Convert the tone color of a waveform from `source` to `target`.
    ///
    /// # Returns
    /// Raw WAV audio data
    fn convert(
        &self,
        audio_path: &Path,
        source: &ToneEmbedding,
        target: &ToneEmbedding,
    ) -> Result<Vec<u8>, BackendError>;
}

/// Create a backend for the configured model server.
pub fn create_backend(settings: &Settings) -> HttpBackend {
    HttpBackend::new(&settings.host, settings.port)
}
