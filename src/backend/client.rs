//! HTTP client for the model server.

use std::path::Path;

use reqwest::blocking::multipart::{Form, Part};
use tracing::debug;

use crate::voice::ToneEmbedding;

use super::Backend;
use super::types::{BackendError, HealthResponse, LoadRequest, LoadResponse, SynthesizeRequest};

/// HTTP-based model server client.
///
/// Reference audio and waveforms to convert are uploaded as multipart
/// bytes. Stored base speaker embeddings are not: `/embedding/load` receives
/// an absolute path, so the model server must see the same filesystem as
/// this client (same host, or the model root mounted at the same path).
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    /// Create a new HTTP backend client.
    pub fn new(host: &str, port: u16) -> Self {
        let base_url = format!("http://{host}:{port}");

        Self {
            base_url,
            client: reqwest::blocking::Client::builder()
                .timeout(None)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Get the base URL for this backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn audio_part(audio_path: &Path) -> Result<Part, BackendError> {
        let audio_data = std::fs::read(audio_path)
            .map_err(|_| BackendError::FileNotFound(audio_path.display().to_string()))?;

        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav");

        Ok(Part::bytes(audio_data).file_name(file_name.to_string()))
    }

    fn check_status(response: &reqwest::blocking::Response) -> Result<(), BackendError> {
        let status = response.status();
        if status.as_u16() == 409 {
            return Err(BackendError::NotLoaded);
        }
        if !status.is_success() {
            return Err(BackendError::RequestFailed(format!("Status: {status}")));
        }
        Ok(())
    }

    fn post_json<T: serde::Serialize + ?Sized, R: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<R, BackendError> {
        let url = format!("{}{endpoint}", self.base_url);
        debug!(%url, "POST");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Self::check_status(&response)?;

        response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn post_for_audio(
        &self,
        endpoint: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Vec<u8>, BackendError> {
        debug!(url = %format!("{}{endpoint}", self.base_url), "POST (audio)");

        let response = request
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Self::check_status(&response)?;

        let bytes = response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        if bytes.is_empty() {
            return Err(BackendError::InvalidResponse(
                "Empty audio payload".to_string(),
            ));
        }

        Ok(bytes)
    }
}

impl Backend for HttpBackend {
    fn health(&self) -> Result<HealthResponse, BackendError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Self::check_status(&response)?;

        response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn load_models(&self, request: &LoadRequest) -> Result<LoadResponse, BackendError> {
        self.post_json("/load", request)
    }

    fn load_embedding(&self, path: &Path) -> Result<ToneEmbedding, BackendError> {
        self.post_json("/embedding/load", &embedding_load_body(path)?)
    }

    fn extract_embedding(
        &self,
        audio_path: &Path,
        vad: bool,
    ) -> Result<ToneEmbedding, BackendError> {
        let url = format!("{}/embedding/extract", self.base_url);
        debug!(%url, vad, "POST");

        let form = Form::new()
            .part("audio", Self::audio_part(audio_path)?)
            .text("vad", vad.to_string());

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        Self::check_status(&response)?;

        response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/synthesize", self.base_url);
        self.post_for_audio("/synthesize", self.client.post(&url).json(request))
    }

    fn convert(
        &self,
        audio_path: &Path,
        source: &ToneEmbedding,
        target: &ToneEmbedding,
    ) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/convert", self.base_url);

        let source_json = serde_json::to_string(source)
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;
        let target_json = serde_json::to_string(target)
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let form = Form::new()
            .part("audio", Self::audio_part(audio_path)?)
            .text("source_se", source_json)
            .text("target_se", target_json);

        self.post_for_audio("/convert", self.client.post(&url).multipart(form))
    }
}

/// Request body for `/embedding/load`. The path is made absolute so the
/// server does not resolve it against its own working directory.
pub(crate) fn embedding_load_body(path: &Path) -> Result<serde_json::Value, BackendError> {
    let absolute = std::fs::canonicalize(path)
        .map_err(|_| BackendError::FileNotFound(path.display().to_string()))?;
    Ok(serde_json::json!({ "path": absolute }))
}
