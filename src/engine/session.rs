//! The synthesis session: owns the backend and all per-process model state.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError, LoadRequest, SynthesizeRequest};
use crate::config::{DevicePreference, Language, OutputDirPolicy, ReferencePolicy, Settings};
use crate::voice::{SpeakerEntry, SpeakerRegistry, ToneEmbedding};

use super::validate::{
    AUDIO_EXTENSION, DEFAULT_SPEED, INTERMEDIATE_FILE, ValidationError, normalize_output_name,
    validate_speed, validate_text,
};

/// Errors that can occur during TTS operations.
#[derive(Error, Debug)]
pub enum TTSError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Models are not loaded; initialize the session first")]
    NotInitialized,

    #[error("No reference voice loaded; load a reference sample before converting")]
    MissingReference,

    #[error("Reference embedding has {target} values but the base speaker has {source_len}")]
    EmbeddingMismatch { source_len: usize, target: usize },

    #[error("Audio file not found: {0}")]
    AudioNotFound(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[source] BackendError),

    #[error("Tone conversion failed: {0}")]
    Conversion(#[source] BackendError),

    #[error("Output file was not produced or is empty: {0}")]
    EmptyOutput(PathBuf),

    #[error("Backend error: {0}")]
    BackendError(#[from] BackendError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// How the final output file is named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputNaming {
    /// `result_<counter>.wav`
    Sequential,
    /// `tts_<YYYYmmdd_HHMMSS>.wav`
    Timestamp,
    /// A caller-supplied name, normalized to end in `.wav`
    Custom(String),
}

impl OutputNaming {
    /// Custom name if one is given, otherwise `fallback`.
    pub fn custom_or(name: Option<&str>, fallback: OutputNaming) -> Self {
        match name {
            Some(n) => OutputNaming::Custom(n.to_string()),
            None => fallback,
        }
    }
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub speed: f32,
    pub naming: OutputNaming,
    /// Apply tone conversion after synthesis.
    pub convert: bool,
}

impl SpeechRequest {
    /// Create a request with default speed, sequential naming and conversion on.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speed: DEFAULT_SPEED,
            naming: OutputNaming::Sequential,
            convert: true,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Skip tone conversion; the base voice is written directly.
    pub fn plain(mut self) -> Self {
        self.convert = false;
        self
    }
}

/// A successfully written output file.
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub elapsed: Duration,
    /// Audio length, when the WAV header could be read.
    pub duration_secs: Option<f32>,
    pub sample_rate: Option<u32>,
}

/// Models loaded by [`TTSSession::initialize`].
#[derive(Debug, Clone)]
pub struct LoadedModels {
    pub device: String,
    pub registry: SpeakerRegistry,
    pub speaker: SpeakerEntry,
    pub source: ToneEmbedding,
}

/// Session options, usually derived from [`Settings`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model_root: PathBuf,
    pub output_dir: PathBuf,
    pub language: Language,
    pub device: DevicePreference,
    pub reference_policy: ReferencePolicy,
    pub output_dir_policy: OutputDirPolicy,
}

impl SessionConfig {
    /// Build from settings. A policy set in the settings overrides `default_policy`.
    pub fn from_settings(
        settings: &Settings,
        default_policy: ReferencePolicy,
        output_dir_policy: OutputDirPolicy,
    ) -> Self {
        Self {
            model_root: settings.model_root.clone(),
            output_dir: settings.output_dir.clone(),
            language: settings.language,
            device: settings.device,
            reference_policy: settings.reference_policy.unwrap_or(default_policy),
            output_dir_policy,
        }
    }

    /// Path of the converter config inside the model root.
    pub fn converter_config(&self) -> PathBuf {
        self.model_root.join("converter").join("config.json")
    }

    /// Path of the converter weights inside the model root.
    pub fn converter_checkpoint(&self) -> PathBuf {
        self.model_root.join("converter").join("checkpoint.pth")
    }
}

/// Owns the backend, the loaded models, the embeddings and the result counter.
///
/// One session per process; front ends create it once and pass it around.
pub struct TTSSession<B: Backend> {
    backend: B,
    config: SessionConfig,
    models: Option<LoadedModels>,
    target: Option<ToneEmbedding>,
    result_count: u64,
    last_result: Option<PathBuf>,
}

impl<B: Backend> TTSSession<B> {
    /// Create a session and prepare the output directory.
    pub fn new(backend: B, config: SessionConfig) -> Result<Self, TTSError> {
        if config.output_dir_policy == OutputDirPolicy::Clear && config.output_dir.exists() {
            info!(path = %config.output_dir.display(), "clearing output directory");
            fs::remove_dir_all(&config.output_dir)?;
        }
        fs::create_dir_all(&config.output_dir)?;

        Ok(Self {
            backend,
            config,
            models: None,
            target: None,
            result_count: 0,
            last_result: None,
        })
    }

    /// Load the converter, the TTS model and the base speaker embedding.
    ///
    /// Calling this again after a success does nothing.
    pub fn initialize(&mut self) -> Result<&LoadedModels, TTSError> {
        if self.models.is_none() {
            let loaded = self.load_models()?;
            self.models = Some(loaded);
        }
        self.models.as_ref().ok_or(TTSError::NotInitialized)
    }

    fn load_models(&self) -> Result<LoadedModels, TTSError> {
        let converter_config = self.config.converter_config();
        let converter_checkpoint = self.config.converter_checkpoint();

        for path in [&converter_config, &converter_checkpoint] {
            if !path.exists() {
                return Err(TTSError::Initialization(format!(
                    "missing checkpoint file {}",
                    path.display()
                )));
            }
        }

        let health = self
            .backend
            .health()
            .map_err(|e| TTSError::Initialization(format!("model server unavailable: {e}")))?;
        let device = self.config.device.resolve(health.cuda_available);
        info!(device, gpu = ?health.gpu, "selected compute device");

        let request = LoadRequest {
            converter_config,
            converter_checkpoint,
            language: self.config.language.code().to_string(),
            device: device.to_string(),
        };
        let response = self
            .backend
            .load_models(&request)
            .map_err(|e| TTSError::Initialization(e.to_string()))?;
        info!("tone converter and TTS model loaded");

        let speakers = response.speakers.into_iter().map(|s| (s.key, s.id));
        let registry =
            SpeakerRegistry::new(speakers).map_err(|e| TTSError::Initialization(e.to_string()))?;
        let speaker = registry.base_speaker().clone();

        let embedding_path = speaker.embedding_path(&self.config.model_root);
        if !embedding_path.exists() {
            return Err(TTSError::Initialization(format!(
                "missing base speaker embedding {}",
                embedding_path.display()
            )));
        }
        let source = self
            .backend
            .load_embedding(&embedding_path)
            .map_err(|e| TTSError::Initialization(e.to_string()))?;
        if source.is_empty() {
            return Err(TTSError::Initialization(format!(
                "base speaker embedding {} is empty",
                embedding_path.display()
            )));
        }
        info!(
            speaker = %speaker.key,
            id = speaker.id,
            dims = source.len(),
            "base speaker embedding loaded"
        );

        Ok(LoadedModels {
            device: response.device,
            registry,
            speaker,
            source,
        })
    }

    /// Extract the target tone embedding from a reference sample.
    ///
    /// Replaces any previously loaded reference.
    pub fn load_reference(
        &mut self,
        audio_path: &Path,
        vad: bool,
    ) -> Result<&ToneEmbedding, TTSError> {
        let models = self.models.as_ref().ok_or(TTSError::NotInitialized)?;

        if !audio_path.exists() {
            return Err(TTSError::AudioNotFound(audio_path.display().to_string()));
        }

        info!(path = %audio_path.display(), vad, "extracting reference tone embedding");
        let embedding = self.backend.extract_embedding(audio_path, vad)?;

        if !embedding.is_compatible(&models.source) {
            return Err(TTSError::EmbeddingMismatch {
                source_len: models.source.len(),
                target: embedding.len(),
            });
        }

        info!(dims = embedding.len(), "reference tone embedding ready");
        let stored: &ToneEmbedding = self.target.insert(embedding);
        Ok(stored)
    }

    /// Forget the loaded reference.
    pub fn clear_reference(&mut self) {
        self.target = None;
    }

    /// Synthesize `request.text` and, if requested, convert it toward the
    /// reference voice.
    ///
    /// The result counter advances only when a non-empty file was written.
    pub fn generate(&mut self, request: &SpeechRequest) -> Result<GeneratedAudio, TTSError> {
        let text = validate_text(&request.text)?;
        let speed = validate_speed(request.speed)?;
        let custom_name = match &request.naming {
            OutputNaming::Custom(name) => Some(normalize_output_name(name)?),
            _ => None,
        };

        let models = self.models.as_ref().ok_or(TTSError::NotInitialized)?;
        let target = if request.convert {
            Some(self.conversion_target(models)?)
        } else {
            None
        };

        let started = Instant::now();
        fs::create_dir_all(&self.config.output_dir)?;

        let intermediate = self.config.output_dir.join(INTERMEDIATE_FILE);
        let synth_request = SynthesizeRequest::new(text, models.speaker.id).with_speed(speed);
        let audio = self
            .backend
            .synthesize(&synth_request)
            .map_err(TTSError::Synthesis)?;
        fs::write(&intermediate, &audio)?;
        debug!(path = %intermediate.display(), bytes = audio.len(), "base voice synthesized");

        let (output_path, sequential_index) = match custom_name {
            Some(name) => (self.config.output_dir.join(name), None),
            None => self.next_output_path(&request.naming),
        };

        match target {
            Some(target) => {
                let converted = self
                    .backend
                    .convert(&intermediate, &models.source, target)
                    .map_err(TTSError::Conversion)?;
                fs::write(&output_path, &converted)?;
                debug!(path = %output_path.display(), "tone conversion written");
            }
            None => {
                fs::rename(&intermediate, &output_path)?;
            }
        }

        let size_bytes = fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
        if size_bytes == 0 {
            return Err(TTSError::EmptyOutput(output_path));
        }

        self.result_count = match sequential_index {
            Some(index) => index + 1,
            None => self.result_count + 1,
        };

        let (duration_secs, sample_rate) = wav_info(&output_path);
        let generated = GeneratedAudio {
            path: output_path.clone(),
            size_bytes,
            elapsed: started.elapsed(),
            duration_secs,
            sample_rate,
        };
        self.last_result = Some(output_path);

        info!(path = %generated.path.display(), size_bytes, "generation complete");
        Ok(generated)
    }

    fn conversion_target<'a>(
        &'a self,
        models: &'a LoadedModels,
    ) -> Result<&'a ToneEmbedding, TTSError> {
        match (&self.target, self.config.reference_policy) {
            (Some(target), _) => Ok(target),
            (None, ReferencePolicy::FallbackToSource) => {
                debug!("no reference loaded, converting toward the base speaker");
                Ok(&models.source)
            }
            (None, ReferencePolicy::Require) => Err(TTSError::MissingReference),
        }
    }

    /// Pick a path that does not overwrite an existing result.
    ///
    /// Returns the sequential index used, if any.
    fn next_output_path(&self, naming: &OutputNaming) -> (PathBuf, Option<u64>) {
        let dir = &self.config.output_dir;
        match naming {
            OutputNaming::Timestamp => {
                let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
                let mut path = dir.join(format!("tts_{stamp}.{AUDIO_EXTENSION}"));
                let mut suffix = 1;
                while path.exists() {
                    path = dir.join(format!("tts_{stamp}_{suffix}.{AUDIO_EXTENSION}"));
                    suffix += 1;
                }
                (path, None)
            }
            // Custom names are resolved by the caller
            OutputNaming::Sequential | OutputNaming::Custom(_) => {
                let mut index = self.result_count;
                while dir.join(sequential_name(index)).exists() {
                    warn!(index, "result file already exists, skipping");
                    index += 1;
                }
                (dir.join(sequential_name(index)), Some(index))
            }
        }
    }

    /// Most recent successful output, if it is still on disk.
    pub fn last_result_path(&self) -> Option<&Path> {
        self.last_result.as_deref().filter(|p| p.exists())
    }

    pub fn result_count(&self) -> u64 {
        self.result_count
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn is_initialized(&self) -> bool {
        self.models.is_some()
    }

    pub fn models(&self) -> Option<&LoadedModels> {
        self.models.as_ref()
    }

    pub fn source_embedding(&self) -> Option<&ToneEmbedding> {
        self.models.as_ref().map(|m| &m.source)
    }

    pub fn target_embedding(&self) -> Option<&ToneEmbedding> {
        self.target.as_ref()
    }

    pub fn has_reference(&self) -> bool {
        self.target.is_some()
    }

    pub fn reference_policy(&self) -> ReferencePolicy {
        self.config.reference_policy
    }

    pub fn set_reference_policy(&mut self, policy: ReferencePolicy) {
        self.config.reference_policy = policy;
    }
}

/// File name for sequential result `index`.
pub fn sequential_name(index: u64) -> String {
    format!("result_{index}.{AUDIO_EXTENSION}")
}

fn wav_info(path: &Path) -> (Option<f32>, Option<u32>) {
    match hound::WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            let duration = reader.duration() as f32 / spec.sample_rate as f32;
            (Some(duration), Some(spec.sample_rate))
        }
        Err(e) => {
            debug!(path = %path.display(), "could not read WAV header: {e}");
            (None, None)
        }
    }
}
