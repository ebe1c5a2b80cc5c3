//! TTS session orchestrator.
//!
//! This module provides the session that sequences model loading,
//! reference embedding, synthesis and tone conversion, along with the input
//! validation every front end runs first.

mod session;
pub mod validate;

pub use session::{
    GeneratedAudio, LoadedModels, OutputNaming, SessionConfig, SpeechRequest, TTSError,
    TTSSession, sequential_name,
};
pub use validate::{
    DEFAULT_SPEED, INTERMEDIATE_FILE, MAX_SPEED, MAX_TEXT_CHARS, MIN_SPEED, ValidationError,
    normalize_output_name, text_preview, validate_speed, validate_text,
};
