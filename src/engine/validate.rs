//! Input validation, run before any model work.

use thiserror::Error;

/// Longest accepted input, in characters.
pub const MAX_TEXT_CHARS: usize = 1000;
/// Slowest accepted speed multiplier.
pub const MIN_SPEED: f32 = 0.5;
/// Fastest accepted speed multiplier.
pub const MAX_SPEED: f32 = 3.0;
/// Speed used when none is given.
pub const DEFAULT_SPEED: f32 = 1.1;

/// Extension of every file the session writes.
pub const AUDIO_EXTENSION: &str = "wav";

/// Name of the intermediate base-voice waveform inside the output directory.
pub const INTERMEDIATE_FILE: &str = "tmp.wav";

/// Errors for rejected user input.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Text is empty")]
    EmptyText,

    #[error("Text contains only whitespace")]
    WhitespaceOnly,

    #[error("Text is too long ({actual} characters, maximum {max})")]
    TextTooLong { actual: usize, max: usize },

    #[error("Speed must be between {min} and {max} (got {actual})")]
    SpeedOutOfRange { actual: f32, min: f32, max: f32 },

    #[error("Speed is not a finite number")]
    InvalidSpeed,

    #[error("Invalid output file name: {0}")]
    InvalidFileName(String),
}

/// Validate input text, returning it trimmed.
pub fn validate_text(text: &str) -> Result<String, ValidationError> {
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::WhitespaceOnly);
    }

    let actual = trimmed.chars().count();
    if actual > MAX_TEXT_CHARS {
        return Err(ValidationError::TextTooLong {
            actual,
            max: MAX_TEXT_CHARS,
        });
    }

    Ok(trimmed.to_string())
}

/// Validate a speed multiplier (inclusive range).
pub fn validate_speed(speed: f32) -> Result<f32, ValidationError> {
    if !speed.is_finite() {
        return Err(ValidationError::InvalidSpeed);
    }

    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(ValidationError::SpeedOutOfRange {
            actual: speed,
            min: MIN_SPEED,
            max: MAX_SPEED,
        });
    }

    Ok(speed)
}

/// Normalize a user-supplied output name so it ends in `.wav` exactly once.
///
/// Names are placed inside the output directory, so path separators and
/// parent references are rejected, as is the intermediate file's name.
pub fn normalize_output_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::InvalidFileName(
            "Name cannot be empty".to_string(),
        ));
    }

    // Prevent path traversal
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ValidationError::InvalidFileName(format!(
            "'{name}' cannot contain path separators"
        )));
    }

    let suffix = format!(".{AUDIO_EXTENSION}");
    let normalized = if name.to_lowercase().ends_with(&suffix) {
        if name.len() == suffix.len() {
            return Err(ValidationError::InvalidFileName(
                "Name cannot be only an extension".to_string(),
            ));
        }
        name.to_string()
    } else {
        format!("{name}{suffix}")
    };

    if normalized.eq_ignore_ascii_case(INTERMEDIATE_FILE) {
        return Err(ValidationError::InvalidFileName(format!(
            "'{name}' is reserved for intermediate audio"
        )));
    }

    Ok(normalized)
}

/// First 50 characters of `text`, with an ellipsis if it was cut.
pub fn text_preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 50;

    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
