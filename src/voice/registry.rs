//! Base speaker registry exposed by the text-to-speech model.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur when building or querying the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Model exposes no speakers")]
    Empty,

    #[error("Speaker not found: {0}")]
    NotFound(String),
}

/// One base speaker: its key in the model and the numeric voice id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerEntry {
    pub key: String,
    pub id: u32,
}

impl SpeakerEntry {
    /// File stem of the stored base embedding (`EN_US` -> `en-us`).
    pub fn embedding_file_stem(&self) -> String {
        self.key.to_lowercase().replace('_', "-")
    }

    /// Location of this speaker's base embedding under a model root.
    pub fn embedding_path(&self, model_root: &Path) -> PathBuf {
        model_root
            .join("base_speakers")
            .join("ses")
            .join(format!("{}.pth", self.embedding_file_stem()))
    }
}

/// Read-only mapping from speaker key to voice id, in model order.
#[derive(Debug, Clone)]
pub struct SpeakerRegistry {
    entries: Vec<SpeakerEntry>,
}

impl SpeakerRegistry {
    /// Build a registry from `(key, id)` pairs in the order the model lists them.
    pub fn new<I, K>(speakers: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, u32)>,
        K: Into<String>,
    {
        let entries: Vec<SpeakerEntry> = speakers
            .into_iter()
            .map(|(key, id)| SpeakerEntry {
                key: key.into(),
                id,
            })
            .collect();

        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }

        Ok(Self { entries })
    }

    /// The speaker used for synthesis. When the model lists several, the
    /// last one is used.
    pub fn base_speaker(&self) -> &SpeakerEntry {
        // new() guarantees at least one entry
        &self.entries[self.entries.len() - 1]
    }

    pub fn get(&self, key: &str) -> Result<&SpeakerEntry, RegistryError> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    pub fn entries(&self) -> &[SpeakerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
