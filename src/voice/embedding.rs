//! Tone color embeddings.

use serde::{Deserialize, Serialize};

/// A speaker's tone color, as produced by the conversion model.
///
/// Values are fixed once constructed; there are no mutating accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneEmbedding {
    values: Vec<f32>,
    /// Where the embedding came from (base speaker key or reference file name).
    #[serde(default)]
    source: String,
}

impl ToneEmbedding {
    /// Create an embedding from raw values.
    pub fn new(values: Vec<f32>, source: impl Into<String>) -> Self {
        Self {
            values,
            source: source.into(),
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Two embeddings can be used together in a conversion only if their
    /// dimensions match.
    pub fn is_compatible(&self, other: &ToneEmbedding) -> bool {
        !self.is_empty() && self.len() == other.len()
    }
}
