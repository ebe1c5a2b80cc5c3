//! Voice data model: tone color embeddings and the base speaker registry.
//!
//! Embeddings are produced by the conversion model (either loaded from a
//! stored base-speaker file or extracted from a reference sample) and are
//! held in memory for the lifetime of a session.

mod embedding;
mod registry;

pub use embedding::ToneEmbedding;
pub use registry::{RegistryError, SpeakerEntry, SpeakerRegistry};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // ===========================================
    // ToneEmbedding tests
    // ===========================================

    #[test]
    fn test_embedding_keeps_values_and_source() {
        let embedding = ToneEmbedding::new(vec![0.1, -0.2, 0.3], "kr");

        assert_eq!(embedding.values(), &[0.1, -0.2, 0.3]);
        assert_eq!(embedding.source(), "kr");
        assert_eq!(embedding.len(), 3);
    }

    #[test]
    fn test_embedding_compatible_same_length() {
        let a = ToneEmbedding::new(vec![0.0; 256], "a");
        let b = ToneEmbedding::new(vec![1.0; 256], "b");
        assert!(a.is_compatible(&b));
    }

    #[test]
    fn test_embedding_incompatible_length() {
        let a = ToneEmbedding::new(vec![0.0; 256], "a");
        let b = ToneEmbedding::new(vec![0.0; 128], "b");
        assert!(!a.is_compatible(&b));
    }

    #[test]
    fn test_empty_embedding_never_compatible() {
        let a = ToneEmbedding::new(vec![], "a");
        let b = ToneEmbedding::new(vec![], "b");
        assert!(a.is_empty());
        assert!(!a.is_compatible(&b));
    }

    #[test]
    fn test_embedding_deserialize_without_source() {
        let json = r#"{"values": [0.5, 0.25]}"#;
        let embedding: ToneEmbedding = serde_json::from_str(json).unwrap();
        assert_eq!(embedding.values(), &[0.5, 0.25]);
        assert_eq!(embedding.source(), "");
    }

    // ===========================================
    // SpeakerRegistry tests
    // ===========================================

    #[test]
    fn test_registry_rejects_empty() {
        let result = SpeakerRegistry::new(Vec::<(String, u32)>::new());
        assert!(matches!(result.unwrap_err(), RegistryError::Empty));
    }

    #[test]
    fn test_registry_single_speaker() {
        let registry = SpeakerRegistry::new([("KR", 0)]).unwrap();
        let base = registry.base_speaker();
        assert_eq!(base.key, "KR");
        assert_eq!(base.id, 0);
    }

    #[test]
    fn test_registry_base_speaker_is_last_listed() {
        let registry =
            SpeakerRegistry::new([("EN-US", 0), ("EN-BR", 1), ("EN_INDIA", 2)]).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.base_speaker().key, "EN_INDIA");
        assert_eq!(registry.base_speaker().id, 2);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SpeakerRegistry::new([("EN-US", 0), ("EN-BR", 1)]).unwrap();
        assert_eq!(registry.get("EN-BR").unwrap().id, 1);
        assert!(matches!(
            registry.get("ZH").unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[test]
    fn test_speaker_embedding_file_stem() {
        let entry = SpeakerEntry {
            key: "EN_NEWEST".to_string(),
            id: 0,
        };
        assert_eq!(entry.embedding_file_stem(), "en-newest");
    }

    #[test]
    fn test_speaker_embedding_path() {
        let entry = SpeakerEntry {
            key: "KR".to_string(),
            id: 0,
        };
        let path = entry.embedding_path(&PathBuf::from("checkpoints_v2"));
        assert_eq!(
            path,
            PathBuf::from("checkpoints_v2/base_speakers/ses/kr.pth")
        );
    }
}
