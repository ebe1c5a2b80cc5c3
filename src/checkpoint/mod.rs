//! Checkpoint provisioning.
//!
//! The converter weights and base speaker embeddings ship as one zip
//! archive. If the model root directory is missing it is downloaded and
//! unpacked; if it exists it is used as is.

mod fetch;
mod provisioner;

#[cfg(test)]
pub use fetch::MockArchiveFetcher;
pub use fetch::{ArchiveFetcher, HttpFetcher};
pub use provisioner::{
    CHECKPOINT_HELP, CheckpointProvisioner, ProvisionError, ProvisionOutcome, extract_archive,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    const URL: &str = "https://example.com/files/checkpoints_v2_0417.zip";

    /// Write a zip with the usual checkpoint layout to `path`.
    fn write_checkpoint_zip(path: &Path) -> u64 {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        zip.add_directory("checkpoints_v2/", options).unwrap();
        zip.start_file("checkpoints_v2/converter/config.json", options)
            .unwrap();
        zip.write_all(br#"{"model": {}}"#).unwrap();
        zip.start_file("checkpoints_v2/converter/checkpoint.pth", options)
            .unwrap();
        zip.write_all(&[7u8; 64]).unwrap();
        zip.start_file("checkpoints_v2/base_speakers/ses/kr.pth", options)
            .unwrap();
        zip.write_all(&[1u8; 32]).unwrap();
        zip.finish().unwrap();

        std::fs::metadata(path).unwrap().len()
    }

    #[test]
    fn test_archive_name_from_url() {
        let provisioner = CheckpointProvisioner::new(MockArchiveFetcher::new(), URL);
        assert_eq!(provisioner.archive_name(), "checkpoints_v2_0417.zip");
    }

    #[test]
    fn test_existing_directory_skips_download() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("checkpoints_v2");
        std::fs::create_dir_all(&model_root).unwrap();

        let mut fetcher = MockArchiveFetcher::new();
        fetcher.expect_fetch().times(0);

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        let outcome = provisioner.ensure(&model_root).unwrap();

        assert_eq!(outcome, ProvisionOutcome::AlreadyPresent);
    }

    #[test]
    fn test_existing_empty_directory_is_accepted() {
        // Presence-only check: an empty directory counts as provisioned.
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("checkpoints_v2");
        std::fs::create_dir_all(&model_root).unwrap();

        let mut fetcher = MockArchiveFetcher::new();
        fetcher.expect_fetch().never();

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        assert_eq!(
            provisioner.ensure(&model_root).unwrap(),
            ProvisionOutcome::AlreadyPresent
        );
    }

    #[test]
    fn test_missing_directory_downloads_once_and_extracts() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("checkpoints_v2");

        let mut fetcher = MockArchiveFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|url, dest| {
                url == URL && dest.file_name().unwrap() == "checkpoints_v2_0417.zip"
            })
            .times(1)
            .returning(|_, dest| Ok(write_checkpoint_zip(dest)));

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        let outcome = provisioner.ensure(&model_root).unwrap();

        match outcome {
            ProvisionOutcome::Downloaded {
                archive_bytes,
                extracted_bytes,
            } => {
                assert!(archive_bytes > 0);
                assert_eq!(extracted_bytes, 13 + 64 + 32);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert!(model_root.join("converter/config.json").exists());
        assert!(model_root.join("converter/checkpoint.pth").exists());
        assert!(model_root.join("base_speakers/ses/kr.pth").exists());
        // Archive is removed after extraction
        assert!(!temp_dir.path().join("checkpoints_v2_0417.zip").exists());
    }

    #[test]
    fn test_second_run_skips_after_successful_download() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("checkpoints_v2");

        let mut fetcher = MockArchiveFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, dest| Ok(write_checkpoint_zip(dest)));

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        assert!(matches!(
            provisioner.ensure(&model_root).unwrap(),
            ProvisionOutcome::Downloaded { .. }
        ));
        assert_eq!(
            provisioner.ensure(&model_root).unwrap(),
            ProvisionOutcome::AlreadyPresent
        );
    }

    #[test]
    fn test_download_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("checkpoints_v2");

        let mut fetcher = MockArchiveFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(ProvisionError::Download("connection reset".to_string())));

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        let result = provisioner.ensure(&model_root);

        assert!(matches!(result.unwrap_err(), ProvisionError::Download(_)));
        assert!(!model_root.exists());
    }

    #[test]
    fn test_corrupt_archive_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("checkpoints_v2");

        let mut fetcher = MockArchiveFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_, dest| {
            std::fs::write(dest, b"this is not a zip file").unwrap();
            Ok(22)
        });

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        let result = provisioner.ensure(&model_root);

        assert!(matches!(result.unwrap_err(), ProvisionError::Archive(_)));
        assert!(!temp_dir.path().join("checkpoints_v2_0417.zip").exists());
    }

    #[test]
    fn test_archive_without_expected_root() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("checkpoints_v2");

        let mut fetcher = MockArchiveFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_, dest| {
            let file = std::fs::File::create(dest).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("other/readme.txt", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
            Ok(1)
        });

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        let result = provisioner.ensure(&model_root);

        assert!(matches!(
            result.unwrap_err(),
            ProvisionError::MissingAfterExtract(_)
        ));
    }

    #[test]
    fn test_custom_model_root_is_provisioned_once() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("my_models");

        let mut fetcher = MockArchiveFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_, dest| Ok(write_checkpoint_zip(dest)));

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        assert!(matches!(
            provisioner.ensure(&model_root).unwrap(),
            ProvisionOutcome::Downloaded { .. }
        ));
        assert_eq!(
            provisioner.ensure(&model_root).unwrap(),
            ProvisionOutcome::AlreadyPresent
        );

        assert!(model_root.join("converter/checkpoint.pth").exists());
        assert!(model_root.join("base_speakers/ses/kr.pth").exists());
        // Nothing left next to the model root
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| name != "my_models")
            .collect();
        assert!(leftovers.is_empty(), "unexpected files: {leftovers:?}");
    }

    #[test]
    fn test_failed_extract_leaves_no_staging() {
        let temp_dir = TempDir::new().unwrap();
        let model_root = temp_dir.path().join("models");

        let mut fetcher = MockArchiveFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_, dest| {
            let file = std::fs::File::create(dest).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("loose.pth", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"x").unwrap();
            zip.finish().unwrap();
            Ok(1)
        });

        let provisioner = CheckpointProvisioner::new(fetcher, URL).quiet();
        assert!(matches!(
            provisioner.ensure(&model_root).unwrap_err(),
            ProvisionError::MissingAfterExtract(_)
        ));
        assert!(!model_root.exists());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_help_text_is_bundled() {
        assert!(CHECKPOINT_HELP.contains("checkpoints_v2/converter/checkpoint.pth"));
    }
}
