//! Ensures the pretrained checkpoint directory exists locally.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{info, warn};

use super::fetch::ArchiveFetcher;

/// Explanation shown when checkpoints cannot be provisioned.
pub const CHECKPOINT_HELP: &str = include_str!("../../resources/checkpoint_help.txt");

/// Errors that can occur while provisioning checkpoints.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Corrupt archive: {0}")]
    Archive(String),

    #[error("Unsafe path in archive: {0}")]
    UnsafeEntry(String),

    #[error("Archive did not contain {0}")]
    MissingAfterExtract(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<zip::result::ZipError> for ProvisionError {
    fn from(e: zip::result::ZipError) -> Self {
        ProvisionError::Archive(e.to_string())
    }
}

/// What `ensure` had to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Directory was already there; contents are not checked.
    AlreadyPresent,
    /// Archive was downloaded and unpacked.
    Downloaded { archive_bytes: u64, extracted_bytes: u64 },
}

/// Downloads and unpacks the checkpoint archive when the model root is missing.
pub struct CheckpointProvisioner<F: ArchiveFetcher> {
    fetcher: F,
    url: String,
    show_progress: bool,
}

impl<F: ArchiveFetcher> CheckpointProvisioner<F> {
    pub fn new(fetcher: F, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
            show_progress: true,
        }
    }

    /// Hide the extraction progress bar.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Archive file name taken from the last URL segment.
    pub fn archive_name(&self) -> &str {
        self.url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("checkpoints.zip")
    }

    /// Make sure `model_root` exists, downloading it if it does not.
    ///
    /// Only presence is checked. A stale or partial directory is accepted.
    pub fn ensure(&self, model_root: &Path) -> Result<ProvisionOutcome, ProvisionError> {
        if model_root.exists() {
            info!(path = %model_root.display(), "checkpoints present");
            return Ok(ProvisionOutcome::AlreadyPresent);
        }

        let parent = match model_root.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let archive_path = parent.join(self.archive_name());
        info!(url = %self.url, "checkpoints missing, downloading");
        let archive_bytes = self.fetcher.fetch(&self.url, &archive_path)?;

        let staging = staging_dir(model_root, &parent);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;
        let installed = extract_archive(&archive_path, &staging, self.show_progress)
            .and_then(|bytes| install_staged_root(&staging, model_root).map(|()| bytes));

        if let Err(e) = fs::remove_file(&archive_path) {
            warn!(path = %archive_path.display(), "could not remove archive: {e}");
        }
        if staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                warn!(path = %staging.display(), "could not remove staging directory: {e}");
            }
        }
        let extracted_bytes = installed?;

        info!(extracted_bytes, "checkpoints unpacked");
        Ok(ProvisionOutcome::Downloaded {
            archive_bytes,
            extracted_bytes,
        })
    }
}

/// Sibling of `model_root` the archive is unpacked into before it is moved.
fn staging_dir(model_root: &Path, parent: &Path) -> PathBuf {
    let name = model_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "checkpoints".to_string());
    parent.join(format!(".{name}.partial"))
}

/// Move the archive's single top-level directory to `model_root`.
///
/// The directory must hold a `converter/` folder; the archive's own folder
/// name does not matter, so any model root can be provisioned.
fn install_staged_root(staging: &Path, model_root: &Path) -> Result<(), ProvisionError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }

    match dirs.as_slice() {
        [root] if root.join("converter").is_dir() => {
            fs::rename(root, model_root)?;
            Ok(())
        }
        _ => Err(ProvisionError::MissingAfterExtract(model_root.to_path_buf())),
    }
}

/// Unpack a zip archive into `dest`, returning total uncompressed bytes.
pub fn extract_archive(
    archive_path: &Path,
    dest: &Path,
    show_progress: bool,
) -> Result<u64, ProvisionError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut total = 0u64;
    for i in 0..archive.len() {
        total += archive.by_index(i)?.size();
    }

    let pb = if show_progress {
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
        {
            pb.set_style(style);
        }
        pb.set_message("Extracting");
        pb
    } else {
        ProgressBar::hidden()
    };

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ProvisionError::UnsafeEntry(entry.name().to_string()))?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        pb.inc(entry.size());
    }

    pb.finish_with_message("Extracted");
    Ok(total)
}
