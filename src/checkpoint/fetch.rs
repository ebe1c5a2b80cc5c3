//! Streamed archive download.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use super::ProvisionError;

/// Downloads an archive to a local file.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher {
    /// Fetch `url` into `dest`, returning the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, ProvisionError>;
}

/// Fetches archives over HTTP with a byte progress bar.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(show_progress: bool) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(None)
                .build()
                .unwrap_or_default(),
            show_progress,
        }
    }

    fn progress_bar(&self, total: Option<u64>, label: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = match total {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb.set_message(label.to_string());
        pb
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64, ProvisionError> {
        let temp_path = dest.with_extension("download.tmp");
        debug!(%url, dest = %dest.display(), "downloading archive");

        let result = (|| -> Result<u64, ProvisionError> {
            let response = self
                .client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| ProvisionError::Download(e.to_string()))?;

            let label = dest
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("checkpoint")
                .to_string();
            let pb = self.progress_bar(response.content_length(), &label);

            let mut file = File::create(&temp_path)?;
            let written = io::copy(&mut pb.wrap_read(response), &mut file)
                .map_err(|e| ProvisionError::Download(e.to_string()))?;
            file.flush()?;
            pb.finish_with_message(format!("{label} downloaded"));

            fs::rename(&temp_path, dest)?;
            Ok(written)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }
}
