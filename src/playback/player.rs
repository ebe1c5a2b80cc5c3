//! External-command audio playback.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Players tried in order when none is configured.
pub const KNOWN_PLAYERS: &[&str] = &["aplay", "afplay", "paplay", "pw-play", "ffplay"];

/// Errors that can occur during playback.
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("No audio player found (tried: {0})")]
    PlayerNotFound(String),

    #[error("Audio file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Playback timed out after {0:?}")]
    Timeout(Duration),

    #[error("Player exited with failure: {0}")]
    Failed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PlaybackError {
    /// A hint on how to fix the problem, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            PlaybackError::PlayerNotFound(_) => Some(
                "Install an audio player, e.g. `sudo apt install alsa-utils` for aplay, \
                 or play the file manually.",
            ),
            _ => None,
        }
    }
}

/// Plays an audio file, blocking until it finishes.
#[cfg_attr(test, mockall::automock)]
pub trait AudioPlayer: Send {
    fn play(&self, path: &Path) -> Result<(), PlaybackError>;
}

/// Plays audio by running an external command.
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandPlayer {
    /// Use a specific player program.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        let program = program.into();
        let args = match program.as_str() {
            "ffplay" => ["-autoexit", "-nodisp", "-loglevel", "error"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            _ => Vec::new(),
        };

        Self {
            program,
            args,
            timeout,
        }
    }

    /// Replace the arguments passed before the file path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Pick the configured player, or the first known one found on PATH.
    pub fn detect(preferred: Option<&str>, timeout: Duration) -> Result<Self, PlaybackError> {
        if let Some(program) = preferred {
            if executable_in_path(program) {
                return Ok(Self::new(program, timeout));
            }
            return Err(PlaybackError::PlayerNotFound(program.to_string()));
        }

        KNOWN_PLAYERS
            .iter()
            .find(|p| executable_in_path(p))
            .map(|p| Self::new(*p, timeout))
            .ok_or_else(|| PlaybackError::PlayerNotFound(KNOWN_PLAYERS.join(", ")))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(path);
        cmd
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, path: &Path) -> Result<(), PlaybackError> {
        if !path.exists() {
            return Err(PlaybackError::FileNotFound(path.to_path_buf()));
        }

        debug!(player = %self.program, path = %path.display(), "starting playback");
        let mut child = self
            .command(path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PlaybackError::PlayerNotFound(self.program.clone()),
                _ => PlaybackError::IoError(e),
            })?;

        // stderr must be drained while the player runs or a full pipe blocks it
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                buf
            })
        });
        let collect_stderr = |reader: Option<thread::JoinHandle<Vec<u8>>>| {
            reader
                .and_then(|handle| handle.join().ok())
                .map(|buf| String::from_utf8_lossy(&buf).trim().to_string())
                .unwrap_or_default()
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                let stderr = collect_stderr(stderr_reader);
                if status.success() {
                    return Ok(());
                }
                let detail = if stderr.is_empty() {
                    status.to_string()
                } else {
                    stderr
                };
                return Err(PlaybackError::Failed(detail));
            }

            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                let _ = collect_stderr(stderr_reader);
                return Err(PlaybackError::Timeout(self.timeout));
            }

            thread::sleep(Duration::from_millis(50));
        }
    }
}

/// Whether `program` resolves to an executable file on PATH.
pub fn executable_in_path(program: &str) -> bool {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file();
    }

    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };

    std::env::split_paths(&paths).any(|dir| dir.join(program).is_file())
}
