//! CLI argument definitions and parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, DevicePreference, Language, Settings};
use crate::engine::DEFAULT_SPEED;

/// Options shared by every front end.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Directory holding the pretrained checkpoints
    #[arg(long)]
    pub model_root: Option<PathBuf>,

    /// Directory for generated audio files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Language of the text-to-speech model
    #[arg(long, value_enum)]
    pub language: Option<Language>,

    /// Compute device for the model server
    #[arg(long, value_enum)]
    pub device: Option<DevicePreference>,

    /// Model server host address
    #[arg(long)]
    pub host: Option<String>,

    /// Model server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Settings file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load settings from the config file and apply command-line overrides.
    pub fn resolve_settings(&self) -> Result<Settings, ConfigError> {
        let settings = Settings::load(self.config.as_deref())?;
        Ok(self.apply(settings))
    }

    /// Apply command-line overrides on top of `settings`.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(root) = &self.model_root {
            settings.model_root = root.clone();
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        if let Some(device) = self.device {
            settings.device = device;
        }
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        settings
    }
}

/// Text-to-speech with optional tone color conversion.
#[derive(Parser, Debug)]
#[command(name = "tts-cli")]
#[command(about = "Convert text to speech, optionally in the tone of a reference voice")]
#[command(version)]
#[command(after_help = "Examples:
  tts-cli \"안녕하세요\"
  tts-cli \"빠르게 말하기\" --speed 1.5
  tts-cli \"테스트\" --output my_audio
  tts-cli \"조용히\" --no-play --quiet
  tts-cli \"변조\" -c --reference sample.m4a")]
pub struct TtsCliArgs {
    /// Text to convert to speech
    pub text: String,

    /// Speech speed multiplier (0.5 to 3.0)
    #[arg(short, long, default_value_t = DEFAULT_SPEED)]
    pub speed: f32,

    /// Output file name (".wav" is added if missing)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Do not play the result
    #[arg(long)]
    pub no_play: bool,

    /// Print only the result summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Apply tone color conversion (default: plain synthesis)
    #[arg(short, long)]
    pub conversion: bool,

    /// Reference voice sample to convert toward (implies --conversion)
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Disable voice activity detection on the reference sample
    #[arg(long)]
    pub no_vad: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Text-to-speech in the base speaker's voice, with tone conversion that
/// never fails for lack of a reference sample.
#[derive(Parser, Debug)]
#[command(name = "simple-tts")]
#[command(about = "Convert text to speech with the base voice")]
#[command(version)]
#[command(after_help = "Examples:
  simple-tts \"안녕하세요\"
  simple-tts \"빠르게 말하기\" --speed 1.5
  simple-tts \"테스트\" --output my_audio
  simple-tts \"조용히\" --no-play --quiet")]
pub struct SimpleArgs {
    /// Text to convert to speech
    pub text: Option<String>,

    /// Speech speed multiplier (0.5 to 3.0)
    #[arg(short, long, default_value_t = DEFAULT_SPEED)]
    pub speed: f32,

    /// Output file name (default: timestamp based)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Do not play the result
    #[arg(long)]
    pub no_play: bool,

    /// Print only the result summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Reference voice sample; without one the base voice is kept
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Disable voice activity detection on the reference sample
    #[arg(long)]
    pub no_vad: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Interactive session: load a reference voice, generate, play.
#[derive(Parser, Debug)]
#[command(name = "tts-studio")]
#[command(about = "Interactive voice cloning session")]
#[command(version)]
pub struct StudioArgs {
    /// Reference voice sample to load at startup
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Speech speed multiplier used for generation (0.5 to 3.0)
    #[arg(short, long, default_value_t = DEFAULT_SPEED)]
    pub speed: f32,

    /// Disable voice activity detection on reference samples
    #[arg(long)]
    pub no_vad: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}
