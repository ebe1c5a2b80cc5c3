//! The generation pipeline shared by the command-line front ends.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info, warn};

use crate::backend::Backend;
use crate::checkpoint::{
    CHECKPOINT_HELP, CheckpointProvisioner, HttpFetcher, ProvisionError, ProvisionOutcome,
};
use crate::config::{ReferencePolicy, Settings};
use crate::engine::{
    GeneratedAudio, OutputNaming, SpeechRequest, TTSError, TTSSession, text_preview,
};
use crate::playback::{AudioPlayer, CommandPlayer};

use super::args::TtsCliArgs;

/// Exit status for failures and rejected input.
pub const EXIT_FAILURE: i32 = 1;

/// Parse arguments. Usage errors exit with status 1; `--help` and
/// `--version` exit with 0.
pub fn parse_args<T: Parser>() -> T {
    T::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() { EXIT_FAILURE } else { 0 };
        let _ = err.print();
        std::process::exit(code);
    })
}

/// Print the startup banner.
pub fn print_banner(title: &str) {
    let rule = "═".repeat(55);
    println!("🎤 {rule}");
    println!("   {title}");
    println!("{rule}");
}

/// Whether `tts-cli` converts, and the reference policy it runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionPlan {
    pub convert: bool,
    pub policy: ReferencePolicy,
}

/// Resolve conversion for `tts-cli` before any model or filesystem work.
///
/// `--reference` implies conversion. Conversion without a reference fails
/// with [`TTSError::MissingReference`] unless the configured policy falls
/// back to the source voice.
pub fn plan_conversion(
    args: &TtsCliArgs,
    settings: &Settings,
) -> Result<ConversionPlan, TTSError> {
    let convert = args.conversion || args.reference.is_some();
    let policy = settings.reference_policy.unwrap_or(ReferencePolicy::Require);

    if convert && args.reference.is_none() && policy == ReferencePolicy::Require {
        return Err(TTSError::MissingReference);
    }
    Ok(ConversionPlan { convert, policy })
}

/// What a front end asks the pipeline to do.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Already validated text.
    pub text: String,
    pub speed: f32,
    pub naming: OutputNaming,
    pub convert: bool,
    pub reference: Option<PathBuf>,
    pub vad: bool,
    pub play: bool,
    pub quiet: bool,
}

impl GenerationOptions {
    fn request(&self) -> SpeechRequest {
        let request = SpeechRequest::new(self.text.clone())
            .with_speed(self.speed)
            .with_naming(self.naming.clone());
        if self.convert { request } else { request.plain() }
    }
}

/// Download checkpoints if the model root is missing.
///
/// Failures are reported with the bundled help text and do not stop the
/// caller; model loading will fail afterwards.
pub fn ensure_checkpoints(settings: &Settings, quiet: bool) -> Option<ProvisionOutcome> {
    let provisioner = CheckpointProvisioner::new(HttpFetcher::new(!quiet), &settings.checkpoint_url);
    let provisioner = if quiet { provisioner.quiet() } else { provisioner };
    report_provisioning(provisioner.ensure(&settings.model_root))
}

/// Report the outcome of provisioning to the user.
pub fn report_provisioning(
    result: Result<ProvisionOutcome, ProvisionError>,
) -> Option<ProvisionOutcome> {
    match result {
        Ok(outcome) => {
            if let ProvisionOutcome::Downloaded { extracted_bytes, .. } = &outcome {
                info!("checkpoints installed ({} bytes)", format_bytes(*extracted_bytes));
            }
            Some(outcome)
        }
        Err(e) => {
            error!("checkpoint provisioning failed: {e}");
            eprintln!("{CHECKPOINT_HELP}");
            eprintln!("Details: {e}");
            None
        }
    }
}

/// Initialize the session, load the reference if any, generate, report and
/// optionally play.
pub fn run_generation<B: Backend>(
    session: &mut TTSSession<B>,
    player: Option<&dyn AudioPlayer>,
    options: &GenerationOptions,
) -> Result<GeneratedAudio, TTSError> {
    let started = Instant::now();
    if !options.quiet {
        println!("🔧 Initializing TTS system...");
    }
    let models = session.initialize()?;
    info!(speaker = %models.speaker.key, device = %models.device, "TTS system ready");

    if let Some(reference) = &options.reference {
        if !options.quiet {
            println!("🎙️  Loading reference voice: {}", reference.display());
        }
        session.load_reference(reference, options.vad)?;
    }

    if !options.quiet {
        println!("🗣️  Text: '{}'", text_preview(&options.text));
        println!("⚡ Speed: {}x", options.speed);
    }

    let generated = session.generate(&options.request())?;
    print_summary(&generated, started.elapsed());

    if options.play {
        match player {
            Some(player) => {
                play_with(player, &generated.path);
            }
            None => warn!("no audio player available, skipping playback"),
        }
    }

    if !options.quiet {
        println!();
        println!("💡 To play the generated file:");
        println!("   aplay {}   # Linux", generated.path.display());
        println!("   afplay {}  # macOS", generated.path.display());
    }

    Ok(generated)
}

/// Print path, size and timing of a generated file.
///
/// `total` covers the whole run including model loading.
pub fn print_summary(generated: &GeneratedAudio, total: Duration) {
    for line in summary_lines(generated, total) {
        println!("{line}");
    }
}

/// Report lines for [`print_summary`].
pub fn summary_lines(generated: &GeneratedAudio, total: Duration) -> Vec<String> {
    let mut lines = vec![
        "✅ Done!".to_string(),
        format!("📁 Output: {}", generated.path.display()),
        format!("📊 Size: {} bytes", format_bytes(generated.size_bytes)),
    ];
    if let Some(duration) = generated.duration_secs {
        lines.push(format!("🎧 Duration: {duration:.2}s"));
    }
    lines.push(format!(
        "⏱️  Generation time: {:.2}s",
        generated.elapsed.as_secs_f64()
    ));
    lines.push(format!(
        "⏱️  Total processing time: {:.2}s",
        total.as_secs_f64()
    ));
    lines
}

/// Find the configured or a known player. Problems are logged and `None`
/// is returned.
pub fn detect_player(settings: &Settings) -> Option<CommandPlayer> {
    let timeout = Duration::from_secs(settings.playback_timeout_secs);
    match CommandPlayer::detect(settings.player.as_deref(), timeout) {
        Ok(player) => Some(player),
        Err(e) => {
            warn!("{e}");
            if let Some(hint) = e.hint() {
                eprintln!("{hint}");
            }
            None
        }
    }
}

/// Play `path`, logging any failure. Returns whether playback completed.
pub fn play_with(player: &dyn AudioPlayer, path: &Path) -> bool {
    println!("🔊 Playing audio...");
    match player.play(path) {
        Ok(()) => {
            println!("🎵 Playback finished");
            true
        }
        Err(e) => {
            warn!("playback failed: {e}");
            if let Some(hint) = e.hint() {
                eprintln!("{hint}");
            }
            false
        }
    }
}

/// Format a byte count with thousands separators (`1234567` -> `1,234,567`).
pub fn format_bytes(bytes: u64) -> String {
    let digits = bytes.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
