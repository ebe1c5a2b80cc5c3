//! tts-cli entry point.

use anyhow::{Context, Result};
use tone_tts::backend::create_backend;
use tone_tts::cli::{
    GenerationOptions, TtsCliArgs, detect_player, ensure_checkpoints, parse_args, plan_conversion,
    print_banner, run_generation,
};
use tone_tts::config::OutputDirPolicy;
use tone_tts::engine::{
    OutputNaming, SessionConfig, TTSSession, normalize_output_name, validate_speed, validate_text,
};
use tone_tts::logging;
use tone_tts::playback::AudioPlayer;

fn main() -> Result<()> {
    let args: TtsCliArgs = parse_args();
    logging::init(args.common.verbose, args.quiet);

    let settings = args
        .common
        .resolve_settings()
        .context("Failed to load settings")?;

    if !args.quiet {
        print_banner("Text-to-Speech CLI");
    }

    let text = validate_text(&args.text)?;
    let speed = validate_speed(args.speed)?;
    if let Some(name) = &args.output {
        normalize_output_name(name)?;
    }

    let plan = plan_conversion(&args, &settings)
        .context("Tone conversion needs a reference voice: pass --reference <audio>")?;
    let convert = plan.convert;
    let config = SessionConfig::from_settings(&settings, plan.policy, OutputDirPolicy::Clear);

    ensure_checkpoints(&settings, args.quiet);

    let mut session = TTSSession::new(create_backend(&settings), config)
        .context("Failed to prepare output directory")?;

    let fallback = if convert {
        OutputNaming::Sequential
    } else {
        OutputNaming::Timestamp
    };
    let options = GenerationOptions {
        text,
        speed,
        naming: OutputNaming::custom_or(args.output.as_deref(), fallback),
        convert,
        reference: args.reference.clone(),
        vad: settings.vad && !args.no_vad,
        play: !args.no_play,
        quiet: args.quiet,
    };

    let player = if args.no_play {
        None
    } else {
        detect_player(&settings)
    };
    run_generation(
        &mut session,
        player.as_ref().map(|p| p as &dyn AudioPlayer),
        &options,
    )
    .context("Speech generation failed")?;

    Ok(())
}
