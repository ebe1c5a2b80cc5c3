//! simple-tts: base-voice text-to-speech that works without a reference sample.

use anyhow::{Context, Result};
use clap::CommandFactory;
use tone_tts::backend::create_backend;
use tone_tts::cli::{
    GenerationOptions, SimpleArgs, detect_player, ensure_checkpoints, parse_args, print_banner,
    run_generation,
};
use tone_tts::config::{OutputDirPolicy, ReferencePolicy};
use tone_tts::engine::{
    OutputNaming, SessionConfig, TTSSession, normalize_output_name, validate_speed, validate_text,
};
use tone_tts::logging;
use tone_tts::playback::AudioPlayer;

fn main() -> Result<()> {
    let args: SimpleArgs = parse_args();
    logging::init(args.common.verbose, args.quiet);

    let Some(raw_text) = args.text.as_deref() else {
        print_banner("Simple TTS");
        println!("Usage: simple-tts \"text\" [options]");
        println!();
        SimpleArgs::command()
            .print_help()
            .context("Failed to print help")?;
        return Ok(());
    };

    let settings = args
        .common
        .resolve_settings()
        .context("Failed to load settings")?;

    if !args.quiet {
        print_banner("Simple TTS");
    }

    let text = validate_text(raw_text)?;
    let speed = validate_speed(args.speed)?;
    if let Some(name) = &args.output {
        normalize_output_name(name)?;
    }

    ensure_checkpoints(&settings, args.quiet);

    let config = SessionConfig::from_settings(
        &settings,
        ReferencePolicy::FallbackToSource,
        OutputDirPolicy::Reuse,
    );
    let mut session = TTSSession::new(create_backend(&settings), config)
        .context("Failed to prepare output directory")?;

    let options = GenerationOptions {
        text,
        speed,
        naming: OutputNaming::custom_or(args.output.as_deref(), OutputNaming::Timestamp),
        convert: true,
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
