//! tts-studio: interactive voice cloning session.

use std::sync::mpsc;

use anyhow::{Context, Result};
use tone_tts::backend::create_backend;
use tone_tts::cli::{StudioArgs, detect_player, ensure_checkpoints, parse_args, print_banner};
use tone_tts::config::{OutputDirPolicy, ReferencePolicy};
use tone_tts::engine::{SessionConfig, TTSSession, validate_speed};
use tone_tts::logging;
use tone_tts::playback::AudioPlayer;
use tone_tts::studio::{
    Action, Job, STUDIO_HELP, Studio, StudioCommand, StudioWorker, run_console, spawn_printer,
};

fn main() -> Result<()> {
    let args: StudioArgs = parse_args();
    logging::init(args.common.verbose, false);

    let settings = args
        .common
        .resolve_settings()
        .context("Failed to load settings")?;
    let speed = validate_speed(args.speed)?;

    print_banner("TTS Studio");
    ensure_checkpoints(&settings, false);

    let config = SessionConfig::from_settings(
        &settings,
        ReferencePolicy::Require,
        OutputDirPolicy::Reuse,
    );
    let session = TTSSession::new(create_backend(&settings), config)
        .context("Failed to prepare output directory")?;
    let player = detect_player(&settings).map(|p| Box::new(p) as Box<dyn AudioPlayer>);

    let (events_tx, events_rx) = mpsc::channel();
    let printer = spawn_printer(events_rx);
    let worker = StudioWorker::spawn(session, player, events_tx);
    worker.submit(Job::Initialize);

    let mut studio = Studio::new(speed, settings.vad && !args.no_vad);
    if let Some(reference) = args.reference {
        match studio.dispatch(StudioCommand::Load(Some(reference))) {
            Action::Submit(job) => {
                worker.submit(job);
            }
            Action::Print(msg) => println!("{msg}"),
            Action::Quit | Action::Nothing => {}
        }
    }

    println!("{STUDIO_HELP}");
    run_console(&mut studio, &worker, std::io::stdin().lock());

    worker.shutdown();
    let _ = printer.join();
    Ok(())
}
