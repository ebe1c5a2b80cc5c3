//! Interactive studio: select a reference sample, load it, generate and
//! play, with generation running on a background worker.

mod command;
mod worker;

pub use command::{CommandError, SAMPLE_EXTENSIONS, STUDIO_HELP, StudioCommand, is_sample_file};
pub use worker::{Event, Job, StudioStatus, StudioWorker};

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use crate::cli::format_bytes;
use crate::engine::{text_preview, validate_text};

/// What the console does with a parsed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Submit(Job),
    Print(String),
    Quit,
    Nothing,
}

/// Console-side state: the selected sample and generation options.
#[derive(Debug, Clone)]
pub struct Studio {
    selected: Option<PathBuf>,
    speed: f32,
    vad: bool,
}

impl Studio {
    pub fn new(speed: f32, vad: bool) -> Self {
        Self {
            selected: None,
            speed,
            vad,
        }
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    /// Turn a command into an action. Input problems are answered locally
    /// and never reach the worker.
    pub fn dispatch(&mut self, command: StudioCommand) -> Action {
        match command {
            StudioCommand::Browse(path) => self.select(path),
            StudioCommand::Load(path) => {
                if let Some(path) = path {
                    if !path.exists() {
                        return Action::Print(format!("Sample file not found: {}", path.display()));
                    }
                    self.selected = Some(path);
                }
                match &self.selected {
                    None => Action::Print(
                        "No sample selected. Use 'browse <path>' first.".to_string(),
                    ),
                    Some(path) if !path.exists() => Action::Print(format!(
                        "Sample file not found: {}",
                        path.display()
                    )),
                    Some(path) => Action::Submit(Job::LoadReference {
                        path: path.clone(),
                        vad: self.vad,
                    }),
                }
            }
            StudioCommand::Generate(text) => match validate_text(&text) {
                Ok(text) => Action::Submit(Job::Generate {
                    text: text.to_string(),
                    speed: self.speed,
                }),
                Err(e) => Action::Print(format!("Error: {e}")),
            },
            StudioCommand::Play => Action::Submit(Job::Play),
            StudioCommand::Status => Action::Submit(Job::Status),
            StudioCommand::Help => Action::Print(STUDIO_HELP.to_string()),
            StudioCommand::Quit => Action::Quit,
            StudioCommand::Nothing => Action::Nothing,
        }
    }

    fn select(&mut self, path: PathBuf) -> Action {
        if !path.exists() {
            return Action::Print(format!("Sample file not found: {}", path.display()));
        }
        let note = if is_sample_file(&path) {
            String::new()
        } else {
            format!(" (expected one of: {})", SAMPLE_EXTENSIONS.join(", "))
        };
        let msg = format!("Selected sample: {}{note}", path.display());
        self.selected = Some(path);
        Action::Print(msg)
    }
}

/// Render a worker event as a log line.
pub fn describe(event: &Event) -> String {
    match event {
        Event::Log(msg) => msg.clone(),
        Event::Ready { device, speaker } => {
            format!("TTS System Initialized (device: {device}, base speaker: {speaker}).")
        }
        Event::ReferenceLoaded { path, dims } => format!(
            "Sample voice loaded successfully: {} ({dims} dims)",
            path.display()
        ),
        Event::Generated(generated) => format!(
            "TTS generation completed: {} ({} bytes, {:.2}s)",
            generated.path.display(),
            format_bytes(generated.size_bytes),
            generated.elapsed.as_secs_f64()
        ),
        Event::Played(path) => format!("Playback completed: {}", path.display()),
        Event::Status(status) => {
            let mut lines = vec![format!(
                "Models: {}",
                match (&status.device, &status.speaker) {
                    (Some(device), Some(speaker)) => format!("loaded on {device} ({speaker})"),
                    _ => "not loaded".to_string(),
                }
            )];
            lines.push(format!(
                "Reference voice: {}",
                if status.has_reference { "loaded" } else { "none" }
            ));
            lines.push(format!("Results: {}", status.result_count));
            if let Some(last) = &status.last_result {
                lines.push(format!("Last result: {}", last.display()));
            }
            lines.join("\n")
        }
        Event::Failed(msg) => format!("❌ {msg}"),
    }
}

/// Print worker events until the channel closes.
pub fn spawn_printer(events: Receiver<Event>) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in events {
            println!("{}", describe(&event));
        }
    })
}

/// Read commands from `input` until `quit` or end of input.
pub fn run_console<R: BufRead>(studio: &mut Studio, worker: &StudioWorker, input: R) {
    prompt();
    for line in input.lines() {
        let Ok(line) = line else { break };
        let action = match StudioCommand::parse(&line) {
            Ok(command) => studio.dispatch(command),
            Err(e) => Action::Print(e.to_string()),
        };
        match action {
            Action::Submit(job) => {
                if let Job::Generate { text, .. } = &job {
                    println!("Generating TTS for text: {}", text_preview(text));
                }
                if !worker.submit(job) {
                    println!("❌ Worker stopped");
                    break;
                }
            }
            Action::Print(msg) => println!("{msg}"),
            Action::Quit => break,
            Action::Nothing => {}
        }
        prompt();
    }
}

fn prompt() {
    print!("studio> ");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, HealthResponse, LoadResponse, MockBackend, SpeakerInfo};
    use crate::config::{DevicePreference, Language, OutputDirPolicy, ReferencePolicy};
    use crate::engine::{SessionConfig, TTSSession};
    use crate::playback::MockAudioPlayer;
    use crate::voice::ToneEmbedding;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    // ===========================================
    // Command parsing tests
    // ===========================================

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            StudioCommand::parse("browse /tmp/me.mp3"),
            Ok(StudioCommand::Browse(PathBuf::from("/tmp/me.mp3")))
        );
        assert_eq!(StudioCommand::parse("load"), Ok(StudioCommand::Load(None)));
        assert_eq!(
            StudioCommand::parse("LOAD  voice sample.wav "),
            Ok(StudioCommand::Load(Some(PathBuf::from("voice sample.wav"))))
        );
        assert_eq!(
            StudioCommand::parse("generate 안녕하세요  반갑습니다"),
            Ok(StudioCommand::Generate("안녕하세요  반갑습니다".to_string()))
        );
        assert_eq!(StudioCommand::parse("play"), Ok(StudioCommand::Play));
        assert_eq!(StudioCommand::parse("q"), Ok(StudioCommand::Quit));
        assert_eq!(StudioCommand::parse("   "), Ok(StudioCommand::Nothing));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            StudioCommand::parse("browse"),
            Err(CommandError::MissingArgument { command: "browse", .. })
        ));
        assert!(matches!(
            StudioCommand::parse("generate   "),
            Err(CommandError::MissingArgument { command: "generate", .. })
        ));
        assert_eq!(
            StudioCommand::parse("dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_is_sample_file() {
        assert!(is_sample_file(Path::new("a.MP3")));
        assert!(is_sample_file(Path::new("dir/b.m4a")));
        assert!(!is_sample_file(Path::new("notes.txt")));
        assert!(!is_sample_file(Path::new("noext")));
    }

    // ===========================================
    // Dispatch tests
    // ===========================================

    #[test]
    fn test_load_without_selection() {
        let mut studio = Studio::new(1.1, true);
        let action = studio.dispatch(StudioCommand::Load(None));
        assert!(matches!(action, Action::Print(msg) if msg.contains("No sample selected")));
    }

    #[test]
    fn test_browse_missing_file_keeps_selection() {
        let temp_dir = TempDir::new().unwrap();
        let sample = temp_dir.path().join("me.mp3");
        std::fs::write(&sample, b"fake").unwrap();

        let mut studio = Studio::new(1.1, true);
        studio.dispatch(StudioCommand::Browse(sample.clone()));
        let action = studio.dispatch(StudioCommand::Browse(temp_dir.path().join("gone.mp3")));

        assert!(matches!(action, Action::Print(msg) if msg.contains("not found")));
        assert_eq!(studio.selected(), Some(sample.as_path()));
    }

    #[test]
    fn test_browse_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let sample = temp_dir.path().join("me.mp3");
        std::fs::write(&sample, b"fake").unwrap();

        let mut studio = Studio::new(1.1, false);
        studio.dispatch(StudioCommand::Browse(sample.clone()));

        assert_eq!(
            studio.dispatch(StudioCommand::Load(None)),
            Action::Submit(Job::LoadReference {
                path: sample,
                vad: false
            })
        );
    }

    #[test]
    fn test_load_with_path_selects_it() {
        let temp_dir = TempDir::new().unwrap();
        let sample = temp_dir.path().join("me.wav");
        std::fs::write(&sample, b"fake").unwrap();

        let mut studio = Studio::new(1.1, true);
        let action = studio.dispatch(StudioCommand::Load(Some(sample.clone())));

        assert!(matches!(action, Action::Submit(Job::LoadReference { .. })));
        assert_eq!(studio.selected(), Some(sample.as_path()));
    }

    #[test]
    fn test_generate_validates_locally() {
        let mut studio = Studio::new(1.3, true);

        let action = studio.dispatch(StudioCommand::Generate("x".repeat(1001)));
        assert!(matches!(action, Action::Print(_)));

        assert_eq!(
            studio.dispatch(StudioCommand::Generate("  안녕하세요 ".to_string())),
            Action::Submit(Job::Generate {
                text: "안녕하세요".to_string(),
                speed: 1.3
            })
        );
    }

    #[test]
    fn test_describe_status() {
        let text = describe(&Event::Status(StudioStatus {
            initialized: false,
            device: None,
            speaker: None,
            has_reference: false,
            result_count: 0,
            last_result: None,
        }));
        assert!(text.contains("not loaded"));
        assert!(text.contains("Results: 0"));
    }

    // ===========================================
    // Worker tests
    // ===========================================

    fn wav_bytes() -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 22050,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..2205 {
                writer.write_sample((i % 64) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn studio_session(temp_dir: &TempDir, mock: MockBackend) -> TTSSession<MockBackend> {
        let root = temp_dir.path().join("checkpoints_v2");
        std::fs::create_dir_all(root.join("converter")).unwrap();
        std::fs::create_dir_all(root.join("base_speakers/ses")).unwrap();
        std::fs::write(root.join("converter/config.json"), "{}").unwrap();
        std::fs::write(root.join("converter/checkpoint.pth"), [1u8]).unwrap();
        std::fs::write(root.join("base_speakers/ses/kr.pth"), [1u8]).unwrap();

        let config = SessionConfig {
            model_root: root,
            output_dir: temp_dir.path().join("output"),
            language: Language::Kr,
            device: DevicePreference::Auto,
            reference_policy: ReferencePolicy::Require,
            output_dir_policy: OutputDirPolicy::Reuse,
        };
        TTSSession::new(mock, config).unwrap()
    }

    fn studio_backend() -> MockBackend {
        let mut mock = MockBackend::new();
        mock.expect_health().returning(|| {
            Ok(HealthResponse {
                status: "healthy".to_string(),
                cuda_available: true,
                gpu: Some("RTX".to_string()),
                device: "cuda:0".to_string(),
            })
        });
        mock.expect_load_models().times(1).returning(|_| {
            Ok(LoadResponse {
                device: "cuda:0".to_string(),
                speakers: vec![SpeakerInfo {
                    key: "KR".to_string(),
                    id: 0,
                }],
            })
        });
        mock.expect_load_embedding()
            .returning(|_| Ok(ToneEmbedding::new(vec![0.5; 16], "KR")));
        mock
    }

    fn collect(rx: &mpsc::Receiver<Event>, count: usize) -> Vec<Event> {
        (0..count)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect()
    }

    #[test]
    fn test_worker_generates_queued_jobs_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let sample = temp_dir.path().join("me.mp3");
        std::fs::write(&sample, b"fake").unwrap();

        let mut mock = studio_backend();
        mock.expect_extract_embedding()
            .times(1)
            .returning(|_, _| Ok(ToneEmbedding::new(vec![1.0; 16], "me.mp3")));
        let audio = wav_bytes();
        mock.expect_synthesize()
            .times(2)
            .returning(move |_| Ok(audio.clone()));
        let converted = wav_bytes();
        mock.expect_convert()
            .times(2)
            .returning(move |_, _, _| Ok(converted.clone()));

        let (tx, rx) = mpsc::channel();
        let worker = StudioWorker::spawn(studio_session(&temp_dir, mock), None, tx);

        assert!(worker.submit(Job::Initialize));
        assert!(worker.submit(Job::LoadReference {
            path: sample,
            vad: true
        }));
        assert!(worker.submit(Job::Generate {
            text: "첫 번째".to_string(),
            speed: 1.1
        }));
        assert!(worker.submit(Job::Generate {
            text: "두 번째".to_string(),
            speed: 1.1
        }));
        assert!(worker.submit(Job::Status));

        let events = collect(&rx, 6);
        worker.shutdown();

        assert!(matches!(&events[0], Event::Ready { device, .. } if device == "cuda:0"));
        assert!(matches!(&events[1], Event::Log(_)));
        assert!(matches!(&events[2], Event::ReferenceLoaded { dims: 16, .. }));
        let Event::Generated(first) = &events[3] else {
            panic!("expected first generation, got {:?}", events[3]);
        };
        let Event::Generated(second) = &events[4] else {
            panic!("expected second generation, got {:?}", events[4]);
        };
        assert!(first.path.ends_with("result_0.wav"));
        assert!(second.path.ends_with("result_1.wav"));
        let Event::Status(status) = &events[5] else {
            panic!("expected status, got {:?}", events[5]);
        };
        assert_eq!(status.result_count, 2);
        assert!(status.has_reference);
    }

    #[test]
    fn test_worker_reports_failure_and_keeps_running() {
        let temp_dir = TempDir::new().unwrap();

        let mut mock = studio_backend();
        mock.expect_extract_embedding()
            .returning(|_, _| Ok(ToneEmbedding::new(vec![1.0; 16], "me.mp3")));
        let audio = wav_bytes();
        let mut calls = 0;
        mock.expect_synthesize().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(BackendError::BackendError("CUDA out of memory".to_string()))
            } else {
                Ok(audio.clone())
            }
        });
        let converted = wav_bytes();
        mock.expect_convert()
            .times(1)
            .returning(move |_, _, _| Ok(converted.clone()));

        let sample = temp_dir.path().join("me.mp3");
        std::fs::write(&sample, b"fake").unwrap();

        let (tx, rx) = mpsc::channel();
        let worker = StudioWorker::spawn(studio_session(&temp_dir, mock), None, tx);
        worker.submit(Job::LoadReference {
            path: sample,
            vad: true,
        });
        worker.submit(Job::Generate {
            text: "실패".to_string(),
            speed: 1.1,
        });
        worker.submit(Job::Generate {
            text: "성공".to_string(),
            speed: 1.1,
        });

        let events = collect(&rx, 4);
        worker.shutdown();

        assert!(matches!(&events[2], Event::Failed(msg) if msg.contains("CUDA out of memory")));
        assert!(matches!(&events[3], Event::Generated(g) if g.path.ends_with("result_0.wav")));
    }

    #[test]
    fn test_worker_play_without_result() {
        let temp_dir = TempDir::new().unwrap();
        let mut player = MockAudioPlayer::new();
        player.expect_play().never();

        let (tx, rx) = mpsc::channel();
        let worker = StudioWorker::spawn(
            studio_session(&temp_dir, MockBackend::new()),
            Some(Box::new(player)),
            tx,
        );
        worker.submit(Job::Play);

        let events = collect(&rx, 1);
        worker.shutdown();

        assert!(matches!(&events[0], Event::Failed(msg) if msg.contains("generate TTS first")));
    }

    #[test]
    fn test_worker_plays_last_result() {
        let temp_dir = TempDir::new().unwrap();

        let mut mock = studio_backend();
        let audio = wav_bytes();
        mock.expect_synthesize()
            .times(1)
            .returning(move |_| Ok(audio.clone()));
        let converted = wav_bytes();
        mock.expect_convert()
            .times(1)
            .returning(move |_, _, _| Ok(converted.clone()));

        let mut player = MockAudioPlayer::new();
        player
            .expect_play()
            .withf(|path| path.ends_with("result_0.wav"))
            .times(1)
            .returning(|_| Ok(()));

        let mut session = studio_session(&temp_dir, mock);
        session.set_reference_policy(ReferencePolicy::FallbackToSource);

        let (tx, rx) = mpsc::channel();
        let worker = StudioWorker::spawn(session, Some(Box::new(player)), tx);
        worker.submit(Job::Generate {
            text: "재생".to_string(),
            speed: 1.0,
        });
        worker.submit(Job::Play);

        let events = collect(&rx, 2);
        worker.shutdown();

        assert!(matches!(&events[0], Event::Generated(_)));
        assert!(matches!(&events[1], Event::Played(path) if path.ends_with("result_0.wav")));
    }

    #[test]
    fn test_console_submits_and_quits() {
        let temp_dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel();
        let worker = StudioWorker::spawn(studio_session(&temp_dir, MockBackend::new()), None, tx);
        let mut studio = Studio::new(1.1, true);

        let input = "help\nfrobnicate\nplay\nquit\ngenerate never sent\n";
        run_console(&mut studio, &worker, std::io::Cursor::new(input));

        let events = collect(&rx, 1);
        worker.shutdown();

        assert!(matches!(&events[0], Event::Failed(_)));
        assert!(rx.try_recv().is_err());
    }
}
