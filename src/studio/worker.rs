//! Background worker that owns the session.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::engine::{GeneratedAudio, SpeechRequest, TTSSession};
use crate::playback::AudioPlayer;

/// Work sent to the worker. Jobs run one at a time in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Initialize,
    LoadReference { path: PathBuf, vad: bool },
    Generate { text: String, speed: f32 },
    Play,
    Status,
    Shutdown,
}

/// Session state as seen by the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioStatus {
    pub initialized: bool,
    pub device: Option<String>,
    pub speaker: Option<String>,
    pub has_reference: bool,
    pub result_count: u64,
    pub last_result: Option<PathBuf>,
}

/// What the worker reports back.
#[derive(Debug, Clone)]
pub enum Event {
    Log(String),
    Ready { device: String, speaker: String },
    ReferenceLoaded { path: PathBuf, dims: usize },
    Generated(GeneratedAudio),
    Played(PathBuf),
    Status(StudioStatus),
    Failed(String),
}

/// Handle to the worker thread.
pub struct StudioWorker {
    jobs: Sender<Job>,
    handle: Option<JoinHandle<()>>,
}

impl StudioWorker {
    /// Move `session` and `player` onto a new thread.
    pub fn spawn<B>(
        session: TTSSession<B>,
        player: Option<Box<dyn AudioPlayer>>,
        events: Sender<Event>,
    ) -> Self
    where
        B: Backend + 'static,
    {
        let (jobs, rx) = mpsc::channel();
        let handle = thread::spawn(move || run_worker(session, player, rx, events));
        Self {
            jobs,
            handle: Some(handle),
        }
    }

    /// Queue a job. Returns false once the worker has stopped.
    pub fn submit(&self, job: Job) -> bool {
        self.jobs.send(job).is_ok()
    }

    /// Finish queued jobs, then stop the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.jobs.send(Job::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("studio worker panicked");
            }
        }
    }
}

impl Drop for StudioWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<B: Backend>(
    mut session: TTSSession<B>,
    player: Option<Box<dyn AudioPlayer>>,
    jobs: Receiver<Job>,
    events: Sender<Event>,
) {
    while let Ok(job) = jobs.recv() {
        debug!(?job, "studio job");
        let event = match job {
            Job::Shutdown => break,
            Job::Initialize => initialize(&mut session),
            Job::LoadReference { path, vad } => match initialize(&mut session) {
                Event::Failed(msg) => Event::Failed(msg),
                _ => {
                    let _ = events.send(Event::Log(format!(
                        "Loading sample voice from {}",
                        path.display()
                    )));
                    match session.load_reference(&path, vad) {
                        Ok(embedding) => Event::ReferenceLoaded {
                            dims: embedding.len(),
                            path,
                        },
                        Err(e) => Event::Failed(format!("Error loading sample voice: {e}")),
                    }
                }
            },
            Job::Generate { text, speed } => match initialize(&mut session) {
                Event::Failed(msg) => Event::Failed(msg),
                _ => {
                    let request = SpeechRequest::new(text).with_speed(speed);
                    match session.generate(&request) {
                        Ok(generated) => Event::Generated(generated),
                        Err(e) => Event::Failed(format!("Error generating TTS: {e}")),
                    }
                }
            },
            Job::Play => play_last(&session, player.as_deref()),
            Job::Status => Event::Status(status(&session)),
        };

        if events.send(event).is_err() {
            break;
        }
    }
    debug!("studio worker stopped");
}

fn initialize<B: Backend>(session: &mut TTSSession<B>) -> Event {
    match session.initialize() {
        Ok(models) => Event::Ready {
            device: models.device.clone(),
            speaker: models.speaker.key.clone(),
        },
        Err(e) => Event::Failed(format!("Error initializing TTS: {e}")),
    }
}

fn play_last<B: Backend>(session: &TTSSession<B>, player: Option<&dyn AudioPlayer>) -> Event {
    let Some(path) = session.last_result_path().filter(|p| p.exists()) else {
        return Event::Failed("TTS file not found. Please generate TTS first.".to_string());
    };
    let Some(player) = player else {
        return Event::Failed("No audio player available".to_string());
    };
    match player.play(path) {
        Ok(()) => Event::Played(path.to_path_buf()),
        Err(e) => match e.hint() {
            Some(hint) => Event::Failed(format!("Playback failed: {e} ({hint})")),
            None => Event::Failed(format!("Playback failed: {e}")),
        },
    }
}

fn status<B: Backend>(session: &TTSSession<B>) -> StudioStatus {
    let models = session.models();
    StudioStatus {
        initialized: session.is_initialized(),
        device: models.map(|m| m.device.clone()),
        speaker: models.map(|m| m.speaker.key.clone()),
        has_reference: session.has_reference(),
        result_count: session.result_count(),
        last_result: session.last_result_path().map(|p| p.to_path_buf()),
    }
}
