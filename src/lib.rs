//! tone-tts: text-to-speech with tone color conversion toward a reference voice.
//!
//! This crate sequences an out-of-process text-to-speech model and tone
//! color converter: it provisions pretrained checkpoints, loads the models,
//! extracts a tone embedding from a reference sample, synthesizes speech in
//! a base voice and converts it toward the reference. Two command-line front
//! ends and an interactive studio share one session type.

pub mod backend;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod playback;
pub mod studio;
pub mod voice;
