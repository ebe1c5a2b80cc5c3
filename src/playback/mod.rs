//! Audio playback through the operating system's player commands.
//!
//! Playback never affects an already written output file; front ends log
//! failures and carry on.

mod player;

#[cfg(test)]
pub use player::MockAudioPlayer;
pub use player::{AudioPlayer, CommandPlayer, KNOWN_PLAYERS, PlaybackError, executable_in_path};
