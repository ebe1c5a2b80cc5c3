//! Studio command line parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Extensions offered when browsing for a reference sample.
pub const SAMPLE_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "m4a"];

pub const STUDIO_HELP: &str = "Commands:
  browse <path>     Select a reference voice sample
  load [path]       Load the selected (or given) sample as the reference voice
  generate <text>   Generate speech in the background
  play              Play the last generated file
  status            Show session state
  help              Show this help
  quit              Exit";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type 'help')")]
    Unknown(String),

    #[error("'{command}' needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },
}

/// One line of studio input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioCommand {
    Browse(PathBuf),
    Load(Option<PathBuf>),
    Generate(String),
    Play,
    Status,
    Help,
    Quit,
    /// Blank line.
    Nothing,
}

impl StudioCommand {
    /// Parse a command line. The first word is the command (case-insensitive);
    /// the rest of the line is its argument, kept verbatim apart from
    /// surrounding whitespace.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Nothing);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "browse" | "b" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "browse",
                        what: "a file path",
                    });
                }
                Ok(Self::Browse(PathBuf::from(rest)))
            }
            "load" | "l" => Ok(Self::Load(
                (!rest.is_empty()).then(|| PathBuf::from(rest)),
            )),
            "generate" | "gen" | "g" => {
                if rest.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "generate",
                        what: "text",
                    });
                }
                Ok(Self::Generate(rest.to_string()))
            }
            "play" | "p" => Ok(Self::Play),
            "status" | "s" => Ok(Self::Status),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Whether `path` has one of [`SAMPLE_EXTENSIONS`].
pub fn is_sample_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SAMPLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
