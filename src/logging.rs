//! Logging setup for the binaries.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Pick the log level for the verbosity flags. `quiet` wins over `verbose`.
pub fn level_for(verbose: bool, quiet: bool) -> Level {
    if quiet {
        Level::WARN
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install a compact subscriber writing to stderr.
///
/// Calling this twice keeps the first subscriber.
pub fn init(verbose: bool, quiet: bool) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_for(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
