//! Configuration: defaults, JSON config file and model layout paths.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_CHECKPOINT_URL, DevicePreference, Language, OutputDirPolicy,
    ReferencePolicy, Settings,
};
