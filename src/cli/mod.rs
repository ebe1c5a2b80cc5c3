//! CLI argument parsing and the shared generation pipeline.

mod args;
mod run;

pub use args::{CommonArgs, SimpleArgs, StudioArgs, TtsCliArgs};
pub use run::{
    ConversionPlan, EXIT_FAILURE, GenerationOptions, detect_player, ensure_checkpoints,
    format_bytes, parse_args, plan_conversion, play_with, print_banner, print_summary,
    report_provisioning, run_generation, summary_lines,
};
