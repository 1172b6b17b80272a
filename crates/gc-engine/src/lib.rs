//! GridCast experiment runner: JSON experiment files in, rankings out.

pub mod report;
pub mod runner;

pub use report::{render_json, render_table};
pub use runner::{run_experiment, ExperimentFile, OutputFormat};
