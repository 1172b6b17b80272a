use anyhow::Context;
use gc_engine::{render_json, render_table, run_experiment, ExperimentFile, OutputFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: gridcast <experiment.json>")?;

    let experiment = ExperimentFile::from_path(&path)
        .await
        .with_context(|| format!("failed to read experiment file {path}"))?;
    let output = experiment.output;

    let report = run_experiment(experiment)
        .await
        .context("evaluation failed")?;

    match output {
        OutputFormat::Table => print!("{}", render_table(&report)),
        OutputFormat::Json => println!("{}", render_json(&report)?),
    }
    Ok(())
}
