//! vrdrive - VR trial alignment tool
//!
//! Aligns eye-tracking / VR recordings with CARLA trajectory logs and
//! assembles the per-scenario master dataset.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vrdrive_alignment::TrialAligner;
use vrdrive_core::{Config, ScenarioConfig};
use vrdrive_dataset::{BatchAligner, DatasetBuilder};
use vrdrive_ingestion::discovery::list_available_scenarios;
use vrdrive_ingestion::loader::write_json;
use vrdrive_ingestion::{read_trajectory, write_aligned, VrFile};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let settings = match &cli.settings {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Align {
            trajectory,
            vr,
            config,
            output,
        } => run_align(&trajectory, &vr, &config, output.as_deref(), &settings)?,
        Commands::Batch {
            data_dir,
            output_dir,
            config,
            workers,
        } => run_batch(&data_dir, &output_dir, &config, workers, settings)?,
        Commands::Aggregate {
            data_dir,
            output,
            config,
            max_participants,
        } => run_aggregate(&data_dir, &output, &config, max_participants, &settings)?,
        Commands::Scenarios { base_dir } => run_scenarios(&base_dir)?,
    }

    Ok(())
}

fn load_scenario(path: &Path) -> anyhow::Result<Arc<ScenarioConfig>> {
    let scenario = ScenarioConfig::load(path)
        .with_context(|| format!("loading scenario parameters from {}", path.display()))?;
    info!(
        scenario = %scenario.scenario_name,
        id = scenario.scenario_id,
        "loaded scenario parameters"
    );
    Ok(Arc::new(scenario))
}

fn run_align(
    trajectory: &Path,
    vr: &Path,
    config: &Path,
    output: Option<&Path>,
    settings: &Config,
) -> anyhow::Result<()> {
    let aligner = TrialAligner::new(load_scenario(config)?, settings.aligner.clone());

    let trial_name = trajectory
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("no file name in {}", trajectory.display()))?;
    let record = read_trajectory(trajectory)
        .with_context(|| format!("reading trajectory {}", trajectory.display()))?;
    let aligned = aligner.align(record, &VrFile::new(vr), trial_name)?;

    match output {
        Some(path) => {
            write_aligned(path, &aligned)?;
            info!(output = %path.display(), "wrote aligned trial");
        }
        None => println!("{}", serde_json::to_string_pretty(&aligned)?),
    }
    Ok(())
}

fn run_batch(
    data_dir: &Path,
    output_dir: &Path,
    config: &Path,
    workers: Option<usize>,
    settings: Config,
) -> anyhow::Result<()> {
    let mut pipeline = settings.pipeline;
    if let Some(workers) = workers {
        pipeline.workers = workers;
    }

    let aligner = TrialAligner::new(load_scenario(config)?, settings.aligner);
    let report = BatchAligner::new(aligner, pipeline).run(data_dir, output_dir)?;

    for failure in report.failures() {
        warn!(
            participant = %failure.participant,
            trial = %failure.trial_name,
            "not aligned"
        );
    }
    write_json(output_dir.join("batch_report.json"), &report)?;

    println!(
        "Aligned {} of {} trials from {} participants in {:.1}s",
        report.aligned_count(),
        report.outcomes.len(),
        report.participants,
        report.elapsed_secs()
    );
    Ok(())
}

fn run_aggregate(
    data_dir: &Path,
    output: &Path,
    config: &Path,
    max_participants: Option<usize>,
    settings: &Config,
) -> anyhow::Result<()> {
    let limit = max_participants.or(settings.pipeline.max_participants);

    let mut builder = DatasetBuilder::new(load_scenario(config)?);
    let skipped = builder.load_dir(data_dir, limit)?;
    let dataset = builder.build();
    dataset
        .save(output)
        .with_context(|| format!("writing master dataset to {}", output.display()))?;

    println!(
        "Wrote {} trials to {}",
        dataset.trial_count(),
        output.display()
    );
    for exp_type in dataset.experiment_types() {
        let slots: Vec<_> = (0..).map_while(|idx| dataset.slot(exp_type, idx)).collect();
        let filled = slots.iter().filter(|trials| !trials.is_empty()).count();
        println!("  {exp_type}: {filled} of {} combinations have trials", slots.len());
    }
    for skip in &skipped {
        println!("  skipped {}: {}", skip.path.display(), skip.reason);
    }
    Ok(())
}

fn run_scenarios(base_dir: &Path) -> anyhow::Result<()> {
    let scenarios = list_available_scenarios(base_dir)?;
    if scenarios.is_empty() {
        println!("No scenarios found under {}", base_dir.display());
        return Ok(());
    }
    for name in scenarios {
        println!("{name}");
    }
    Ok(())
}
