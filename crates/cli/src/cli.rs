//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Align VR driving-simulator recordings with their CARLA trajectories.
#[derive(Parser, Debug)]
#[command(name = "vrdrive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Processing settings file (JSON)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Align a single trial
    Align {
        /// Trajectory file, named `<type>_[values].json`
        #[arg(short, long)]
        trajectory: PathBuf,

        /// VR recording file
        #[arg(long)]
        vr: PathBuf,

        /// Scenario parameter file (`*_trial_params.json`)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file (printed to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Align every trial of every participant under a data directory
    Batch {
        /// Raw data root holding one directory per participant
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Root for processed output
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Scenario parameter file
        #[arg(short, long)]
        config: PathBuf,

        /// Number of parallel workers (overrides settings; 0 = auto)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Build the master dataset from processed trials
    Aggregate {
        /// Processed data root
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Master dataset output file
        #[arg(short, long)]
        output: PathBuf,

        /// Scenario parameter file
        #[arg(short, long)]
        config: PathBuf,

        /// Only include the first N participants (overrides settings)
        #[arg(short, long)]
        max_participants: Option<usize>,
    },

    /// List scenario folders that carry a parameter file
    Scenarios {
        /// Folder holding the `scenario*` directories
        #[arg(short, long, default_value = ".")]
        base_dir: PathBuf,
    },
}
