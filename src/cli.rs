use clap::{Parser, Subcommand};
use rf_core::Stage;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(author, version, about = "Turn scripted scenes into narrated video clips")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run image, voice and render over every scene in the project
    Run {
        /// Project file (JSON array of scenes); rewritten in place
        #[arg(short, long)]
        project: PathBuf,
    },

    /// Run a single stage over every scene in the project
    Stage {
        /// Project file (JSON array of scenes); rewritten in place
        #[arg(short, long)]
        project: PathBuf,

        /// Stage to run: image, voice or render
        stage: Stage,
    },

    /// Re-run a stage for the scenes still missing its output
    Retry {
        /// Project file (JSON array of scenes); rewritten in place
        #[arg(short, long)]
        project: PathBuf,

        /// Stage to retry: image, voice or render
        stage: Stage,
    },

    /// Validate the configuration file and print warnings
    CheckConfig,
}
