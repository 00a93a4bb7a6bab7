use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

mod completion;
mod dispatch;
mod render;
mod settings;


use dispatch::run_cli;
use settings::ConfigArgs;

#[derive(Parser, Debug)]
#[command(name = "s3update")]
#[command(version, about = "Self-updating executables from an S3 bucket", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare the local build with the published version.
    Check,
    /// Download and install the published build if it is newer.
    Update(UpdateArgs),
    /// Print the artifact key for a platform.
    ReleaseKey {
        #[arg(long)]
        os: Option<String>,
        #[arg(long)]
        arch: Option<String>,
    },
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default, Clone)]
struct UpdateArgs {
    /// Stop after installing instead of re-executing the new binary.
    #[arg(long)]
    no_restart: bool,
    /// Replace this file instead of the running executable.
    #[arg(long)]
    target: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    run_cli(Cli::parse())
}
