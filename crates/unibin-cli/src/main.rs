//! unibin command-line tool
//!
//! Turns an application source file into a self-contained executable by
//! patching it into a pre-built carrier binary, and pre-builds carriers for
//! capacity buckets.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "unibin")]
#[command(about = "Package an application into a self-contained executable", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch an application into a cached carrier binary
    Build {
        /// Main application source file
        app: PathBuf,
        /// Application name (defaults to a name inferred from the file)
        #[arg(short, long)]
        name: Option<String>,
        /// Target platform (windows, darwin, linux, alpine)
        #[arg(long)]
        platform: Option<String>,
        /// Target architecture (x86, x64, arm6l, arm7l, arm64)
        #[arg(long)]
        arch: Option<String>,
        /// Runtime version the carrier was built from
        #[arg(long)]
        runtime: String,
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Explicit capacity bucket, e.g. "4MB"
        #[arg(long)]
        size: Option<String>,
        /// Keep the downloaded carrier in the local cache
        #[arg(long)]
        cache: bool,
    },

    /// Compile and cache a carrier with an unfilled placeholder
    Prebuild {
        /// Unpacked runtime source tree
        #[arg(long)]
        source_dir: PathBuf,
        /// Runtime version being compiled
        #[arg(long)]
        runtime: String,
        /// Capacity bucket to reserve, e.g. "2MB"
        #[arg(long)]
        size: String,
        /// Bootstrap entry file to install into the tree
        #[arg(long)]
        bootstrap: PathBuf,
        /// Directory of patch files to apply before building
        #[arg(long)]
        patch_dir: Option<PathBuf>,
        /// Upload the finished carrier to the remote store
        #[arg(long)]
        upload: bool,
    },

    /// Inspect or clean the local carrier cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached carriers
    Ls,
    /// Remove all cached carriers
    Clean,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            app,
            name,
            platform,
            arch,
            runtime,
            output,
            size,
            cache,
        } => {
            let options = commands::build::BuildOptions {
                app,
                name,
                platform,
                arch,
                runtime,
                output,
                size,
                keep_carrier: cache,
            };
            if let Err(e) = commands::build::run(options) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }

        Commands::Prebuild {
            source_dir,
            runtime,
            size,
            bootstrap,
            patch_dir,
            upload,
        } => {
            let options = commands::prebuild::PrebuildOptions {
                source_dir,
                runtime,
                size,
                bootstrap,
                patch_dir,
                upload,
            };
            if let Err(e) = commands::prebuild::run(options) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }

        Commands::Cache { action } => {
            let result = match action {
                CacheAction::Ls => commands::cache::ls(),
                CacheAction::Clean => commands::cache::clean(),
            };
            if let Err(e) = result {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
