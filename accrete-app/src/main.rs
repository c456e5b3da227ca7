//! Accrete
//!
//! Command line front end for densifying LiDAR frames: inspect a dataset's
//! scenes, frames and instances, and patch instances in a frame with their
//! points accumulated across the scene.

mod app;
mod errors;
mod settings;

use accrete_core::StrategyKind;
use accrete_data::{DiskDataset, InstanceId, disk::DEFAULT_SPLIT};
use app::{App, InstanceSelection, LoggingConfig, init_logging};
use clap::{Parser, Subcommand};
use errors::AppError;
use settings::{Overrides, load_patch_config};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

/// Accrete - LiDAR instance accumulation and frame patching
#[derive(Parser, Debug)]
#[command(name = "accrete")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dataset root directory
    #[arg(short, long, global = true, default_value = ".")]
    data_root: PathBuf,

    /// Dataset split under the root
    #[arg(long, global = true, default_value = DEFAULT_SPLIT)]
    split: String,

    /// JSON patch configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Use every N-th frame of an instance's track (overrides the config file)
    #[arg(long, global = true)]
    step: Option<usize>,

    /// Accumulation strategy (default, greedy_grid); overrides the config file
    #[arg(long, global = true)]
    strategy: Option<StrategyKind>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List scene ids
    Scenes,
    /// List the frames of a scene
    Frames { scene: String },
    /// Show the instances in a frame with their point counts
    Instances { scene: String, frame: String },
    /// Print the scene's instance -> frames index as JSON
    Group { scene: String },
    /// Replace instances in a frame with their accumulated points
    Patch {
        scene: String,
        frame: String,
        /// Instance id to patch; repeat for several
        #[arg(short, long = "instance", value_name = "ID", required_unless_present = "all")]
        instances: Vec<InstanceId>,
        /// Patch every instance present in the frame
        #[arg(long, conflicts_with = "instances")]
        all: bool,
        /// Write the result under the dataset's patched_v3 tree
        #[arg(long)]
        save: bool,
    },
}

fn run(args: Args) -> Result<(), AppError> {
    let config = load_patch_config(
        args.config.as_deref(),
        Overrides {
            step: args.step,
            strategy: args.strategy,
        },
    )?;
    let dataset = DiskDataset::new(&args.data_root).with_split(&args.split);
    info!(
        "Dataset {} ({}), strategy {}, step {}",
        args.data_root.display(),
        args.split,
        config.strategy,
        config.step
    );
    let app = App::new(dataset, config);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.command {
        Command::Scenes => app.list_scenes(&mut out)?,
        Command::Frames { scene } => app.list_frames(&scene, &mut out)?,
        Command::Instances { scene, frame } => app.list_instances(&scene, &frame, &mut out)?,
        Command::Group { scene } => app.print_group(&scene, &mut out)?,
        Command::Patch {
            scene,
            frame,
            instances,
            all,
            save,
        } => {
            let selection = if all {
                InstanceSelection::All
            } else {
                InstanceSelection::Listed(instances)
            };
            app.patch(&scene, &frame, &selection, save, &mut out)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(&LoggingConfig {
        level: args.log_level.clone(),
    });

    if let Err(e) = run(args) {
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}
