//! Root CLI structure for iqm-view

use clap::{Parser, Subcommand};

use crate::commands::animate::AnimateArgs;
use crate::commands::info::InfoArgs;
use crate::commands::retarget::RetargetArgs;
use crate::commands::synth::SynthArgs;
use crate::commands::tree::TreeArgs;

#[derive(Parser)]
#[command(name = "iqm-view")]
#[command(about = "Inspect, animate and skin Inter-Quake Model files", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display header, vertex arrays, meshes, bones and clips of a model
    Info(InfoArgs),

    /// Display the bone hierarchy and meshes of a model as a tree
    Tree(TreeArgs),

    /// Sample an animation frame and print the skinned vertices
    Animate(AnimateArgs),

    /// Print the by-name bone map from one model's skeleton onto another's
    Retarget(RetargetArgs),

    /// Write a small two-bone animated model
    Synth(SynthArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
