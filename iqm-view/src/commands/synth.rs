//! `synth`: write a small animated model for trying the other commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use iqm_model::IqmEncoder;

use crate::utils::format_bytes;

#[derive(Args)]
pub struct SynthArgs {
    /// Output IQM file
    pub output: PathBuf,
}

pub fn execute(args: SynthArgs) -> Result<()> {
    let data = IqmEncoder::two_bone_demo()
        .encode()
        .context("Failed to encode demo model")?;
    std::fs::write(&args.output, &data)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Wrote {} ({})",
        args.output.display(),
        format_bytes(data.len() as u64)
    );
    Ok(())
}
