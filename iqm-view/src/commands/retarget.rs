//! `retarget`: show which source bone drives each destination bone

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use iqm_model::animation::RetargetMap;

use crate::commands::load_model;
use crate::utils::{add_table_row, create_table};

#[derive(Args)]
pub struct RetargetArgs {
    /// Model whose skeleton is animated
    pub model: PathBuf,

    /// Model supplying the animation
    pub anim: PathBuf,

    /// Only list bones with no counterpart
    #[arg(short, long)]
    pub unmapped: bool,
}

pub fn execute(args: RetargetArgs) -> Result<()> {
    let destination = load_model(&args.model)?;
    let source = load_model(&args.anim)?;
    let map = RetargetMap::build(&destination.skeleton, &source.skeleton);

    let mut table = create_table(&["#", "Bone", "Source"]);
    for (i, (bone, entry)) in destination
        .skeleton
        .bones()
        .iter()
        .zip(map.entries())
        .enumerate()
    {
        if args.unmapped && entry.is_some() {
            continue;
        }
        let target = match entry {
            Some(s) => match source.skeleton.bone(*s) {
                Some(source_bone) => format!("{s} ({})", source_bone.name),
                None => s.to_string(),
            },
            None => "unmapped (rest pose)".to_string(),
        };
        add_table_row(&mut table, vec![i.to_string(), bone.name.clone(), target]);
    }
    table.printstd();

    println!(
        "{} of {} bones mapped{}",
        map.mapped_count(),
        map.len(),
        if map.is_identity() { " (identity)" } else { "" }
    );
    Ok(())
}
