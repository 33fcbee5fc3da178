//! `animate`: sample a clip and print skinned vertex data

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use iqm_model::animation::RetargetMap;
use iqm_model::{AnimationState, CpuSkinner, IqmModel};
use log::info;

use crate::commands::load_model;
use crate::utils::{add_table_row, create_table, format_parent, format_vec3};

#[derive(Args)]
pub struct AnimateArgs {
    /// Path to the IQM file to skin
    pub file: PathBuf,

    /// Take the clip from another IQM file, mapping bones by name
    #[arg(long)]
    pub anim: Option<PathBuf>,

    /// Clip name (defaults to the first clip)
    #[arg(short, long)]
    pub clip: Option<String>,

    /// Clip-relative frame to sample; wraps around the clip
    #[arg(short, long, conflicts_with = "time")]
    pub frame: Option<i64>,

    /// Playback time in seconds from the start of the clip
    #[arg(short, long)]
    pub time: Option<f32>,

    /// Sample the rest pose instead of a clip
    #[arg(long, conflicts_with_all = ["clip", "frame", "time", "anim"])]
    pub rest: bool,

    /// Also print model-space joint positions
    #[arg(short, long)]
    pub bones: bool,

    /// Maximum number of vertices to print
    #[arg(short, long, default_value = "32")]
    pub limit: usize,

    /// Decimal places for printed coordinates
    #[arg(long, default_value = "3")]
    pub precision: usize,
}

pub fn execute(args: AnimateArgs) -> Result<()> {
    let model = load_model(&args.file)?;
    let source = match &args.anim {
        Some(path) => Some(load_model(path)?),
        None => None,
    };

    let mut state = AnimationState::for_model(&model)
        .with_context(|| format!("Cannot animate {}", args.file.display()))?;

    if args.rest {
        state
            .evaluate_rest(&model.skeleton)
            .context("Failed to evaluate rest pose")?;
        println!("Rest pose");
    } else {
        let clip_owner = source.as_ref().unwrap_or(&model);
        let clip = select_clip(clip_owner, args.clip.as_deref())?;
        state.bind(clip.clone());
        if let Some(frame) = args.frame {
            state.set_time(frame as f32);
        } else if let Some(time) = args.time {
            state.advance(time);
        }

        match &source {
            Some(source) => {
                let map = RetargetMap::build(&model.skeleton, &source.skeleton);
                info!(
                    "Mapped {} of {} bones by name",
                    map.mapped_count(),
                    map.len()
                );
                state
                    .evaluate_retargeted(&model.skeleton, source, &map)
                    .context("Failed to evaluate retargeted pose")?;
            }
            None => state.evaluate(&model).context("Failed to evaluate pose")?,
        }

        let frame = state.sampled_frame().unwrap_or(clip.first_frame);
        println!(
            "Clip '{}' frame {} (time {:.3}, {} frames at {:.1} fps)",
            clip.name,
            frame - clip.first_frame,
            state.time(),
            clip.frame_count,
            clip.frame_rate
        );
    }

    if args.bones {
        println!("\n=== Joints ===");
        let mut table = create_table(&["#", "Name", "Parent", "Position"]);
        for (i, (bone, matrix)) in model
            .skeleton
            .bones()
            .iter()
            .zip(state.absolute_matrices())
            .enumerate()
        {
            add_table_row(
                &mut table,
                vec![
                    i.to_string(),
                    bone.name.clone(),
                    format_parent(bone.parent),
                    format_vec3(matrix.w_axis.truncate(), args.precision),
                ],
            );
        }
        table.printstd();
    }

    let mut skinner = CpuSkinner::new();
    skinner
        .skin(&model.vertices, state.skin_matrices())
        .context("Failed to skin vertices")?;

    println!("\n=== Vertices ===");
    let mut table = create_table(&["#", "Position", "Normal"]);
    let normals = skinner.normals();
    for (i, position) in skinner.positions().iter().enumerate().take(args.limit) {
        let normal = normals
            .get(i)
            .map_or_else(|| "-".to_string(), |n| format_vec3(*n, args.precision));
        add_table_row(
            &mut table,
            vec![i.to_string(), format_vec3(*position, args.precision), normal],
        );
    }
    table.printstd();
    if skinner.positions().len() > args.limit {
        println!("... {} more", skinner.positions().len() - args.limit);
    }

    Ok(())
}

fn select_clip<'a>(model: &'a IqmModel, name: Option<&str>) -> Result<&'a iqm_model::AnimationClip> {
    match name {
        Some(name) => model.find_clip(name).with_context(|| {
            let known: Vec<&str> = model.clips.iter().map(|c| c.name.as_str()).collect();
            format!("No clip named '{name}' (available: {})", known.join(", "))
        }),
        None => match model.clips.first() {
            Some(clip) => Ok(clip),
            None => bail!("Model has no animation clips; use --rest"),
        },
    }
}
