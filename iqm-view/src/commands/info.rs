//! `info`: report what a model contains

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::commands::{load_model, material_path};
use crate::utils::{add_table_row, create_table, format_bytes, format_parent};

#[derive(Args)]
pub struct InfoArgs {
    /// Path to the IQM file
    pub file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// List every bone
    #[arg(short, long)]
    pub bones: bool,
}

pub fn execute(args: InfoArgs) -> Result<()> {
    let model = load_model(&args.file)?;
    let summary = model.summary();

    if args.json {
        let json =
            serde_json::to_string_pretty(&summary).context("Failed to serialize model summary")?;
        println!("{json}");
        return Ok(());
    }

    println!("=== IQM Model: {} ===", args.file.display());
    println!("Version:       {}", summary.version);
    println!("File size:     {}", format_bytes(u64::from(summary.filesize)));
    println!("Vertices:      {}", summary.vertex_count);
    println!("Triangles:     {}", summary.triangle_count);
    println!("Vertex arrays: {}", summary.vertex_arrays.join(", "));
    println!("Bones:         {}", summary.bones.len());
    println!(
        "Frames:        {} ({} channels per frame)",
        summary.frame_count, summary.frame_channels
    );
    if let Some(comment) = &summary.comment {
        println!("Comment:       {comment}");
    }

    if !model.meshes.is_empty() {
        println!("\n=== Meshes ===");
        let mut table = create_table(&["Name", "Material", "Triangles", "Texture"]);
        for mesh in &model.meshes {
            let texture = match (&mesh.texture, material_path(&model, &mesh.material)) {
                (Some(handle), _) => format!("#{}", handle.0),
                (None, Some(path)) => format!("missing: {}", path.display()),
                (None, None) => "-".to_string(),
            };
            add_table_row(
                &mut table,
                vec![
                    mesh.name.clone(),
                    mesh.material.clone(),
                    format!(
                        "{}..{}",
                        mesh.first_triangle,
                        mesh.first_triangle + mesh.triangle_count
                    ),
                    texture,
                ],
            );
        }
        table.printstd();
    }

    if args.bones && !summary.bones.is_empty() {
        println!("\n=== Bones ===");
        let mut table = create_table(&["#", "Name", "Parent"]);
        for (i, bone) in summary.bones.iter().enumerate() {
            add_table_row(
                &mut table,
                vec![i.to_string(), bone.name.clone(), format_parent(bone.parent)],
            );
        }
        table.printstd();
    }

    if !summary.clips.is_empty() {
        println!("\n=== Animation Clips ===");
        let mut table = create_table(&["Name", "Frames", "Rate", "Duration", "Loop"]);
        for clip in &summary.clips {
            add_table_row(
                &mut table,
                vec![
                    clip.name.clone(),
                    format!(
                        "{}..{}",
                        clip.first_frame,
                        clip.first_frame + clip.frame_count
                    ),
                    format!("{:.1} fps", clip.frame_rate),
                    clip.duration()
                        .map_or_else(|| "-".to_string(), |d| format!("{d:.2}s")),
                    if clip.is_looping() { "yes" } else { "no" }.to_string(),
                ],
            );
        }
        table.printstd();
    }

    Ok(())
}
