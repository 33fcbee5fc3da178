//! `tree`: render the bone hierarchy and meshes as a tree

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use iqm_model::{IqmModel, Skeleton};

use crate::commands::{load_model, material_path};
use crate::utils::{NodeType, TreeNode, TreeOptions, format_vec3, render_tree};

#[derive(Args)]
pub struct TreeArgs {
    /// Path to the IQM file
    pub file: PathBuf,

    /// Maximum depth to display
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Show bind-pose translations on each bone
    #[arg(short, long)]
    pub poses: bool,

    /// Show material image references
    #[arg(short, long)]
    pub refs: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Show metadata inline
    #[arg(long)]
    pub compact: bool,
}

pub fn execute(args: TreeArgs) -> Result<()> {
    let model = load_model(&args.file)?;
    let root = build_tree(&model, &args);

    let options = TreeOptions {
        max_depth: args.depth,
        show_external_refs: args.refs,
        no_color: args.no_color,
        show_metadata: true,
        compact: args.compact,
    };
    print!("{}", render_tree(&root, &options));
    Ok(())
}

fn build_tree(model: &IqmModel, args: &TreeArgs) -> TreeNode {
    let name = args
        .file
        .file_name()
        .map_or_else(|| args.file.display().to_string(), |n| n.to_string_lossy().into_owned());

    let header = TreeNode::new("Header", NodeType::Header)
        .with_metadata("version", model.header.version)
        .with_metadata("vertices", model.vertices.count)
        .with_metadata("triangles", model.triangles.len());

    let mut meshes = TreeNode::new("Meshes", NodeType::Table)
        .with_metadata("count", model.meshes.len());
    for mesh in &model.meshes {
        let mut node = TreeNode::new(mesh.name.as_str(), NodeType::Mesh)
            .with_metadata("material", &mesh.material)
            .with_metadata("triangles", mesh.triangle_count);
        if let Some(path) = material_path(model, &mesh.material) {
            node = node.with_external_ref(&path.display().to_string(), Some(path.is_file()));
        }
        meshes.push_child(node);
    }

    let mut skeleton = TreeNode::new("Skeleton", NodeType::Table)
        .with_metadata("count", model.skeleton.len());
    for (index, bone) in model.skeleton.bones().iter().enumerate() {
        if bone.parent.is_none() {
            skeleton.push_child(bone_node(&model.skeleton, index, args.poses));
        }
    }

    let mut clips = TreeNode::new("Clips", NodeType::Table)
        .with_metadata("count", model.clips.len());
    for clip in &model.clips {
        clips.push_child(
            TreeNode::new(clip.name.as_str(), NodeType::Clip)
                .with_metadata("frames", clip.frame_count)
                .with_metadata("rate", clip.frame_rate),
        );
    }

    TreeNode::new(name, NodeType::Root)
        .with_size(u64::from(model.header.filesize))
        .add_child(header)
        .add_child(meshes)
        .add_child(skeleton)
        .add_child(clips)
}

fn bone_node(skeleton: &Skeleton, index: usize, show_pose: bool) -> TreeNode {
    let bone = &skeleton.bones()[index];
    let mut node = TreeNode::new(bone.name.as_str(), NodeType::Bone).with_metadata("index", index);
    if show_pose {
        node = node.with_metadata("translate", format_vec3(bone.bind_pose.translate, 3));
    }
    for child in skeleton.children(index) {
        node.push_child(bone_node(skeleton, child, show_pose));
    }
    node
}
