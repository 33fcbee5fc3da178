//! Parser and skeletal animation core for Inter-Quake Model (IQM) files
//!
//! The crate reads version 2 IQM files into an [`IqmModel`], decodes the
//! delta-compressed animation frames, composes bone hierarchies into skinning
//! matrices, retargets clips between skeletons by bone name, and skins
//! vertices on the CPU.
//!
//! # Example
//!
//! ```rust,no_run
//! use iqm_model::{AnimationState, CpuSkinner, IqmModel};
//!
//! let model = IqmModel::load("mrfixit.iqm")?;
//! let mut state = AnimationState::for_model(&model)?;
//! if let Some(clip) = model.clips.first() {
//!     state.bind(clip.clone());
//!     state.advance(0.5);
//! }
//! state.evaluate(&model)?;
//!
//! let mut skinner = CpuSkinner::new();
//! skinner.skin(&model.vertices, state.skin_matrices())?;
//! println!("first vertex: {:?}", skinner.positions().first());
//! # Ok::<(), iqm_model::IqmError>(())
//! ```

pub mod animation;
pub mod chunks;
pub mod encoder;
pub mod error;
pub mod header;
pub mod material;
pub mod model;
pub mod reader;
pub mod scene;
pub mod skeleton;
pub mod skinning;

pub use animation::{
    AnimationState, ChannelMask, FrameTable, PlaybackState, Pose, PoseChannel, RetargetCache,
    RetargetMap,
};
pub use chunks::{AnimFlags, AnimationClip, FrameBounds, Mesh, VertexData};
pub use encoder::IqmEncoder;
pub use error::{IqmError, Result};
pub use header::IqmHeader;
pub use material::{TextureHandle, TextureLoader};
pub use model::{IqmModel, ModelSummary};
pub use scene::{ArmatureId, Attachment, ObjectId, Scene, Transform};
pub use skeleton::{Bone, Skeleton, SkeletonId};
pub use skinning::CpuSkinner;

/// Maximum number of bones in one skeleton (blend indices are bytes)
pub const MAX_BONES: usize = 256;

/// Maximum number of animation frames accepted from one file
pub const MAX_FRAMES: usize = 1 << 20;

/// Size of the name buffers; stored names keep at most `MAX_NAME_LEN - 1` bytes
pub const MAX_NAME_LEN: usize = 80;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
