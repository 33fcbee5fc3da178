//! IQM skeletal animation
//!
//! This module provides playback support for IQM models:
//! - Delta-compressed pose channel decoding
//! - The shared frame table and whole-clip decoding
//! - Hierarchy composition into absolute and skinning matrices
//! - By-name retargeting between skeletons
//! - Per-instance playback state
//!
//! # Example
//!
//! ```rust,no_run
//! use iqm_model::animation::{AnimationState, RetargetCache};
//! use iqm_model::IqmModel;
//!
//! let character = IqmModel::load("character.iqm")?;
//! let moves = IqmModel::load("moves.iqm")?;
//!
//! let mut cache = RetargetCache::new();
//! let map = cache.get_or_build(&character.skeleton, &moves.skeleton);
//!
//! let mut state = AnimationState::for_model(&character)?;
//! if let Some(clip) = moves.find_clip("run") {
//!     state.bind(clip.clone());
//! }
//! state.advance(1.0 / 60.0);
//! state.evaluate_retargeted(&character.skeleton, &moves, &map)?;
//! # Ok::<(), iqm_model::IqmError>(())
//! ```

pub mod frames;
pub mod pose;
pub mod retarget;
pub mod state;
pub mod transform;

pub use frames::FrameTable;
pub use pose::{CHANNEL_COUNT, ChannelMask, Pose, PoseChannel, decode_frame};
pub use retarget::{RetargetCache, RetargetMap, resolve_bone_tag, resolve_skin_map};
pub use state::{AnimationState, PlaybackState};
pub use transform::{compute_absolute, compute_local, compute_skinning};
