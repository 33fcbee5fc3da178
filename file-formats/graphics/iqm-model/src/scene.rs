//! Armatures and objects attached to each other's bones
//!
//! The scene owns every node in an arena. A child refers to its parent by
//! `(ArmatureId, bone)` and never owns it. [`Scene::update`] advances every
//! armature's clip, evaluates its pose and resolves world matrices, parents
//! first.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use log::{debug, trace};

use crate::animation::retarget::{resolve_bone_tag, resolve_skin_map};
use crate::animation::{AnimationState, RetargetCache, RetargetMap};
use crate::error::{IqmError, Result};
use crate::model::IqmModel;

/// Handle to an armature in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArmatureId(usize);

/// Handle to an object in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ArmatureId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Placement of a node relative to whatever it is attached to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Where a parented node hangs: an armature and optionally one of its bones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoneTag {
    pub armature: ArmatureId,
    /// `None` follows the armature's own transform
    pub bone: Option<usize>,
}

/// How an object follows its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Free,
    /// Follows one bone (or the armature root) as a rigid body
    Rigid(BoneTag),
    /// Every bone of the object's skeleton tracks the named parent bone
    Skinned {
        armature: ArmatureId,
        /// Parent bone for each object bone
        bone_map: Vec<usize>,
    },
}

/// The clip an armature plays, possibly authored for another skeleton
#[derive(Debug, Clone)]
struct Playback {
    source: Arc<IqmModel>,
    map: Arc<RetargetMap>,
}

#[derive(Debug)]
struct Armature {
    model: Arc<IqmModel>,
    transform: Transform,
    parent: Option<BoneTag>,
    playback: Option<Playback>,
    state: AnimationState,
    world: Mat4,
    updated: bool,
}

#[derive(Debug)]
struct Object {
    model: Arc<IqmModel>,
    transform: Transform,
    attachment: Attachment,
    world: Mat4,
    skin: Vec<Mat4>,
}

/// Arena of armatures and objects plus the retarget maps they share
#[derive(Debug, Default)]
pub struct Scene {
    armatures: Vec<Armature>,
    objects: Vec<Object>,
    retarget: RetargetCache,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an armature posed at its rest pose
    pub fn add_armature(&mut self, model: Arc<IqmModel>, transform: Transform) -> Result<ArmatureId> {
        let state = AnimationState::for_model(&model)?;
        let id = ArmatureId(self.armatures.len());
        self.armatures.push(Armature {
            model,
            transform,
            parent: None,
            playback: None,
            state,
            world: transform.to_matrix(),
            updated: false,
        });
        Ok(id)
    }

    pub fn add_object(&mut self, model: Arc<IqmModel>, transform: Transform) -> ObjectId {
        let id = ObjectId(self.objects.len());
        let skin = vec![Mat4::IDENTITY; model.skeleton.len()];
        self.objects.push(Object {
            model,
            transform,
            attachment: Attachment::Free,
            world: transform.to_matrix(),
            skin,
        });
        id
    }

    fn armature(&self, id: ArmatureId) -> Result<&Armature> {
        self.armatures
            .get(id.0)
            .ok_or_else(|| IqmError::ReferenceError(format!("no armature {}", id.0)))
    }

    fn armature_mut(&mut self, id: ArmatureId) -> Result<&mut Armature> {
        self.armatures
            .get_mut(id.0)
            .ok_or_else(|| IqmError::ReferenceError(format!("no armature {}", id.0)))
    }

    fn object(&self, id: ObjectId) -> Result<&Object> {
        self.objects
            .get(id.0)
            .ok_or_else(|| IqmError::ReferenceError(format!("no object {}", id.0)))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects
            .get_mut(id.0)
            .ok_or_else(|| IqmError::ReferenceError(format!("no object {}", id.0)))
    }

    fn resolve_tag(&self, armature: ArmatureId, tag: Option<&str>) -> Result<BoneTag> {
        let parent = self.armature(armature)?;
        let bone = tag
            .map(|name| resolve_bone_tag(&parent.model.skeleton, name))
            .transpose()?;
        Ok(BoneTag { armature, bone })
    }

    /// Hang `child` from `parent`, optionally from the bone named `tag`
    ///
    /// Fails with [`IqmError::AttachCycle`] if `child` is `parent` or one of
    /// its ancestors.
    pub fn attach_armature(
        &mut self,
        child: ArmatureId,
        parent: ArmatureId,
        tag: Option<&str>,
    ) -> Result<()> {
        self.armature(child)?;
        let link = self.resolve_tag(parent, tag)?;

        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(IqmError::AttachCycle {
                    child: child.0,
                    parent: parent.0,
                });
            }
            cursor = self.armature(current)?.parent.map(|p| p.armature);
        }

        debug!(
            "Attach armature {} to armature {} bone {:?}",
            child.0, parent.0, link.bone
        );
        self.armature_mut(child)?.parent = Some(link);
        Ok(())
    }

    pub fn detach_armature(&mut self, id: ArmatureId) -> Result<()> {
        self.armature_mut(id)?.parent = None;
        Ok(())
    }

    /// Attach an object to an armature
    ///
    /// An object with its own skeleton is skinned: every one of its bones must
    /// exist by name in the armature's skeleton. An object without bones is
    /// attached rigidly to the bone named `tag` and needs one.
    pub fn attach_object(
        &mut self,
        object: ObjectId,
        armature: ArmatureId,
        tag: Option<&str>,
    ) -> Result<()> {
        let object_skeleton = &self.object(object)?.model.skeleton;
        let attachment = if object_skeleton.is_empty() {
            if tag.is_none() {
                return Err(IqmError::ReferenceError(format!(
                    "object {} has no skeleton and no bone tag",
                    object.0
                )));
            }
            Attachment::Rigid(self.resolve_tag(armature, tag)?)
        } else {
            let parent = self.armature(armature)?;
            Attachment::Skinned {
                armature,
                bone_map: resolve_skin_map(object_skeleton, &parent.model.skeleton)?,
            }
        };
        debug!("Attach object {} as {:?}", object.0, attachment);
        self.object_mut(object)?.attachment = attachment;
        Ok(())
    }

    pub fn detach_object(&mut self, id: ObjectId) -> Result<()> {
        let object = self.object_mut(id)?;
        object.attachment = Attachment::Free;
        object.skin.fill(Mat4::IDENTITY);
        Ok(())
    }

    /// Play the clip `clip` of `source` on an armature
    ///
    /// `source` may be the armature's own model or a separate animation file;
    /// bones it does not name keep their rest pose.
    pub fn play_anim(&mut self, id: ArmatureId, source: Arc<IqmModel>, clip: &str) -> Result<()> {
        let model = Arc::clone(&self.armature(id)?.model);
        let found = source.find_clip(clip).cloned().ok_or_else(|| {
            IqmError::ReferenceError(format!("no clip named '{clip}'"))
        })?;
        let map = self.retarget.get_or_build(&model.skeleton, &source.skeleton);
        debug!(
            "Armature {} plays '{}' ({} of {} bones mapped)",
            id.0,
            clip,
            map.mapped_count(),
            map.len()
        );

        let armature = self.armature_mut(id)?;
        armature.state.bind(found);
        armature.playback = Some(Playback { source, map });
        Ok(())
    }

    /// Stop playback; the armature returns to its rest pose
    pub fn stop_anim(&mut self, id: ArmatureId) -> Result<()> {
        let armature = self.armature_mut(id)?;
        armature.state.stop();
        armature.playback = None;
        Ok(())
    }

    pub fn set_armature_transform(&mut self, id: ArmatureId, transform: Transform) -> Result<()> {
        self.armature_mut(id)?.transform = transform;
        Ok(())
    }

    pub fn set_object_transform(&mut self, id: ObjectId, transform: Transform) -> Result<()> {
        self.object_mut(id)?.transform = transform;
        Ok(())
    }

    /// Advance every clip by `delta_seconds` and recompute all matrices
    pub fn update(&mut self, delta_seconds: f32) -> Result<()> {
        for armature in &mut self.armatures {
            armature.state.advance(delta_seconds);
            armature.updated = false;
        }
        for index in 0..self.armatures.len() {
            self.update_armature(ArmatureId(index))?;
        }
        for index in 0..self.objects.len() {
            self.update_object(ObjectId(index))?;
        }
        Ok(())
    }

    fn update_armature(&mut self, id: ArmatureId) -> Result<()> {
        if self.armature(id)?.updated {
            return Ok(());
        }

        let parent_matrix = match self.armature(id)?.parent {
            Some(tag) => {
                self.update_armature(tag.armature)?;
                self.tag_matrix(tag)?
            }
            None => Mat4::IDENTITY,
        };

        let armature = self.armature_mut(id)?;
        let Armature {
            model,
            playback,
            state,
            ..
        } = &mut *armature;
        match playback {
            Some(playback) => {
                state.evaluate_retargeted(&model.skeleton, &playback.source, &playback.map)?;
            }
            None => state.evaluate_rest(&model.skeleton)?,
        }
        armature.world = parent_matrix * armature.transform.to_matrix();
        armature.updated = true;
        trace!("Armature {} frame {:?}", id.0, armature.state.sampled_frame());
        Ok(())
    }

    /// World matrix of a bone (or the armature root) after its update
    fn tag_matrix(&self, tag: BoneTag) -> Result<Mat4> {
        let armature = self.armature(tag.armature)?;
        Ok(match tag.bone {
            Some(bone) => {
                let absolute = armature.state.absolute_matrices().get(bone).ok_or_else(|| {
                    IqmError::ReferenceError(format!(
                        "armature {} has no bone {}",
                        tag.armature.0, bone
                    ))
                })?;
                armature.world * *absolute
            }
            None => armature.world,
        })
    }

    fn update_object(&mut self, id: ObjectId) -> Result<()> {
        let object = self.object(id)?;
        let local = object.transform.to_matrix();
        match object.attachment.clone() {
            Attachment::Free => {
                self.object_mut(id)?.world = local;
            }
            Attachment::Rigid(tag) => {
                let parent = self.tag_matrix(tag)?;
                self.object_mut(id)?.world = parent * local;
            }
            Attachment::Skinned { armature, bone_map } => {
                let parent = self.armature(armature)?;
                let parent_world = parent.world;
                let absolute = parent.state.absolute_matrices().to_vec();
                let object = self.object_mut(id)?;
                object.world = parent_world * local;
                for ((skin, bone), &mapped) in object
                    .skin
                    .iter_mut()
                    .zip(object.model.skeleton.bones())
                    .zip(&bone_map)
                {
                    let pose = absolute.get(mapped).ok_or_else(|| {
                        IqmError::ReferenceError(format!("parent armature has no bone {mapped}"))
                    })?;
                    *skin = *pose * bone.inverse_bind_matrix;
                }
            }
        }
        Ok(())
    }

    pub fn armature_world(&self, id: ArmatureId) -> Result<Mat4> {
        Ok(self.armature(id)?.world)
    }

    pub fn armature_state(&self, id: ArmatureId) -> Result<&AnimationState> {
        Ok(&self.armature(id)?.state)
    }

    pub fn armature_parent(&self, id: ArmatureId) -> Result<Option<BoneTag>> {
        Ok(self.armature(id)?.parent)
    }

    pub fn object_world(&self, id: ObjectId) -> Result<Mat4> {
        Ok(self.object(id)?.world)
    }

    pub fn object_attachment(&self, id: ObjectId) -> Result<&Attachment> {
        Ok(&self.object(id)?.attachment)
    }

    /// Skinning matrices of a skinned object, identity otherwise
    pub fn object_skin_matrices(&self, id: ObjectId) -> Result<&[Mat4]> {
        Ok(&self.object(id)?.skin)
    }

    pub fn retarget_cache(&self) -> &RetargetCache {
        &self.retarget
    }

    /// Drop every cached retarget map; playing armatures keep theirs
    pub fn clear_retarget_cache(&mut self) {
        self.retarget.clear();
    }
}
