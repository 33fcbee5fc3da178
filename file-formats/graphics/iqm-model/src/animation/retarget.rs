//! Bone correspondence between independently authored skeletons
//!
//! Matching is exact name equality found by linear scan. Skeletons are small
//! and maps are cached, so nothing cleverer is needed.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::error::{IqmError, Result};
use crate::skeleton::{Skeleton, SkeletonId};

/// For every destination bone, the source bone with the same name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetargetMap {
    destination: SkeletonId,
    source: SkeletonId,
    entries: Vec<Option<usize>>,
}

impl RetargetMap {
    /// Map `destination` bones onto `source` bones by name
    ///
    /// Destination bones without a namesake stay unmapped and keep their rest
    /// pose when the map is applied.
    pub fn build(destination: &Skeleton, source: &Skeleton) -> Self {
        let entries: Vec<Option<usize>> = destination
            .bones()
            .iter()
            .map(|bone| source.find_bone(&bone.name))
            .collect();

        let unmapped = entries.iter().filter(|e| e.is_none()).count();
        if unmapped > 0 {
            debug!(
                "Retarget {:?} <- {:?}: {} of {} bones unmapped",
                destination.id(),
                source.id(),
                unmapped,
                entries.len()
            );
        }

        Self {
            destination: destination.id(),
            source: source.id(),
            entries,
        }
    }

    pub fn destination(&self) -> SkeletonId {
        self.destination
    }

    pub fn source(&self) -> SkeletonId {
        self.source
    }

    /// Source bone driving destination bone `index`
    pub fn get(&self, index: usize) -> Option<usize> {
        self.entries.get(index).copied().flatten()
    }

    pub fn entries(&self) -> &[Option<usize>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mapped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Whether every bone maps to the bone at the same index
    pub fn is_identity(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, entry)| *entry == Some(i))
    }
}

/// Map every bone of a skinned object onto its parent armature's skeleton
///
/// Unlike clip retargeting a partial map is not usable here: any bone missing
/// from `parent` fails the whole attach.
pub fn resolve_skin_map(object: &Skeleton, parent: &Skeleton) -> Result<Vec<usize>> {
    object
        .bones()
        .iter()
        .map(|bone| {
            parent.find_bone(&bone.name).ok_or_else(|| {
                IqmError::ReferenceError(format!(
                    "bone '{}' has no match in the parent skeleton",
                    bone.name
                ))
            })
        })
        .collect()
}

/// Resolve the single bone a rigid attachment follows
pub fn resolve_bone_tag(skeleton: &Skeleton, name: &str) -> Result<usize> {
    skeleton
        .find_bone(name)
        .ok_or_else(|| IqmError::ReferenceError(format!("no bone named '{name}'")))
}

/// Retarget maps keyed by (destination, source) skeleton identity
///
/// Entries live until [`RetargetCache::clear`] is called.
#[derive(Debug, Default)]
pub struct RetargetCache {
    maps: HashMap<(SkeletonId, SkeletonId), Arc<RetargetMap>>,
}

impl RetargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached map for this pair, built on first request
    pub fn get_or_build(&mut self, destination: &Skeleton, source: &Skeleton) -> Arc<RetargetMap> {
        self.maps
            .entry((destination.id(), source.id()))
            .or_insert_with(|| Arc::new(RetargetMap::build(destination, source)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn clear(&mut self) {
        self.maps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::pose::Pose;
    use crate::chunks::JointRecord;

    fn skeleton(names: &[&str]) -> Skeleton {
        let joints: Vec<JointRecord> = names
            .iter()
            .enumerate()
            .map(|(i, name)| JointRecord {
                name: (*name).to_string(),
                parent: i as i32 - 1,
                pose: Pose::IDENTITY,
            })
            .collect();
        Skeleton::from_joints(&joints).unwrap()
    }

    #[test]
    fn test_self_map_is_identity() {
        let a = skeleton(&["root", "spine", "head"]);
        let map = RetargetMap::build(&a, &a);
        assert!(map.is_identity());
        assert_eq!(map.mapped_count(), 3);
    }

    #[test]
    fn test_reordered_names() {
        let dest = skeleton(&["root", "spine", "head"]);
        let src = skeleton(&["root", "head", "spine"]);
        let map = RetargetMap::build(&dest, &src);
        assert_eq!(map.entries(), &[Some(0), Some(2), Some(1)]);
        assert!(!map.is_identity());
    }

    #[test]
    fn test_partial_map_is_not_an_error() {
        let dest = skeleton(&["root", "cape", "head"]);
        let src = skeleton(&["root", "head"]);
        let map = RetargetMap::build(&dest, &src);
        assert_eq!(map.get(0), Some(0));
        assert_eq!(map.get(1), None);
        assert_eq!(map.get(2), Some(1));
        assert_eq!(map.get(99), None);
    }

    #[test]
    fn test_build_is_pure() {
        let dest = skeleton(&["a", "b", "c"]);
        let src = skeleton(&["c", "a"]);
        assert_eq!(RetargetMap::build(&dest, &src), RetargetMap::build(&dest, &src));
    }

    #[test]
    fn test_skin_map_requires_every_bone() {
        let parent = skeleton(&["root", "spine", "head"]);
        assert_eq!(
            resolve_skin_map(&skeleton(&["spine", "head"]), &parent).unwrap(),
            vec![1, 2]
        );
        assert!(matches!(
            resolve_skin_map(&skeleton(&["spine", "tail"]), &parent),
            Err(IqmError::ReferenceError(_))
        ));
    }

    #[test]
    fn test_bone_tag() {
        let parent = skeleton(&["root", "hand"]);
        assert_eq!(resolve_bone_tag(&parent, "hand").unwrap(), 1);
        assert!(resolve_bone_tag(&parent, "foot").is_err());
    }

    #[test]
    fn test_cache_reuses_maps() {
        let dest = skeleton(&["root", "head"]);
        let src = skeleton(&["head"]);
        let mut cache = RetargetCache::new();
        let first = cache.get_or_build(&dest, &src);
        let second = cache.get_or_build(&dest, &src);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.get_or_build(&src, &dest);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
