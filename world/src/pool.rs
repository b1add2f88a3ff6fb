//! Generational arena that recycles pooled instances by tag.

use std::{
    collections::{BTreeMap, VecDeque},
    fmt::Debug,
    marker::PhantomData,
};

use glam::Vec2;
use tracing::{debug, warn};

/// Instance that can be stamped out of a prefab and placed on the field.
pub(crate) trait Poolable: Clone {
    /// Moves a freshly acquired instance to its spawn transform.
    fn place(&mut self, position: Vec2, facing: f32);
}

/// Generational handle issued by an [`EntityPool`].
pub(crate) trait PoolHandle: Copy {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn slot(&self) -> u32;
    fn generation(&self) -> u32;
}

#[derive(Debug)]
struct Slot<K, T> {
    tag: K,
    generation: u32,
    active: bool,
    item: T,
}

/// Arena of pooled instances keyed by tag.
///
/// Idle slots of each tag are reused oldest first. A slot's generation is
/// bumped on release so handles issued before the release stop resolving.
#[derive(Debug)]
pub(crate) struct EntityPool<K, T, H> {
    prefabs: BTreeMap<K, T>,
    slots: Vec<Slot<K, T>>,
    idle: BTreeMap<K, VecDeque<u32>>,
    active: usize,
    handle: PhantomData<H>,
}

impl<K, T, H> EntityPool<K, T, H>
where
    K: Ord + Copy + Debug,
    T: Poolable,
    H: PoolHandle,
{
    pub(crate) fn new() -> Self {
        Self {
            prefabs: BTreeMap::new(),
            slots: Vec::new(),
            idle: BTreeMap::new(),
            active: 0,
            handle: PhantomData,
        }
    }

    /// Registers the prefab for a tag and creates `prewarm` idle instances of it.
    pub(crate) fn register(&mut self, tag: K, prefab: T, prewarm: u32) {
        let queue = self.idle.entry(tag).or_default();
        for _ in 0..prewarm {
            let Ok(index) = u32::try_from(self.slots.len()) else {
                break;
            };
            self.slots.push(Slot {
                tag,
                generation: 0,
                active: false,
                item: prefab.clone(),
            });
            queue.push_back(index);
        }
        if self.prefabs.insert(tag, prefab).is_some() {
            debug!(?tag, "replaced pooled prefab");
        }
    }

    /// Activates an instance of the tag at the provided transform.
    ///
    /// Returns `None` when no prefab is registered for the tag.
    pub(crate) fn acquire(&mut self, tag: K, position: Vec2, facing: f32) -> Option<H> {
        let Some(prefab) = self.prefabs.get(&tag) else {
            warn!(?tag, "no pooled prefab registered for tag");
            return None;
        };

        let index = match self.idle.get_mut(&tag).and_then(VecDeque::pop_front) {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(Slot {
                    tag,
                    generation: 0,
                    active: false,
                    item: prefab.clone(),
                });
                index
            }
        };

        let slot = self.slots.get_mut(index as usize)?;
        slot.item = prefab.clone();
        slot.item.place(position, facing);
        slot.active = true;
        self.active += 1;
        Some(H::from_parts(index, slot.generation))
    }

    /// Deactivates the instance and queues its slot for reuse.
    ///
    /// Stale handles and tag mismatches are ignored and reported as `false`.
    pub(crate) fn release(&mut self, handle: H, tag: K) -> bool {
        let index = handle.slot();
        let Some(slot) = self.slots.get_mut(index as usize) else {
            warn!(slot = index, "release of unknown pool slot");
            return false;
        };
        if !slot.active || slot.generation != handle.generation() {
            debug!(slot = index, "ignoring release of stale pool handle");
            return false;
        }
        if slot.tag != tag {
            warn!(slot = index, expected = ?slot.tag, given = ?tag, "release under wrong pool tag");
            return false;
        }

        slot.active = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.active -= 1;
        self.idle.entry(tag).or_default().push_back(index);
        true
    }

    pub(crate) fn get(&self, handle: H) -> Option<&T> {
        self.slots
            .get(handle.slot() as usize)
            .filter(|slot| slot.active && slot.generation == handle.generation())
            .map(|slot| &slot.item)
    }

    pub(crate) fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.slots
            .get_mut(handle.slot() as usize)
            .filter(|slot| slot.active && slot.generation == handle.generation())
            .map(|slot| &mut slot.item)
    }

    pub(crate) fn is_live(&self, handle: H) -> bool {
        self.get(handle).is_some()
    }

    /// Active instances in slot order.
    pub(crate) fn iter_active(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let index = u32::try_from(index).ok()?;
            slot.active
                .then(|| (H::from_parts(index, slot.generation), &slot.item))
        })
    }

    /// Handles of every active instance in slot order.
    pub(crate) fn handles(&self) -> Vec<H> {
        self.iter_active().map(|(handle, _)| handle).collect()
    }

    pub(crate) fn active_count(&self) -> usize {
        self.active
    }

    pub(crate) fn idle_count(&self, tag: K) -> usize {
        self.idle.get(&tag).map_or(0, VecDeque::len)
    }
}
