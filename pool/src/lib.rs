#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Generic object pool shared by enemies, cannons and projectiles.
//!
//! Every instance is materialised from a single template. Acquired instances
//! are handed out by [`InstanceId`]; releasing an instance bumps its slot
//! generation so identifiers issued before the release can never reach the
//! next occupant of the slot. The pool never shrinks: released instances are
//! parked under the pool root until the pool is torn down.

use std::{collections::VecDeque, fmt};

use cannon_defence_core::{InstanceId, NodeId, Vec3};
use thiserror::Error;
use tracing::debug;

/// Entity that can be materialised from a template and recycled by a pool.
pub trait Spawnable {
    /// Template the entity is instantiated from.
    type Template;

    /// Materialises a fresh dormant instance.
    fn instantiate(template: &Self::Template) -> Self;

    /// Invoked when the instance leaves the dormant queue.
    fn on_acquire(&mut self) {}

    /// Invoked when the instance returns to the dormant queue.
    fn on_release(&mut self) {}
}

/// Scene placement of a pooled instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// World position of the instance.
    pub position: Vec3,
    /// Scene node the instance is attached to.
    pub parent: NodeId,
}

/// Errors reported by [`EntityPool`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was torn down and can no longer provide instances.
    #[error("pool has been torn down")]
    TornDown,
}

struct Slot<T> {
    instance: T,
    generation: u32,
    live: bool,
    placement: Placement,
}

/// Recycling pool of instances materialised from one template.
pub struct EntityPool<T: Spawnable> {
    template: T::Template,
    root: NodeId,
    slots: Vec<Slot<T>>,
    dormant: VecDeque<u32>,
    active: Vec<InstanceId>,
    torn_down: bool,
}

impl<T: Spawnable> EntityPool<T> {
    /// Creates a pool and prewarms `prewarm` dormant instances under `root`.
    #[must_use]
    pub fn new(template: T::Template, prewarm: usize, root: NodeId) -> Self {
        let mut pool = Self {
            template,
            root,
            slots: Vec::with_capacity(prewarm),
            dormant: VecDeque::with_capacity(prewarm),
            active: Vec::new(),
            torn_down: false,
        };
        for _ in 0..prewarm {
            let slot = pool.grow();
            pool.dormant.push_back(slot);
        }
        pool
    }

    /// Activates a dormant instance at `position`, growing the pool when empty.
    ///
    /// Dormant instances are reused in release order. When `parent` is `None`
    /// the instance stays attached to the pool root.
    pub fn acquire(
        &mut self,
        position: Vec3,
        parent: Option<NodeId>,
    ) -> Result<InstanceId, PoolError> {
        if self.torn_down {
            return Err(PoolError::TornDown);
        }

        let slot_index = match self.dormant.pop_front() {
            Some(slot) => slot,
            None => {
                let slot = self.grow();
                debug!(capacity = self.slots.len(), "pool grew past prewarm size");
                slot
            }
        };

        let root = self.root;
        let slot = &mut self.slots[slot_index as usize];
        slot.live = true;
        slot.placement = Placement {
            position,
            parent: parent.unwrap_or(root),
        };
        slot.instance.on_acquire();

        let id = InstanceId::new(slot_index, slot.generation);
        self.active.push(id);
        Ok(id)
    }

    /// Returns the instance to the dormant queue.
    ///
    /// Returns `false` without side effects when the identifier is stale,
    /// unknown or already dormant.
    pub fn release(&mut self, id: InstanceId) -> bool {
        let root = self.root;
        let Some(slot) = self.live_slot_mut(id) else {
            return false;
        };

        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.placement = Placement {
            position: Vec3::ZERO,
            parent: root,
        };
        slot.instance.on_release();

        self.dormant.push_back(id.slot());
        if let Some(index) = self.active.iter().position(|active| *active == id) {
            let _ = self.active.remove(index);
        }
        true
    }

    /// Releases every active instance and reports how many were released.
    pub fn release_all(&mut self) -> usize {
        let active = std::mem::take(&mut self.active);
        let mut released = 0;
        for id in active {
            if self.release(id) {
                released += 1;
            }
        }
        released
    }

    /// Destroys every instance, active or dormant. Later acquisitions fail.
    pub fn teardown(&mut self) {
        self.slots.clear();
        self.dormant.clear();
        self.active.clear();
        self.torn_down = true;
    }

    /// Immutable access to an active instance.
    #[must_use]
    pub fn get(&self, id: InstanceId) -> Option<&T> {
        self.live_slot(id).map(|slot| &slot.instance)
    }

    /// Mutable access to an active instance.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut T> {
        self.live_slot_mut(id).map(|slot| &mut slot.instance)
    }

    /// Mutable access to an active instance together with its placement.
    pub fn entity_mut(&mut self, id: InstanceId) -> Option<(&mut T, &mut Placement)> {
        self.live_slot_mut(id)
            .map(|slot| (&mut slot.instance, &mut slot.placement))
    }

    /// Placement of an active instance.
    #[must_use]
    pub fn placement(&self, id: InstanceId) -> Option<Placement> {
        self.live_slot(id).map(|slot| slot.placement)
    }

    /// Moves an active instance. Returns `false` for stale identifiers.
    pub fn set_position(&mut self, id: InstanceId, position: Vec3) -> bool {
        match self.live_slot_mut(id) {
            Some(slot) => {
                slot.placement.position = position;
                true
            }
            None => false,
        }
    }

    /// Active instances in acquisition order.
    #[must_use]
    pub fn active(&self) -> &[InstanceId] {
        &self.active
    }

    /// Reports whether `id` refers to a currently active instance.
    #[must_use]
    pub fn is_active(&self, id: InstanceId) -> bool {
        self.live_slot(id).is_some()
    }

    /// Number of instances waiting in the dormant queue.
    #[must_use]
    pub fn dormant_count(&self) -> usize {
        self.dormant.len()
    }

    /// Total number of instances owned by the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Reports whether the pool was torn down.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Template every instance is materialised from.
    #[must_use]
    pub fn template(&self) -> &T::Template {
        &self.template
    }

    /// Root node dormant instances are parked under.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn grow(&mut self) -> u32 {
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            instance: T::instantiate(&self.template),
            generation: 0,
            live: false,
            placement: Placement {
                position: Vec3::ZERO,
                parent: self.root,
            },
        });
        index
    }

    fn live_slot(&self, id: InstanceId) -> Option<&Slot<T>> {
        self.slots
            .get(id.slot() as usize)
            .filter(|slot| slot.live && slot.generation == id.generation())
    }

    fn live_slot_mut(&mut self, id: InstanceId) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(id.slot() as usize)
            .filter(|slot| slot.live && slot.generation == id.generation())
    }
}

impl<T: Spawnable> fmt::Debug for EntityPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPool")
            .field("root", &self.root)
            .field("capacity", &self.slots.len())
            .field("active", &self.active.len())
            .field("dormant", &self.dormant.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}
