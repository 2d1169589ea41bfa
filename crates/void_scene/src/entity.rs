//! Entity handles for the host scene
//!
//! A host entity is an (index, generation) pair. The generation is bumped
//! every time an index is recycled so stale handles never alias a live one.

use std::fmt;

/// Host entity handle with generation for ABA protection
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Placeholder handle that never refers to a live entity
    pub const PLACEHOLDER: Self = Self {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Create a handle from its raw parts
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the world
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub const fn is_placeholder(&self) -> bool {
        self.index == u32::MAX
    }

    /// Pack into a u64 (generation in the high half)
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_placeholder() {
            write!(f, "Entity(placeholder)")
        } else {
            write!(f, "Entity({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Slot allocator with a free list
#[derive(Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    alive_count: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh handle, reusing a freed slot when one exists
    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;

        match self.free.pop() {
            Some(index) => {
                self.alive[index as usize] = true;
                Entity::new(index, self.generations[index as usize])
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.alive.push(true);
                Entity::new(index, 0)
            }
        }
    }

    /// Release a handle. Returns false if it was already dead.
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let slot = entity.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index);
        self.alive_count -= 1;
        true
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        !entity.is_placeholder()
            && self.alive.get(slot).copied().unwrap_or(false)
            && self.generations[slot] == entity.generation
    }

    #[inline]
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Iterate live handles in slot order
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(slot, _)| Entity::new(slot as u32, self.generations[slot]))
    }
}
