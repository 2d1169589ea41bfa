//! Host <-> guest identity table
//!
//! The only record of which host entities are mirrored. Both directions are
//! kept in step so the mapping stays injective.

use crate::error::{MirrorError, Result};
use crate::ffi::GuestEntityId;
use std::collections::HashMap;
use void_scene::Entity;

#[derive(Debug, Default)]
pub struct CorrespondenceTable {
    by_host: HashMap<Entity, GuestEntityId>,
    by_guest: HashMap<GuestEntityId, Entity>,
}

impl CorrespondenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn lookup_by_host(&self, host: Entity) -> Option<GuestEntityId> {
        self.by_host.get(&host).copied()
    }

    #[inline]
    pub fn lookup_by_guest(&self, guest: GuestEntityId) -> Option<Entity> {
        self.by_guest.get(&guest).copied()
    }

    /// Record a new correspondence. Leaves the table untouched on error.
    pub fn insert(&mut self, host: Entity, guest: GuestEntityId) -> Result<()> {
        if !guest.is_valid() || self.by_host.contains_key(&host) || self.by_guest.contains_key(&guest)
        {
            return Err(MirrorError::DuplicateMapping { host, guest });
        }
        self.by_host.insert(host, guest);
        self.by_guest.insert(guest, host);
        Ok(())
    }

    /// Drop the record for `host`, if any
    pub fn remove(&mut self, host: Entity) -> Option<GuestEntityId> {
        let guest = self.by_host.remove(&host)?;
        self.by_guest.remove(&guest);
        Some(guest)
    }

    /// Drop the record for `guest`, if any
    pub fn remove_by_guest(&mut self, guest: GuestEntityId) -> Option<Entity> {
        let host = self.by_guest.remove(&guest)?;
        self.by_host.remove(&host);
        Some(host)
    }

    /// Drop every record whose host entity fails `keep`, returning the
    /// dropped pairs
    pub fn retain_hosts(&mut self, mut keep: impl FnMut(Entity) -> bool) -> Vec<(Entity, GuestEntityId)> {
        let dropped: Vec<(Entity, GuestEntityId)> = self
            .by_host
            .iter()
            .filter(|(host, _)| !keep(**host))
            .map(|(h, g)| (*h, *g))
            .collect();
        for (host, guest) in &dropped {
            self.by_host.remove(host);
            self.by_guest.remove(guest);
        }
        dropped
    }

    pub fn contains_host(&self, host: Entity) -> bool {
        self.by_host.contains_key(&host)
    }

    pub fn contains_guest(&self, guest: GuestEntityId) -> bool {
        self.by_guest.contains_key(&guest)
    }

    pub fn len(&self) -> usize {
        self.by_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }

    /// All records, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (Entity, GuestEntityId)> + '_ {
        self.by_host.iter().map(|(h, g)| (*h, *g))
    }

    pub fn clear(&mut self) {
        self.by_host.clear();
        self.by_guest.clear();
    }
}
