//! Outbound batch builder
//!
//! Every tick, host entities carrying [`MirrorRequest`] without a
//! correspondence record are spawned into the guest. A child is only spawned
//! once its parent has a guest id; until then it waits in the pending set,
//! which survives across ticks. Within a tick the set is swept repeatedly so
//! that a parent resolved in one pass unblocks its children in the next.

use crate::correspondence::CorrespondenceTable;
use crate::error::{MirrorError, Result};
use crate::ffi::{EntityMirror, GuestEntityId};
use crate::runtime::{GuestRuntime, SpawnRequest};
use crate::schema::Ingestion;
use crate::wire::{ComponentSnapshot, InbuiltComponent, WireCodec};
use std::collections::HashSet;
use void_scene::{Entity, Guid, LocalTransform, MirrorRequest, Parent, Prefab, World};

/// A host entity waiting for its parent to be mirrored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingEntity {
    pub entity: Entity,
    /// Tick on which the entity was first deferred
    pub since_tick: u64,
    warned: bool,
}

/// What one resolution step did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutboundReport {
    /// New correspondences, in spawn order
    pub spawned: Vec<(Entity, GuestEntityId)>,
    /// Sweeps over the candidate set, the gather pass included
    pub passes: usize,
    /// Entities still waiting afterwards
    pub pending: usize,
}

enum Attempt {
    Spawned(GuestEntityId),
    /// Parent exists but has no guest id yet
    Deferred(Entity),
}

/// Borrowed pieces of the bridge the builder needs for one step
pub struct OutboundContext<'a, G: GuestRuntime + ?Sized> {
    pub world: &'a World,
    pub table: &'a mut CorrespondenceTable,
    pub guest: &'a mut G,
    pub codec: &'a mut WireCodec<InbuiltComponent>,
    pub ingestion: &'a mut Ingestion,
    pub tick: u64,
}

pub struct OutboundBuilder {
    pending: Vec<PendingEntity>,
    /// Sweep count past which a tick is reported as slow to converge
    warn_passes: usize,
    warn_after_ticks: u64,
}

impl OutboundBuilder {
    pub fn new(warn_passes: usize, warn_after_ticks: u64) -> Self {
        Self {
            pending: Vec::new(),
            warn_passes: warn_passes.max(1),
            warn_after_ticks,
        }
    }

    /// Entities deferred from earlier ticks
    pub fn pending(&self) -> &[PendingEntity] {
        &self.pending
    }

    pub fn is_pending(&self, entity: Entity) -> bool {
        self.pending.iter().any(|p| p.entity == entity)
    }

    /// Host entities that should be mirrored and are not yet
    fn is_candidate(world: &World, table: &CorrespondenceTable, entity: Entity) -> bool {
        world.is_alive(entity)
            && world.has::<MirrorRequest>(entity)
            && !world.has::<Prefab>(entity)
            && !table.contains_host(entity)
    }

    /// Snapshot the inbuilt components of `entity`, or report the parent it
    /// is waiting on.
    pub fn snapshot(
        world: &World,
        table: &CorrespondenceTable,
        entity: Entity,
    ) -> std::result::Result<ComponentSnapshot<InbuiltComponent>, Entity> {
        let mut snapshot = ComponentSnapshot::new();

        if let Some(parent) = world.get::<Parent>(entity) {
            match table.lookup_by_host(parent.entity) {
                Some(guest) => {
                    snapshot.insert(InbuiltComponent::Parent(guest));
                }
                None => return Err(parent.entity),
            }
        }

        snapshot.insert(InbuiltComponent::Entity(EntityMirror::from(entity)));

        if let Some(guid) = world.get::<Guid>(entity) {
            snapshot.insert(InbuiltComponent::Guid(guid.hash));
        }

        let local = world.get::<LocalTransform>(entity).copied().unwrap_or_default();
        snapshot.insert(InbuiltComponent::Transform(local.to_matrix()));

        Ok(snapshot)
    }

    fn attempt<G: GuestRuntime + ?Sized>(
        cx: &mut OutboundContext<'_, G>,
        entity: Entity,
    ) -> Result<Attempt> {
        let snapshot = match Self::snapshot(cx.world, cx.table, entity) {
            Ok(snapshot) => snapshot,
            Err(parent) => return Ok(Attempt::Deferred(parent)),
        };

        let components = cx.codec.encode(&snapshot);
        let (custom, custom_state) = cx.ingestion.ingest(cx.world, entity);
        let request = SpawnRequest {
            host: entity,
            components,
            custom,
            custom_state,
        };

        let guest = cx.guest.spawn(&request);
        if !guest.is_valid() {
            return Err(MirrorError::transport(format!(
                "guest refused to spawn {:?}",
                entity
            )));
        }

        cx.table.insert(entity, guest)?;
        log::trace!("Mirrored {:?} as {}", entity, guest);
        Ok(Attempt::Spawned(guest))
    }

    /// Run one resolution step.
    ///
    /// On error the unattempted and deferred entities stay pending; the
    /// entity that failed is picked up again by the next gather.
    pub fn resolve<G: GuestRuntime + ?Sized>(
        &mut self,
        cx: &mut OutboundContext<'_, G>,
    ) -> Result<OutboundReport> {
        let mut report = OutboundReport::default();

        // Carried-over entities go first
        let mut queue = std::mem::take(&mut self.pending);
        queue.retain(|p| {
            let keep = Self::is_candidate(cx.world, cx.table, p.entity);
            if !keep {
                log::debug!("Dropping pending {:?}: no longer a mirror candidate", p.entity);
            }
            keep
        });

        let queued: HashSet<Entity> = queue.iter().map(|p| p.entity).collect();
        for entity in cx.world.query::<MirrorRequest>() {
            if !queued.contains(&entity) && Self::is_candidate(cx.world, cx.table, entity) {
                queue.push(PendingEntity {
                    entity,
                    since_tick: cx.tick,
                    warned: false,
                });
            }
        }

        // Every sweep either maps an entity or ends the loop
        while !queue.is_empty() {
            report.passes += 1;
            let mut deferred = Vec::with_capacity(queue.len());
            let mut resolved_any = false;

            let mut remaining = queue.into_iter();
            while let Some(candidate) = remaining.next() {
                match Self::attempt(cx, candidate.entity) {
                    Ok(Attempt::Spawned(guest)) => {
                        report.spawned.push((candidate.entity, guest));
                        resolved_any = true;
                    }
                    Ok(Attempt::Deferred(parent)) => {
                        log::debug!(
                            "Deferring {:?}: parent {:?} is not mirrored yet",
                            candidate.entity,
                            parent
                        );
                        deferred.push(candidate);
                    }
                    Err(e) => {
                        self.pending = deferred;
                        self.pending.extend(remaining);
                        return Err(e);
                    }
                }
            }

            queue = deferred;
            if !resolved_any {
                break;
            }
        }

        if report.passes > self.warn_passes {
            log::warn!(
                "Resolution took {} passes (threshold {}) for {} spawns",
                report.passes,
                self.warn_passes,
                report.spawned.len()
            );
        }

        for pending in &mut queue {
            let age = cx.tick.saturating_sub(pending.since_tick);
            if !pending.warned && self.warn_after_ticks > 0 && age >= self.warn_after_ticks {
                log::warn!(
                    "{:?} has waited {} ticks for its parent to be mirrored",
                    pending.entity,
                    age
                );
                pending.warned = true;
            }
        }

        report.pending = queue.len();
        self.pending = queue;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::InboundSink;
    use void_scene::IDENTITY_MATRIX;

    /// Mints sequential ids and records what it was sent
    #[derive(Default)]
    struct Minting {
        next: u64,
        spawned: Vec<(Entity, Option<GuestEntityId>)>,
    }

    impl GuestRuntime for Minting {
        fn register(&mut self, _family_id: i32, _templates: &[Entity]) -> Result<()> {
            Ok(())
        }

        fn spawn(&mut self, request: &SpawnRequest<'_>) -> GuestEntityId {
            let decoded = WireCodec::<InbuiltComponent>::decode(request.components);
            let parent = match decoded.snapshot.get(InbuiltComponent::PARENT) {
                Some(InbuiltComponent::Parent(id)) => Some(*id),
                _ => None,
            };
            self.spawned.push((request.host, parent));
            let id = GuestEntityId::new(100 + self.next);
            self.next += 1;
            id
        }

        fn tick(&mut self, _sink: &mut dyn InboundSink) -> Result<()> {
            Ok(())
        }
    }

    struct Harness {
        table: CorrespondenceTable,
        guest: Minting,
        codec: WireCodec<InbuiltComponent>,
        ingestion: Ingestion,
        builder: OutboundBuilder,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                table: CorrespondenceTable::new(),
                guest: Minting::default(),
                codec: WireCodec::new(),
                ingestion: Ingestion::new(),
                builder: OutboundBuilder::new(64, 2),
            }
        }

        fn resolve(&mut self, world: &World, tick: u64) -> OutboundReport {
            let mut cx = OutboundContext {
                world,
                table: &mut self.table,
                guest: &mut self.guest,
                codec: &mut self.codec,
                ingestion: &mut self.ingestion,
                tick,
            };
            self.builder.resolve(&mut cx).unwrap()
        }
    }

    #[test]
    fn test_child_before_root_takes_two_passes() {
        let mut world = World::new();
        let child = world.spawn();
        let root = world.build().with(MirrorRequest).id();
        world.insert(child, MirrorRequest).unwrap();
        world.insert(child, Parent::new(root)).unwrap();

        let mut h = Harness::new();
        let report = h.resolve(&world, 1);

        assert_eq!(report.passes, 2);
        assert_eq!(report.pending, 0);
        let root_id = h.table.lookup_by_host(root).unwrap();
        assert_eq!(
            h.guest.spawned,
            vec![(root, None), (child, Some(root_id))]
        );
        assert_eq!(h.table.len(), 2);
    }

    #[test]
    fn test_long_chain_resolves_past_pass_threshold() {
        const N: usize = 70;
        let mut world = World::new();
        let links: Vec<Entity> = (0..N).map(|_| world.spawn()).collect();
        for i in 0..N {
            world.insert(links[i], MirrorRequest).unwrap();
            if i + 1 < N {
                world.insert(links[i], Parent::new(links[i + 1])).unwrap();
            }
        }

        let mut h = Harness::new();
        h.builder = OutboundBuilder::new(8, 2);
        let report = h.resolve(&world, 1);

        assert_eq!(report.passes, N);
        assert_eq!(report.pending, 0);
        assert_eq!(h.table.len(), N);
    }

    #[test]
    fn test_snapshot_defaults() {
        let mut world = World::new();
        let e = world.build().with(MirrorRequest).with(Guid::new([7; 4])).id();
        let table = CorrespondenceTable::new();

        let snapshot = OutboundBuilder::snapshot(&world, &table, e).unwrap();
        assert_eq!(
            snapshot.get(InbuiltComponent::TRANSFORM),
            Some(&InbuiltComponent::Transform(IDENTITY_MATRIX))
        );
        assert_eq!(
            snapshot.get(InbuiltComponent::GUID),
            Some(&InbuiltComponent::Guid([7; 4]))
        );
        assert!(!snapshot.contains(InbuiltComponent::PARENT));
    }

    #[test]
    fn test_unmirrored_parent_keeps_child_pending() {
        let mut world = World::new();
        let parent = world.spawn();
        let child = world
            .build()
            .with(MirrorRequest)
            .with(Parent::new(parent))
            .id();

        let mut h = Harness::new();
        for tick in 1..=3 {
            let report = h.resolve(&world, tick);
            assert_eq!(report.passes, 1);
            assert_eq!(report.pending, 1);
        }
        assert!(h.builder.is_pending(child));
        assert_eq!(h.builder.pending()[0].since_tick, 1);

        world.insert(parent, MirrorRequest).unwrap();
        let report = h.resolve(&world, 4);
        assert_eq!(report.spawned.len(), 2);
        assert!(h.builder.pending().is_empty());
    }

    #[test]
    fn test_despawned_pending_is_dropped() {
        let mut world = World::new();
        let parent = world.spawn();
        let child = world
            .build()
            .with(MirrorRequest)
            .with(Parent::new(parent))
            .id();

        let mut h = Harness::new();
        h.resolve(&world, 1);
        world.despawn(child);
        let report = h.resolve(&world, 2);
        assert_eq!(report.pending, 0);
        assert!(h.guest.spawned.is_empty());
    }

    #[test]
    fn test_prefabs_are_not_mirrored() {
        let mut world = World::new();
        world.build().with(MirrorRequest).with(Prefab).id();

        let mut h = Harness::new();
        let report = h.resolve(&world, 1);
        assert_eq!(report.passes, 0);
        assert!(report.spawned.is_empty());
    }
}
