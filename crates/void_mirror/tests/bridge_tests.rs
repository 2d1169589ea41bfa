//! Integration tests for void_mirror
//!
//! Drive a full [`Bridge`] against an in-process guest that mints ids and
//! replays scripted structural commands during its tick.

use std::collections::HashSet;

use void_mirror::prelude::*;
use void_mirror::{CodecError, InbuiltData, InboundReport};
use void_scene::prelude::*;

/// A command the mock guest issues during its next tick
enum Scripted {
    Create(TemplateRef, Vec<InbuiltData>),
    Update(GuestEntityId, Vec<InbuiltData>),
    Destroy(GuestEntityId),
}

#[derive(Default)]
struct MockGuest {
    next_id: u64,
    refuse_spawns: usize,
    /// Answer this many spawns with the most recently minted id
    repeat_ids: usize,
    registered: Vec<(i32, Vec<Entity>)>,
    /// (host, parent guest id, custom record count)
    spawns: Vec<(Entity, Option<GuestEntityId>, usize)>,
    script: Vec<Scripted>,
}

impl MockGuest {
    fn queue(&mut self, command: Scripted) {
        self.script.push(command);
    }
}

impl GuestRuntime for MockGuest {
    fn register(&mut self, family_id: i32, templates: &[Entity]) -> void_mirror::Result<()> {
        self.registered.push((family_id, templates.to_vec()));
        Ok(())
    }

    fn spawn(&mut self, request: &SpawnRequest<'_>) -> GuestEntityId {
        if self.refuse_spawns > 0 {
            self.refuse_spawns -= 1;
            return GuestEntityId::INVALID;
        }
        if self.repeat_ids > 0 && self.next_id > 0 {
            self.repeat_ids -= 1;
            return GuestEntityId::new(self.next_id - 1);
        }
        let decoded = WireCodec::<InbuiltComponent>::decode(request.components);
        assert!(decoded.errors.is_empty());
        let parent = match decoded.snapshot.get(InbuiltComponent::PARENT) {
            Some(InbuiltComponent::Parent(id)) => Some(*id),
            _ => None,
        };
        self.spawns.push((request.host, parent, request.custom.len()));

        let id = GuestEntityId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn tick(&mut self, sink: &mut dyn InboundSink) -> void_mirror::Result<()> {
        for command in std::mem::take(&mut self.script) {
            match command {
                Scripted::Create(template, records) => sink.create(&[InboundEntity {
                    handle: template,
                    records: &records,
                }]),
                Scripted::Update(id, records) => sink.update(&[InboundEntity {
                    handle: id,
                    records: &records,
                }]),
                Scripted::Destroy(id) => sink.destroy(&[id]),
            }
        }
        Ok(())
    }
}

fn bridge() -> Bridge<MockGuest> {
    Bridge::new(MockGuest::default(), &BridgeConfig::default())
}

fn transform(matrix: Matrix4) -> InbuiltData {
    InbuiltComponent::Transform(matrix).to_raw()
}

fn assert_injective(bridge: &Bridge<MockGuest>) {
    let mut hosts = HashSet::new();
    let mut guests = HashSet::new();
    for (host, guest) in bridge.table().iter() {
        assert!(hosts.insert(host), "host {host:?} mapped twice");
        assert!(guests.insert(guest), "guest {guest} mapped twice");
        assert_eq!(bridge.table().lookup_by_guest(guest), Some(host));
    }
}

#[test]
fn child_listed_before_root_resolves_in_two_passes() {
    let mut world = World::new();
    let child = world.spawn();
    let root = world.build().with(MirrorRequest).id();
    world.insert(child, MirrorRequest).unwrap();
    world.insert(child, Parent::new(root)).unwrap();

    let mut bridge = bridge();
    bridge.start(&world).unwrap();
    let report = bridge.tick(&mut world).unwrap();

    assert_eq!(report.outbound.passes, 2);
    assert_eq!(report.outbound.spawned.len(), 2);
    assert_eq!(bridge.table().len(), 2);

    let root_id = bridge.table().lookup_by_host(root).unwrap();
    let spawns = &bridge.guest().spawns;
    assert_eq!(spawns[0].0, root);
    assert_eq!(spawns[1], (child, Some(root_id), 0));
    assert_injective(&bridge);
}

#[test]
fn shuffled_chain_resolves_within_chain_length_passes() {
    const N: usize = 6;
    let mut world = World::new();
    let links: Vec<Entity> = (0..N).map(|_| world.spawn()).collect();

    // Slot order is deepest-first; every link points at the next one
    for i in 0..N {
        world.insert(links[i], MirrorRequest).unwrap();
        if i + 1 < N {
            world.insert(links[i], Parent::new(links[i + 1])).unwrap();
        }
    }

    let mut bridge = bridge();
    let report = bridge.tick(&mut world).unwrap();

    assert!(report.outbound.passes <= N);
    assert_eq!(report.outbound.pending, 0);
    assert_eq!(bridge.table().len(), N);

    for i in 0..N - 1 {
        let parent_id = bridge.table().lookup_by_host(links[i + 1]);
        let spawn = bridge
            .guest()
            .spawns
            .iter()
            .find(|(host, _, _)| *host == links[i])
            .unwrap();
        assert_eq!(spawn.1, parent_id);
    }
    assert_injective(&bridge);
}

#[test]
fn pending_child_survives_until_parent_is_mirrored() {
    let mut world = World::new();
    let parent = world.spawn();
    let child = world
        .build()
        .with(MirrorRequest)
        .with(Parent::new(parent))
        .id();

    let mut bridge = bridge();
    for _ in 0..3 {
        let report = bridge.tick(&mut world).unwrap();
        assert!(report.outbound.spawned.is_empty());
        assert_eq!(report.outbound.pending, 1);
    }
    assert_eq!(bridge.pending()[0].entity, child);

    world.insert(parent, MirrorRequest).unwrap();
    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.outbound.spawned.len(), 2);
    assert!(bridge.pending().is_empty());
    assert_eq!(
        bridge.guest().spawns[1].1,
        bridge.table().lookup_by_host(parent)
    );
}

#[test]
fn update_for_unknown_guest_is_skipped() {
    let mut world = World::new();
    let mirrored = world.build().with(MirrorRequest).id();

    let mut bridge = bridge();
    bridge.tick(&mut world).unwrap();
    let id = bridge.table().lookup_by_host(mirrored).unwrap();

    let moved = LocalTransform::from_translation([0.0, 0.0, 9.0]).to_matrix();
    bridge
        .guest_mut()
        .queue(Scripted::Update(GuestEntityId::new(77), vec![transform(moved)]));
    bridge.guest_mut().queue(Scripted::Update(id, vec![transform(moved)]));

    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.inbound.stale, 1);
    assert_eq!(report.inbound.updated, 1);
    assert_eq!(
        world.get::<LocalToWorld>(mirrored).unwrap().translation(),
        [0.0, 0.0, 9.0]
    );
}

#[test]
fn unknown_tag_costs_only_its_record() {
    let mut world = World::new();
    let mirrored = world.build().with(MirrorRequest).id();

    let mut bridge = bridge();
    bridge.tick(&mut world).unwrap();
    let id = bridge.table().lookup_by_host(mirrored).unwrap();

    let moved = LocalTransform::from_translation([1.0, 1.0, 1.0]).to_matrix();
    let mut records = vec![
        InbuiltComponent::Parent(GuestEntityId::new(0)).to_raw(),
        InbuiltComponent::Guid([9; 4]).to_raw(),
        InbuiltComponent::Entity(mirrored.into()).to_raw(),
        transform(moved),
    ];
    records[1].tag = 250;

    let decoded = WireCodec::<InbuiltComponent>::decode(&records);
    assert_eq!(
        decoded.errors,
        vec![(1, CodecError::UnknownComponentKind { tag: 250 })]
    );
    assert_eq!(decoded.snapshot.len(), 3);

    bridge.guest_mut().queue(Scripted::Update(id, records));
    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(
        report.inbound,
        InboundReport {
            updated: 1,
            rejected_records: 1,
            ..Default::default()
        }
    );
    assert_eq!(world.get::<LocalToWorld>(mirrored).unwrap().matrix, moved);
}

#[test]
fn destroys_play_after_creates_and_updates() {
    let mut world = World::new();
    let template = world
        .build()
        .with(Prefab)
        .with(Name("spark".into()))
        .id();
    world.build().with(TemplateFamily::new(3, vec![template])).id();
    let doomed = world.build().with(MirrorRequest).id();

    let mut bridge = bridge();
    bridge.start(&world).unwrap();
    bridge.tick(&mut world).unwrap();
    let doomed_id = bridge.table().lookup_by_host(doomed).unwrap();

    // The despawn is staged before the create but plays after it
    let guest = bridge.guest_mut();
    guest.queue(Scripted::Update(doomed_id, vec![transform(IDENTITY_MATRIX)]));
    guest.queue(Scripted::Destroy(doomed_id));
    guest.queue(Scripted::Create(
        TemplateRef::new(3, 0),
        vec![transform(LocalTransform::from_translation([2.0, 0.0, 0.0]).to_matrix())],
    ));

    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.playback.updated, 1);
    assert_eq!(report.playback.despawned, 1);
    assert_eq!(report.playback.instantiated.len(), 1);
    assert!(!world.is_alive(doomed));
    assert!(!bridge.table().contains_guest(doomed_id));

    let spark = report.playback.instantiated[0];
    assert_eq!(world.get::<Name>(spark), Some(&Name("spark".into())));
    assert_eq!(
        world.get::<LocalTransform>(spark).unwrap().translation,
        [2.0, 0.0, 0.0]
    );

    // The template carries no mirror flag, so neither does its instance
    let report = bridge.tick(&mut world).unwrap();
    assert!(report.outbound.spawned.is_empty());
}

#[test]
fn guest_created_instance_is_mirrored_back_and_addressable() {
    let mut world = World::new();
    let template = world.build().with(Prefab).with(MirrorRequest).id();
    world.build().with(TemplateFamily::new(3, vec![template])).id();

    let mut bridge = bridge();
    bridge.start(&world).unwrap();
    bridge
        .guest_mut()
        .queue(Scripted::Create(TemplateRef::new(3, 0), Vec::new()));
    let report = bridge.tick(&mut world).unwrap();
    let instance = report.playback.instantiated[0];
    assert!(bridge.table().is_empty());

    // Next tick hands the instance back so the guest learns its id
    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.outbound.spawned.len(), 1);
    let id = bridge.table().lookup_by_host(instance).unwrap();
    assert_eq!(report.outbound.spawned[0], (instance, id));

    let moved = LocalTransform::from_translation([0.0, -4.0, 0.0]).to_matrix();
    bridge.guest_mut().queue(Scripted::Update(id, vec![transform(moved)]));
    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.inbound.updated, 1);
    assert_eq!(world.get::<LocalToWorld>(instance).unwrap().matrix, moved);

    bridge.guest_mut().queue(Scripted::Destroy(id));
    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.inbound.destroyed, 1);
    assert_eq!(report.playback.despawned, 1);
    assert!(!world.is_alive(instance));
    assert!(bridge.table().is_empty());
    assert!(world.is_alive(template));
}

#[test]
fn host_despawn_releases_correspondence() {
    let mut world = World::new();
    let kept = world.build().with(MirrorRequest).id();
    let gone = world.build().with(MirrorRequest).id();

    let mut bridge = bridge();
    bridge.tick(&mut world).unwrap();
    let gone_id = bridge.table().lookup_by_host(gone).unwrap();

    world.despawn(gone);
    bridge
        .guest_mut()
        .queue(Scripted::Update(gone_id, vec![transform(IDENTITY_MATRIX)]));
    let report = bridge.tick(&mut world).unwrap();

    assert_eq!(report.released, 1);
    assert_eq!(report.inbound.stale, 1);
    assert_eq!(report.inbound.updated, 0);
    assert_eq!(report.playback.skipped, 0);
    assert_eq!(bridge.table().len(), 1);
    assert!(bridge.table().contains_host(kept));
    assert!(!bridge.table().contains_guest(gone_id));
}

#[test]
fn chain_longer_than_pass_threshold_resolves_in_one_tick() {
    const N: usize = 70;
    let mut world = World::new();
    let links: Vec<Entity> = (0..N).map(|_| world.spawn()).collect();
    for i in 0..N {
        world.insert(links[i], MirrorRequest).unwrap();
        if i + 1 < N {
            world.insert(links[i], Parent::new(links[i + 1])).unwrap();
        }
    }

    let mut bridge = bridge();
    let report = bridge.tick(&mut world).unwrap();

    assert_eq!(report.outbound.passes, N);
    assert_eq!(report.outbound.pending, 0);
    assert_eq!(bridge.table().len(), N);
    assert_injective(&bridge);
}

#[test]
fn repeated_guest_id_aborts_tick_and_keeps_pending() {
    let mut world = World::new();
    let a = world.build().with(MirrorRequest).id();
    let b = world.build().with(MirrorRequest).id();
    let c = world.build().with(MirrorRequest).id();

    let mut bridge = bridge();
    bridge.guest_mut().repeat_ids = 1;

    let err = bridge.tick(&mut world).unwrap_err();
    assert!(matches!(err, MirrorError::DuplicateMapping { host, .. } if host == b));
    assert!(err.aborts_tick());

    assert_eq!(bridge.table().len(), 1);
    assert!(bridge.table().contains_host(a));
    assert!(!bridge.table().contains_host(b));
    assert_injective(&bridge);
    let pending: Vec<Entity> = bridge.pending().iter().map(|p| p.entity).collect();
    assert_eq!(pending, vec![c]);

    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.outbound.spawned.len(), 2);
    assert_eq!(bridge.table().len(), 3);
    assert!(bridge.pending().is_empty());
    assert_injective(&bridge);
}

#[test]
fn templates_are_registered_once() {
    let mut world = World::new();
    let a = world.build().with(Prefab).id();
    world.build().with(TemplateFamily::new(1, vec![a])).id();

    let mut bridge = bridge();
    bridge.start(&world).unwrap();
    bridge.start(&world).unwrap();
    bridge.tick(&mut world).unwrap();

    assert_eq!(bridge.guest().registered, vec![(1, vec![a])]);
}

#[test]
fn refused_spawn_aborts_tick_and_retries() {
    let mut world = World::new();
    let e = world.build().with(MirrorRequest).id();

    let mut bridge = bridge();
    bridge.guest_mut().refuse_spawns = 1;

    let err = bridge.tick(&mut world).unwrap_err();
    assert!(matches!(err, MirrorError::TransportFault(_)));
    assert!(err.aborts_tick());
    assert!(bridge.table().is_empty());

    let report = bridge.tick(&mut world).unwrap();
    assert_eq!(report.outbound.spawned.len(), 1);
    assert!(bridge.table().contains_host(e));
}

#[test]
fn custom_components_reach_the_guest() {
    #[derive(Clone, Copy)]
    #[repr(C)]
    struct SpeedRaw {
        tag: u8,
        speed: f32,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Speed(f32);

    impl TaggedUnion for Speed {
        type Raw = SpeedRaw;
        const KIND_COUNT: usize = 1;

        fn tag(&self) -> u8 {
            0
        }

        fn to_raw(&self) -> SpeedRaw {
            SpeedRaw { tag: 0, speed: self.0 }
        }

        fn raw_tag(raw: &SpeedRaw) -> u8 {
            raw.tag
        }

        fn from_raw(raw: &SpeedRaw) -> std::result::Result<Self, CodecError> {
            match raw.tag {
                0 => Ok(Speed(raw.speed)),
                tag => Err(CodecError::UnknownComponentKind { tag }),
            }
        }
    }

    #[derive(Clone)]
    struct Velocity(f32);

    let mut world = World::new();
    let fast = world.build().with(MirrorRequest).with(Velocity(12.0)).id();
    let still = world.build().with(MirrorRequest).id();

    let mut adapters = AdapterSet::<Speed>::new();
    adapters.register_component::<Velocity>(|v| Speed(v.0));
    let mut bridge =
        Bridge::new(MockGuest::default(), &BridgeConfig::default()).with_custom_components(adapters);
    bridge.tick(&mut world).unwrap();

    let spawns = &bridge.guest().spawns;
    assert_eq!(spawns.iter().find(|s| s.0 == fast).unwrap().2, 1);
    assert_eq!(spawns.iter().find(|s| s.0 == still).unwrap().2, 0);
}
