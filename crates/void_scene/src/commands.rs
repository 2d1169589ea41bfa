//! Deferred world mutation
//!
//! Commands are recorded while the world is borrowed elsewhere and applied in
//! one go by [`CommandBuffer::playback`]. Creates and updates run in the order
//! they were recorded; despawns always run last.

use crate::components::{LocalToWorld, LocalTransform, Matrix4};
use crate::entity::Entity;
use crate::world::World;

/// A single recorded mutation
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clone a template, optionally overriding its local transform
    Instantiate {
        template: Entity,
        local: Option<LocalTransform>,
    },
    /// Overwrite the world-space matrix of an existing entity
    SetWorldMatrix { entity: Entity, matrix: Matrix4 },
    /// Remove an entity
    Despawn(Entity),
}

/// What a playback actually did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackReport {
    /// Instances created, in command order
    pub instantiated: Vec<Entity>,
    pub updated: usize,
    pub despawned: usize,
    /// Commands whose target no longer existed at playback time
    pub skipped: usize,
}

/// Ordered command queue, consumed by playback
#[derive(Clone, Debug, Default)]
pub struct CommandBuffer {
    /// Creates and updates, in recording order
    ordered: Vec<Command>,
    /// Despawns, played after everything else
    despawns: Vec<Entity>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an instance of `template`
    pub fn instantiate(&mut self, template: Entity, local: Option<LocalTransform>) {
        self.ordered.push(Command::Instantiate { template, local });
    }

    /// Queue a world matrix write
    pub fn set_world_matrix(&mut self, entity: Entity, matrix: Matrix4) {
        self.ordered.push(Command::SetWorldMatrix { entity, matrix });
    }

    /// Queue a despawn
    pub fn despawn(&mut self, entity: Entity) {
        self.despawns.push(entity);
    }

    pub fn len(&self) -> usize {
        self.ordered.len() + self.despawns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty() && self.despawns.is_empty()
    }

    /// Recorded commands in playback order
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.ordered
            .iter()
            .cloned()
            .chain(self.despawns.iter().copied().map(Command::Despawn))
    }

    /// Apply every command to the world. Consumes the buffer so a recorded
    /// batch can only be played once.
    pub fn playback(self, world: &mut World) -> PlaybackReport {
        let mut report = PlaybackReport::default();

        let despawns = self.despawns.into_iter().map(Command::Despawn);
        for command in self.ordered.into_iter().chain(despawns) {
            apply(world, command, &mut report);
        }

        report
    }
}

fn apply(world: &mut World, command: Command, report: &mut PlaybackReport) {
    match command {
        Command::Instantiate { template, local } => {
            let instance = match world.instantiate(template) {
                Ok(instance) => instance,
                Err(e) => {
                    log::warn!("Skipping instantiate: {}", e);
                    report.skipped += 1;
                    return;
                }
            };
            if let Some(local) = local {
                if let Err(e) = world.insert(instance, local) {
                    log::warn!("Instance {:?} kept its template transform: {}", instance, e);
                }
            }
            report.instantiated.push(instance);
        }
        Command::SetWorldMatrix { entity, matrix } => {
            if world.insert(entity, LocalToWorld { matrix }).is_ok() {
                report.updated += 1;
            } else {
                log::debug!("Skipping world matrix for dead {:?}", entity);
                report.skipped += 1;
            }
        }
        Command::Despawn(entity) => {
            if world.despawn(entity) {
                report.despawned += 1;
            } else {
                log::debug!("Skipping despawn of dead {:?}", entity);
                report.skipped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{MirrorRequest, Prefab, IDENTITY_MATRIX};

    #[test]
    fn test_despawns_run_after_updates() {
        let mut world = World::new();
        let e = world.spawn();

        let mut buffer = CommandBuffer::new();
        buffer.despawn(e);
        buffer.set_world_matrix(e, IDENTITY_MATRIX);

        let order: Vec<_> = buffer.commands().collect();
        assert_eq!(order.last(), Some(&Command::Despawn(e)));

        let report = buffer.playback(&mut world);
        assert_eq!(report.updated, 1);
        assert_eq!(report.despawned, 1);
        assert!(!world.is_alive(e));
    }

    #[test]
    fn test_instantiate_applies_local_override() {
        let mut world = World::new();
        let template = world
            .build()
            .with(Prefab)
            .with(MirrorRequest)
            .with(LocalTransform::IDENTITY)
            .id();

        let mut buffer = CommandBuffer::new();
        let local = LocalTransform::from_translation([0.0, 5.0, 0.0]);
        buffer.instantiate(template, Some(local));
        let report = buffer.playback(&mut world);

        let instance = report.instantiated[0];
        assert_eq!(world.get::<LocalTransform>(instance), Some(&local));
        assert!(world.has::<MirrorRequest>(instance));
        assert!(!world.has::<Prefab>(instance));
    }

    #[test]
    fn test_dead_targets_are_skipped() {
        let mut world = World::new();
        let gone = world.spawn();
        world.despawn(gone);

        let mut buffer = CommandBuffer::new();
        buffer.instantiate(gone, None);
        buffer.set_world_matrix(gone, IDENTITY_MATRIX);
        buffer.despawn(gone);
        assert_eq!(buffer.len(), 3);

        let report = buffer.playback(&mut world);
        assert_eq!(report.skipped, 3);
        assert!(report.instantiated.is_empty());
    }
}
