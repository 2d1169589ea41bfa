//! Ingestion adapters for project-specific components
//!
//! Projects describe their own component sets as [`TaggedUnion`]s and
//! register `(predicate, encoder)` pairs that turn host components into
//! records of that set. The bridge runs them for every entity it spawns and
//! hands the encoded arrays to the guest next to the inbuilt records.

use crate::runtime::RawRecords;
use crate::wire::{ComponentSnapshot, TaggedUnion, WireCodec};
use void_scene::{Entity, World};

type Predicate = Box<dyn Fn(&World, Entity) -> bool>;
type Encoder<U> = Box<dyn Fn(&World, Entity) -> Option<U>>;

/// Type-erased adapter set, as stored by the bridge
pub trait Ingest {
    /// Encode the records for `entity`. The view borrows the adapter's
    /// buffer until the next call.
    fn ingest(&mut self, world: &World, entity: Entity) -> RawRecords<'_>;

    /// Number of registered adapters
    fn adapter_count(&self) -> usize;
}

/// Adapters for one project-specific component set
pub struct AdapterSet<U: TaggedUnion> {
    adapters: Vec<(Predicate, Encoder<U>)>,
    codec: WireCodec<U>,
}

impl<U: TaggedUnion> Default for AdapterSet<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: TaggedUnion> AdapterSet<U> {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
            codec: WireCodec::new(),
        }
    }

    /// Register an adapter. Encoders run only when their predicate holds.
    pub fn register(
        &mut self,
        predicate: impl Fn(&World, Entity) -> bool + 'static,
        encoder: impl Fn(&World, Entity) -> Option<U> + 'static,
    ) -> &mut Self {
        self.adapters.push((Box::new(predicate), Box::new(encoder)));
        self
    }

    /// Adapter for a single host component type
    pub fn register_component<T: 'static>(
        &mut self,
        encoder: impl Fn(&T) -> U + 'static,
    ) -> &mut Self {
        self.register(
            |world, entity| world.has::<T>(entity),
            move |world, entity| world.get::<T>(entity).map(&encoder),
        )
    }

    /// Run every matching adapter. A later adapter producing the same kind
    /// replaces the earlier one.
    pub fn snapshot(&self, world: &World, entity: Entity) -> ComponentSnapshot<U> {
        let mut snapshot = ComponentSnapshot::new();
        for (predicate, encoder) in &self.adapters {
            if !predicate(world, entity) {
                continue;
            }
            if let Some(component) = encoder(world, entity) {
                snapshot.insert(component);
            }
        }
        snapshot
    }
}

impl<U: TaggedUnion> Ingest for AdapterSet<U> {
    fn ingest(&mut self, world: &World, entity: Entity) -> RawRecords<'_> {
        let snapshot = self.snapshot(world, entity);
        RawRecords::from_slice(self.codec.encode(&snapshot))
    }

    fn adapter_count(&self) -> usize {
        self.adapters.len()
    }
}

/// The project-specific adapter sets the bridge runs on every spawn
#[derive(Default)]
pub struct Ingestion {
    pub custom: Option<Box<dyn Ingest>>,
    pub custom_state: Option<Box<dyn Ingest>>,
}

impl Ingestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom<U: TaggedUnion + 'static>(mut self, adapters: AdapterSet<U>) -> Self {
        self.custom = Some(Box::new(adapters));
        self
    }

    pub fn with_custom_state<U: TaggedUnion + 'static>(mut self, adapters: AdapterSet<U>) -> Self {
        self.custom_state = Some(Box::new(adapters));
        self
    }

    /// Encode both sets for `entity`
    pub fn ingest(&mut self, world: &World, entity: Entity) -> (RawRecords<'_>, RawRecords<'_>) {
        let custom = match self.custom.as_mut() {
            Some(adapters) => adapters.ingest(world, entity),
            None => RawRecords::empty(),
        };
        let custom_state = match self.custom_state.as_mut() {
            Some(adapters) => adapters.ingest(world, entity),
            None => RawRecords::empty(),
        };
        (custom, custom_state)
    }
}
