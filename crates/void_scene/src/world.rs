//! World - Container for the host scene
//!
//! Components are stored per type in sparse maps keyed by entity. Every
//! component type must be `Clone` so template entities can be instanced.

use crate::components::Prefab;
use crate::entity::{Entity, EntityAllocator};
use crate::error::{Result, SceneError};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};

/// Object-safe view of a stored component
pub trait Component: Any + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn Component>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Clone + Send + Sync + 'static> Component for T {
    fn clone_boxed(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Storage for a single component type
struct ComponentColumn {
    name: &'static str,
    data: HashMap<Entity, Box<dyn Component>>,
}

impl ComponentColumn {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            data: HashMap::new(),
        }
    }
}

/// The host scene
#[derive(Default)]
pub struct World {
    entities: EntityAllocator,
    columns: BTreeMap<TypeId, ComponentColumn>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Entity Management ==========

    /// Spawn an entity with no components
    pub fn spawn(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Start building an entity fluently
    pub fn build(&mut self) -> EntityBuilder<'_> {
        let entity = self.spawn();
        EntityBuilder {
            world: self,
            entity,
        }
    }

    /// Despawn an entity and drop all of its components.
    /// Returns false if the entity was already dead.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.free(entity) {
            return false;
        }
        for column in self.columns.values_mut() {
            column.data.remove(&entity);
        }
        true
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.alive_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live entities in slot order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    // ========== Components ==========

    /// Insert or replace a component
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, entity: Entity, component: T) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(SceneError::EntityNotFound(entity));
        }
        self.columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ComponentColumn::new(std::any::type_name::<T>()))
            .data
            .insert(entity, Box::new(component));
        Ok(())
    }

    pub fn remove<T: 'static>(&mut self, entity: Entity) -> Option<T> {
        let boxed = self.columns.get_mut(&TypeId::of::<T>())?.data.remove(&entity)?;
        boxed.into_any().downcast::<T>().ok().map(|b| *b)
    }

    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        let component: &dyn Component = &**self.columns.get(&TypeId::of::<T>())?.data.get(&entity)?;
        component.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        let component: &mut dyn Component =
            &mut **self.columns.get_mut(&TypeId::of::<T>())?.data.get_mut(&entity)?;
        component.as_any_mut().downcast_mut::<T>()
    }

    pub fn has<T: 'static>(&self, entity: Entity) -> bool {
        self.columns
            .get(&TypeId::of::<T>())
            .map_or(false, |column| column.data.contains_key(&entity))
    }

    /// Entities carrying a `T`, in slot order
    pub fn query<T: 'static>(&self) -> Vec<Entity> {
        let Some(column) = self.columns.get(&TypeId::of::<T>()) else {
            return Vec::new();
        };
        let mut found: Vec<Entity> = column.data.keys().copied().collect();
        found.sort_unstable_by_key(|e| e.index());
        found
    }

    /// Names of the component types attached to an entity
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.columns
            .values()
            .filter(|column| column.data.contains_key(&entity))
            .map(|column| column.name)
            .collect()
    }

    // ========== Templates ==========

    /// Clone every component of `template` onto a fresh entity.
    ///
    /// The `Prefab` marker is not copied, so the instance takes part in
    /// simulation and mirroring like any other entity.
    pub fn instantiate(&mut self, template: Entity) -> Result<Entity> {
        if !self.is_alive(template) {
            return Err(SceneError::TemplateNotFound(template));
        }

        let instance = self.entities.allocate();
        let prefab = TypeId::of::<Prefab>();
        for (type_id, column) in self.columns.iter_mut() {
            if *type_id == prefab {
                continue;
            }
            if let Some(component) = column.data.get(&template) {
                let copy = (**component).clone_boxed();
                column.data.insert(instance, copy);
            }
        }

        log::trace!("Instantiated {:?} from template {:?}", instance, template);
        Ok(instance)
    }
}

/// Fluent entity construction
pub struct EntityBuilder<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> EntityBuilder<'w> {
    pub fn with<T: Clone + Send + Sync + 'static>(self, component: T) -> Self {
        self.world
            .columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ComponentColumn::new(std::any::type_name::<T>()))
            .data
            .insert(self.entity, Box::new(component));
        self
    }

    pub fn id(self) -> Entity {
        self.entity
    }
}
