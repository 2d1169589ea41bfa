//! # void_scene - Host scene world
//!
//! The authoritative side of a mirrored simulation:
//! - Generational entity handles that are never reused while alive
//! - Per-type component storage with template instancing
//! - Hierarchy and transform components read by the mirror bridge
//! - A deferred [`CommandBuffer`] played back once per tick
//!
//! ## Example
//!
//! ```ignore
//! use void_scene::prelude::*;
//!
//! let mut world = World::new();
//! let root = world.build().with(MirrorRequest).id();
//! let child = world
//!     .build()
//!     .with(MirrorRequest)
//!     .with(Parent::new(root))
//!     .with(LocalTransform::from_translation([0.0, 1.0, 0.0]))
//!     .id();
//!
//! let mut commands = CommandBuffer::new();
//! commands.despawn(child);
//! commands.playback(&mut world);
//! ```

pub mod commands;
pub mod components;
pub mod entity;
pub mod error;
pub mod scene;
pub mod world;

pub use commands::{Command, CommandBuffer, PlaybackReport};
pub use components::*;
pub use entity::{Entity, EntityAllocator};
pub use error::{Result, SceneError};
pub use scene::{EntityDesc, FamilyDesc, SceneDesc};
pub use world::{Component, EntityBuilder, World};

pub mod prelude {
    pub use crate::commands::{Command, CommandBuffer, PlaybackReport};
    pub use crate::components::{
        Guid, LocalToWorld, LocalTransform, Matrix4, MirrorRequest, Name, Parent, Prefab,
        TemplateFamily, IDENTITY_MATRIX,
    };
    pub use crate::entity::Entity;
    pub use crate::error::{Result, SceneError};
    pub use crate::scene::SceneDesc;
    pub use crate::world::World;
}
