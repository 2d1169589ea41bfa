//! Declarative scene descriptions
//!
//! A small serde model for populating a world from config files:
//!
//! ```toml
//! [[entities]]
//! name = "root"
//! mirror = true
//!
//! [[entities]]
//! name = "child"
//! parent = "root"
//! mirror = true
//! translation = [0.0, 1.0, 0.0]
//!
//! [[entities]]
//! name = "bullet"
//! prefab = true
//!
//! [[families]]
//! family_id = 1
//! templates = ["bullet"]
//! ```

use crate::components::{Guid, LocalTransform, MirrorRequest, Name, Parent, Prefab, TemplateFamily};
use crate::entity::Entity;
use crate::error::{Result, SceneError};
use crate::world::World;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entity of a scene description
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityDesc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub mirror: bool,
    #[serde(default)]
    pub prefab: bool,
    #[serde(default)]
    pub guid: Option<[u32; 4]>,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default = "default_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

fn default_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// A named list of templates the guest may instantiate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FamilyDesc {
    pub family_id: i32,
    pub templates: Vec<String>,
}

/// A whole scene
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub entities: Vec<EntityDesc>,
    #[serde(default)]
    pub families: Vec<FamilyDesc>,
}

impl SceneDesc {
    /// Spawn the described entities into `world`, returning them by name.
    ///
    /// Parents may be declared after their children. Each family becomes a
    /// separate entity carrying a [`TemplateFamily`].
    pub fn spawn_into(&self, world: &mut World) -> Result<HashMap<String, Entity>> {
        let mut named = HashMap::with_capacity(self.entities.len());

        for desc in &self.entities {
            if named.contains_key(&desc.name) {
                return Err(SceneError::DuplicateName(desc.name.clone()));
            }
            let local = LocalTransform {
                translation: desc.translation,
                rotation: desc.rotation,
                scale: desc.scale,
            };
            let mut builder = world.build().with(Name(desc.name.clone())).with(local);
            if desc.mirror {
                builder = builder.with(MirrorRequest);
            }
            if desc.prefab {
                builder = builder.with(Prefab);
            }
            if let Some(hash) = desc.guid {
                builder = builder.with(Guid::new(hash));
            }
            named.insert(desc.name.clone(), builder.id());
        }

        for desc in &self.entities {
            if let Some(parent) = &desc.parent {
                let parent = lookup(&named, parent)?;
                world.insert(named[&desc.name], Parent::new(parent))?;
            }
        }

        for family in &self.families {
            let templates = family
                .templates
                .iter()
                .map(|name| lookup(&named, name))
                .collect::<Result<Vec<_>>>()?;
            world
                .build()
                .with(TemplateFamily::new(family.family_id, templates))
                .id();
        }

        log::debug!(
            "Spawned scene with {} entities and {} template families",
            self.entities.len(),
            self.families.len()
        );
        Ok(named)
    }
}

fn lookup(named: &HashMap<String, Entity>, name: &str) -> Result<Entity> {
    named
        .get(name)
        .copied()
        .ok_or_else(|| SceneError::UnknownName(name.to_string()))
}
