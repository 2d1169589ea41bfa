//! Template families the guest may instantiate
//!
//! Collected from [`TemplateFamily`] components once at startup and pushed to
//! the guest exactly once. Create requests from the guest name a template by
//! `(family_id, index)`.

use crate::error::Result;
use crate::ffi::TemplateRef;
use crate::runtime::GuestRuntime;
use std::collections::BTreeMap;
use void_scene::{Entity, TemplateFamily, World};

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    families: BTreeMap<i32, Vec<Entity>>,
    pushed: bool,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather every template family in the world.
    ///
    /// A family id declared twice keeps its first declaration.
    pub fn collect(world: &World) -> Self {
        let mut families = BTreeMap::new();
        for holder in world.query::<TemplateFamily>() {
            let Some(family) = world.get::<TemplateFamily>(holder) else {
                continue;
            };
            if families.contains_key(&family.family_id) {
                log::warn!(
                    "Template family {} declared more than once, keeping the first",
                    family.family_id
                );
                continue;
            }
            families.insert(family.family_id, family.templates.clone());
        }
        Self {
            families,
            pushed: false,
        }
    }

    /// Add or replace a family by hand. Only meaningful before [`push_all`](Self::push_all).
    pub fn insert(&mut self, family_id: i32, templates: Vec<Entity>) {
        self.families.insert(family_id, templates);
    }

    /// Send every family to the guest in ascending id order. Later calls do
    /// nothing.
    pub fn push_all<G: GuestRuntime + ?Sized>(&mut self, guest: &mut G) -> Result<()> {
        if self.pushed {
            return Ok(());
        }
        for (family_id, templates) in &self.families {
            guest.register(*family_id, templates)?;
            log::debug!(
                "Registered template family {} ({} templates)",
                family_id,
                templates.len()
            );
        }
        self.pushed = true;
        Ok(())
    }

    pub fn is_pushed(&self) -> bool {
        self.pushed
    }

    /// Look up the host template behind a guest reference
    pub fn resolve(&self, template: TemplateRef) -> Option<Entity> {
        let index = usize::try_from(template.index).ok()?;
        self.families.get(&template.family_id)?.get(index).copied()
    }

    pub fn family(&self, family_id: i32) -> Option<&[Entity]> {
        self.families.get(&family_id).map(Vec::as_slice)
    }

    /// Number of families
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
