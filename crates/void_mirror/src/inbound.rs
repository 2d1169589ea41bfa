//! Inbound patch applier
//!
//! Receives the guest's create/update/destroy callbacks during its tick and
//! turns them into host commands. Nothing touches the world here: commands
//! are staged in a [`CommandBuffer`] that the bridge plays back afterwards.

use crate::correspondence::CorrespondenceTable;
use crate::error::MirrorError;
use crate::ffi::{GuestEntityId, InbuiltData, TemplateRef};
use crate::registry::ResourceRegistry;
use crate::runtime::{InboundEntity, InboundSink};
use crate::wire::{ComponentSnapshot, InbuiltComponent, TaggedUnion, WireCodec};
use void_scene::{CommandBuffer, LocalTransform};

/// Counters for one guest tick
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundReport {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
    /// Updates and destroys naming a guest id with no correspondence
    pub stale: usize,
    /// Records dropped by the decoder
    pub rejected_records: usize,
    /// Creates naming a template the registry does not hold
    pub unknown_templates: usize,
}

pub struct InboundPatchApplier<'a> {
    table: &'a mut CorrespondenceTable,
    registry: &'a ResourceRegistry,
    commands: CommandBuffer,
    report: InboundReport,
}

impl<'a> InboundPatchApplier<'a> {
    pub fn new(table: &'a mut CorrespondenceTable, registry: &'a ResourceRegistry) -> Self {
        Self {
            table,
            registry,
            commands: CommandBuffer::new(),
            report: InboundReport::default(),
        }
    }

    /// Hand back the staged commands and the counters
    pub fn finish(self) -> (CommandBuffer, InboundReport) {
        (self.commands, self.report)
    }

    pub fn report(&self) -> &InboundReport {
        &self.report
    }

    fn decode(&mut self, records: &[InbuiltData]) -> ComponentSnapshot<InbuiltComponent> {
        let decoded = WireCodec::<InbuiltComponent>::decode(records);
        for (index, error) in &decoded.errors {
            log::warn!("Dropping inbound record {}: {}", index, error);
        }
        self.report.rejected_records += decoded.errors.len();
        decoded.snapshot
    }
}

impl InboundSink for InboundPatchApplier<'_> {
    fn create(&mut self, batch: &[InboundEntity<'_, TemplateRef>]) {
        for item in batch {
            let Some(template) = self.registry.resolve(item.handle) else {
                let e = MirrorError::UnknownTemplate {
                    family_id: item.handle.family_id,
                    index: item.handle.index,
                };
                log::warn!("Skipping create: {}", e);
                self.report.unknown_templates += 1;
                continue;
            };

            let mut local = None;
            for component in &self.decode(item.records) {
                match component {
                    InbuiltComponent::Transform(matrix) => {
                        local = Some(LocalTransform::from_matrix(matrix));
                    }
                    other => log::debug!("Ignoring kind {} on create", other.tag()),
                }
            }

            self.commands.instantiate(template, local);
            self.report.created += 1;
        }
    }

    fn update(&mut self, batch: &[InboundEntity<'_, GuestEntityId>]) {
        for item in batch {
            let Some(host) = self.table.lookup_by_guest(item.handle) else {
                log::warn!("Skipping update: {}", MirrorError::StaleGuestReference(item.handle));
                self.report.stale += 1;
                continue;
            };

            for component in &self.decode(item.records) {
                match component {
                    InbuiltComponent::Transform(matrix) => {
                        self.commands.set_world_matrix(host, *matrix);
                    }
                    other => log::debug!("Ignoring kind {} on update", other.tag()),
                }
            }
            self.report.updated += 1;
        }
    }

    fn destroy(&mut self, ids: &[GuestEntityId]) {
        for &guest in ids {
            // Removed now so later creates in this tick cannot see it
            match self.table.remove_by_guest(guest) {
                Some(host) => {
                    self.commands.despawn(host);
                    self.report.destroyed += 1;
                }
                None => {
                    log::warn!("Skipping destroy: {}", MirrorError::StaleGuestReference(guest));
                    self.report.stale += 1;
                }
            }
        }
    }
}
