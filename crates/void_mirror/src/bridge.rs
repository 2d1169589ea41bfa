//! Per-tick orchestrator
//!
//! A [`Bridge`] is built once at world startup and owns everything that has
//! to survive between ticks: the guest, the correspondence table, the pending
//! set and the template registry. Each tick runs these steps in order:
//!
//! 1. release records of host entities despawned since the last tick
//! 2. outbound resolution (host -> guest spawns)
//! 3. guest tick, with its callbacks staged into a fresh command buffer
//! 4. command playback with exclusive world access
//! 5. scratch reset

use crate::config::BridgeConfig;
use crate::correspondence::CorrespondenceTable;
use crate::error::Result;
use crate::inbound::{InboundPatchApplier, InboundReport};
use crate::outbound::{OutboundBuilder, OutboundContext, OutboundReport, PendingEntity};
use crate::registry::ResourceRegistry;
use crate::runtime::GuestRuntime;
use crate::schema::{AdapterSet, Ingestion};
use crate::wire::{InbuiltComponent, TaggedUnion, WireCodec};
use void_scene::{PlaybackReport, World};

/// Everything one tick did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Records dropped because the host entity was despawned
    pub released: usize,
    pub outbound: OutboundReport,
    pub inbound: InboundReport,
    pub playback: PlaybackReport,
}

pub struct Bridge<G: GuestRuntime> {
    guest: G,
    table: CorrespondenceTable,
    outbound: OutboundBuilder,
    registry: ResourceRegistry,
    codec: WireCodec<InbuiltComponent>,
    ingestion: Ingestion,
    tick: u64,
}

impl<G: GuestRuntime> Bridge<G> {
    pub fn new(guest: G, config: &BridgeConfig) -> Self {
        Self {
            guest,
            table: CorrespondenceTable::new(),
            outbound: OutboundBuilder::new(
                config.warn_resolution_passes,
                config.warn_pending_after_ticks,
            ),
            registry: ResourceRegistry::new(),
            codec: WireCodec::new(),
            ingestion: Ingestion::new(),
            tick: 0,
        }
    }

    /// Encode project-specific components with `adapters` on every spawn
    pub fn with_custom_components<U: TaggedUnion + 'static>(mut self, adapters: AdapterSet<U>) -> Self {
        self.ingestion = std::mem::take(&mut self.ingestion).with_custom(adapters);
        self
    }

    /// Encode project-specific initial state with `adapters` on every spawn
    pub fn with_custom_state<U: TaggedUnion + 'static>(mut self, adapters: AdapterSet<U>) -> Self {
        self.ingestion = std::mem::take(&mut self.ingestion).with_custom_state(adapters);
        self
    }

    /// Collect the world's template families and push them to the guest.
    /// Must run before the first tick that may see guest creates.
    pub fn start(&mut self, world: &World) -> Result<()> {
        if self.registry.is_pushed() {
            return Ok(());
        }
        self.registry = ResourceRegistry::collect(world);
        self.registry.push_all(&mut self.guest)?;
        log::info!(
            "Mirror bridge started with {} template families",
            self.registry.len()
        );
        Ok(())
    }

    /// Run one full tick
    pub fn tick(&mut self, world: &mut World) -> Result<TickReport> {
        self.tick += 1;
        let tick = self.tick;

        let released = self.table.retain_hosts(|host| world.is_alive(host));
        for (host, guest) in &released {
            log::debug!("Released {} after host {:?} was despawned", guest, host);
        }

        let outbound = {
            let mut cx = OutboundContext {
                world,
                table: &mut self.table,
                guest: &mut self.guest,
                codec: &mut self.codec,
                ingestion: &mut self.ingestion,
                tick,
            };
            self.outbound.resolve(&mut cx)?
        };

        let mut applier = InboundPatchApplier::new(&mut self.table, &self.registry);
        let guest_result = self.guest.tick(&mut applier);
        let (commands, inbound) = applier.finish();

        // Staged commands are played even if the guest faulted: destroys
        // have already been unmapped
        let playback = commands.playback(world);
        guest_result?;

        log::trace!(
            "Tick {}: spawned {}, created {}, updated {}, destroyed {}",
            tick,
            outbound.spawned.len(),
            inbound.created,
            inbound.updated,
            inbound.destroyed
        );

        Ok(TickReport {
            tick,
            released: released.len(),
            outbound,
            inbound,
            playback,
        })
    }

    /// Ticks run so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn table(&self) -> &CorrespondenceTable {
        &self.table
    }

    /// Entities waiting on an unmirrored parent
    pub fn pending(&self) -> &[PendingEntity] {
        self.outbound.pending()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn guest(&self) -> &G {
        &self.guest
    }

    pub fn guest_mut(&mut self) -> &mut G {
        &mut self.guest
    }

    /// Tear down, handing back the guest
    pub fn into_guest(self) -> G {
        self.guest
    }
}
