//! # void_mirror - Host/guest entity mirroring
//!
//! Keeps a partial mirror of a [`void_scene::World`] inside a separately
//! compiled guest simulation loaded as a shared library, and plays the
//! guest's structural changes back into the host.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  spawn   ┌─────────────────┐
//! │ OutboundBuilder │─────────▶│  GuestRuntime   │
//! │ (parents first) │          │ (NativeGuest)   │
//! └────────┬────────┘          └────────┬────────┘
//!          │ records                    │ create/update/destroy
//!          ▼                            ▼
//! ┌─────────────────┐          ┌─────────────────┐
//! │ Correspondence  │◀─────────│ InboundPatch    │
//! │ Table           │          │ Applier         │
//! └─────────────────┘          └────────┬────────┘
//!                                       │ CommandBuffer
//!                                       ▼
//!                              ┌─────────────────┐
//!                              │   World         │
//!                              │   (playback)    │
//!                              └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use void_mirror::prelude::*;
//!
//! let config = BridgeConfig::load("mirror.toml")?;
//! let guest = NativeGuest::load(&config)?;
//! let mut bridge = Bridge::new(guest, &config);
//!
//! bridge.start(&world)?;
//! loop {
//!     let report = bridge.tick(&mut world)?;
//! }
//! ```
//!
//! ## Guest Side
//!
//! The guest exports `create_game`, `load`, `init`, `register_prefabs`,
//! `spawn`, `tick` and `unload` (names configurable through
//! [`SymbolNames`]). Component records are 72 bytes: a `u8` tag at offset 0
//! and the payload union at offset 8.

pub mod bridge;
pub mod config;
pub mod correspondence;
pub mod error;
pub mod ffi;
pub mod inbound;
pub mod library;
pub mod logger;
pub mod outbound;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod wire;

pub use bridge::{Bridge, TickReport};
pub use config::{BridgeConfig, SymbolNames};
pub use correspondence::CorrespondenceTable;
pub use error::{CodecError, MirrorError, Result};
pub use ffi::{GuestEntityId, InbuiltData, LogLevel, TemplateRef};
pub use inbound::{InboundPatchApplier, InboundReport};
pub use library::NativeGuest;
pub use outbound::{OutboundBuilder, OutboundReport, PendingEntity};
pub use registry::ResourceRegistry;
pub use runtime::{GuestRuntime, InboundEntity, InboundSink, RawRecords, SpawnRequest};
pub use schema::{AdapterSet, Ingest, Ingestion};
pub use wire::{ComponentSnapshot, Decoded, InbuiltComponent, TaggedUnion, WireCodec};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bridge::{Bridge, TickReport};
    pub use crate::config::BridgeConfig;
    pub use crate::error::{MirrorError, Result};
    pub use crate::ffi::{GuestEntityId, TemplateRef};
    pub use crate::library::NativeGuest;
    pub use crate::runtime::{GuestRuntime, InboundEntity, InboundSink, SpawnRequest};
    pub use crate::schema::AdapterSet;
    pub use crate::wire::{ComponentSnapshot, InbuiltComponent, TaggedUnion, WireCodec};
}
