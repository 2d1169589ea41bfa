//! Rust-side seams of the guest transport
//!
//! [`GuestRuntime`] is what the bridge calls; [`InboundSink`] is what the
//! guest calls back into while it ticks. The native provider in
//! [`crate::library`] implements the former over a shared library, tests
//! implement it in-process.

use crate::error::Result;
use crate::ffi::{GuestEntityId, InbuiltData, TemplateRef};
use std::ffi::c_void;
use std::marker::PhantomData;
use void_scene::Entity;

/// Untyped view of a schema-specific record array
#[derive(Debug, Clone, Copy)]
pub struct RawRecords<'a> {
    ptr: *const c_void,
    len: usize,
    _marker: PhantomData<&'a ()>,
}

impl<'a> RawRecords<'a> {
    pub const fn empty() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
            _marker: PhantomData,
        }
    }

    pub fn from_slice<T>(records: &'a [T]) -> Self {
        Self {
            ptr: records.as_ptr().cast(),
            len: records.len(),
            _marker: PhantomData,
        }
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.ptr
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reinterpret as typed records.
    ///
    /// # Safety
    /// `T` must be the record type the view was built from.
    pub unsafe fn as_slice<T>(&self) -> &'a [T] {
        if self.ptr.is_null() || self.len == 0 {
            return &[];
        }
        std::slice::from_raw_parts(self.ptr.cast(), self.len)
    }
}

impl Default for RawRecords<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

/// One creation request, borrowed from the bridge's scratch buffers
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest<'a> {
    pub host: Entity,
    pub components: &'a [InbuiltData],
    pub custom: RawRecords<'a>,
    pub custom_state: RawRecords<'a>,
}

/// One entity of an inbound create or update batch
#[derive(Debug, Clone, Copy)]
pub struct InboundEntity<'a, H> {
    pub handle: H,
    pub records: &'a [InbuiltData],
}

/// Receiver for the guest's structural commands
pub trait InboundSink {
    fn create(&mut self, batch: &[InboundEntity<'_, TemplateRef>]);
    fn update(&mut self, batch: &[InboundEntity<'_, GuestEntityId>]);
    fn destroy(&mut self, ids: &[GuestEntityId]);
}

/// A guest simulation the bridge can drive
pub trait GuestRuntime {
    /// Push one template family
    fn register(&mut self, family_id: i32, templates: &[Entity]) -> Result<()>;

    /// Ask the guest to mirror a host entity. Returns
    /// [`GuestEntityId::INVALID`] if it refused.
    fn spawn(&mut self, request: &SpawnRequest<'_>) -> GuestEntityId;

    /// Advance the guest one step. Every structural command it issues
    /// reaches `sink` before this returns.
    fn tick(&mut self, sink: &mut dyn InboundSink) -> Result<()>;
}

impl<G: GuestRuntime + ?Sized> GuestRuntime for Box<G> {
    fn register(&mut self, family_id: i32, templates: &[Entity]) -> Result<()> {
        (**self).register(family_id, templates)
    }

    fn spawn(&mut self, request: &SpawnRequest<'_>) -> GuestEntityId {
        (**self).spawn(request)
    }

    fn tick(&mut self, sink: &mut dyn InboundSink) -> Result<()> {
        (**self).tick(sink)
    }
}
