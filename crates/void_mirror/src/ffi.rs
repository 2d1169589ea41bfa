//! FFI types and function signatures for the guest module
//!
//! This module defines the C ABI shared with the guest. All types use
//! `#[repr(C)]` (or `#[repr(transparent)]`) for ABI compatibility; everything
//! outside this module works with the safe enums in [`crate::wire`].

use std::ffi::{c_char, c_void};
use std::fmt;
use void_scene::Entity;

/// Id minted by the guest for an entity it created on request
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuestEntityId(pub u64);

impl GuestEntityId {
    /// Returned by `spawn` when the guest refused to create the entity
    pub const INVALID: Self = Self(u64::MAX);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Debug for GuestEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "GuestEntityId({})", self.0)
        } else {
            write!(f, "GuestEntityId(invalid)")
        }
    }
}

impl fmt::Display for GuestEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guest#{}", self.0)
    }
}

// ============================================================================
// Inbuilt component payloads
// ============================================================================

/// Parent reference by guest id
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParentRef {
    pub parent: u64,
}

/// Host entity handle as seen by the guest.
///
/// The guest ABI carries index and generation as `i32`. Values above
/// `i32::MAX` are reinterpreted bit-for-bit, so the guest sees them negative
/// but converting back yields the original handle.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EntityMirror {
    pub index: i32,
    pub version: i32,
}

impl From<Entity> for EntityMirror {
    fn from(e: Entity) -> Self {
        Self {
            index: i32::from_ne_bytes(e.index().to_ne_bytes()),
            version: i32::from_ne_bytes(e.generation().to_ne_bytes()),
        }
    }
}

impl From<EntityMirror> for Entity {
    fn from(m: EntityMirror) -> Self {
        Entity::new(
            u32::from_ne_bytes(m.index.to_ne_bytes()),
            u32::from_ne_bytes(m.version.to_ne_bytes()),
        )
    }
}

/// 128-bit asset hash
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuidRef {
    pub hash: [u32; 4],
}

/// Column-major 4x4 matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformRecord {
    pub matrix: [f32; 16],
}

/// Payload of an inbuilt record; `InbuiltData::tag` says which field is live
#[repr(C)]
#[derive(Clone, Copy)]
pub union InbuiltPayload {
    pub parent: ParentRef,
    pub entity: EntityMirror,
    pub guid: GuidRef,
    pub transform: TransformRecord,
}

/// One tagged record of the inbuilt component set.
///
/// `tag` sits at offset 0 and the payload at offset 8; every record is the
/// same size so a bad tag never desynchronizes the rest of a buffer.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct InbuiltData {
    pub tag: u8,
    pub payload: InbuiltPayload,
}

const _: () = assert!(std::mem::size_of::<InbuiltData>() == 72);
const _: () = assert!(std::mem::align_of::<InbuiltData>() == 8);

impl InbuiltData {
    /// Zeroed record with tag 0
    pub const ZEROED: Self = Self {
        tag: 0,
        payload: InbuiltPayload {
            transform: TransformRecord { matrix: [0.0; 16] },
        },
    };
}

impl fmt::Debug for InbuiltData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InbuiltData").field("tag", &self.tag).finish_non_exhaustive()
    }
}

// ============================================================================
// Batches
// ============================================================================

/// Template reference sent by the guest with a create request
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateRef {
    pub family_id: i32,
    pub index: i32,
}

impl TemplateRef {
    pub const fn new(family_id: i32, index: i32) -> Self {
        Self { family_id, index }
    }
}

/// One entity of a create or update batch
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiEntityData<H> {
    pub handle: H,
    pub data: *const InbuiltData,
    pub len: usize,
}

pub type FfiCreateData = FfiEntityData<TemplateRef>;
pub type FfiUpdateData = FfiEntityData<GuestEntityId>;

/// A template family pushed to the guest once at startup
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiTemplateFamily {
    pub family_id: i32,
    pub handles: *const EntityMirror,
    pub length: usize,
}

/// Severity of a guest log line
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Error),
            1 => Some(Self::Warning),
            2 => Some(Self::Info),
            3 => Some(Self::Debug),
            _ => None,
        }
    }
}

// ============================================================================
// Function signatures
// ============================================================================

/// Guest log sink: `(level, utf8 bytes, byte length)`
pub type LoggerFn = unsafe extern "C" fn(level: u8, bytes: *const u8, len: usize);

/// Host callbacks fired by the guest during `tick`
pub type CreateFn = unsafe extern "C" fn(data: *const FfiCreateData, count: usize);
pub type UpdateFn = unsafe extern "C" fn(data: *const FfiUpdateData, count: usize);
pub type DestroyFn = unsafe extern "C" fn(ids: *const GuestEntityId, count: usize);

/// Guest entry points
pub type ConstructFn = unsafe extern "C" fn();
pub type LoadFn = unsafe extern "C" fn(logger: LoggerFn) -> *mut c_void;
pub type InitFn = unsafe extern "C" fn(
    context: *mut c_void,
    base_path: *const c_char,
    create: CreateFn,
    update: UpdateFn,
    destroy: DestroyFn,
);
pub type RegisterFn = unsafe extern "C" fn(context: *mut c_void, family: FfiTemplateFamily);
pub type SpawnFn = unsafe extern "C" fn(
    context: *mut c_void,
    host: EntityMirror,
    components: *const InbuiltData,
    count: usize,
    custom: *const c_void,
    custom_len: usize,
    custom_state: *const c_void,
    custom_state_len: usize,
) -> u64;
pub type TickFn = unsafe extern "C" fn(context: *mut c_void);
pub type UnloadFn = unsafe extern "C" fn(context: *mut c_void);
