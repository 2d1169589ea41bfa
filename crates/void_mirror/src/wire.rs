//! Tagged-union wire codec
//!
//! A component set is a closed enumeration of kinds. On the wire each
//! component is one fixed-size raw record (tag + union payload); in Rust it is
//! a plain enum. [`WireCodec`] moves snapshots between the two.

use crate::error::CodecError;
use crate::ffi::{
    EntityMirror, GuestEntityId, GuidRef, InbuiltData, InbuiltPayload, ParentRef, TransformRecord,
};
use std::fmt::Debug;
use void_scene::Matrix4;

/// A closed set of component kinds with a `#[repr(C)]` raw record
pub trait TaggedUnion: Sized + Clone + Debug + PartialEq {
    /// Raw wire record
    type Raw: Copy;

    /// Number of kinds; tags are `0..KIND_COUNT`
    const KIND_COUNT: usize;

    /// Tag of this value
    fn tag(&self) -> u8;

    fn to_raw(&self) -> Self::Raw;

    /// Tag of a raw record, without validating it
    fn raw_tag(raw: &Self::Raw) -> u8;

    /// Decode one record. Fails only on an out-of-range tag.
    fn from_raw(raw: &Self::Raw) -> Result<Self, CodecError>;
}

/// The inbuilt component set understood by both sides
#[derive(Clone, Debug, PartialEq)]
pub enum InbuiltComponent {
    /// Parent, by guest id
    Parent(GuestEntityId),
    /// The host handle of the entity
    Entity(EntityMirror),
    /// Asset hash
    Guid([u32; 4]),
    /// Column-major local (outbound) or world (inbound) matrix
    Transform(Matrix4),
}

impl InbuiltComponent {
    pub const PARENT: u8 = 0;
    pub const ENTITY: u8 = 1;
    pub const GUID: u8 = 2;
    pub const TRANSFORM: u8 = 3;
}

impl TaggedUnion for InbuiltComponent {
    type Raw = InbuiltData;

    const KIND_COUNT: usize = 4;

    fn tag(&self) -> u8 {
        match self {
            Self::Parent(_) => Self::PARENT,
            Self::Entity(_) => Self::ENTITY,
            Self::Guid(_) => Self::GUID,
            Self::Transform(_) => Self::TRANSFORM,
        }
    }

    fn to_raw(&self) -> InbuiltData {
        let mut raw = InbuiltData::ZEROED;
        raw.tag = self.tag();
        raw.payload = match *self {
            Self::Parent(id) => InbuiltPayload {
                parent: ParentRef { parent: id.raw() },
            },
            Self::Entity(entity) => InbuiltPayload { entity },
            Self::Guid(hash) => InbuiltPayload {
                guid: GuidRef { hash },
            },
            Self::Transform(matrix) => InbuiltPayload {
                transform: TransformRecord { matrix },
            },
        };
        raw
    }

    fn raw_tag(raw: &InbuiltData) -> u8 {
        raw.tag
    }

    fn from_raw(raw: &InbuiltData) -> Result<Self, CodecError> {
        // SAFETY: every payload is plain old data and the tag selects the
        // field that was written
        let decoded = unsafe {
            match raw.tag {
                Self::PARENT => Self::Parent(GuestEntityId::new(raw.payload.parent.parent)),
                Self::ENTITY => Self::Entity(raw.payload.entity),
                Self::GUID => Self::Guid(raw.payload.guid.hash),
                Self::TRANSFORM => Self::Transform(raw.payload.transform.matrix),
                tag => return Err(CodecError::UnknownComponentKind { tag }),
            }
        };
        Ok(decoded)
    }
}

/// An ordered set of components, at most one per kind, in tag order
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentSnapshot<U> {
    components: Vec<U>,
}

impl<U: TaggedUnion> Default for ComponentSnapshot<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: TaggedUnion> ComponentSnapshot<U> {
    pub fn new() -> Self {
        Self {
            components: Vec::with_capacity(U::KIND_COUNT),
        }
    }

    /// Insert a component, replacing any existing one of the same kind
    pub fn insert(&mut self, component: U) -> Option<U> {
        let tag = component.tag();
        match self.components.binary_search_by_key(&tag, |c| c.tag()) {
            Ok(i) => Some(std::mem::replace(&mut self.components[i], component)),
            Err(i) => {
                self.components.insert(i, component);
                None
            }
        }
    }

    pub fn with(mut self, component: U) -> Self {
        self.insert(component);
        self
    }

    pub fn get(&self, tag: u8) -> Option<&U> {
        self.components
            .binary_search_by_key(&tag, |c| c.tag())
            .ok()
            .map(|i| &self.components[i])
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.get(tag).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, U> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }
}

impl<U: TaggedUnion> FromIterator<U> for ComponentSnapshot<U> {
    fn from_iter<I: IntoIterator<Item = U>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for component in iter {
            snapshot.insert(component);
        }
        snapshot
    }
}

impl<'a, U> IntoIterator for &'a ComponentSnapshot<U> {
    type Item = &'a U;
    type IntoIter = std::slice::Iter<'a, U>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

/// Result of decoding a record buffer
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded<U> {
    pub snapshot: ComponentSnapshot<U>,
    /// Record-local failures, with the index of the offending record
    pub errors: Vec<(usize, CodecError)>,
}

impl<U> Decoded<U> {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Encoder with a single reusable record buffer
pub struct WireCodec<U: TaggedUnion> {
    buffer: Vec<U::Raw>,
}

impl<U: TaggedUnion> Default for WireCodec<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: TaggedUnion> WireCodec<U> {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(U::KIND_COUNT),
        }
    }

    /// Encode the present kinds in tag order. The returned slice borrows
    /// the codec's buffer and is overwritten by the next call.
    pub fn encode(&mut self, snapshot: &ComponentSnapshot<U>) -> &[U::Raw] {
        self.buffer.clear();
        self.buffer.extend(snapshot.iter().map(U::to_raw));
        &self.buffer
    }

    /// Decode a record buffer.
    ///
    /// Unknown tags and repeated kinds only cost their own record; a buffer
    /// with more records than kinds is rejected whole.
    pub fn decode(raw: &[U::Raw]) -> Decoded<U> {
        let mut decoded = Decoded {
            snapshot: ComponentSnapshot::new(),
            errors: Vec::new(),
        };

        if raw.len() > U::KIND_COUNT {
            decoded.errors.push((
                U::KIND_COUNT,
                CodecError::TooManyRecords {
                    len: raw.len(),
                    capacity: U::KIND_COUNT,
                },
            ));
            return decoded;
        }

        for (index, record) in raw.iter().enumerate() {
            match U::from_raw(record) {
                Ok(component) => {
                    if decoded.snapshot.contains(component.tag()) {
                        let tag = U::raw_tag(record);
                        decoded
                            .errors
                            .push((index, CodecError::DuplicateComponentKind { tag }));
                    } else {
                        decoded.snapshot.insert(component);
                    }
                }
                Err(e) => decoded.errors.push((index, e)),
            }
        }

        decoded
    }
}
