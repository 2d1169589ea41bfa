//! Error types for the mirror bridge

use crate::ffi::GuestEntityId;
use std::path::PathBuf;
use thiserror::Error;
use void_scene::Entity;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Errors that can occur while bridging the two worlds
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Either side of a correspondence is already mapped
    #[error("Duplicate mapping {host:?} <-> {guest}")]
    DuplicateMapping { host: Entity, guest: GuestEntityId },

    /// A record carried a tag outside the component enumeration
    #[error("Unknown component kind {tag}")]
    UnknownComponentKind { tag: u8 },

    /// The guest referred to an id with no live correspondence
    #[error("Stale guest reference {0}")]
    StaleGuestReference(GuestEntityId),

    /// The guest module failed or refused a request
    #[error("Transport fault: {0}")]
    TransportFault(String),

    /// Failed to load the guest module
    #[error("Failed to load library '{path}': {message}")]
    LoadError { path: PathBuf, message: String },

    /// The guest module does not export a required entry point
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    /// A create request named a template the registry does not know
    #[error("Unknown template {index} in family {family_id}")]
    UnknownTemplate { family_id: i32, index: i32 },

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MirrorError {
    /// Create a load error
    pub fn load_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        MirrorError::LoadError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a symbol not found error
    pub fn symbol_not_found(library: impl Into<String>, symbol: impl Into<String>) -> Self {
        MirrorError::SymbolNotFound {
            library: library.into(),
            symbol: symbol.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        MirrorError::TransportFault(message.into())
    }

    /// Whether this error ends the current tick
    pub fn aborts_tick(&self) -> bool {
        matches!(
            self,
            MirrorError::DuplicateMapping { .. } | MirrorError::TransportFault(_)
        )
    }
}

/// Record-local decode failures. These never abort a batch.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unknown component kind {tag}")]
    UnknownComponentKind { tag: u8 },

    #[error("Component kind {tag} repeated in one snapshot")]
    DuplicateComponentKind { tag: u8 },

    #[error("{len} records exceed the {capacity} component kinds")]
    TooManyRecords { len: usize, capacity: usize },
}

impl From<CodecError> for MirrorError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::UnknownComponentKind { tag } => MirrorError::UnknownComponentKind { tag },
            other => MirrorError::TransportFault(other.to_string()),
        }
    }
}
