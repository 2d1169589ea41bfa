//! Error types for the host scene

use crate::entity::Entity;
use thiserror::Error;

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;

/// Errors that can occur while mutating the scene
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The handle is dead or was never issued
    #[error("Entity {0:?} not found")]
    EntityNotFound(Entity),

    /// Instancing was requested from an entity that no longer exists
    #[error("Template {0:?} not found")]
    TemplateNotFound(Entity),

    /// A scene description refers to a name it never declares
    #[error("Unknown entity name '{0}' in scene description")]
    UnknownName(String),

    /// A scene description declares the same name twice
    #[error("Entity name '{0}' declared more than once")]
    DuplicateName(String),
}
