//! Error types for Vouch.
//!
//! Uses thiserror for structured errors with context. Errors are split by
//! audience:
//! - Resolution and registry errors are developer-facing configuration problems
//! - Validation faults abort a run because a callback misbehaved
//! - Violations are not errors at all; they live in the validation result

use crate::core::declaration::DeclarationId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Vouch.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum VouchError {
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Validation fault: {0}")]
    Fault(#[from] ValidationFault),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Object {index} failed: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<VouchError>,
    },
}

/// Errors raised while turning a declaration into an invocable.
///
/// These are configuration problems: they block the offending declaration
/// and are reported to the developer, never to the end user.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionError {
    #[error("Callback '{callback}' not found on {type_name} (declaration {declaration})")]
    NotFound {
        declaration: DeclarationId,
        type_name: String,
        callback: String,
    },

    #[error("Callback '{callback}' is a free function; use a method, an external type function or a closure (declaration {declaration})")]
    UnsupportedCallableKind {
        declaration: DeclarationId,
        callback: String,
    },

    #[error("Cannot classify callback '{spec}': {reason} (declaration {declaration})")]
    AmbiguousSpec {
        declaration: DeclarationId,
        spec: String,
        reason: String,
    },
}

/// Errors while building a callback registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Method '{name}' is already registered on {type_name}")]
    DuplicateMethod { type_name: String, name: String },

    #[error("External function '{type_name}::{method}' is already registered")]
    DuplicateExternal { type_name: String, method: String },
}

/// Errors while parsing a property path.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathError {
    #[error("Empty path segment at position {position}")]
    EmptySegment { position: usize },

    #[error("Unclosed '[' at position {position}")]
    UnclosedBracket { position: usize },

    #[error("Unexpected '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },
}

/// Fatal faults raised while invoking a callback.
///
/// A faulting callback cannot be trusted to have left its context in a
/// consistent state, so the whole run is aborted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFault {
    #[error("Callback {callback} panicked (declaration {declaration}): {message}")]
    CallbackPanicked {
        declaration: DeclarationId,
        callback: String,
        message: String,
    },
}

/// Errors loading validator options.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid option: {0}")]
    Invalid(String),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ResolutionError {
    /// The declaration that failed to resolve.
    pub fn declaration(&self) -> DeclarationId {
        match self {
            ResolutionError::NotFound { declaration, .. }
            | ResolutionError::UnsupportedCallableKind { declaration, .. }
            | ResolutionError::AmbiguousSpec { declaration, .. } => *declaration,
        }
    }

    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            ResolutionError::NotFound { type_name, callback, .. } => Some(format!(
                "Register '{}' on the {} callback registry",
                callback, type_name
            )),
            ResolutionError::UnsupportedCallableKind { callback, .. } => Some(format!(
                "Wrap '{}' in a closure or register it as an external function",
                callback
            )),
            ResolutionError::AmbiguousSpec { .. } => {
                Some("Use 'method' or 'Type::method'".to_string())
            }
        }
    }
}

impl ValidationFault {
    /// The declaration whose callback faulted.
    pub fn declaration(&self) -> DeclarationId {
        match self {
            ValidationFault::CallbackPanicked { declaration, .. } => *declaration,
        }
    }
}

impl VouchError {
    /// Check if this error comes from configuration rather than a faulting callback.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            VouchError::Resolution(_)
            | VouchError::Registry(_)
            | VouchError::Path(_)
            | VouchError::Config(_) => true,
            VouchError::Item { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }
}

/// Result type alias for Vouch operations.
pub type VouchResult<T> = Result<T, VouchError>;

/// Result type alias for resolution.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_suggestions() {
        let error = ResolutionError::NotFound {
            declaration: DeclarationId::new(),
            type_name: "Author".to_string(),
            callback: "validate".to_string(),
        };
        let fix = error.suggested_fix().unwrap();
        assert!(fix.contains("validate"));
        assert!(fix.contains("Author"));
    }

    #[test]
    fn test_resolution_error_declaration() {
        let id = DeclarationId::new();
        let error = ResolutionError::UnsupportedCallableKind {
            declaration: id,
            callback: "::check".to_string(),
        };
        assert_eq!(error.declaration(), id);
    }

    #[test]
    fn test_configuration_error_classification() {
        let resolution: VouchError = ResolutionError::AmbiguousSpec {
            declaration: DeclarationId::new(),
            spec: "a::b::c".to_string(),
            reason: "too many segments".to_string(),
        }
        .into();
        assert!(resolution.is_configuration_error());

        let fault: VouchError = ValidationFault::CallbackPanicked {
            declaration: DeclarationId::new(),
            callback: "method 'validate'".to_string(),
            message: "boom".to_string(),
        }
        .into();
        assert!(!fault.is_configuration_error());

        let item = VouchError::Item {
            index: 3,
            source: Box::new(resolution),
        };
        assert!(item.is_configuration_error());
        assert!(item.to_string().starts_with("Object 3 failed"));
    }
}
