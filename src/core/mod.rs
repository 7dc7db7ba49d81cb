//! Core types for callback constraints.
//!
//! This module contains the foundational types shared by the resolver and
//! the validation driver:
//! - Property paths
//! - Violations and validation results
//! - Constraint declarations
//! - The execution context handed to callbacks
//! - Error types

pub mod path;
pub mod violation;
pub mod declaration;
pub mod context;
pub mod error;

// Re-export commonly used types
pub use path::{PathSegment, PropertyPath};
pub use violation::{Payload, ValidationResult, Violation};
pub use declaration::{
    CallbackSpec, ClosureHandle, ConstraintDeclaration, ConstraintTarget, DeclarationId,
    DEFAULT_GROUP,
};
pub use context::{ExecutionContext, ViolationBuilder};
pub use error::{ResolutionError, ValidationFault, VouchError, VouchResult};
