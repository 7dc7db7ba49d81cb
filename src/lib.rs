//! # Vouch - Callback Constraints
//!
//! Vouch validates objects by running user-supplied callbacks against them.
//! A type declares which callbacks apply to it (a method on the type, a
//! function registered under another type name, or a closure), and the
//! validator resolves each declaration, invokes it with an execution context,
//! and collects every violation the callback reports.
//!
//! ## Features
//!
//! - **Callback resolution**: Textual or structured references resolved once against a registry
//! - **Cached**: Resolutions are stored per declaration and shared across threads
//! - **Property paths**: Violations carry paths like `authors[2].firstName`
//! - **Groups and payloads**: Run subsets of declarations and tag violations with payload data
//! - **Batch validation**: Independent objects validated in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vouch::prelude::*;
//!
//! struct Author {
//!     first_name: String,
//! }
//!
//! impl Author {
//!     fn validate(&self, ctx: &mut ExecutionContext) {
//!         if self.first_name == "FakeName" {
//!             ctx.build_violation("This name sounds totally fake!")
//!                 .at_path("firstName")
//!                 .add_violation();
//!         }
//!     }
//! }
//!
//! impl HasConstraints for Author {
//!     fn load_constraints(metadata: &mut ClassMetadata<Self>) {
//!         metadata.add_constraint(ConstraintDeclaration::path("validate"));
//!     }
//!
//!     fn register_callbacks(builder: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
//!         builder.instance("validate", Author::validate)
//!     }
//! }
//!
//! let validator = Validator::<Author>::for_type()?;
//! let result = validator.validate_object(&Author { first_name: "FakeName".into() })?;
//! assert_eq!(result.violations()[0].path.to_string(), "firstName");
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Paths, violations, declarations, the execution context and errors
//! - [`callbacks`]: Callback registry, resolver and resolution cache
//! - [`validation`]: Class metadata, options and the validation driver

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callbacks;
pub mod core;
pub mod validation;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use vouch::prelude::*;
/// ```
pub mod prelude {
    // Paths and results
    pub use crate::core::path::{PathSegment, PropertyPath};
    pub use crate::core::violation::{Payload, ValidationResult, Violation};

    // Declarations
    pub use crate::core::declaration::{
        CallbackSpec, ClosureHandle, ConstraintDeclaration, ConstraintTarget, DeclarationId,
        DEFAULT_GROUP,
    };

    // Context
    pub use crate::core::context::{ExecutionContext, ViolationBuilder};

    // Errors
    pub use crate::core::error::{
        ConfigError, PathError, RegistryError, ResolutionError, ValidationFault, VouchError,
        VouchResult,
    };

    // Callbacks
    pub use crate::callbacks::cache::{CacheKey, CacheStats, ResolutionCache, SharedResolutionCache};
    pub use crate::callbacks::registry::{CallbackRegistry, RegistryBuilder};
    pub use crate::callbacks::resolver::{resolve, CallingConvention, InvocableKind, ResolvedInvocable};

    // Validation
    pub use crate::validation::driver::Validator;
    pub use crate::validation::metadata::{ClassMetadata, HasConstraints, MetadataProvider};
    pub use crate::validation::options::ValidatorOptions;
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct Author {
        first_name: String,
    }

    impl Author {
        fn validate(&self, ctx: &mut ExecutionContext) {
            if self.first_name == "FakeName" {
                ctx.build_violation("This name sounds totally fake!")
                    .at_path("firstName")
                    .add_violation();
            }
        }
    }

    impl HasConstraints for Author {
        fn load_constraints(metadata: &mut ClassMetadata<Self>) {
            metadata.add_constraint(ConstraintDeclaration::path("validate"));
        }

        fn register_callbacks(builder: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
            builder.instance("validate", Author::validate)
        }
    }

    fn author(name: &str) -> Author {
        Author {
            first_name: name.to_string(),
        }
    }

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "vouch");
    }

    #[test]
    fn test_fake_name_end_to_end() {
        let validator = Validator::<Author>::for_type().unwrap();
        let result = validator.validate_object(&author("FakeName")).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.violations()[0].path, PropertyPath::parse("firstName").unwrap());
        assert_eq!(result.violations()[0].message, "This name sounds totally fake!");
        assert!(validator.validate_object(&author("Jane")).unwrap().is_valid());
    }

    #[test]
    fn test_independent_violations_from_three_callbacks() {
        let registry = RegistryBuilder::<Author>::for_type()
            .instance("validate", Author::validate)
            .static_fn("checkLength", |a: &Author, ctx: &mut ExecutionContext| {
                if a.first_name.len() > 5 {
                    ctx.build_violation("Name is longer than {{ limit }} characters")
                        .at_path("firstName")
                        .set_parameter("limit", "5")
                        .add_violation();
                }
            })
            .external("NameRules", "noDigits", |a: &Author, ctx: &mut ExecutionContext| {
                if !a.first_name.chars().any(|c| c.is_ascii_digit()) {
                    ctx.add_violation("Expected a digit");
                }
            })
            .build()
            .unwrap();
        let validator = Validator::new(registry);
        let declarations = vec![
            ConstraintDeclaration::path("validate"),
            ConstraintDeclaration::path("checkLength"),
            ConstraintDeclaration::path("NameRules::noDigits"),
        ];

        let result = validator.validate(&author("FakeName"), &declarations).unwrap();
        let messages: Vec<&str> = result.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "This name sounds totally fake!",
                "Name is longer than 5 characters",
                "Expected a digit",
            ]
        );
        assert!(result.violations()[2].path.is_root());
    }

    #[test]
    fn test_global_function_rejected_but_others_run() {
        let validator = Validator::<Author>::for_type().unwrap();
        let declarations = vec![
            ConstraintDeclaration::path("::validate"),
            ConstraintDeclaration::path("validate"),
        ];

        let result = validator.validate(&author("FakeName"), &declarations).unwrap();
        assert_eq!(result.len(), 1);
        assert!(matches!(
            result.configuration_errors[0],
            ResolutionError::UnsupportedCallableKind { .. }
        ));
    }

    #[test]
    fn test_result_serializes() {
        let validator = Validator::<Author>::for_type().unwrap();
        let result = validator.validate_object(&author("FakeName")).unwrap();
        let json = result.to_json().unwrap();

        assert!(json.contains("firstName"));
        assert!(json.contains("This name sounds totally fake!"));
    }

    proptest! {
        #[test]
        fn prop_validation_is_deterministic(names in prop::collection::vec("[A-Za-z]{0,10}", 0..20)) {
            let validator = Validator::<Author>::for_type().unwrap();
            let authors: Vec<Author> = names.iter().map(|n| author(n)).collect();

            let first = validator.validate_all(&authors).unwrap();
            let second = validator.validate_all(&authors).unwrap();
            prop_assert_eq!(first.len(), authors.len());
            for (a, b) in first.iter().zip(second.iter()) {
                prop_assert_eq!(a.violations(), b.violations());
            }
        }
    }
}
