//! Callback resolution.
//!
//! Turns a [`ConstraintDeclaration`] into a [`ResolvedInvocable`] once, at
//! configuration time. The validation hot path only ever sees the resolved
//! variant.

use crate::callbacks::registry::{CallbackRegistry, MethodKind};
use crate::core::context::ExecutionContext;
use crate::core::declaration::{CallbackSpec, ConstraintDeclaration, SharedCallback};
use crate::core::error::{ResolutionError, ResolutionResult};
use std::fmt;
use std::sync::Arc;

/// How an invocable receives its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    /// Object bound as receiver; called with the context only.
    Bound,
    /// Called with the object, then the context.
    Explicit,
}

impl CallingConvention {
    /// Number of arguments the callable receives.
    pub fn arity(self) -> usize {
        match self {
            CallingConvention::Bound => 1,
            CallingConvention::Explicit => 2,
        }
    }
}

/// Which variant a declaration resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocableKind {
    InstanceMethod,
    StaticFunction,
    ExternalFunction,
    Closure,
}

/// Concrete callable form of a declaration.
pub enum ResolvedInvocable<T> {
    /// Method bound to each validated object at call time.
    InstanceMethod { name: String, method: SharedCallback<T> },
    /// Type-scoped function receiving the object explicitly.
    StaticFunction { name: String, function: SharedCallback<T> },
    /// Function defined outside the target type.
    ExternalFunction {
        type_name: String,
        name: String,
        function: SharedCallback<T>,
    },
    /// Closure captured at configuration time.
    Closure {
        label: Option<String>,
        closure: SharedCallback<T>,
    },
}

impl<T> ResolvedInvocable<T> {
    /// Which variant this is.
    pub fn kind(&self) -> InvocableKind {
        match self {
            ResolvedInvocable::InstanceMethod { .. } => InvocableKind::InstanceMethod,
            ResolvedInvocable::StaticFunction { .. } => InvocableKind::StaticFunction,
            ResolvedInvocable::ExternalFunction { .. } => InvocableKind::ExternalFunction,
            ResolvedInvocable::Closure { .. } => InvocableKind::Closure,
        }
    }

    /// Calling convention implied by the variant.
    pub fn calling_convention(&self) -> CallingConvention {
        match self {
            ResolvedInvocable::InstanceMethod { .. } => CallingConvention::Bound,
            _ => CallingConvention::Explicit,
        }
    }

    /// Short description for logs and faults.
    pub fn describe(&self) -> String {
        match self {
            ResolvedInvocable::InstanceMethod { name, .. } => format!("method '{}'", name),
            ResolvedInvocable::StaticFunction { name, .. } => format!("static '{}'", name),
            ResolvedInvocable::ExternalFunction { type_name, name, .. } => {
                format!("external '{}::{}'", type_name, name)
            }
            ResolvedInvocable::Closure { label: Some(label), .. } => format!("closure '{}'", label),
            ResolvedInvocable::Closure { label: None, .. } => "closure".to_string(),
        }
    }

    /// Invoke against one object.
    ///
    /// Registered instance methods already take the receiver as their first
    /// argument, so every variant is called the same way.
    pub fn invoke(&self, object: &T, context: &mut ExecutionContext) {
        match self {
            ResolvedInvocable::InstanceMethod { method: function, .. }
            | ResolvedInvocable::StaticFunction { function, .. }
            | ResolvedInvocable::ExternalFunction { function, .. }
            | ResolvedInvocable::Closure { closure: function, .. } => function(object, context),
        }
    }
}

impl<T> Clone for ResolvedInvocable<T> {
    fn clone(&self) -> Self {
        match self {
            ResolvedInvocable::InstanceMethod { name, method } => ResolvedInvocable::InstanceMethod {
                name: name.clone(),
                method: Arc::clone(method),
            },
            ResolvedInvocable::StaticFunction { name, function } => ResolvedInvocable::StaticFunction {
                name: name.clone(),
                function: Arc::clone(function),
            },
            ResolvedInvocable::ExternalFunction { type_name, name, function } => {
                ResolvedInvocable::ExternalFunction {
                    type_name: type_name.clone(),
                    name: name.clone(),
                    function: Arc::clone(function),
                }
            }
            ResolvedInvocable::Closure { label, closure } => ResolvedInvocable::Closure {
                label: label.clone(),
                closure: Arc::clone(closure),
            },
        }
    }
}

impl<T> fmt::Debug for ResolvedInvocable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedInvocable")
            .field("kind", &self.kind())
            .field("callable", &self.describe())
            .finish()
    }
}

/// Shape of a textual callback reference.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SpecShape<'a> {
    Method(&'a str),
    External(&'a str, &'a str),
    Global(&'a str),
}

/// Classify `"name"`, `"Type::name"` and `"::name"`.
fn classify(text: &str) -> Result<SpecShape<'_>, String> {
    if text.is_empty() {
        return Err("empty reference".to_string());
    }
    if text.trim() != text {
        return Err("surrounding whitespace".to_string());
    }

    if let Some(name) = text.strip_prefix("::") {
        check_identifier(name)?;
        return Ok(SpecShape::Global(name));
    }

    let parts: Vec<&str> = text.split("::").collect();
    match parts.as_slice() {
        [name] => {
            check_identifier(name)?;
            Ok(SpecShape::Method(name))
        }
        [type_name, method] => {
            check_identifier(type_name)?;
            check_identifier(method)?;
            Ok(SpecShape::External(type_name, method))
        }
        _ => Err(format!("expected at most two segments, found {}", parts.len())),
    }
}

fn check_identifier(part: &str) -> Result<(), String> {
    let mut chars = part.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid identifier", part))
    }
}

/// Resolve a declaration against the target type's registry.
pub fn resolve<T>(
    declaration: &ConstraintDeclaration<T>,
    registry: &CallbackRegistry<T>,
) -> ResolutionResult<ResolvedInvocable<T>> {
    match declaration.spec() {
        CallbackSpec::Method(name) => resolve_method(declaration, registry, name),
        CallbackSpec::External { type_name, method } => {
            resolve_external(declaration, registry, type_name, method)
        }
        CallbackSpec::Function(name) => Err(ResolutionError::UnsupportedCallableKind {
            declaration: declaration.id(),
            callback: format!("::{}", name),
        }),
        CallbackSpec::Closure(handle) => Ok(ResolvedInvocable::Closure {
            label: handle.label().map(str::to_string),
            closure: Arc::clone(handle.callback()),
        }),
        CallbackSpec::Path(text) => match classify(text) {
            Ok(SpecShape::Method(name)) => resolve_method(declaration, registry, name),
            Ok(SpecShape::External(type_name, method)) => {
                resolve_external(declaration, registry, type_name, method)
            }
            Ok(SpecShape::Global(_)) => Err(ResolutionError::UnsupportedCallableKind {
                declaration: declaration.id(),
                callback: text.clone(),
            }),
            Err(reason) => Err(ResolutionError::AmbiguousSpec {
                declaration: declaration.id(),
                spec: text.clone(),
                reason,
            }),
        },
    }
}

fn resolve_method<T>(
    declaration: &ConstraintDeclaration<T>,
    registry: &CallbackRegistry<T>,
    name: &str,
) -> ResolutionResult<ResolvedInvocable<T>> {
    let entry = registry
        .method(name)
        .ok_or_else(|| ResolutionError::NotFound {
            declaration: declaration.id(),
            type_name: registry.type_name().to_string(),
            callback: name.to_string(),
        })?;

    let name = name.to_string();
    let callback = Arc::clone(&entry.callback);
    Ok(match entry.kind {
        MethodKind::Instance => ResolvedInvocable::InstanceMethod { name, method: callback },
        MethodKind::Static => ResolvedInvocable::StaticFunction { name, function: callback },
    })
}

fn resolve_external<T>(
    declaration: &ConstraintDeclaration<T>,
    registry: &CallbackRegistry<T>,
    type_name: &str,
    method: &str,
) -> ResolutionResult<ResolvedInvocable<T>> {
    // A qualified reference to the target's own type is an ordinary method.
    if type_name == registry.type_name() {
        return resolve_method(declaration, registry, method);
    }

    let function = registry
        .external(type_name, method)
        .ok_or_else(|| ResolutionError::NotFound {
            declaration: declaration.id(),
            type_name: type_name.to_string(),
            callback: method.to_string(),
        })?;

    Ok(ResolvedInvocable::ExternalFunction {
        type_name: type_name.to_string(),
        name: method.to_string(),
        function: Arc::clone(function),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::registry::RegistryBuilder;

    struct Author {
        first_name: String,
    }

    impl Author {
        fn validate(&self, ctx: &mut ExecutionContext) {
            ctx.add_violation(format!("instance saw {}", self.first_name));
        }
    }

    fn registry() -> CallbackRegistry<Author> {
        RegistryBuilder::new("Author")
            .instance("validate", Author::validate)
            .static_fn("check", |author: &Author, ctx: &mut ExecutionContext| {
                ctx.add_violation(format!("static saw {}", author.first_name));
            })
            .external("NameRules", "check", |author: &Author, ctx: &mut ExecutionContext| {
                ctx.add_violation(format!("external saw {}", author.first_name));
            })
            .build()
            .unwrap()
    }

    fn author() -> Author {
        Author {
            first_name: "Ada".to_string(),
        }
    }

    fn run(invocable: &ResolvedInvocable<Author>) -> String {
        let mut ctx = ExecutionContext::new();
        invocable.invoke(&author(), &mut ctx);
        ctx.violations()[0].message.clone()
    }

    #[test]
    fn test_instance_method_is_bound() {
        let registry = registry();
        let resolved = resolve(&ConstraintDeclaration::method("validate"), &registry).unwrap();

        assert_eq!(resolved.kind(), InvocableKind::InstanceMethod);
        assert_eq!(resolved.calling_convention(), CallingConvention::Bound);
        assert_eq!(resolved.calling_convention().arity(), 1);
        assert_eq!(run(&resolved), "instance saw Ada");
    }

    #[test]
    fn test_explicit_conventions() {
        let registry = registry();
        let cases = [
            (ConstraintDeclaration::method("check"), InvocableKind::StaticFunction),
            (ConstraintDeclaration::external("NameRules", "check"), InvocableKind::ExternalFunction),
            (
                ConstraintDeclaration::closure(|a: &Author, ctx: &mut ExecutionContext| {
                    ctx.add_violation(a.first_name.clone())
                }),
                InvocableKind::Closure,
            ),
        ];

        for (declaration, kind) in cases {
            let resolved = resolve(&declaration, &registry).unwrap();
            assert_eq!(resolved.kind(), kind);
            assert_eq!(resolved.calling_convention(), CallingConvention::Explicit);
            assert_eq!(resolved.calling_convention().arity(), 2);
        }
    }

    #[test]
    fn test_qualified_own_type_is_method() {
        let registry = registry();
        let resolved = resolve(&ConstraintDeclaration::external("Author", "validate"), &registry).unwrap();
        assert_eq!(resolved.kind(), InvocableKind::InstanceMethod);
    }

    #[test]
    fn test_not_found() {
        let registry = registry();
        let declaration = ConstraintDeclaration::method("missing");
        let error = resolve(&declaration, &registry).unwrap_err();

        assert_eq!(
            error,
            ResolutionError::NotFound {
                declaration: declaration.id(),
                type_name: "Author".to_string(),
                callback: "missing".to_string(),
            }
        );

        let error = resolve(&ConstraintDeclaration::external("Other", "check"), &registry).unwrap_err();
        assert!(matches!(error, ResolutionError::NotFound { ref type_name, .. } if type_name == "Other"));
    }

    #[test]
    fn test_global_function_unsupported() {
        let registry = registry();
        let spec = ConstraintDeclaration::new(CallbackSpec::Function("check".to_string()));
        assert!(matches!(
            resolve(&spec, &registry),
            Err(ResolutionError::UnsupportedCallableKind { .. })
        ));

        let text = ConstraintDeclaration::path("::check");
        assert!(matches!(
            resolve(&text, &registry),
            Err(ResolutionError::UnsupportedCallableKind { .. })
        ));
    }

    #[test]
    fn test_textual_specs() {
        let registry = registry();

        let resolved = resolve(&ConstraintDeclaration::path("validate"), &registry).unwrap();
        assert_eq!(resolved.kind(), InvocableKind::InstanceMethod);

        let resolved = resolve(&ConstraintDeclaration::path("NameRules::check"), &registry).unwrap();
        assert_eq!(resolved.kind(), InvocableKind::ExternalFunction);
        assert_eq!(run(&resolved), "external saw Ada");
    }

    #[test]
    fn test_ambiguous_specs() {
        let registry = registry();
        for text in ["", " validate", "a::b::c", "NameRules::", "::", "check-name", "1st"] {
            let result = resolve(&ConstraintDeclaration::path(text), &registry);
            assert!(
                matches!(result, Err(ResolutionError::AmbiguousSpec { .. })),
                "'{}' should be ambiguous, got {:?}",
                text,
                result
            );
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let registry = registry();
        let declaration = ConstraintDeclaration::path("check");
        let first = resolve(&declaration, &registry).unwrap();
        let second = resolve(&declaration, &registry).unwrap();
        assert_eq!(first.kind(), second.kind());
        assert_eq!(first.describe(), second.describe());
    }
}
