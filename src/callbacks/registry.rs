//! Callback registry: the reflection-free method table of a validated type.
//!
//! Declarations never dispatch on strings at validation time. Every callable
//! they may name is registered here up front, together with the kind of
//! callable it is.

use crate::core::context::ExecutionContext;
use crate::core::declaration::SharedCallback;
use crate::core::error::RegistryError;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Kind of a method registered on the target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Bound to the validated object; receives only the context.
    Instance,
    /// Type-scoped; receives the object explicitly.
    Static,
}

/// Registry entry for a method on the target type.
pub struct MethodEntry<T> {
    /// Instance or static.
    pub kind: MethodKind,
    /// The callable.
    pub callback: SharedCallback<T>,
}

impl<T> Clone for MethodEntry<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> fmt::Debug for MethodEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Registry for all callbacks a type's declarations may name.
pub struct CallbackRegistry<T> {
    /// Name the target type is known by in declarations.
    type_name: String,
    /// Methods of the target type, by name.
    methods: IndexMap<String, MethodEntry<T>>,
    /// Functions of other types accepting the target, by (type, method).
    externals: IndexMap<(String, String), SharedCallback<T>>,
}

impl<T> CallbackRegistry<T> {
    /// Create a new empty registry for a type known as `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: IndexMap::new(),
            externals: IndexMap::new(),
        }
    }

    /// Create a registry named after `T` (last path segment of its type name).
    pub fn for_type() -> Self {
        Self::new(short_type_name::<T>())
    }

    /// Register an instance method, e.g. `Author::validate`.
    pub fn register_instance<F>(&mut self, name: impl Into<String>, method: F) -> Result<(), RegistryError>
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        self.insert_method(name.into(), MethodKind::Instance, Arc::new(method))
    }

    /// Register a static method taking the object explicitly.
    pub fn register_static<F>(&mut self, name: impl Into<String>, function: F) -> Result<(), RegistryError>
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        self.insert_method(name.into(), MethodKind::Static, Arc::new(function))
    }

    /// Register a function defined on another type.
    pub fn register_external<F>(
        &mut self,
        type_name: impl Into<String>,
        method: impl Into<String>,
        function: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        let key = (type_name.into(), method.into());
        if self.externals.contains_key(&key) {
            return Err(RegistryError::DuplicateExternal {
                type_name: key.0,
                method: key.1,
            });
        }
        self.externals.insert(key, Arc::new(function));
        Ok(())
    }

    fn insert_method(
        &mut self,
        name: String,
        kind: MethodKind,
        callback: SharedCallback<T>,
    ) -> Result<(), RegistryError> {
        if self.methods.contains_key(&name) {
            return Err(RegistryError::DuplicateMethod {
                type_name: self.type_name.clone(),
                name,
            });
        }
        self.methods.insert(name, MethodEntry { kind, callback });
        Ok(())
    }

    /// Name the target type is known by.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Look up a method on the target type.
    pub fn method(&self, name: &str) -> Option<&MethodEntry<T>> {
        self.methods.get(name)
    }

    /// Look up a function registered for another type.
    pub fn external(&self, type_name: &str, method: &str) -> Option<&SharedCallback<T>> {
        self.externals
            .get(&(type_name.to_string(), method.to_string()))
    }

    /// Check if a method is registered.
    pub fn contains_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered method names, in registration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|s| s.as_str())
    }

    /// Registered external functions as `(type, method)`, in registration order.
    pub fn external_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.externals
            .keys()
            .map(|(t, m)| (t.as_str(), m.as_str()))
    }

    /// Total number of registered callables.
    pub fn len(&self) -> usize {
        self.methods.len() + self.externals.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.externals.is_empty()
    }
}

impl<T> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("externals", &self.externals.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for creating a registry with chained calls.
///
/// The first registration error is kept and returned from [`build`](Self::build).
pub struct RegistryBuilder<T> {
    registry: CallbackRegistry<T>,
    error: Option<RegistryError>,
}

impl<T> RegistryBuilder<T> {
    /// Create a new builder for a type known as `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            registry: CallbackRegistry::new(type_name),
            error: None,
        }
    }

    /// Create a builder named after `T`.
    pub fn for_type() -> Self {
        Self {
            registry: CallbackRegistry::for_type(),
            error: None,
        }
    }

    /// Register an instance method.
    pub fn instance<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        let outcome = self.registry.register_instance(name, method);
        self.keep_first(outcome);
        self
    }

    /// Register a static method.
    pub fn static_fn<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        let outcome = self.registry.register_static(name, function);
        self.keep_first(outcome);
        self
    }

    /// Register a function defined on another type.
    pub fn external<F>(mut self, type_name: impl Into<String>, method: impl Into<String>, function: F) -> Self
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        let outcome = self.registry.register_external(type_name, method, function);
        self.keep_first(outcome);
        self
    }

    fn keep_first(&mut self, outcome: Result<(), RegistryError>) {
        if let Err(error) = outcome {
            self.error.get_or_insert(error);
        }
    }

    /// Build the registry.
    pub fn build(self) -> Result<CallbackRegistry<T>, RegistryError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.registry),
        }
    }
}

/// Last path segment of `T`'s type name (`my_app::model::Author` → `Author`).
pub fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Author {
        first_name: String,
    }

    impl Author {
        fn validate(&self, ctx: &mut ExecutionContext) {
            if self.first_name.is_empty() {
                ctx.add_violation("empty");
            }
        }
    }

    fn check_author(author: &Author, ctx: &mut ExecutionContext) {
        author.validate(ctx);
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CallbackRegistry::<Author>::for_type();
        registry.register_instance("validate", Author::validate).unwrap();
        registry.register_static("check", check_author).unwrap();

        assert_eq!(registry.type_name(), "Author");
        assert_eq!(registry.method("validate").unwrap().kind, MethodKind::Instance);
        assert_eq!(registry.method("check").unwrap().kind, MethodKind::Static);
        assert!(registry.method("missing").is_none());
        assert_eq!(registry.method_names().collect::<Vec<_>>(), vec!["validate", "check"]);
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let mut registry = CallbackRegistry::<Author>::new("Author");
        registry.register_instance("validate", Author::validate).unwrap();
        let error = registry.register_static("validate", check_author).unwrap_err();

        assert_eq!(
            error,
            RegistryError::DuplicateMethod {
                type_name: "Author".to_string(),
                name: "validate".to_string(),
            }
        );
    }

    #[test]
    fn test_external_lookup() {
        let mut registry = CallbackRegistry::<Author>::new("Author");
        registry
            .register_external("NameRules", "check", check_author)
            .unwrap();

        assert!(registry.external("NameRules", "check").is_some());
        assert!(registry.external("NameRules", "other").is_none());
        assert!(registry
            .register_external("NameRules", "check", check_author)
            .is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_builder_keeps_first_error() {
        let result = RegistryBuilder::<Author>::new("Author")
            .instance("validate", Author::validate)
            .static_fn("validate", check_author)
            .external("Rules", "a", check_author)
            .external("Rules", "a", check_author)
            .build();

        assert!(matches!(result, Err(RegistryError::DuplicateMethod { .. })));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Author>(), "Author");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
    }
}
