//! Constraint declarations.
//!
//! A declaration names the callback to run for a type (or one of its
//! properties). Declarations are built at configuration time and are
//! immutable once they are stored in a type's metadata.

use crate::core::context::ExecutionContext;
use crate::core::violation::Payload;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Group every declaration belongs to unless told otherwise.
pub const DEFAULT_GROUP: &str = "Default";

/// Signature shared by every callback once resolved.
///
/// Instance methods use the same shape, with the object bound as receiver.
pub type CallbackFn<T> = dyn Fn(&T, &mut ExecutionContext) + Send + Sync;

/// Shared handle to a callback function.
pub type SharedCallback<T> = Arc<CallbackFn<T>>;

/// Unique identifier for a constraint declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationId(pub Uuid);

impl DeclarationId {
    /// Create a new random declaration ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a declaration ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for DeclarationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// What a declaration is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ConstraintTarget {
    /// The type as a whole.
    Class,
    /// One named property; violations default to that property's path.
    Property(String),
}

/// A closure captured at configuration time.
pub struct ClosureHandle<T> {
    callback: SharedCallback<T>,
    label: Option<String>,
}

impl<T> ClosureHandle<T> {
    /// Wrap a closure.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            label: None,
        }
    }

    /// Attach a label used in logs and error messages.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn callback(&self) -> &SharedCallback<T> {
        &self.callback
    }
}

impl<T> Clone for ClosureHandle<T> {
    fn clone(&self) -> Self {
        Self {
            callback: Arc::clone(&self.callback),
            label: self.label.clone(),
        }
    }
}

impl<T> fmt::Debug for ClosureHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureHandle")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// How a declaration names its callback.
pub enum CallbackSpec<T> {
    /// Method registered on the target type (instance or static).
    Method(String),
    /// Function defined on another type.
    External { type_name: String, method: String },
    /// Global free function. Never resolves.
    Function(String),
    /// Closure captured at configuration time.
    Closure(ClosureHandle<T>),
    /// Textual reference as a mapping file would carry it, classified on resolution.
    Path(String),
}

impl<T> CallbackSpec<T> {
    /// Short human-readable form for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            CallbackSpec::Method(name) => name.clone(),
            CallbackSpec::External { type_name, method } => format!("{}::{}", type_name, method),
            CallbackSpec::Function(name) => format!("::{}", name),
            CallbackSpec::Closure(handle) => match handle.label() {
                Some(label) => format!("closure '{}'", label),
                None => "closure".to_string(),
            },
            CallbackSpec::Path(text) => text.clone(),
        }
    }
}

impl<T> Clone for CallbackSpec<T> {
    fn clone(&self) -> Self {
        match self {
            CallbackSpec::Method(name) => CallbackSpec::Method(name.clone()),
            CallbackSpec::External { type_name, method } => CallbackSpec::External {
                type_name: type_name.clone(),
                method: method.clone(),
            },
            CallbackSpec::Function(name) => CallbackSpec::Function(name.clone()),
            CallbackSpec::Closure(handle) => CallbackSpec::Closure(handle.clone()),
            CallbackSpec::Path(text) => CallbackSpec::Path(text.clone()),
        }
    }
}

impl<T> fmt::Debug for CallbackSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackSpec::Method(name) => f.debug_tuple("Method").field(name).finish(),
            CallbackSpec::External { type_name, method } => f
                .debug_struct("External")
                .field("type_name", type_name)
                .field("method", method)
                .finish(),
            CallbackSpec::Function(name) => f.debug_tuple("Function").field(name).finish(),
            CallbackSpec::Closure(handle) => f.debug_tuple("Closure").field(handle).finish(),
            CallbackSpec::Path(text) => f.debug_tuple("Path").field(text).finish(),
        }
    }
}

/// A callback constraint attached to type `T`.
pub struct ConstraintDeclaration<T> {
    id: DeclarationId,
    target: ConstraintTarget,
    spec: CallbackSpec<T>,
    payload: Option<Payload>,
    groups: Vec<String>,
}

impl<T> ConstraintDeclaration<T> {
    /// Create a class-level declaration in the default group.
    pub fn new(spec: CallbackSpec<T>) -> Self {
        Self {
            id: DeclarationId::new(),
            target: ConstraintTarget::Class,
            spec,
            payload: None,
            groups: vec![DEFAULT_GROUP.to_string()],
        }
    }

    /// Declaration invoking a method registered on `T`.
    pub fn method(name: impl Into<String>) -> Self {
        Self::new(CallbackSpec::Method(name.into()))
    }

    /// Declaration invoking a function registered for another type.
    pub fn external(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(CallbackSpec::External {
            type_name: type_name.into(),
            method: method.into(),
        })
    }

    /// Declaration invoking a closure.
    pub fn closure<F>(callback: F) -> Self
    where
        F: Fn(&T, &mut ExecutionContext) + Send + Sync + 'static,
    {
        Self::new(CallbackSpec::Closure(ClosureHandle::new(callback)))
    }

    /// Declaration from a textual reference (`"validate"`, `"Type::check"`).
    pub fn path(text: impl Into<String>) -> Self {
        Self::new(CallbackSpec::Path(text.into()))
    }

    /// Attach the declaration to a property instead of the whole type.
    pub fn on_property(mut self, property: impl Into<String>) -> Self {
        self.target = ConstraintTarget::Property(property.into());
        self
    }

    /// Attach opaque metadata; it is copied onto every violation emitted.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Replace the validation groups.
    pub fn in_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Unique ID.
    pub fn id(&self) -> DeclarationId {
        self.id
    }

    /// What the declaration is attached to.
    pub fn target(&self) -> &ConstraintTarget {
        &self.target
    }

    /// How the callback is named.
    pub fn spec(&self) -> &CallbackSpec<T> {
        &self.spec
    }

    /// Attached payload.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Validation groups.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Check whether any of `groups` selects this declaration.
    pub fn applies_to(&self, groups: &[String]) -> bool {
        groups.iter().any(|g| self.groups.contains(g))
    }
}

impl<T> Clone for ConstraintDeclaration<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            target: self.target.clone(),
            spec: self.spec.clone(),
            payload: self.payload.clone(),
            groups: self.groups.clone(),
        }
    }
}

impl<T> fmt::Debug for ConstraintDeclaration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstraintDeclaration")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("spec", &self.spec)
            .field("payload", &self.payload)
            .field("groups", &self.groups)
            .finish()
    }
}
