//! Class metadata: the ordered declarations of one validated type.
//!
//! How declarations get here (annotations, mapping files, code) is up to the
//! caller. The driver only relies on [`MetadataProvider`].

use crate::callbacks::registry::{short_type_name, RegistryBuilder};
use crate::core::declaration::ConstraintDeclaration;

/// Source of a type's declarations, in declaration order.
pub trait MetadataProvider<T> {
    /// All declarations for `T`.
    fn declarations(&self) -> &[ConstraintDeclaration<T>];
}

/// Programmatic registration hook for validated types.
///
/// ```rust,ignore
/// impl HasConstraints for Author {
///     fn load_constraints(metadata: &mut ClassMetadata<Self>) {
///         metadata.add_constraint(ConstraintDeclaration::method("validate"));
///     }
///
///     fn register_callbacks(builder: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
///         builder.instance("validate", Author::validate)
///     }
/// }
/// ```
pub trait HasConstraints: Sized + Send + Sync + 'static {
    /// Add this type's declarations.
    fn load_constraints(metadata: &mut ClassMetadata<Self>);

    /// Register the callables the declarations may name.
    fn register_callbacks(builder: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
        builder
    }
}

/// Declarations attached to one type.
pub struct ClassMetadata<T> {
    type_name: String,
    declarations: Vec<ConstraintDeclaration<T>>,
}

impl<T> ClassMetadata<T> {
    /// Create empty metadata for a type known as `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            declarations: Vec::new(),
        }
    }

    /// Create empty metadata named after `T`.
    pub fn for_type() -> Self {
        Self::new(short_type_name::<T>())
    }

    /// Append a declaration.
    pub fn add_constraint(&mut self, declaration: ConstraintDeclaration<T>) -> &mut Self {
        self.declarations.push(declaration);
        self
    }

    /// Append a declaration attached to `property`.
    pub fn add_property_constraint(
        &mut self,
        property: impl Into<String>,
        declaration: ConstraintDeclaration<T>,
    ) -> &mut Self {
        self.declarations.push(declaration.on_property(property));
        self
    }

    /// Put already materialized inherited declarations ahead of this type's own.
    pub fn inherit(&mut self, parent: &ClassMetadata<T>) -> &mut Self {
        let mut merged = parent.declarations.clone();
        merged.append(&mut self.declarations);
        self.declarations = merged;
        self
    }

    /// Name of the type.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declarations selected by any of `groups`, in order.
    pub fn declarations_in<'a>(
        &'a self,
        groups: &'a [String],
    ) -> impl Iterator<Item = &'a ConstraintDeclaration<T>> {
        self.declarations.iter().filter(move |d| d.applies_to(groups))
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check if there are no declarations.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl<T: HasConstraints> ClassMetadata<T> {
    /// Load metadata through the type's [`HasConstraints`] hook.
    pub fn load() -> Self {
        let mut metadata = Self::for_type();
        T::load_constraints(&mut metadata);
        metadata
    }
}

impl<T> MetadataProvider<T> for ClassMetadata<T> {
    fn declarations(&self) -> &[ConstraintDeclaration<T>] {
        &self.declarations
    }
}

impl<T> Clone for ClassMetadata<T> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            declarations: self.declarations.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ClassMetadata<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("type_name", &self.type_name)
            .field("declarations", &self.declarations)
            .finish()
    }
}
