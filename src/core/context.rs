//! Execution context handed to callbacks.
//!
//! A context is created fresh for every (declaration, object) invocation and
//! is owned by that invocation alone. Callbacks can only append to it; the
//! driver reads the violations back once the callback returns.

use crate::core::declaration::DeclarationId;
use crate::core::path::{PathSegment, PropertyPath};
use crate::core::violation::{Payload, Violation};
use indexmap::IndexMap;

/// Per-invocation violation accumulator.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// Cursor new violations are attributed to.
    current: PropertyPath,
    /// Violations in emission order.
    violations: Vec<Violation>,
    /// Declaration being executed.
    declaration: Option<DeclarationId>,
    /// Payload of the declaration being executed.
    payload: Option<Payload>,
}

impl ExecutionContext {
    /// Create a context rooted at the object itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context whose cursor starts at `path`.
    pub fn at(path: PropertyPath) -> Self {
        Self {
            current: path,
            ..Self::default()
        }
    }

    pub(crate) fn for_declaration(
        declaration: DeclarationId,
        payload: Option<Payload>,
        path: PropertyPath,
    ) -> Self {
        Self {
            current: path,
            violations: Vec::new(),
            declaration: Some(declaration),
            payload,
        }
    }

    // ========================================================================
    // Emitting
    // ========================================================================

    /// Record a violation at the current path.
    pub fn add_violation(&mut self, message: impl Into<String>) {
        self.add_violation_with(message, std::iter::empty::<(String, String)>());
    }

    /// Record a violation at the current path with interpolation parameters.
    pub fn add_violation_with<I, K, V>(&mut self, message: impl Into<String>, parameters: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let parameters = parameters
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.violations
            .push(Violation::new(message, self.current.clone(), parameters));
    }

    /// Start building a violation. Nothing is recorded until
    /// [`ViolationBuilder::add_violation`] is called.
    pub fn build_violation(&mut self, message: impl Into<String>) -> ViolationBuilder<'_> {
        ViolationBuilder {
            context: self,
            template: message.into(),
            path: PropertyPath::root(),
            parameters: IndexMap::new(),
            invalid_value: None,
            plural: None,
            code: None,
        }
    }

    // ========================================================================
    // Path Scoping
    // ========================================================================

    /// Run `f` with the cursor moved into `segment`, restoring it afterwards.
    pub fn scoped<R>(
        &mut self,
        segment: impl Into<PathSegment>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let depth = self.current.len();
        self.current.push(segment.into());
        let out = f(self);
        self.current.truncate(depth);
        out
    }

    /// Run `f` with the cursor moved by a relative path, restoring it afterwards.
    pub fn scoped_path<R>(&mut self, relative: &PropertyPath, f: impl FnOnce(&mut Self) -> R) -> R {
        let depth = self.current.len();
        for segment in relative.segments() {
            self.current.push(segment.clone());
        }
        let out = f(self);
        self.current.truncate(depth);
        out
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// The path new violations are attributed to.
    pub fn current_path(&self) -> &PropertyPath {
        &self.current
    }

    /// Violations recorded so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Number of violations recorded so far.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Payload of the declaration being executed.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Declaration being executed.
    pub fn declaration_id(&self) -> Option<DeclarationId> {
        self.declaration
    }

    pub(crate) fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

/// Builder for a single violation.
///
/// Dropping the builder without calling [`add_violation`](Self::add_violation)
/// records nothing.
#[must_use = "a violation is only recorded once `add_violation` is called"]
pub struct ViolationBuilder<'a> {
    context: &'a mut ExecutionContext,
    template: String,
    path: PropertyPath,
    parameters: IndexMap<String, String>,
    invalid_value: Option<serde_json::Value>,
    plural: Option<u64>,
    code: Option<String>,
}

impl<'a> ViolationBuilder<'a> {
    /// Set the field address, relative to the context's current path.
    ///
    /// Text that does not parse as a path is kept as a single property name.
    pub fn at_path(mut self, path: &str) -> Self {
        self.path = match PropertyPath::parse(path) {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!("Malformed property path '{}': {}", path, error);
                PropertyPath::root().property(path)
            }
        };
        self
    }

    /// Set the field address from an already built path.
    pub fn at_property_path(mut self, path: PropertyPath) -> Self {
        self.path = path;
        self
    }

    /// Set one interpolation parameter.
    pub fn set_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Set several interpolation parameters.
    pub fn set_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Report the offending value.
    pub fn set_invalid_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.invalid_value = Some(value.into());
        self
    }

    /// Select the plural form of a `"one|many"` message.
    pub fn set_plural(mut self, count: u64) -> Self {
        self.plural = Some(count);
        self
    }

    /// Set a machine-readable error code.
    pub fn set_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Commit exactly one violation to the context.
    pub fn add_violation(self) {
        let path = self.context.current.join(&self.path);
        let violation = Violation::new(self.template, path, self.parameters)
            .with_details(self.invalid_value, self.plural, self.code);
        self.context.violations.push(violation);
    }
}
