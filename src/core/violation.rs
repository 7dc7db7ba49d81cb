//! Violations and the aggregate validation result.

use crate::core::declaration::DeclarationId;
use crate::core::error::ResolutionError;
use crate::core::path::PropertyPath;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Opaque metadata attached to a declaration and copied onto its violations.
pub type Payload = serde_json::Value;

/// One recorded validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Message with parameters interpolated
    pub message: String,
    /// Message as the callback supplied it
    pub message_template: String,
    /// Where in the object the failure was found; empty means the object itself
    pub path: PropertyPath,
    /// Interpolation parameters, in insertion order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, String>,
    /// The offending value, if the callback reported it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_value: Option<serde_json::Value>,
    /// Count used to select a plural form of the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<u64>,
    /// Machine-readable error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Payload of the declaration that produced this violation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    /// Declaration that produced this violation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<DeclarationId>,
}

impl Violation {
    /// Create a violation, rendering the message from its template.
    pub fn new(
        template: impl Into<String>,
        path: PropertyPath,
        parameters: IndexMap<String, String>,
    ) -> Self {
        let message_template = template.into();
        let message = interpolate(&message_template, &parameters);
        Self {
            message,
            message_template,
            path,
            parameters,
            invalid_value: None,
            plural: None,
            code: None,
            payload: None,
            declaration: None,
        }
    }

    pub(crate) fn with_details(
        mut self,
        invalid_value: Option<serde_json::Value>,
        plural: Option<u64>,
        code: Option<String>,
    ) -> Self {
        if let Some(count) = plural {
            let form = select_plural(&self.message_template, count);
            self.message = interpolate(form, &self.parameters);
        }
        self.invalid_value = invalid_value;
        self.plural = plural;
        self.code = code;
        self
    }

    /// Attribute the violation to a declaration.
    pub(crate) fn tagged(mut self, declaration: DeclarationId, payload: Option<Payload>) -> Self {
        self.declaration = Some(declaration);
        self.payload = payload;
        self
    }

    /// Move the violation under `prefix`.
    pub(crate) fn prefixed(mut self, prefix: &PropertyPath) -> Self {
        self.path = prefix.join(&self.path);
        self
    }
}

/// Replace `{{ name }}` placeholders with parameter values.
///
/// Unknown placeholders are left as written.
pub fn interpolate(template: &str, parameters: &IndexMap<String, String>) -> String {
    if parameters.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match parameters.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + end + 4]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Pick the singular or plural form of a `"one|many"` template.
fn select_plural(template: &str, count: u64) -> &str {
    match template.split_once('|') {
        Some((one, _)) if count == 1 => one,
        Some((_, many)) => many,
        None => template,
    }
}

/// Ordered violations of one validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    violations: Vec<Violation>,
    /// Declarations that could not be resolved and therefore did not run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration_errors: Vec<ResolutionError>,
    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

impl ValidationResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append violations in order.
    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    /// Record a declaration that failed to resolve.
    pub fn add_configuration_error(&mut self, error: ResolutionError) {
        self.configuration_errors.push(error);
    }

    /// Append another result after this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.violations.extend(other.violations);
        self.configuration_errors.extend(other.configuration_errors);
        self.duration_ms += other.duration_ms;
    }

    /// True when no violation was found and every declaration ran.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty() && self.configuration_errors.is_empty()
    }

    /// True when at least one violation was recorded.
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Violations in order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Take ownership of the violations.
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// Violations recorded at exactly `path`.
    pub fn violations_at<'a>(&'a self, path: &'a PropertyPath) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| &v.path == path)
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Check if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Iterate over violations.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Move every violation under `prefix`.
    pub fn prefixed(mut self, prefix: &PropertyPath) -> Self {
        self.violations = self
            .violations
            .into_iter()
            .map(|v| v.prefixed(prefix))
            .collect();
        self
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            "✓ Object is valid".to_string()
        } else if self.configuration_errors.is_empty() {
            format!("✗ {} violation(s)", self.violations.len())
        } else {
            format!(
                "✗ {} violation(s), {} declaration(s) could not run",
                self.violations.len(),
                self.configuration_errors.len()
            )
        }
    }

    /// One line per violation, `path: message`.
    pub fn detailed_messages(&self) -> Vec<String> {
        self.violations
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if v.path.is_root() {
                    format!("{}. {}", i + 1, v.message)
                } else {
                    format!("{}. {}: {}", i + 1, v.path, v.message)
                }
            })
            .collect()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}
