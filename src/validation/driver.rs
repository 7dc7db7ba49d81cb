//! Validation driver.
//!
//! For each object the driver gathers the applicable declarations, resolves
//! them (through the cache), invokes each with a fresh execution context and
//! collects the violations into one [`ValidationResult`].

use crate::callbacks::cache::{new_shared_cache, CacheKey, SharedResolutionCache};
use crate::callbacks::registry::{CallbackRegistry, RegistryBuilder};
use crate::callbacks::resolver::{resolve, ResolvedInvocable};
use crate::core::context::ExecutionContext;
use crate::core::declaration::{ConstraintDeclaration, ConstraintTarget};
use crate::core::error::{RegistryError, ResolutionResult, ValidationFault, VouchError, VouchResult};
use crate::core::path::PropertyPath;
use crate::core::violation::ValidationResult;
use crate::validation::metadata::{ClassMetadata, HasConstraints, MetadataProvider};
use crate::validation::options::ValidatorOptions;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Callback-constraint validator for type `T`.
pub struct Validator<T> {
    /// Callables declarations may name.
    registry: Arc<CallbackRegistry<T>>,
    /// Declarations used by [`validate_object`](Self::validate_object).
    metadata: ClassMetadata<T>,
    /// Resolution cache.
    cache: SharedResolutionCache<T>,
    /// Options.
    options: ValidatorOptions,
}

impl<T> Validator<T> {
    /// Create a validator with no declarations of its own.
    pub fn new(registry: CallbackRegistry<T>) -> Self {
        let metadata = ClassMetadata::new(registry.type_name());
        Self {
            registry: Arc::new(registry),
            metadata,
            cache: new_shared_cache(),
            options: ValidatorOptions::default(),
        }
    }

    /// Use `metadata` as the type's declarations.
    pub fn with_metadata(mut self, metadata: ClassMetadata<T>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set options.
    pub fn with_options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Share a resolution cache with other validators of the same type.
    pub fn with_cache(mut self, cache: SharedResolutionCache<T>) -> Self {
        self.cache = cache;
        self
    }

    /// Get the options.
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Get the registry.
    pub fn registry(&self) -> &CallbackRegistry<T> {
        &self.registry
    }

    /// Get the type's declarations.
    pub fn metadata(&self) -> &ClassMetadata<T> {
        &self.metadata
    }

    /// Get the resolution cache.
    pub fn cache(&self) -> &SharedResolutionCache<T> {
        &self.cache
    }

    /// Resolve a declaration, through the cache when enabled.
    pub fn resolve(&self, declaration: &ConstraintDeclaration<T>) -> ResolutionResult<ResolvedInvocable<T>> {
        if !self.options.cache_resolutions {
            return resolve(declaration, &self.registry);
        }
        let key = CacheKey::new(declaration.id(), self.registry.type_name());
        self.cache
            .get_or_resolve(key, || resolve(declaration, &self.registry))
    }

    /// Validate `object` against `declarations`, using the configured groups.
    pub fn validate(
        &self,
        object: &T,
        declarations: &[ConstraintDeclaration<T>],
    ) -> VouchResult<ValidationResult> {
        self.run(object, declarations, &self.options.groups)
    }

    /// Validate `object` against the type's own declarations.
    pub fn validate_object(&self, object: &T) -> VouchResult<ValidationResult> {
        self.run(object, self.metadata.declarations(), &self.options.groups)
    }

    /// Validate `object` against the type's declarations in `groups`.
    pub fn validate_groups(&self, object: &T, groups: &[&str]) -> VouchResult<ValidationResult> {
        let groups: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
        self.run(object, self.metadata.declarations(), &groups)
    }

    fn run(
        &self,
        object: &T,
        declarations: &[ConstraintDeclaration<T>],
        groups: &[String],
    ) -> VouchResult<ValidationResult> {
        let start = Instant::now();
        let mut result = ValidationResult::new();

        for declaration in declarations.iter().filter(|d| d.applies_to(groups)) {
            let invocable = match self.resolve(declaration) {
                Ok(invocable) => invocable,
                Err(error) => {
                    log::error!("Skipping declaration {}: {}", declaration.id(), error);
                    if self.options.strict_resolution {
                        return Err(error.into());
                    }
                    result.add_configuration_error(error);
                    continue;
                }
            };

            let context = self.invoke(object, declaration, &invocable)?;
            let payload = declaration.payload();
            result.extend(
                context
                    .into_violations()
                    .into_iter()
                    .map(|v| v.tagged(declaration.id(), payload.cloned())),
            );
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        log::debug!(
            "Validated {} object: {} violation(s) in {}ms",
            self.registry.type_name(),
            result.len(),
            result.duration_ms
        );
        Ok(result)
    }

    fn invoke(
        &self,
        object: &T,
        declaration: &ConstraintDeclaration<T>,
        invocable: &ResolvedInvocable<T>,
    ) -> Result<ExecutionContext, ValidationFault> {
        let root = match declaration.target() {
            ConstraintTarget::Class => PropertyPath::root(),
            ConstraintTarget::Property(name) => PropertyPath::root().property(name.as_str()),
        };
        let mut context =
            ExecutionContext::for_declaration(declaration.id(), declaration.payload().cloned(), root);

        log::debug!(
            "Invoking {} for declaration {}",
            invocable.describe(),
            declaration.id()
        );

        if !self.options.catch_panics {
            invocable.invoke(object, &mut context);
            return Ok(context);
        }

        panic::catch_unwind(AssertUnwindSafe(|| invocable.invoke(object, &mut context))).map_err(
            |panic| {
                let message = panic_message(panic.as_ref());
                log::error!(
                    "Callback {} panicked (declaration {}): {}",
                    invocable.describe(),
                    declaration.id(),
                    message
                );
                ValidationFault::CallbackPanicked {
                    declaration: declaration.id(),
                    callback: invocable.describe(),
                    message,
                }
            },
        )?;

        Ok(context)
    }
}

impl<T: Sync> Validator<T> {
    /// Validate sibling objects independently.
    ///
    /// Each result's paths are prefixed with the object's index (`[i]`).
    /// Results come back in input order; the lowest-index failure aborts the
    /// whole batch.
    pub fn validate_all(&self, objects: &[T]) -> VouchResult<Vec<ValidationResult>> {
        let run_one = |(index, object): (usize, &T)| -> VouchResult<ValidationResult> {
            self.validate_object(object)
                .map(|result| result.prefixed(&PropertyPath::root().index(index)))
                .map_err(|error| VouchError::Item {
                    index,
                    source: Box::new(error),
                })
        };

        let outcomes: Vec<VouchResult<ValidationResult>> = if !self.options.parallel {
            objects.iter().enumerate().map(run_one).collect()
        } else if self.options.max_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.max_threads)
                .build()?;
            pool.install(|| objects.par_iter().enumerate().map(run_one).collect())
        } else {
            objects.par_iter().enumerate().map(run_one).collect()
        };

        outcomes.into_iter().collect()
    }
}

impl<T: HasConstraints> Validator<T> {
    /// Build a validator from the type's [`HasConstraints`] hooks.
    pub fn for_type() -> Result<Self, RegistryError> {
        let registry = T::register_callbacks(RegistryBuilder::for_type()).build()?;
        Ok(Self::new(registry).with_metadata(ClassMetadata::load()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
