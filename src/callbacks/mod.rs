//! Callback registration and resolution.

pub mod cache;
pub mod registry;
pub mod resolver;

pub use cache::{CacheKey, CacheStats, ResolutionCache, SharedResolutionCache, DEFAULT_CACHE_CAPACITY};
pub use registry::{CallbackRegistry, MethodEntry, MethodKind, RegistryBuilder};
pub use resolver::{resolve, CallingConvention, InvocableKind, ResolvedInvocable};
