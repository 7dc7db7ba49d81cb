//! Validation: class metadata, options and the driver that runs callback
//! constraints against objects.

pub mod driver;
pub mod metadata;
pub mod options;

pub use driver::Validator;
pub use metadata::{ClassMetadata, HasConstraints, MetadataProvider};
pub use options::ValidatorOptions;
