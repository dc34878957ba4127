//! Immutable per-company reference datasets.
//!
//! Built-in datasets are embedded at compile time; extra companies can be
//! loaded from a directory of JSON files. Every dataset is validated before
//! it reaches the engine.

pub mod error;
pub mod registry;
pub mod validation;

pub use error::{DatasetError, DatasetResult};
pub use registry::{load_directory, parse_company, CompanyRegistry, BUILTIN_DATASETS};
pub use validation::validate;
