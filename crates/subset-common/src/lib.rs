//! Common types shared across the granule subsetter crates.

pub mod bbox;
pub mod error;
pub mod granule;
pub mod variables;

pub use bbox::BoundingBox;
pub use error::{GranuleError, GranuleErrorKind, SubsetError, SubsetResult};
pub use granule::{AccessMode, GranuleLinks, GranuleLocator};
pub use variables::{basename, VariablePath, VariableSpec};
