//! Hierarchical granule reader.
//!
//! This crate reads named numeric arrays from HDF5 / NetCDF-4 granules,
//! such as ICESat-2 ATL06 files where each ground track is a group
//! (`gt1l`, `gt1r`, ...) holding nested sub-groups of 1-D arrays.
//!
//! # Implementation Notes
//!
//! Reading goes through the [`HierarchicalSource`] trait so callers can swap
//! the native reader for an in-memory one. The native reader wraps the
//! `netcdf` crate, which opens a path or an HTTP byte-range URL; a plain
//! `Read` source can be staged into a temporary file instead (see
//! [`native`]).
//!
//! Arrays keep their on-disk element type in [`ColumnData`].

pub mod column;
pub mod error;
pub mod memory;
pub mod native;
pub mod source;

pub use column::{ColumnData, DataType};
pub use error::{ReaderError, ReaderResult};
pub use memory::MemorySource;
pub use native::{silence_hdf5_errors, NetCdfGranule};
pub use source::HierarchicalSource;
