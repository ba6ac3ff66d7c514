//! Persisting subset results.
//!
//! The merged [`PointTable`](pipeline::PointTable) is written as GeoParquet:
//! one Arrow column per variable in its original element type, a `group`
//! column naming the source ground track, and a WKB-encoded `geometry`
//! column described by the `geo` file metadata.

pub mod error;
pub mod geoparquet;
pub mod wkb;

pub use error::{OutputError, OutputResult};
pub use geoparquet::{to_record_batch, write_geoparquet, GeoMetadata, WriteStats};
