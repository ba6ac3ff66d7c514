//! Granule subsetting pipeline.
//!
//! Per granule: open the remote file, read the requested arrays for every
//! group, assemble point-referenced rows, clip them to a bounding box. The
//! [`orchestrator`] runs this over many granules on a bounded worker pool and
//! merges the per-granule tables as they complete.
//!
//! # Architecture
//!
//! ```text
//! run ──► batches ──► rayon pool ──► process(granule) ──► mpsc ──► merge
//!                                     │
//!                                     ├─ GranuleOpener::open
//!                                     ├─ extract_group   (per group)
//!                                     ├─ assemble        (per group)
//!                                     └─ clip            (once per granule)
//! ```
//!
//! Every step below the orchestrator is synchronous. Failures are normalized
//! into [`GranuleError`](subset_common::GranuleError) at the worker boundary.

pub mod assemble;
pub mod clip;
pub mod extract;
pub mod orchestrator;
pub mod summary;
pub mod table;
pub mod worker;

pub use assemble::assemble;
pub use clip::clip;
pub use extract::{extract_group, GroupArrays};
pub use orchestrator::{compute_batch_size, default_worker_count, run, RunOptions};
pub use summary::RunSummary;
pub use table::{Column, Point, PointTable};
pub use worker::{process, GranuleOpener, MemoryGranuleOpener, RemoteGranuleOpener};
