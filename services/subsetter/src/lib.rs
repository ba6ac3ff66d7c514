//! Granule subsetter service library.
//!
//! The binary in `main.rs` is a thin CLI over these modules:
//! - [`config`]: subset parameters (YAML) and transport settings (environment)
//! - [`discovery`]: catalog search and URL lists
//! - [`job`]: credential resolution, the parallel pipeline and GeoParquet output

pub mod config;
pub mod discovery;
pub mod job;

pub use config::{Parameters, ParametersFile, Settings};
pub use discovery::{read_url_list, CmrClient, SearchRequest};
pub use job::{JobReport, SubsetJob};
