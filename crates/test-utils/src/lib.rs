//! Shared test utilities for the granule subsetter workspace.
//!
//! - [`fixtures`]: bounding boxes, ATL06 layout constants and URLs
//! - [`generators`]: synthetic granules, in memory or written as NetCDF-4
//! - [`paths`]: lookup of optional real granules
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Evaluate to the path of a real test granule, or skip the test.
///
/// ```ignore
/// #[test]
/// fn test_real_granule() {
///     let path = require_test_file!("ATL06_sample.h5");
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: granule '{}' not found; set {} to a directory holding it",
                    $name,
                    $crate::TEST_DATA_ENV
                );
                return;
            }
        }
    }};
}

/// Assert two numbers differ by at most `epsilon`, compared as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
