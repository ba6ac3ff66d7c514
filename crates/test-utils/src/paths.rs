//! Locating optional real granules on disk.
//!
//! Real ATL06 files are large and never committed; tests that want one look
//! it up here and skip when it is absent.

use std::path::PathBuf;

/// Environment variable naming an extra directory to search first.
pub const TEST_DATA_ENV: &str = "TEST_DATA_DIR";

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or(manifest_dir)
}

/// Directories searched for test granules, in order.
pub fn testdata_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    let mut dirs: Vec<PathBuf> = std::env::var_os(TEST_DATA_ENV)
        .map(PathBuf::from)
        .into_iter()
        .collect();
    dirs.extend([
        root.join("crates/granule-reader/testdata"),
        root.join("crates/pipeline/testdata"),
        root.join("testdata"),
    ]);
    dirs
}

/// First existing `name` across [`testdata_dirs`].
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    testdata_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}
