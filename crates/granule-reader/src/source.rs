//! The read interface shared by all granule backends.

use crate::column::ColumnData;
use crate::error::ReaderResult;

/// An opened hierarchical file that can hand out named arrays.
///
/// Paths are slash-separated and relative to the group root, e.g.
/// `land_ice_segments/fit_statistics/dh_fit_dx` inside group `gt1l`.
pub trait HierarchicalSource {
    /// Read the full array at `path` inside `group`.
    ///
    /// Returns [`ReaderError::GroupNotFound`](crate::ReaderError::GroupNotFound)
    /// or [`ReaderError::VariableNotFound`](crate::ReaderError::VariableNotFound)
    /// when the layout does not contain the request.
    fn read_array(&self, group: &str, path: &str) -> ReaderResult<ColumnData>;

    /// Human-readable name of the source for log lines.
    fn name(&self) -> &str;
}

impl<S: HierarchicalSource + ?Sized> HierarchicalSource for Box<S> {
    fn read_array(&self, group: &str, path: &str) -> ReaderResult<ColumnData> {
        (**self).read_array(group, path)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
