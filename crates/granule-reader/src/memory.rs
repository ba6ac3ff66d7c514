//! In-memory granule source.

use std::collections::{BTreeMap, BTreeSet};

use crate::column::ColumnData;
use crate::error::{ReaderError, ReaderResult};
use crate::source::HierarchicalSource;

/// A granule held entirely in memory, keyed by (group, path).
///
/// Used for synthetic granules and for sources that have already been
/// decoded elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    name: String,
    groups: BTreeSet<String>,
    arrays: BTreeMap<(String, String), ColumnData>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add an array, creating its group if needed.
    pub fn with_array(
        mut self,
        group: impl Into<String>,
        path: impl Into<String>,
        data: impl Into<ColumnData>,
    ) -> Self {
        self.insert(group, path, data);
        self
    }

    pub fn insert(
        &mut self,
        group: impl Into<String>,
        path: impl Into<String>,
        data: impl Into<ColumnData>,
    ) {
        let group = group.into();
        self.groups.insert(group.clone());
        self.arrays.insert((group, path.into()), data.into());
    }

    /// Declare an empty group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }
}

impl HierarchicalSource for MemorySource {
    fn read_array(&self, group: &str, path: &str) -> ReaderResult<ColumnData> {
        if !self.groups.contains(group) {
            return Err(ReaderError::GroupNotFound(group.to_string()));
        }
        self.arrays
            .get(&(group.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| ReaderError::VariableNotFound {
                group: group.to_string(),
                path: path.to_string(),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let src = MemorySource::new("mem").with_array("gt1l", "a/b", vec![1.0f64, 2.0]);
        assert_eq!(
            src.read_array("gt1l", "a/b").unwrap(),
            ColumnData::F64(vec![1.0, 2.0])
        );
        assert!(matches!(
            src.read_array("gt2l", "a/b"),
            Err(ReaderError::GroupNotFound(_))
        ));
        assert!(matches!(
            src.read_array("gt1l", "a/c"),
            Err(ReaderError::VariableNotFound { .. })
        ));
    }
}
