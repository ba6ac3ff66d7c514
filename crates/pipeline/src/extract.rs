//! Reading the requested arrays of one group.

use granule_reader::{ColumnData, HierarchicalSource, ReaderError};
use subset_common::{SubsetError, SubsetResult, VariablePath, VariableSpec};
use tracing::debug;

/// Arrays read for one group, all of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupArrays {
    pub lon: ColumnData,
    pub lat: ColumnData,
    /// Basename -> array, in first-declaration order. A later path with the
    /// same basename replaces the earlier array in place.
    pub columns: Vec<(String, ColumnData)>,
}

impl GroupArrays {
    pub fn row_count(&self) -> usize {
        self.lon.len()
    }
}

/// Read longitude, latitude and every variable of `spec` inside `group`.
///
/// The longitude array fixes the group's row count; any other array of a
/// different length is a shape error. Either every array resolves or the
/// whole group fails.
pub fn extract_group<S>(source: &S, group: &str, spec: &VariableSpec) -> SubsetResult<GroupArrays>
where
    S: HierarchicalSource + ?Sized,
{
    let lon = read(source, group, spec.lon())?;
    let rows = lon.len();

    let lat = read(source, group, spec.lat())?;
    check_len(group, spec.lat(), rows, &lat)?;

    let mut columns: Vec<(String, ColumnData)> = Vec::with_capacity(spec.variables().len());
    for path in spec.variables() {
        let data = read(source, group, path)?;
        check_len(group, path, rows, &data)?;

        match columns.iter_mut().find(|(name, _)| *name == path.basename) {
            Some(slot) => slot.1 = data,
            None => columns.push((path.basename.clone(), data)),
        }
    }

    debug!(
        source = source.name(),
        group = group,
        rows = rows,
        columns = columns.len(),
        "Extracted group"
    );

    Ok(GroupArrays { lon, lat, columns })
}

fn read<S>(source: &S, group: &str, path: &VariablePath) -> SubsetResult<ColumnData>
where
    S: HierarchicalSource + ?Sized,
{
    source
        .read_array(group, &path.path)
        .map_err(|e| reader_error(group, e))
}

fn check_len(
    group: &str,
    path: &VariablePath,
    expected: usize,
    data: &ColumnData,
) -> SubsetResult<()> {
    if data.len() != expected {
        return Err(SubsetError::Shape {
            group: group.to_string(),
            path: path.path.clone(),
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Classify a reader failure: layout problems are schema errors, anything
/// else means the file itself could not be read.
pub(crate) fn reader_error(group: &str, err: ReaderError) -> SubsetError {
    if err.is_schema() {
        SubsetError::schema(group, err.to_string())
    } else {
        SubsetError::access("failed to read granule", err)
    }
}
