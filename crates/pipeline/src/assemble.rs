//! Building point-referenced rows from extracted arrays.

use granule_reader::ColumnData;
use subset_common::{SubsetError, SubsetResult};

use crate::table::{Column, Point, PointTable};

/// One row per index: geometry from `lon[i]`/`lat[i]`, each column's value at
/// `i`, and the group name.
///
/// Coordinates are widened to f64 for the geometry only; column values keep
/// their element type.
pub fn assemble(
    group: &str,
    lon: &ColumnData,
    lat: &ColumnData,
    columns: Vec<(String, ColumnData)>,
) -> SubsetResult<PointTable> {
    let rows = lon.len();
    if lat.len() != rows {
        return Err(shape(group, "latitude", rows, lat.len()));
    }
    if let Some((name, data)) = columns.iter().find(|(_, data)| data.len() != rows) {
        return Err(shape(group, name, rows, data.len()));
    }

    let geometry = lon
        .to_f64_vec()
        .into_iter()
        .zip(lat.to_f64_vec())
        .map(|(x, y)| Point::new(x, y))
        .collect();

    let columns = columns
        .into_iter()
        .map(|(name, data)| Column { name, data })
        .collect();

    Ok(PointTable::for_group(group, geometry, columns))
}

fn shape(group: &str, path: &str, expected: usize, actual: usize) -> SubsetError {
    SubsetError::Shape {
        group: group.to_string(),
        path: path.to_string(),
        expected,
        actual,
    }
}
