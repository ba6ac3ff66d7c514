//! Point-referenced tables.
//!
//! One type serves for a single group's rows, a whole granule's rows and the
//! merged result: a geometry column, a source-group column and named value
//! columns that keep their on-disk element type.

use std::sync::Arc;

use granule_reader::{ColumnData, DataType};
use subset_common::{BoundingBox, SubsetError, SubsetResult};

/// A longitude/latitude point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Closed-interval containment; NaN coordinates are never inside.
    pub fn within(&self, bbox: &BoundingBox) -> bool {
        bbox.contains_point(self.lon, self.lat)
    }
}

/// A named value column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Rows of (geometry, group, values...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTable {
    geometry: Vec<Point>,
    groups: Vec<Arc<str>>,
    columns: Vec<Column>,
}

impl PointTable {
    /// A table with no rows and no columns; adopts the schema of the first
    /// non-trivial table appended to it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table for one group: every row tagged with `group`.
    ///
    /// Columns must already have one element per point.
    pub(crate) fn for_group(group: &str, geometry: Vec<Point>, columns: Vec<Column>) -> Self {
        let tag: Arc<str> = Arc::from(group);
        let groups = vec![tag; geometry.len()];
        Self {
            geometry,
            groups,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    pub fn geometry(&self) -> &[Point] {
        &self.geometry
    }

    /// Source group of each row.
    pub fn groups(&self) -> impl ExactSizeIterator<Item = &str> {
        self.groups.iter().map(|g| g.as_ref())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.data)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// New table holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            geometry: indices.iter().map(|&i| self.geometry[i]).collect(),
            groups: indices.iter().map(|&i| Arc::clone(&self.groups[i])).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(indices),
                })
                .collect(),
        }
    }

    /// Append all rows of `other`.
    ///
    /// Both tables must carry the same column names in the same order, unless
    /// `self` has never held a schema, in which case it adopts `other`'s. A
    /// column whose element types differ is promoted to their common type
    /// ([`DataType::common`]), so the merged table does not depend on which
    /// side arrived first. On error `self` is unchanged.
    pub fn append(&mut self, other: PointTable) -> SubsetResult<()> {
        if self.columns.is_empty() && self.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.columns.is_empty() && other.is_empty() {
            return Ok(());
        }

        self.check_compatible(&other)?;

        self.geometry.extend(other.geometry);
        self.groups.extend(other.groups);
        for (mine, theirs) in self.columns.iter_mut().zip(other.columns) {
            let dtype: DataType = mine.data.dtype().common(theirs.data.dtype());
            if mine.data.dtype() != dtype {
                let data = std::mem::replace(&mut mine.data, ColumnData::F64(Vec::new()));
                mine.data = data.cast(dtype);
            }
            mine.data
                .append(theirs.data.cast(dtype))
                .map_err(|(a, b)| incompatible(&mine.name, &a.to_string(), &b.to_string()))?;
        }
        Ok(())
    }

    fn check_compatible(&self, other: &PointTable) -> SubsetResult<()> {
        if self.column_names() != other.column_names() {
            return Err(SubsetError::Schema {
                group: other.groups.first().map(|g| g.to_string()).unwrap_or_default(),
                message: format!(
                    "column set {:?} does not match {:?}",
                    other.column_names(),
                    self.column_names()
                ),
            });
        }
        Ok(())
    }

    /// Row `index` rendered as `group|lon|lat|v1|v2...`, for logging and for
    /// order-independent comparisons of result tables.
    pub fn row_key(&self, index: usize) -> Option<String> {
        let point = self.geometry.get(index)?;
        let mut key = format!("{}|{}|{}", self.groups[index], point.lon, point.lat);
        for column in &self.columns {
            key.push('|');
            key.push_str(&column.data.format_value(index)?);
        }
        Some(key)
    }
}

fn incompatible(column: &str, expected: &str, actual: &str) -> SubsetError {
    SubsetError::Schema {
        group: String::new(),
        message: format!(
            "column '{}' has type {}, expected {}",
            column, actual, expected
        ),
    }
}
