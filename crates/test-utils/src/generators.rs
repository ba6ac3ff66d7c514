//! Synthetic granule generators.
//!
//! A [`GranuleFixture`] describes a granule as (group, path, array) triples and
//! can be materialised either as an in-memory source or as a real NetCDF-4
//! file on disk, so the same fixture exercises both reader backends.

use std::collections::BTreeMap;
use std::path::Path;

use granule_reader::{ColumnData, MemorySource};

use crate::fixtures::atl06;

/// A synthetic granule.
#[derive(Debug, Clone, Default)]
pub struct GranuleFixture {
    name: String,
    groups: BTreeMap<String, Vec<(String, ColumnData)>>,
}

impl GranuleFixture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an array at `path` below `group`. Intermediate groups are implied.
    pub fn with_array(
        mut self,
        group: impl Into<String>,
        path: impl Into<String>,
        data: impl Into<ColumnData>,
    ) -> Self {
        self.groups
            .entry(group.into())
            .or_default()
            .push((path.into(), data.into()));
        self
    }

    /// Add ATL06-style longitude/latitude arrays for `group`.
    pub fn with_track(self, group: &str, points: &[(f64, f64)]) -> Self {
        let lon: Vec<f64> = points.iter().map(|p| p.0).collect();
        let lat: Vec<f64> = points.iter().map(|p| p.1).collect();
        self.with_array(group, atl06::LON, lon)
            .with_array(group, atl06::LAT, lat)
    }

    pub fn to_memory_source(&self) -> MemorySource {
        let mut source = MemorySource::new(self.name.clone());
        for (group, arrays) in &self.groups {
            for (path, data) in arrays {
                source.insert(group.clone(), path.clone(), data.clone());
            }
        }
        source
    }

    /// Write the fixture as a NetCDF-4 file with nested groups.
    pub fn write_netcdf(&self, path: &Path) -> Result<(), netcdf::Error> {
        let mut file = netcdf::create(path)?;
        for (group, arrays) in &self.groups {
            let tree = GroupTree::build(arrays);
            let mut handle = file.add_group(group)?;
            tree.write(&mut handle)?;
        }
        Ok(())
    }
}

/// Nested group layout derived from slash-separated array paths.
#[derive(Default)]
struct GroupTree<'a> {
    children: BTreeMap<&'a str, GroupTree<'a>>,
    arrays: Vec<(&'a str, &'a ColumnData)>,
}

impl<'a> GroupTree<'a> {
    fn build(arrays: &'a [(String, ColumnData)]) -> Self {
        let mut root = GroupTree::default();
        for (path, data) in arrays {
            let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            let Some(leaf) = segments.pop() else { continue };
            let mut node = &mut root;
            for segment in segments {
                node = node.children.entry(segment).or_default();
            }
            node.arrays.push((leaf, data));
        }
        root
    }

    fn write(&self, group: &mut netcdf::GroupMut<'_>) -> Result<(), netcdf::Error> {
        let mut dims: Vec<usize> = Vec::new();
        for (name, data) in &self.arrays {
            let len = data.len();
            let dim = format!("n{}", len);
            if !dims.contains(&len) {
                group.add_dimension(&dim, len)?;
                dims.push(len);
            }
            write_array(group, name, &dim, data)?;
        }
        for (name, child) in &self.children {
            let mut handle = group.add_group(name)?;
            child.write(&mut handle)?;
        }
        Ok(())
    }
}

fn write_array(
    group: &mut netcdf::GroupMut<'_>,
    name: &str,
    dim: &str,
    data: &ColumnData,
) -> Result<(), netcdf::Error> {
    macro_rules! put {
        ($ty:ty, $values:expr) => {{
            let mut var = group.add_variable::<$ty>(name, &[dim])?;
            if !$values.is_empty() {
                var.put_values($values.as_slice(), ..)?;
            }
        }};
    }

    match data {
        ColumnData::I8(v) => put!(i8, v),
        ColumnData::I16(v) => put!(i16, v),
        ColumnData::I32(v) => put!(i32, v),
        ColumnData::I64(v) => put!(i64, v),
        ColumnData::U8(v) => put!(u8, v),
        ColumnData::U16(v) => put!(u16, v),
        ColumnData::U32(v) => put!(u32, v),
        ColumnData::U64(v) => put!(u64, v),
        ColumnData::F32(v) => put!(f32, v),
        ColumnData::F64(v) => put!(f64, v),
    }
    Ok(())
}

/// An ATL06-like granule: a track per group plus `h_li` (f32),
/// `atl06_quality_summary` (i8) and `segment_id` (i32).
///
/// Values are derived from the row index so tests can predict them:
/// `h_li = 1000 + row`, `segment_id = offset + row`, quality alternates 0/1.
pub fn atl06_granule(
    name: &str,
    groups: &[&str],
    points: &[(f64, f64)],
    segment_offset: i32,
) -> GranuleFixture {
    let mut fixture = GranuleFixture::new(name);
    for group in groups {
        let n = points.len();
        let h_li: Vec<f32> = (0..n).map(|i| 1000.0 + i as f32).collect();
        let quality: Vec<i8> = (0..n).map(|i| (i % 2) as i8).collect();
        let segment_id: Vec<i32> = (0..n).map(|i| segment_offset + i as i32).collect();

        fixture = fixture
            .with_track(group, points)
            .with_array(*group, atl06::H_LI, h_li)
            .with_array(*group, atl06::QUALITY, quality)
            .with_array(*group, atl06::SEGMENT_ID, segment_id);
    }
    fixture
}

/// `n` evenly spaced points on the diagonal from `start` to `end`, inclusive.
pub fn track_between(start: (f64, f64), end: (f64, f64), n: usize) -> Vec<(f64, f64)> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| {
                let t = i as f64 / (n - 1) as f64;
                (
                    start.0 + (end.0 - start.0) * t,
                    start.1 + (end.1 - start.1) * t,
                )
            })
            .collect(),
    }
}
