//! Spatial clipping.

use subset_common::BoundingBox;

use crate::table::PointTable;

/// Keep rows whose point lies inside `bbox` (closed on both axes).
///
/// An empty result is valid; the schema is kept.
pub fn clip(table: &PointTable, bbox: &BoundingBox) -> PointTable {
    let keep: Vec<usize> = table
        .geometry()
        .iter()
        .enumerate()
        .filter(|(_, point)| point.within(bbox))
        .map(|(i, _)| i)
        .collect();

    table.take(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use granule_reader::ColumnData;

    fn table(points: &[(f64, f64)]) -> PointTable {
        let ids: Vec<u32> = (0..points.len() as u32).collect();
        assemble(
            "gt1l",
            &ColumnData::F64(points.iter().map(|p| p.0).collect()),
            &ColumnData::F64(points.iter().map(|p| p.1).collect()),
            vec![("id".into(), ids.into())],
        )
        .unwrap()
    }

    #[test]
    fn test_boundary_points_kept() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let clipped = clip(
            &table(&[(0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (1.0, 0.0), (0.5, 0.5)]),
            &bbox,
        );
        assert_eq!(clipped.len(), 5);
    }

    #[test]
    fn test_outside_points_dropped() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let clipped = clip(
            &table(&[(-0.1, 0.5), (0.5, 0.5), (0.5, 1.0001), (2.0, 2.0)]),
            &bbox,
        );
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped.column("id"), Some(&ColumnData::U32(vec![1])));
    }

    #[test]
    fn test_nan_never_inside() {
        let bbox = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
        let clipped = clip(&table(&[(f64::NAN, 0.0), (0.0, f64::NAN), (0.0, 0.0)]), &bbox);
        assert_eq!(clipped.len(), 1);
    }

    #[test]
    fn test_all_outside_is_empty_with_schema() {
        let bbox = BoundingBox::new(10.0, 10.0, 11.0, 11.0);
        let clipped = clip(&table(&[(0.0, 0.0)]), &bbox);
        assert!(clipped.is_empty());
        assert_eq!(clipped.column_names(), vec!["id"]);
    }
}
