//! Tests for the parallel orchestrator over in-memory granules.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use granule_reader::{ColumnData, DataType, HierarchicalSource, MemorySource};
use pipeline::{run, GranuleOpener, MemoryGranuleOpener, PointTable, RunOptions};
use subset_common::{
    BoundingBox, GranuleErrorKind, GranuleLocator, SubsetError, SubsetResult, VariableSpec,
};
use test_utils::{atl06, atl06_granule, bbox, track_between, urls};

fn greenland() -> BoundingBox {
    BoundingBox::from(bbox::GREENLAND)
}

/// Granule `i` crosses the Greenland box diagonally with 20 points per track,
/// half of them inside.
fn crossing_granule(i: usize) -> test_utils::GranuleFixture {
    let (min_lon, min_lat, max_lon, max_lat) = bbox::GREENLAND;
    let width = max_lon - min_lon;
    let height = max_lat - min_lat;
    let shift = i as f64 * 0.001;
    let track = track_between(
        (min_lon - width / 2.0 + shift, min_lat - height / 2.0),
        (max_lon - width / 2.0 + shift, max_lat - height / 2.0),
        20,
    );
    atl06_granule(&urls::synthetic(i), &["gt1l", "gt2l"], &track, (i * 1000) as i32)
}

/// Granule entirely north-east of the Greenland box.
fn outside_granule(i: usize) -> test_utils::GranuleFixture {
    let track = track_between((10.0, 10.0), (11.0, 11.0), 8);
    atl06_granule(&urls::synthetic(i), &["gt1l", "gt2l"], &track, 0)
}

/// [`crossing_granule`] with `h_li` stored as float64 instead of float32.
fn widened_granule(i: usize) -> MemorySource {
    let narrow = crossing_granule(i).to_memory_source();
    let mut wide = MemorySource::new(narrow.name());
    for group in ["gt1l", "gt2l"] {
        for path in [atl06::LON, atl06::LAT, atl06::H_LI, atl06::QUALITY, atl06::SEGMENT_ID] {
            let data = narrow.read_array(group, path).unwrap();
            let data = if path == atl06::H_LI {
                data.cast(DataType::F64)
            } else {
                data
            };
            wide.insert(group, path, data);
        }
    }
    wide
}

fn opener_for(indices: &[usize]) -> MemoryGranuleOpener {
    let mut opener = MemoryGranuleOpener::new();
    for &i in indices {
        opener.insert(urls::synthetic(i), crossing_granule(i).to_memory_source());
    }
    opener
}

fn locators(indices: &[usize]) -> Vec<GranuleLocator> {
    indices
        .iter()
        .map(|&i| GranuleLocator::from_url(urls::synthetic(i)))
        .collect()
}

fn row_keys(table: &PointTable) -> Vec<String> {
    let mut keys: Vec<String> = (0..table.len())
        .map(|i| table.row_key(i).unwrap())
        .collect();
    keys.sort();
    keys
}

fn run_with(
    opener: impl GranuleOpener + 'static,
    indices: &[usize],
    workers: usize,
) -> SubsetResult<(PointTable, pipeline::RunSummary)> {
    run(
        locators(indices),
        Arc::new(opener),
        Arc::new(atl06::small_spec()),
        greenland(),
        RunOptions::with_workers(workers),
    )
}

// ============================================================================
// Merge properties
// ============================================================================

#[test]
fn test_union_of_disjoint_runs() {
    let a = [0, 1, 2, 3];
    let b = [4, 5, 6];
    let all = [0, 1, 2, 3, 4, 5, 6];

    let (ta, _) = run_with(opener_for(&all), &a, 3).unwrap();
    let (tb, _) = run_with(opener_for(&all), &b, 2).unwrap();
    let (tall, summary) = run_with(opener_for(&all), &all, 4).unwrap();

    let mut expected = row_keys(&ta);
    expected.extend(row_keys(&tb));
    expected.sort();

    assert_eq!(row_keys(&tall), expected);
    assert_eq!(summary.succeeded, 7);
    assert_eq!(summary.rows, tall.len());
}

#[test]
fn test_idempotent_runs() {
    let all: Vec<usize> = (0..12).collect();
    let (first, _) = run_with(opener_for(&all), &all, 4).unwrap();
    let (second, _) = run_with(opener_for(&all), &all, 3).unwrap();

    assert!(!first.is_empty());
    assert_eq!(row_keys(&first), row_keys(&second));
}

#[test]
fn test_no_rows_dropped_or_duplicated() {
    let all: Vec<usize> = (0..25).collect();
    let (table, _) = run_with(opener_for(&all), &all, 8).unwrap();

    let (single, _) = run_with(opener_for(&[0]), &[0], 1).unwrap();
    assert_eq!(table.len(), single.len() * 25);

    let keys = row_keys(&table);
    let mut deduped = keys.clone();
    deduped.dedup();
    assert_eq!(keys.len(), deduped.len());
}

#[test]
fn test_result_rows_inside_bbox() {
    let all: Vec<usize> = (0..5).collect();
    let (table, _) = run_with(opener_for(&all), &all, 2).unwrap();
    let bbox = greenland();

    assert!(!table.is_empty());
    for point in table.geometry() {
        assert!(bbox.contains_point(point.lon, point.lat), "{:?}", point);
    }
}

#[test]
fn test_outside_granule_contributes_nothing() {
    let mut opener = opener_for(&[0]);
    opener.insert(urls::synthetic(1), outside_granule(1).to_memory_source());

    let (with_outside, summary) = run_with(opener, &[0, 1], 2).unwrap();
    let (alone, _) = run_with(opener_for(&[0]), &[0], 1).unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(row_keys(&with_outside), row_keys(&alone));
}

#[test]
fn test_original_dtypes_survive_merge() {
    let all = [0, 1, 2];
    let (table, _) = run_with(opener_for(&all), &all, 2).unwrap();

    assert_eq!(table.column_names(), vec!["h_li", "atl06_quality_summary", "segment_id"]);
    assert!(matches!(
        table.column("h_li"),
        Some(granule_reader::ColumnData::F32(_))
    ));
    assert!(matches!(
        table.column("atl06_quality_summary"),
        Some(granule_reader::ColumnData::I8(_))
    ));
}

#[test]
fn test_mixed_dtypes_merge_in_either_order() {
    let mut opener = opener_for(&[0]);
    opener.insert(urls::synthetic(1), widened_granule(1));

    let (narrow, _) = run_with(opener.clone(), &[0], 1).unwrap();
    let (wide, _) = run_with(opener.clone(), &[1], 1).unwrap();
    assert!(matches!(narrow.column("h_li"), Some(ColumnData::F32(_))));
    assert!(matches!(wide.column("h_li"), Some(ColumnData::F64(_))));

    let mut expected = row_keys(&narrow);
    expected.extend(row_keys(&wide));
    expected.sort();

    // One worker and one batch, so completion order follows input order.
    for order in [[0, 1], [1, 0]] {
        let (merged, summary) = run_with(opener.clone(), &order, 1).unwrap();
        assert_eq!(summary.failed, 0, "order {:?}", order);
        assert_eq!(row_keys(&merged), expected, "order {:?}", order);
        assert!(matches!(merged.column("h_li"), Some(ColumnData::F64(_))));
        assert!(matches!(
            merged.column("atl06_quality_summary"),
            Some(ColumnData::I8(_))
        ));
    }
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_access_failure_isolated() {
    // Granule #3 has no backing object
    let opener = opener_for(&[1, 2, 4, 5]);
    let (table, summary) = run_with(opener, &[1, 2, 3, 4, 5], 2).unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].kind, GranuleErrorKind::Access);
    assert_eq!(summary.failures[0].url, urls::synthetic(3));

    let (expected, _) = run_with(opener_for(&[1, 2, 4, 5]), &[1, 2, 4, 5], 2).unwrap();
    assert_eq!(row_keys(&table), row_keys(&expected));
}

#[test]
fn test_schema_violation_isolated() {
    let mut opener = opener_for(&[0, 2]);
    // Granule 1 lacks segment_id in gt2l
    let broken = crossing_granule(1).to_memory_source();
    let mut stripped = granule_reader::MemorySource::new(broken.name());
    for group in ["gt1l", "gt2l"] {
        for path in [atl06::LON, atl06::LAT, atl06::H_LI, atl06::QUALITY] {
            stripped.insert(group, path, broken.read_array(group, path).unwrap());
        }
    }
    stripped.insert(
        "gt1l",
        atl06::SEGMENT_ID,
        broken.read_array("gt1l", atl06::SEGMENT_ID).unwrap(),
    );
    opener.insert(urls::synthetic(1), stripped);

    let (_, summary) = run_with(opener, &[0, 1, 2], 3).unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].kind, GranuleErrorKind::Schema);
    assert!(summary.failures[0].message.contains("gt2l"));
}

#[test]
fn test_all_failures_yield_empty_table() {
    let (table, summary) = run_with(MemoryGranuleOpener::new(), &[0, 1, 2], 2).unwrap();

    assert!(table.is_empty());
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 3);
}

#[test]
fn test_empty_granule_list() {
    let (table, summary) = run_with(MemoryGranuleOpener::new(), &[], 4).unwrap();
    assert!(table.is_empty());
    assert_eq!(summary.total, 0);
}

// ============================================================================
// Run-fatal conditions
// ============================================================================

/// Rejects every open as a configuration problem, counting attempts.
struct MisconfiguredOpener {
    opens: Arc<AtomicUsize>,
}

impl GranuleOpener for MisconfiguredOpener {
    fn open(&self, _locator: &GranuleLocator) -> SubsetResult<Box<dyn HierarchicalSource>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Err(SubsetError::Config("transport rejected credentials".into()))
    }
}

#[test]
fn test_config_failure_stops_dispatch() {
    let opens = Arc::new(AtomicUsize::new(0));
    let opener = MisconfiguredOpener {
        opens: Arc::clone(&opens),
    };

    // One worker, one batch: the first failure must stop the other four.
    let err = run_with(opener, &[0, 1, 2, 3, 4], 1).unwrap_err();

    assert!(matches!(err, SubsetError::Config(ref m) if m.contains("transport rejected")));
    assert_eq!(opens.load(Ordering::SeqCst), 1);
}

#[test]
fn test_invalid_bbox_rejected_before_dispatch() {
    let opens = Arc::new(AtomicUsize::new(0));
    let result = run(
        locators(&[0]),
        Arc::new(MisconfiguredOpener {
            opens: Arc::clone(&opens),
        }),
        Arc::new(atl06::small_spec()),
        BoundingBox::from(bbox::INVALID),
        RunOptions::default(),
    );

    assert!(matches!(result, Err(SubsetError::Config(_))));
    assert_eq!(opens.load(Ordering::SeqCst), 0);
}

#[test]
fn test_zero_workers_rejected() {
    let result = run_with(MemoryGranuleOpener::new(), &[0], 0);
    assert!(matches!(result, Err(SubsetError::Config(_))));
}

#[test]
fn test_spec_without_groups_rejected() {
    let result = VariableSpec::new(Vec::<String>::new(), atl06::LON, atl06::LAT, vec![atl06::H_LI]);
    assert!(matches!(result, Err(SubsetError::Config(_))));
}
