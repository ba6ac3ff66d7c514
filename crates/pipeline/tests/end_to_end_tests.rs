//! End-to-end: NetCDF-4 granules on disk, read through the remote accessor
//! over `file://` URLs, extracted, clipped and merged.

use std::sync::Arc;

use granule_reader::{ColumnData, HierarchicalSource, NetCdfGranule};
use pipeline::{run, RemoteGranuleOpener, RunOptions};
use storage::{AccessConfig, CacheStrategy, RangeServer, RemoteAccessor};
use subset_common::{BoundingBox, GranuleErrorKind, GranuleLocator, VariableSpec};
use test_utils::{assert_approx_eq, atl06, atl06_granule, bbox, track_between};
use tokio::runtime::Runtime;

fn file_url(path: &std::path::Path) -> String {
    format!("file://{}", path.display())
}

fn spec() -> VariableSpec {
    VariableSpec::new(
        vec!["gt1l", "gt3r"],
        atl06::LON,
        atl06::LAT,
        vec![atl06::H_LI, atl06::SEGMENT_ID],
    )
    .unwrap()
}

#[test]
fn test_netcdf_granules_end_to_end() {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let unit = BoundingBox::from(bbox::UNIT);

    // Granule A: 5 points, 3 inside the unit box
    let a = atl06_granule(
        "A.h5",
        &["gt1l", "gt3r"],
        &[(-0.5, 0.5), (0.0, 0.0), (0.5, 0.5), (1.0, 1.0), (1.5, 0.5)],
        100,
    );
    // Granule B: entirely outside
    let b = atl06_granule(
        "B.h5",
        &["gt1l", "gt3r"],
        &track_between((5.0, 5.0), (6.0, 6.0), 4),
        200,
    );
    // Granule C: missing gt3r, a schema failure
    let c = atl06_granule("C.h5", &["gt1l"], &[(0.5, 0.5)], 300);

    let mut locators = Vec::new();
    for fixture in [&a, &b, &c] {
        let path = dir.path().join(fixture.name());
        fixture.write_netcdf(&path).unwrap();
        locators.push(GranuleLocator::from_url(file_url(&path)));
    }
    // Granule D: not on disk, an access failure
    locators.push(GranuleLocator::from_url(file_url(&dir.path().join("D.h5"))));

    let config = AccessConfig::default().with_cache(CacheStrategy::Background, 4096);
    let accessor = RemoteAccessor::new(config, rt.handle().clone()).unwrap();
    let opener = Arc::new(RemoteGranuleOpener::new(accessor));

    let (table, summary) = run(
        locators,
        opener,
        Arc::new(spec()),
        unit,
        RunOptions::with_workers(2),
    )
    .unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    let mut kinds: Vec<GranuleErrorKind> = summary.failures.iter().map(|f| f.kind).collect();
    kinds.sort_by_key(|k| k.to_string());
    assert_eq!(kinds, vec![GranuleErrorKind::Access, GranuleErrorKind::Schema]);

    // 3 inside points in each of two groups of granule A
    assert_eq!(table.len(), 6);
    assert_eq!(table.column_names(), vec!["h_li", "segment_id"]);

    let mut ids = match table.column("segment_id") {
        Some(ColumnData::I32(ids)) => ids.clone(),
        other => panic!("unexpected segment_id column {:?}", other),
    };
    ids.sort();
    assert_eq!(ids, vec![101, 101, 102, 102, 103, 103]);

    let groups: Vec<&str> = table.groups().collect();
    assert_eq!(groups.iter().filter(|g| **g == "gt1l").count(), 3);
    assert_eq!(groups.iter().filter(|g| **g == "gt3r").count(), 3);

    for point in table.geometry() {
        assert!(point.within(&unit));
    }
    let h_li = match table.column("h_li") {
        Some(ColumnData::F32(h)) => h.clone(),
        other => panic!("unexpected h_li column {:?}", other),
    };
    let mean = h_li.iter().map(|&v| v as f64).sum::<f64>() / h_li.len() as f64;
    // rows 1..=3 of each track: 1001, 1002, 1003
    assert_approx_eq!(mean, 1002.0, 1e-6);
}

#[test]
fn test_byte_range_read_skips_unrequested_arrays() {
    let rt = Runtime::new().unwrap();
    let dir = tempfile::tempdir().unwrap();

    // 4 MB of an array nobody asks for next to a small track.
    let track = track_between((0.0, 0.0), (1.0, 1.0), 100);
    let fixture = atl06_granule("big.h5", &["gt1l"], &track, 0).with_array(
        "gt1l",
        "land_ice_segments/fit_statistics/dh_fit_dx",
        vec![0.5f64; 500_000],
    );
    let path = dir.path().join(fixture.name());
    fixture.write_netcdf(&path).unwrap();
    let locator = GranuleLocator::from_url(file_url(&path));

    let config = AccessConfig::default().with_cache(CacheStrategy::Blocks, 64 * 1024);
    let accessor = RemoteAccessor::new(config, rt.handle().clone()).unwrap();
    let server = RangeServer::start(accessor.handle()).unwrap();
    let published = server.publish(accessor.open(&locator).unwrap());

    let granule = NetCdfGranule::open_url(published.url(), &locator.url).unwrap();
    let h_li = granule.read_array("gt1l", atl06::H_LI).unwrap();
    let lon = granule.read_array("gt1l", atl06::LON).unwrap();
    assert_eq!(h_li.len(), 100);
    assert_eq!(lon.len(), 100);
    drop(granule);

    let stats = published.stats();
    assert!(stats.requests > 0);
    assert!(
        stats.bytes_fetched < published.len() / 4,
        "fetched {} of {} bytes",
        stats.bytes_fetched,
        published.len()
    );
}
