//! Per-granule processing.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use granule_reader::{ColumnData, HierarchicalSource, MemorySource, NetCdfGranule, ReaderResult};
use storage::{PublishedFile, RangeServer, RemoteAccessor};
use subset_common::{
    BoundingBox, GranuleError, GranuleLocator, SubsetError, SubsetResult, VariableSpec,
};
use tracing::{debug, info, warn};

use crate::assemble::assemble;
use crate::clip::clip;
use crate::extract::{extract_group, reader_error};
use crate::table::PointTable;

/// Opens a granule as a hierarchical source.
///
/// Shared by every worker thread, so implementations must be `Send + Sync`.
pub trait GranuleOpener: Send + Sync {
    fn open(&self, locator: &GranuleLocator) -> SubsetResult<Box<dyn HierarchicalSource>>;
}

/// Opens granules through the remote accessor and the native HDF5 reader.
///
/// Each granule is published on a loopback [`RangeServer`] and opened in
/// libnetcdf's byte-range mode, so only the blocks HDF5 asks for travel
/// through the accessor's cache. When a ranged open fails but staging the
/// same object succeeds, the linked libnetcdf lacks byte-range support and
/// every later granule is staged whole.
pub struct RemoteGranuleOpener {
    accessor: RemoteAccessor,
    ranges: Option<RangeServer>,
    ranged: AtomicBool,
}

impl RemoteGranuleOpener {
    /// Starts the range server on the accessor's runtime.
    pub fn new(accessor: RemoteAccessor) -> Self {
        let ranges = match RangeServer::start(accessor.handle()) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!(error = %e, "Byte-range reads unavailable; granules will be staged");
                None
            }
        };
        Self {
            accessor,
            ranged: AtomicBool::new(ranges.is_some()),
            ranges,
        }
    }

    fn open_ranged(
        &self,
        server: &RangeServer,
        locator: &GranuleLocator,
    ) -> SubsetResult<Box<dyn HierarchicalSource>> {
        let published = server.publish(self.accessor.open(locator)?);

        let ranged_err = match NetCdfGranule::open_url(published.url(), &locator.url) {
            Ok(granule) => {
                return Ok(Box::new(RangedGranule {
                    granule,
                    _published: published,
                }))
            }
            Err(e) => e,
        };
        drop(published);

        let staged = self.open_staged(locator)?;
        if self.ranged.swap(false, Ordering::SeqCst) {
            warn!(
                url = %locator.url,
                error = %ranged_err,
                "Byte-range open failed where staging worked; staging all further granules"
            );
        }
        Ok(staged)
    }

    fn open_staged(&self, locator: &GranuleLocator) -> SubsetResult<Box<dyn HierarchicalSource>> {
        let mut file = self.accessor.open(locator)?;
        let granule =
            NetCdfGranule::from_reader(&mut file, &locator.url).map_err(|e| reader_error("", e))?;
        Ok(Box::new(granule))
    }
}

impl GranuleOpener for RemoteGranuleOpener {
    fn open(&self, locator: &GranuleLocator) -> SubsetResult<Box<dyn HierarchicalSource>> {
        match &self.ranges {
            Some(server) if self.ranged.load(Ordering::SeqCst) => {
                self.open_ranged(server, locator)
            }
            _ => self.open_staged(locator),
        }
    }
}

/// A granule read over byte ranges, holding its loopback URL open.
struct RangedGranule {
    // Declared first so libnetcdf closes before the URL is withdrawn.
    granule: NetCdfGranule,
    _published: PublishedFile,
}

impl HierarchicalSource for RangedGranule {
    fn read_array(&self, group: &str, path: &str) -> ReaderResult<ColumnData> {
        self.granule.read_array(group, path)
    }

    fn name(&self) -> &str {
        self.granule.name()
    }
}

/// Serves pre-built in-memory granules keyed by URL.
///
/// URLs with no entry fail with an access error, like a missing object.
#[derive(Debug, Clone, Default)]
pub struct MemoryGranuleOpener {
    granules: HashMap<String, MemorySource>,
}

impl MemoryGranuleOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_granule(mut self, url: impl Into<String>, source: MemorySource) -> Self {
        self.granules.insert(url.into(), source);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, source: MemorySource) {
        self.granules.insert(url.into(), source);
    }
}

impl GranuleOpener for MemoryGranuleOpener {
    fn open(&self, locator: &GranuleLocator) -> SubsetResult<Box<dyn HierarchicalSource>> {
        self.granules
            .get(&locator.url)
            .cloned()
            .map(|s| Box::new(s) as Box<dyn HierarchicalSource>)
            .ok_or_else(|| SubsetError::access_msg(format!("object not found: {}", locator.url)))
    }
}

/// Open, extract every group, assemble, concatenate, clip.
///
/// Any failure, panics included, comes back as a [`GranuleError`] naming the
/// granule.
pub fn process(
    opener: &dyn GranuleOpener,
    locator: &GranuleLocator,
    spec: &VariableSpec,
    bbox: &BoundingBox,
) -> Result<PointTable, GranuleError> {
    info!("Reading {}", locator.url);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        process_granule(opener, locator, spec, bbox)
    }));

    match outcome {
        Ok(Ok(table)) => {
            info!(rows = table.len(), "Selected {} rows from {}", table.len(), locator.url);
            Ok(table)
        }
        Ok(Err(err)) => Err(GranuleError::from_error(&locator.url, &err)),
        Err(payload) => Err(GranuleError::panicked(
            &locator.url,
            format!("worker panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

fn process_granule(
    opener: &dyn GranuleOpener,
    locator: &GranuleLocator,
    spec: &VariableSpec,
    bbox: &BoundingBox,
) -> SubsetResult<PointTable> {
    // One open per granule, reused for every group.
    let source = opener.open(locator)?;

    let mut granule = PointTable::empty();
    for group in spec.groups() {
        let arrays = extract_group(source.as_ref(), group, spec)?;
        let table = assemble(group, &arrays.lon, &arrays.lat, arrays.columns)?;
        debug!(url = %locator.url, group = %group, rows = table.len(), "Assembled group");
        granule.append(table)?;
    }

    Ok(clip(&granule, bbox))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subset_common::GranuleErrorKind;

    const LON: &str = "seg/longitude";
    const LAT: &str = "seg/latitude";

    fn spec() -> VariableSpec {
        VariableSpec::new(vec!["gt1l", "gt2l"], LON, LAT, vec!["seg/h"]).unwrap()
    }

    fn granule() -> MemorySource {
        MemorySource::new("a.h5")
            .with_array("gt1l", LON, vec![0.5f64, 5.0])
            .with_array("gt1l", LAT, vec![0.5f64, 5.0])
            .with_array("gt1l", "seg/h", vec![1.0f32, 2.0])
            .with_array("gt2l", LON, vec![0.25f64])
            .with_array("gt2l", LAT, vec![0.75f64])
            .with_array("gt2l", "seg/h", vec![3.0f32])
    }

    #[test]
    fn test_groups_concatenated_then_clipped() {
        let opener = MemoryGranuleOpener::new().with_granule("mem://a.h5", granule());
        let table = process(
            &opener,
            &GranuleLocator::from_url("mem://a.h5"),
            &spec(),
            &BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.groups().collect::<Vec<_>>(), vec!["gt1l", "gt2l"]);
        assert_eq!(table.column("h"), Some(&ColumnData::F32(vec![1.0, 3.0])));
    }

    #[test]
    fn test_missing_granule_is_access_failure() {
        let opener = MemoryGranuleOpener::new();
        let err = process(
            &opener,
            &GranuleLocator::from_url("mem://absent.h5"),
            &spec(),
            &BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        )
        .unwrap_err();

        assert_eq!(err.kind, GranuleErrorKind::Access);
        assert_eq!(err.url, "mem://absent.h5");
    }

    struct PanickingSource;

    impl HierarchicalSource for PanickingSource {
        fn read_array(&self, _group: &str, _path: &str) -> ReaderResult<ColumnData> {
            panic!("corrupt chunk index");
        }

        fn name(&self) -> &str {
            "panic.h5"
        }
    }

    struct PanickingOpener;

    impl GranuleOpener for PanickingOpener {
        fn open(&self, _locator: &GranuleLocator) -> SubsetResult<Box<dyn HierarchicalSource>> {
            Ok(Box::new(PanickingSource))
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let err = process(
            &PanickingOpener,
            &GranuleLocator::from_url("mem://panic.h5"),
            &spec(),
            &BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        )
        .unwrap_err();

        assert_eq!(err.kind, GranuleErrorKind::Internal);
        assert!(err.message.contains("corrupt chunk index"));
    }
}
