//! Common test fixtures for granule subsetting tests.
//!
//! Values mirror the ATL06 land-ice product so fixtures read like the real
//! thing, but nothing here requires network access.

/// Common bounding box definitions for testing.
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// Patch of the south-west Greenland ice sheet
    pub const GREENLAND: (f64, f64, f64, f64) = (-45.38452, 62.63238, -44.61547, 62.98197);

    /// Unit square at the origin, convenient for hand-computed cases
    pub const UNIT: (f64, f64, f64, f64) = (0.0, 0.0, 1.0, 1.0);

    /// Single point (degenerate bbox)
    pub const POINT: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 0.0);

    /// Invalid bbox (min > max)
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 10.0, 5.0, 5.0);
}

/// ATL06 layout: ground-track groups and land-ice segment datasets.
pub mod atl06 {
    use subset_common::VariableSpec;

    /// The six ground tracks (three beam pairs)
    pub const GROUPS: [&str; 6] = ["gt1l", "gt1r", "gt2l", "gt2r", "gt3l", "gt3r"];

    pub const LON: &str = "land_ice_segments/longitude";
    pub const LAT: &str = "land_ice_segments/latitude";

    pub const H_LI: &str = "land_ice_segments/h_li";
    pub const H_LI_SIGMA: &str = "land_ice_segments/h_li_sigma";
    pub const QUALITY: &str = "land_ice_segments/atl06_quality_summary";
    pub const SEGMENT_ID: &str = "land_ice_segments/segment_id";
    pub const X_ATC: &str = "land_ice_segments/ground_track/x_atc";

    /// Small spec over two tracks with mixed dtypes
    pub fn small_spec() -> VariableSpec {
        VariableSpec::new(
            vec!["gt1l".into(), "gt2l".into()],
            LON,
            LAT,
            vec![H_LI.into(), QUALITY.into(), SEGMENT_ID.into()],
        )
        .expect("static spec is valid")
    }
}

/// Common granule URLs for testing.
pub mod urls {
    pub const HTTPS: &str = "https://data.nsidc.earthdatacloud.nasa.gov/nsidc-cumulus-prod-protected/ATLAS/ATL06/006/2019/01/12/ATL06_20190112054413_02150205_006_02.h5";

    pub const S3: &str = "s3://nsidc-cumulus-prod-protected/ATLAS/ATL06/006/2019/01/12/ATL06_20190112054413_02150205_006_02.h5";

    /// Synthetic URL for granule `index`, used as a label by in-memory sources
    pub fn synthetic(index: usize) -> String {
        format!("memory://granules/ATL06_{:04}.h5", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_spec_shape() {
        let spec = atl06::small_spec();
        assert_eq!(spec.groups().len(), 2);
        assert_eq!(spec.variables().len(), 3);
    }

    #[test]
    fn test_greenland_bbox_is_ordered() {
        let (min_lon, min_lat, max_lon, max_lat) = bbox::GREENLAND;
        assert!(min_lon < max_lon);
        assert!(min_lat < max_lat);
    }

    #[test]
    fn test_synthetic_urls_unique() {
        assert_ne!(urls::synthetic(1), urls::synthetic(2));
        assert!(urls::synthetic(7).ends_with("0007.h5"));
    }
}
