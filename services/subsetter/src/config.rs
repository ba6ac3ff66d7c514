//! Subsetter configuration.
//!
//! Two layers:
//! - [`Parameters`]: what to subset (collection, bounding box, groups and
//!   variables), loaded from a YAML file or the built-in ATL06 defaults.
//! - [`Settings`]: how to reach the data (token, endpoints, cache tuning),
//!   read from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use storage::config::DEFAULT_BLOCK_SIZE;
use storage::{AccessConfig, CacheStrategy, Credentials, DEFAULT_CREDENTIALS_URL};
use subset_common::{AccessMode, BoundingBox, VariableSpec};

/// ATL06 land-ice height collection (release 006).
pub const ATL06_COLLECTION: &str = "C2670138092-NSIDC_CPRD";

/// Default catalog endpoint.
pub const DEFAULT_CMR_URL: &str = "https://cmr.earthdata.nasa.gov";

const ATL06_GROUPS: [&str; 6] = ["gt1l", "gt1r", "gt2l", "gt2r", "gt3l", "gt3r"];
const ATL06_LON: &str = "land_ice_segments/longitude";
const ATL06_LAT: &str = "land_ice_segments/latitude";
const ATL06_VARIABLES: [&str; 17] = [
    "land_ice_segments/atl06_quality_summary",
    "land_ice_segments/delta_time",
    "land_ice_segments/fit_statistics/dh_fit_dx",
    "land_ice_segments/fit_statistics/h_robust_sprd",
    "land_ice_segments/fit_statistics/n_fit_photons",
    "land_ice_segments/fit_statistics/w_surface_window_final",
    "land_ice_segments/geophysical/bsnow_conf",
    "land_ice_segments/geophysical/bsnow_h",
    "land_ice_segments/geophysical/r_eff",
    "land_ice_segments/geophysical/tide_ocean",
    "land_ice_segments/ground_track/seg_azimuth",
    "land_ice_segments/ground_track/x_atc",
    "land_ice_segments/ground_track/y_atc",
    "land_ice_segments/h_li",
    "land_ice_segments/h_li_sigma",
    "land_ice_segments/segment_id",
    "land_ice_segments/sigma_geo_h",
];

// ============================================================================
// Parameters (YAML)
// ============================================================================

/// A validated subset request.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub collection_concept_id: String,
    pub bbox: BoundingBox,
    pub variables: VariableSpec,
}

/// On-disk form. Any omitted key falls back to the ATL06 default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametersFile {
    pub collection_concept_id: String,
    /// [min_lon, min_lat, max_lon, max_lat]
    pub bbox: [f64; 4],
    pub groups: Vec<String>,
    pub lon: String,
    pub lat: String,
    pub variables: Vec<String>,
}

impl Default for ParametersFile {
    fn default() -> Self {
        Self {
            collection_concept_id: ATL06_COLLECTION.to_string(),
            bbox: [-45.38452, 62.63238, -44.61547, 62.98197],
            groups: ATL06_GROUPS.iter().map(|g| g.to_string()).collect(),
            lon: ATL06_LON.to_string(),
            lat: ATL06_LAT.to_string(),
            variables: ATL06_VARIABLES.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl ParametersFile {
    /// Validate into [`Parameters`]. Bad boxes and specs fail here, before
    /// any granule is touched.
    pub fn into_parameters(self) -> Result<Parameters> {
        let [min_lon, min_lat, max_lon, max_lat] = self.bbox;
        let bbox = BoundingBox::new(min_lon, min_lat, max_lon, max_lat);
        bbox.validate()?;

        let variables = VariableSpec::new(self.groups, &self.lon, &self.lat, self.variables)?;

        Ok(Parameters {
            collection_concept_id: self.collection_concept_id,
            bbox,
            variables,
        })
    }
}

impl Parameters {
    /// The built-in ATL06 land-ice subset over south-west Greenland.
    pub fn atl06() -> Result<Self> {
        ParametersFile::default().into_parameters()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: ParametersFile =
            serde_yaml::from_str(yaml).context("Failed to parse parameters")?;
        file.into_parameters()
    }

    /// Load parameters from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid parameters file: {}", path.display()))
    }
}

// ============================================================================
// Settings (environment)
// ============================================================================

/// Transport settings taken from the environment.
#[derive(Clone, PartialEq)]
pub struct Settings {
    /// Earthdata Login bearer token (`EARTHDATA_TOKEN`)
    pub token: Option<String>,
    /// Temporary S3 credentials endpoint (`SUBSET_CREDENTIALS_URL`)
    pub credentials_url: String,
    /// Catalog search endpoint (`SUBSET_CMR_URL`)
    pub cmr_url: String,
    /// `SUBSET_CACHE_STRATEGY`
    pub cache_strategy: CacheStrategy,
    /// `SUBSET_BLOCK_SIZE`, bytes
    pub block_size: usize,
    /// `HTTPS_PROXY`, honored for external access only
    pub proxy_url: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("credentials_url", &self.credentials_url)
            .field("cmr_url", &self.cmr_url)
            .field("cache_strategy", &self.cache_strategy)
            .field("block_size", &self.block_size)
            .field("proxy_url", &self.proxy_url)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            credentials_url: DEFAULT_CREDENTIALS_URL.to_string(),
            cmr_url: DEFAULT_CMR_URL.to_string(),
            cache_strategy: CacheStrategy::Background,
            block_size: DEFAULT_BLOCK_SIZE,
            proxy_url: None,
        }
    }
}

impl Settings {
    /// Load settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let cache_strategy = match get("SUBSET_CACHE_STRATEGY") {
            Some(value) => value
                .parse::<CacheStrategy>()
                .map_err(anyhow::Error::msg)
                .context("Invalid SUBSET_CACHE_STRATEGY")?,
            None => defaults.cache_strategy,
        };

        let block_size = match get("SUBSET_BLOCK_SIZE") {
            Some(value) => value
                .parse::<usize>()
                .with_context(|| format!("Invalid SUBSET_BLOCK_SIZE: {}", value))?,
            None => defaults.block_size,
        };

        Ok(Self {
            token: get("EARTHDATA_TOKEN"),
            credentials_url: get("SUBSET_CREDENTIALS_URL").unwrap_or(defaults.credentials_url),
            cmr_url: get("SUBSET_CMR_URL").unwrap_or(defaults.cmr_url),
            cache_strategy,
            block_size,
            proxy_url: get("HTTPS_PROXY").or_else(|| get("https_proxy")),
        })
    }

    /// Transport configuration for `mode` with already-resolved credentials.
    pub fn access_config(&self, mode: AccessMode, credentials: Credentials) -> AccessConfig {
        let mut config = AccessConfig::default()
            .with_cache(self.cache_strategy, self.block_size)
            .with_credentials(credentials);
        if mode == AccessMode::External {
            config.proxy_url = self.proxy_url.clone();
        }
        config
    }
}
