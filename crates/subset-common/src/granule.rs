//! Granule locators produced by discovery and consumed by workers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which URL variant of a granule to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// In-region object storage (`s3://...`) with temporary keys.
    Direct,
    /// HTTPS distribution endpoint with a bearer token.
    #[default]
    External,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Direct => "direct",
            AccessMode::External => "external",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "s3" => Ok(AccessMode::Direct),
            "external" | "https" | "http" => Ok(AccessMode::External),
            other => Err(format!("unknown access mode '{}'", other)),
        }
    }
}

/// A single remote granule to subset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GranuleLocator {
    pub url: String,
    pub mode: AccessMode,
}

impl GranuleLocator {
    pub fn new(url: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            url: url.into(),
            mode,
        }
    }

    /// Build a locator, inferring the mode from the URL scheme.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let mode = if url.starts_with("s3://") {
            AccessMode::Direct
        } else {
            AccessMode::External
        };
        Self { url, mode }
    }
}

impl fmt::Display for GranuleLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Both URL variants a catalog reports for one granule data file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranuleLinks {
    pub direct: Vec<String>,
    pub external: Vec<String>,
}

impl GranuleLinks {
    /// Locators for the requested access mode.
    pub fn locators(&self, mode: AccessMode) -> Vec<GranuleLocator> {
        let urls = match mode {
            AccessMode::Direct => &self.direct,
            AccessMode::External => &self.external,
        };
        urls.iter()
            .map(|url| GranuleLocator::new(url.clone(), mode))
            .collect()
    }
}
