//! Granule discovery.
//!
//! Turns a collection and bounding box into granule locators, either through
//! a CMR granule search or from a plain list of URLs.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

use subset_common::{AccessMode, BoundingBox, GranuleLinks, GranuleLocator};

/// Largest page CMR serves.
pub const MAX_PAGE_SIZE: usize = 2000;

const DATA_REL: &str = "http://esipfed.org/ns/fedsearch/1.1/data#";

/// One granule search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub collection_concept_id: String,
    pub bbox: BoundingBox,
    /// Maximum granules to return; negative means all.
    pub count: i64,
}

impl SearchRequest {
    fn limit(&self) -> Option<usize> {
        usize::try_from(self.count).ok()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    feed: Feed,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(default)]
    rel: String,
    href: String,
    #[serde(default)]
    inherited: bool,
}

/// CMR granule search client.
#[derive(Debug, Clone)]
pub struct CmrClient {
    client: Client,
    base_url: String,
    page_size: usize,
}

impl CmrClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_size: MAX_PAGE_SIZE,
        })
    }

    /// Granules requested per page, at most [`MAX_PAGE_SIZE`].
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Search for granules, following pages until `count` granules are found
    /// or the results run out.
    #[instrument(skip(self, request), fields(collection = %request.collection_concept_id))]
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<GranuleLinks>> {
        let limit = request.limit();
        let page_size = limit.map_or(self.page_size, |l| l.clamp(1, self.page_size));
        let url = format!("{}/search/granules.json", self.base_url);

        let mut granules: Vec<GranuleLinks> = Vec::new();
        if limit == Some(0) {
            return Ok(granules);
        }

        let mut page_num = 1usize;
        loop {
            debug!(url = %url, page = page_num, "Searching granules");

            let response = self
                .client
                .get(&url)
                .query(&[
                    ("collection_concept_id", request.collection_concept_id.clone()),
                    ("bounding_box", request.bbox.to_csv()),
                    ("page_size", page_size.to_string()),
                    ("page_num", page_num.to_string()),
                ])
                .send()
                .await
                .with_context(|| format!("Granule search request failed: {}", url))?;

            if !response.status().is_success() {
                return Err(anyhow!("Granule search failed: {}", response.status()));
            }

            let page: SearchResponse = response
                .json()
                .await
                .context("Failed to decode granule search response")?;
            let returned = page.feed.entry.len();

            for entry in &page.feed.entry {
                let links = links_of(entry);
                if links.direct.is_empty() && links.external.is_empty() {
                    debug!(granule = %entry.title, "Granule has no data links");
                }
                granules.push(links);
            }

            if let Some(limit) = limit {
                if granules.len() >= limit {
                    granules.truncate(limit);
                    break;
                }
            }
            if returned < page_size {
                break;
            }
            page_num += 1;
        }

        info!(count = granules.len(), "Found granules");
        Ok(granules)
    }
}

/// Data links of one search entry, split by scheme.
fn links_of(entry: &Entry) -> GranuleLinks {
    let mut links = GranuleLinks::default();
    for link in entry.links.iter().filter(|l| l.rel == DATA_REL && !l.inherited) {
        if link.href.starts_with("s3://") {
            links.direct.push(link.href.clone());
        } else if link.href.starts_with("https://") || link.href.starts_with("http://") {
            links.external.push(link.href.clone());
        }
    }
    links
}

/// Flatten the links of every granule into locators for `mode`.
pub fn locators(granules: &[GranuleLinks], mode: AccessMode) -> Vec<GranuleLocator> {
    granules.iter().flat_map(|g| g.locators(mode)).collect()
}

/// Read one URL per line; blank lines and `#` comments are skipped.
pub fn read_url_list(path: &Path, mode: AccessMode) -> Result<Vec<GranuleLocator>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list: {}", path.display()))?;
    Ok(parse_url_list(&content, mode))
}

fn parse_url_list(content: &str, mode: AccessMode) -> Vec<GranuleLocator> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|url| GranuleLocator::new(url, mode))
        .collect()
}
