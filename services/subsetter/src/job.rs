//! One subset run: credentials, transport, pipeline, output.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

use output::{write_geoparquet, WriteStats};
use pipeline::{run, RemoteGranuleOpener, RunOptions, RunSummary};
use storage::{resolve_credentials, RemoteAccessor};
use subset_common::{AccessMode, GranuleLocator};

use crate::config::{Parameters, Settings};

/// Everything needed to subset a resolved list of granules.
#[derive(Debug, Clone)]
pub struct SubsetJob {
    pub locators: Vec<GranuleLocator>,
    pub mode: AccessMode,
    pub parameters: Parameters,
    pub settings: Settings,
    pub workers: Option<usize>,
    pub output: PathBuf,
}

/// What a finished job produced.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub summary: RunSummary,
    pub written: WriteStats,
}

impl SubsetJob {
    /// Run the job on the current tokio runtime.
    ///
    /// The pipeline itself is synchronous and runs on a blocking thread; its
    /// remote reads come back to this runtime through the captured handle.
    pub async fn execute(self) -> Result<JobReport> {
        let credentials = resolve_credentials(
            self.mode,
            &self.settings.credentials_url,
            self.settings.token.as_deref(),
        )
        .await
        .context("Failed to obtain credentials")?;

        let config = self.settings.access_config(self.mode, credentials);
        let accessor = RemoteAccessor::new(config, Handle::current())?;
        let opener = Arc::new(RemoteGranuleOpener::new(accessor));

        info!(
            granules = self.locators.len(),
            mode = %self.mode,
            "Subsetting {} granule(s)",
            self.locators.len()
        );

        let spec = Arc::new(self.parameters.variables);
        let bbox = self.parameters.bbox;
        let options = RunOptions {
            workers: self.workers,
        };
        let locators = self.locators;

        let (table, summary) =
            tokio::task::spawn_blocking(move || run(locators, opener, spec, bbox, options))
                .await
                .context("Subset task failed")??;

        info!("Writing results to {}", self.output.display());
        let output = self.output.clone();
        let written = tokio::task::spawn_blocking(move || write_geoparquet(&table, &output))
            .await
            .context("Write task failed")?
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        Ok(JobReport { summary, written })
    }
}
