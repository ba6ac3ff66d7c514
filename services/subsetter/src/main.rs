//! Granule subsetter.
//!
//! Searches the catalog for granules intersecting the configured bounding
//! box, subsets them in parallel and writes the merged rows as GeoParquet.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use subset_common::{AccessMode, BoundingBox};
use subsetter::discovery::{locators, read_url_list};
use subsetter::{CmrClient, Parameters, SearchRequest, Settings, SubsetJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "subsetter")]
#[command(about = "Subset remote HDF5 granules to a bounding box and merge them into GeoParquet")]
struct Args {
    /// Number of granules in the area of interest to subset (-1 for all)
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    count: i64,

    /// Worker threads (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Use S3 URLs rather than HTTPS URLs
    #[arg(long)]
    s3: bool,

    /// YAML parameters file (default: built-in ATL06 land-ice subset)
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Override the bounding box: min_lon,min_lat,max_lon,max_lat
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<String>,

    /// Read granule URLs from a file instead of searching the catalog
    #[arg(long)]
    urls_file: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// File to write GeoParquet results to (e.g. subset.parquet)
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format)?;

    let mut parameters = match &args.parameters {
        Some(path) => Parameters::load(path)?,
        None => Parameters::atl06()?,
    };
    if let Some(bbox) = &args.bbox {
        let bbox = BoundingBox::from_csv(bbox).context("Invalid --bbox")?;
        bbox.validate()?;
        parameters.bbox = bbox;
    }
    let settings = Settings::from_env()?;
    let mode = if args.s3 {
        AccessMode::Direct
    } else {
        AccessMode::External
    };

    info!(
        collection = %parameters.collection_concept_id,
        bbox = %parameters.bbox.to_csv(),
        mode = %mode,
        "Starting granule subsetter"
    );

    let granules = match &args.urls_file {
        Some(path) => {
            let mut urls = read_url_list(path, mode)?;
            if let Ok(limit) = usize::try_from(args.count) {
                urls.truncate(limit);
            }
            urls
        }
        None => {
            let client = CmrClient::new(&settings.cmr_url)?;
            let request = SearchRequest {
                collection_concept_id: parameters.collection_concept_id.clone(),
                bbox: parameters.bbox,
                count: args.count,
            };
            locators(&client.search(&request).await?, mode)
        }
    };

    if granules.is_empty() {
        warn!("No granules to subset");
    }

    let job = SubsetJob {
        locators: granules,
        mode,
        parameters,
        settings,
        workers: args.workers,
        output: args.output,
    };
    let report = job.execute().await?;

    print!("{}", report.summary);
    println!(
        "Wrote {} rows ({} columns, {} bytes)",
        report.written.rows, report.written.columns, report.written.bytes
    );

    Ok(())
}

/// Install the global subscriber. `RUST_LOG`, when set, overrides `level`.
fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}
