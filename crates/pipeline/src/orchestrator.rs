//! Parallel dispatch and unordered merge.
//!
//! Granules are split into batches and each batch runs as one task on a
//! dedicated rayon pool. Every granule produces exactly one message on a
//! completion channel; the calling thread drains the channel and appends each
//! successful table to the result as it arrives, so completion order never
//! matters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use subset_common::{
    BoundingBox, GranuleError, GranuleErrorKind, GranuleLocator, SubsetError, SubsetResult,
    VariableSpec,
};
use tracing::{error, info, warn};

use crate::summary::RunSummary;
use crate::table::PointTable;
use crate::worker::{process, GranuleOpener};

/// Upper bound on granules per dispatched task.
pub const MAX_BATCH_SIZE: usize = 10;

/// Tunables for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Worker threads; `None` uses the number of available CPUs.
    pub workers: Option<usize>,
}

impl RunOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: Some(workers),
        }
    }
}

/// Worker count used when none is given.
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

/// `min(10, max(1, total / workers))`.
pub fn compute_batch_size(total: usize, workers: usize) -> usize {
    (total / workers.max(1)).clamp(1, MAX_BATCH_SIZE)
}

enum Completion {
    Done {
        url: String,
        result: Result<PointTable, GranuleError>,
    },
    Skipped,
}

/// Subset every granule in `locators` and merge the results.
///
/// Granule-scoped failures are logged, recorded in the summary and excluded
/// from the table. A configuration failure reported by any worker stops new
/// granules from starting and is returned as the run's error once in-flight
/// work has drained.
pub fn run(
    locators: Vec<GranuleLocator>,
    opener: Arc<dyn GranuleOpener>,
    spec: Arc<VariableSpec>,
    bbox: BoundingBox,
    options: RunOptions,
) -> SubsetResult<(PointTable, RunSummary)> {
    bbox.validate()?;
    let workers = match options.workers {
        Some(0) => {
            return Err(SubsetError::Config(
                "worker count must be at least 1".into(),
            ))
        }
        Some(n) => n,
        None => default_worker_count(),
    };

    let started = Instant::now();
    let total = locators.len();
    let batch_size = compute_batch_size(total, workers);

    info!("Using {} workers with batch size {}", workers, batch_size);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("granule-worker-{}", i))
        .build()
        .map_err(|e| SubsetError::Internal(format!("failed to build worker pool: {}", e)))?;

    let abort = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<Completion>();

    for batch in locators.chunks(batch_size) {
        let batch = batch.to_vec();
        let tx = tx.clone();
        let opener = Arc::clone(&opener);
        let spec = Arc::clone(&spec);
        let abort = Arc::clone(&abort);

        pool.spawn(move || {
            for locator in batch {
                let message = if abort.load(Ordering::SeqCst) {
                    Completion::Skipped
                } else {
                    let result = process(opener.as_ref(), &locator, &spec, &bbox);
                    if matches!(&result, Err(e) if e.kind.is_fatal()) {
                        abort.store(true, Ordering::SeqCst);
                    }
                    Completion::Done {
                        url: locator.url,
                        result,
                    }
                };
                // The receiver only goes away if the caller's thread died.
                if tx.send(message).is_err() {
                    return;
                }
            }
        });
    }
    drop(tx);

    let mut result = PointTable::empty();
    let mut summary = RunSummary {
        total,
        workers,
        batch_size,
        ..Default::default()
    };
    let mut fatal: Option<GranuleError> = None;

    for message in rx {
        match message {
            Completion::Skipped => summary.skipped += 1,
            Completion::Done { url, result: outcome } => {
                summary.attempted += 1;
                let outcome = outcome.and_then(|table| {
                    result
                        .append(table)
                        .map_err(|e| GranuleError::from_error(&url, &e))
                });
                match outcome {
                    Ok(()) => summary.succeeded += 1,
                    Err(failure) => {
                        log_failure(&failure);
                        if failure.kind.is_fatal() && fatal.is_none() {
                            fatal = Some(failure.clone());
                        }
                        summary.failed += 1;
                        summary.failures.push(failure);
                    }
                }
            }
        }
    }

    let received = summary.attempted + summary.skipped;
    if received != total {
        return Err(SubsetError::Internal(format!(
            "expected {} completions, received {}",
            total, received
        )));
    }

    summary.rows = result.len();
    summary.elapsed = started.elapsed();
    summary.log();

    if let Some(failure) = fatal {
        return Err(SubsetError::Config(failure.chain()));
    }

    Ok((result, summary))
}

fn log_failure(failure: &GranuleError) {
    let chain = failure.chain();
    match failure.kind {
        GranuleErrorKind::Access | GranuleErrorKind::Shape => {
            warn!(url = %failure.url, kind = %failure.kind, error = %chain, "Unable to read {}", failure.url)
        }
        GranuleErrorKind::Schema | GranuleErrorKind::Config | GranuleErrorKind::Internal => {
            error!(url = %failure.url, kind = %failure.kind, error = %chain, "Unable to read {}", failure.url)
        }
    }
}
