//! Run-level reporting.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use subset_common::GranuleError;
use tracing::{info, warn};

/// Outcome counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Granules handed to the pipeline
    pub total: usize,
    /// Granules a worker actually processed
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Granules never started because the run was aborted
    pub skipped: usize,
    pub rows: usize,
    pub workers: usize,
    pub batch_size: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    pub failures: Vec<GranuleError>,
}

impl RunSummary {
    /// Log the summary: `info` normally, `warn` when nothing succeeded.
    pub fn log(&self) {
        if self.succeeded == 0 {
            warn!(
                total = self.total,
                failed = self.failed,
                skipped = self.skipped,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "No granules succeeded; result is empty"
            );
        } else {
            info!(
                total = self.total,
                attempted = self.attempted,
                succeeded = self.succeeded,
                failed = self.failed,
                skipped = self.skipped,
                rows = self.rows,
                elapsed_ms = self.elapsed.as_millis() as u64,
                "Run complete"
            );
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} granules: {} attempted, {} succeeded, {} failed, {} skipped; {} rows in {:.1}s",
            self.total,
            self.attempted,
            self.succeeded,
            self.failed,
            self.skipped,
            self.rows,
            self.elapsed.as_secs_f64()
        )?;
        for failure in &self.failures {
            writeln!(f, "  {} {}: {}", failure.kind, failure.url, failure.chain())?;
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subset_common::GranuleErrorKind;

    fn failure(kind: GranuleErrorKind) -> GranuleError {
        GranuleError {
            url: "s3://b/k.h5".into(),
            kind,
            message: "boom".into(),
            causes: vec!["root cause".into()],
        }
    }

    #[test]
    fn test_display_lists_failures() {
        let summary = RunSummary {
            total: 2,
            attempted: 2,
            succeeded: 1,
            failed: 1,
            rows: 10,
            failures: vec![failure(GranuleErrorKind::Schema)],
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.starts_with("2 granules: 2 attempted, 1 succeeded, 1 failed"));
        assert!(text.contains("SchemaError s3://b/k.h5: boom: root cause"));
    }

    #[test]
    fn test_serializes_elapsed_as_seconds() {
        let summary = RunSummary {
            elapsed: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["elapsed"], 1.5);
    }
}
