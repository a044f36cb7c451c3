use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Input validation failures of the capacity estimator.
///
/// Every variant is raised before any computation takes place, so a failed
/// validation never yields a partial [`ClusterPlan`](crate::ClusterPlan).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SizingError {
    /// Both demand inputs were given; there is no precedence between them.
    #[error(
        "total-metrics ({total_metrics}) and injection-rate ({injection_rate}) are mutually exclusive; provide only one of them"
    )]
    ConflictingDemand {
        total_metrics: f64,
        injection_rate: f64,
    },

    #[error("either total-metrics or injection-rate must be > 0")]
    MissingDemand,

    #[error("{name} must be > 0 (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{name} must be a finite number (got {value})")]
    NotFinite { name: &'static str, value: f64 },

    #[error("disk-overhead must be in [0, 100) (got {0})")]
    InvalidOverhead(f64),
}

/// Setup failures of the directory analyzer.
///
/// Errors on individual entries during the walk are not represented here:
/// those are logged and skipped.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot access RRD directory {}", .path.display())]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("RRD directory {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
