#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod classify;
pub mod error;
pub mod properties;
pub mod sizing;

pub use analysis::{Analyzer, AnalyzerConfig, Report, Stats};
pub use error::{AnalysisError, SizingError};
pub use properties::Properties;
pub use sizing::{ClusterPlan, SizingParams, plan_cluster, round_up};
