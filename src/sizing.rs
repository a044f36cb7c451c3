use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::SizingError;

/// Bytes in one (binary) gigabyte.
pub const GIB: f64 = 1_073_741_824.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Inputs of the capacity estimator.
///
/// Demand is expressed either as `total_metrics` or as `injection_rate`;
/// exactly one of them must be positive, the other left at `0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingParams {
    /// TTL, or total metric retention in days.
    pub ttl_days: f64,
    /// Average data collection interval in minutes.
    pub interval_minutes: f64,
    /// Average size in bytes of a row of the `newts.samples` table.
    pub sample_size_bytes: f64,
    pub replication_factor: f64,
    /// Disk space per instance reserved for compactions, as a percentage.
    pub overhead_percent: f64,
    /// Expected number of metrics persisted into the cluster.
    pub total_metrics: f64,
    /// Expected samples per second.
    pub injection_rate: f64,
    /// Total disk space per instance in GB (`2^30` bytes).
    pub disk_space_gb: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            ttl_days: 365.0,
            interval_minutes: 5.0,
            sample_size_bytes: 18.0,
            replication_factor: 2.0,
            overhead_percent: 15.0,
            total_metrics: 0.0,
            injection_rate: 0.0,
            disk_space_gb: 0.0,
        }
    }
}

/// Computed cluster recommendation.
///
/// Byte quantities are raw bytes, growth is in binary GB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterPlan {
    /// Samples kept per metric during the TTL.
    ///
    /// Formula: `(ttl_days * 86400) / (interval_minutes * 60)`
    pub samples_per_metric: f64,

    /// Usable bytes per instance once the compaction overhead is set aside.
    ///
    /// Formula: `disk_space_gb * 2^30 * (1 - overhead_percent / 100)`
    pub available_bytes_per_node: f64,

    /// Samples per second; derived from `total_metrics` when not given.
    ///
    /// Formula: `total_metrics / (interval_minutes * 60)`
    pub injection_rate: f64,

    /// Metrics persisted; derived from `injection_rate` when not given.
    ///
    /// Formula: `injection_rate * interval_minutes * 60`
    pub total_metrics: f64,

    /// Formula: `total_metrics * samples_per_metric`
    pub sample_capacity: f64,

    /// Bytes of one copy of the data set.
    ///
    /// Formula: `sample_capacity * sample_size_bytes`
    pub cluster_usable_bytes: f64,

    /// Formula: `cluster_usable_bytes * replication_factor / available_bytes_per_node`
    pub raw_nodes: f64,

    /// `raw_nodes` rounded up, at least `1`.
    pub nodes: u64,

    /// Metrics the recommended cluster can hold.
    ///
    /// Formula: `available_bytes_per_node * nodes / (samples_per_metric * sample_size_bytes * replication_factor)`
    pub calculated_capacity: f64,

    /// Expected disk growth per instance per day, in GB.
    ///
    /// Formula: `total_metrics * (replication_factor / nodes) * (86400 / (interval_minutes * 60)) * sample_size_bytes / 2^30`
    pub daily_growth_per_node_gb: f64,

    // --- Inputs echoed for reporting ---
    pub ttl_days: f64,
    pub interval_minutes: f64,
    pub sample_size_bytes: f64,
    pub replication_factor: f64,
    pub overhead_percent: f64,
    pub disk_space_gb: f64,
}

impl ClusterPlan {
    /// `true` when the data would fit on fewer instances than there are
    /// replicas, so the replication factor dictates the cluster size.
    pub fn limited_by_replication(&self) -> bool {
        (self.nodes as f64) < self.replication_factor
    }
}

/// Rounds up to the next whole instance.
///
/// Any fractional part counts as one more instance, integral values map to
/// themselves and non-positive values to `0`.
pub fn round_up(value: f64) -> u64 {
    let v = value.ceil();
    if v <= 0.0 { 0 } else { v as u64 }
}

fn ensure_finite(name: &'static str, value: f64) -> Result<(), SizingError> {
    if !value.is_finite() {
        return Err(SizingError::NotFinite { name, value });
    }
    Ok(())
}

fn ensure_positive(name: &'static str, value: f64) -> Result<(), SizingError> {
    ensure_finite(name, value)?;
    // `!(x > 0)` also rejects NaN.
    if !(value > 0.0) {
        return Err(SizingError::NonPositive { name, value });
    }
    Ok(())
}

/// Computes the number of Cassandra/ScyllaDB instances required to keep
/// `total_metrics` (or `injection_rate` samples per second) for `ttl_days`.
///
/// # Errors
///
/// - [`SizingError::ConflictingDemand`] if both `total_metrics` and
///   `injection_rate` are positive;
/// - [`SizingError::MissingDemand`] if neither is;
/// - [`SizingError::NonPositive`] for a TTL, interval, sample size,
///   replication factor or disk space that is not `> 0`;
/// - [`SizingError::NotFinite`] for an infinite or NaN input, or a demand so
///   large that the node count overflows;
/// - [`SizingError::InvalidOverhead`] if the overhead is outside `[0, 100)`.
///
/// # Formulas
///
/// ```text
/// samples_per_metric   = (ttl_days * 86400) / (interval_minutes * 60)
/// total_metrics        = injection_rate * interval_minutes * 60   (rate given)
/// injection_rate       = total_metrics / (interval_minutes * 60)  (total given)
/// available_per_node   = disk_space_gb * 2^30 * (1 - overhead_percent / 100)
/// sample_capacity      = total_metrics * samples_per_metric
/// cluster_usable_bytes = sample_capacity * sample_size_bytes
/// raw_nodes            = cluster_usable_bytes * replication_factor / available_per_node
/// nodes                = max(ceil(raw_nodes), 1)
/// ```
///
/// # Examples
///
/// ```
/// use newts_sizing::{plan_cluster, SizingParams};
///
/// let plan = plan_cluster(&SizingParams {
///     total_metrics: 100_000.0,
///     disk_space_gb: 500.0,
///     ..SizingParams::default()
/// })
/// .unwrap();
///
/// assert_eq!(plan.samples_per_metric, 105_120.0);
/// assert_eq!(plan.nodes, 1);
/// assert!(plan.limited_by_replication());
/// ```
pub fn plan_cluster(params: &SizingParams) -> Result<ClusterPlan, SizingError> {
    let has_total = params.total_metrics > 0.0;
    let has_rate = params.injection_rate > 0.0;
    match (has_total, has_rate) {
        (true, true) => {
            return Err(SizingError::ConflictingDemand {
                total_metrics: params.total_metrics,
                injection_rate: params.injection_rate,
            });
        }
        (false, false) => return Err(SizingError::MissingDemand),
        _ => {}
    }
    ensure_finite("total-metrics", params.total_metrics)?;
    ensure_finite("injection-rate", params.injection_rate)?;
    ensure_positive("ttl", params.ttl_days)?;
    ensure_positive("interval", params.interval_minutes)?;
    ensure_positive("sample-size", params.sample_size_bytes)?;
    ensure_positive("replication-factor", params.replication_factor)?;
    ensure_positive("disk-space", params.disk_space_gb)?;
    if !(0.0..100.0).contains(&params.overhead_percent) {
        return Err(SizingError::InvalidOverhead(params.overhead_percent));
    }

    let step_seconds = params.interval_minutes * 60.0;
    let samples_per_metric = (params.ttl_days * SECONDS_PER_DAY) / step_seconds;

    let (total_metrics, injection_rate) = if has_rate {
        (params.injection_rate * step_seconds, params.injection_rate)
    } else {
        (params.total_metrics, params.total_metrics / step_seconds)
    };

    let available_bytes_per_node =
        params.disk_space_gb * GIB * (1.0 - params.overhead_percent / 100.0);

    let sample_capacity = total_metrics * samples_per_metric;

    let cluster_usable_bytes = sample_capacity * params.sample_size_bytes;

    let raw_nodes = (cluster_usable_bytes * params.replication_factor) / available_bytes_per_node;

    ensure_finite("node count", raw_nodes)?;

    // A positive demand always needs at least one instance, even when
    // `raw_nodes` underflows to zero.
    let nodes = round_up(raw_nodes).max(1);
    let nodes_f = nodes as f64;

    let calculated_capacity = (available_bytes_per_node * nodes_f)
        / (samples_per_metric * params.sample_size_bytes * params.replication_factor);

    let daily_growth_per_node_gb = total_metrics
        * (params.replication_factor / nodes_f)
        * (SECONDS_PER_DAY / step_seconds)
        * params.sample_size_bytes
        / GIB;

    tracing::debug!(raw_nodes, nodes, "cluster sized");

    Ok(ClusterPlan {
        samples_per_metric,
        available_bytes_per_node,
        injection_rate,
        total_metrics,
        sample_capacity,
        cluster_usable_bytes,
        raw_nodes,
        nodes,
        calculated_capacity,
        daily_growth_per_node_gb,
        ttl_days: params.ttl_days,
        interval_minutes: params.interval_minutes,
        sample_size_bytes: params.sample_size_bytes,
        replication_factor: params.replication_factor,
        overhead_percent: params.overhead_percent,
        disk_space_gb: params.disk_space_gb,
    })
}

impl Display for ClusterPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "=== Newts Cluster Sizing ===")?;
        writeln!(f, "1 GB = {} Bytes", GIB as u64)?;
        writeln!(
            f,
            "TTL: {:.0} days | Interval: {:.0} min | Disk space: {:.0} GB | Overhead: {:.0}%",
            self.ttl_days, self.interval_minutes, self.disk_space_gb, self.overhead_percent
        )?;
        writeln!(f)?;
        writeln!(
            f,
            "The total samples per metric would be {:.0} assuming {:.0} bytes per sample with a RF of {:.0}",
            self.samples_per_metric.trunc(),
            self.sample_size_bytes.trunc(),
            self.replication_factor.trunc()
        )?;
        writeln!(
            f,
            "The available disk space per Cassandra instance would be {:.0} bytes",
            self.available_bytes_per_node.trunc()
        )?;
        writeln!(
            f,
            "The expected sample injection rate would be around {:.0} samples/sec persisting data every {:.0}min",
            self.injection_rate.trunc(),
            self.interval_minutes.trunc()
        )?;
        writeln!(
            f,
            "The expected total number of metrics would be {:.0}",
            self.total_metrics.trunc()
        )?;
        writeln!(
            f,
            "The recommended number of Cassandra instances would be {}",
            self.nodes
        )?;
        if self.limited_by_replication() {
            writeln!(
                f,
                "The replication factor of {:.0} sets the minimum number of instances",
                self.replication_factor
            )?;
        }
        writeln!(
            f,
            "The calculated metrics capacity would be {:.0}",
            self.calculated_capacity.trunc()
        )?;
        write!(
            f,
            "The expected disk growth per Cassandra instance would be {:.2} GB/day",
            self.daily_growth_per_node_gb
        )
    }
}
