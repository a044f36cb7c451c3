//! RRD/JRB directory analysis, emulating the Evaluation Layer of OpenNMS.
//!
//! The estimates are accurate only when `storeByGroup` is enabled; in
//! single-metric mode every file is assumed to hold exactly one metric.
//! Data still queued in memory by OpenNMS is not visible here.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use bytesize::ByteSize;
use rayon::prelude::*;
use walkdir::{DirEntry, WalkDir};

use crate::classify;
use crate::error::AnalysisError;
use crate::properties::{DS_PROPERTIES, Properties, STRINGS_PROPERTIES};

/// Default location of the RRD/JRB files on an OpenNMS installation.
pub const DEFAULT_RRD_DIR: &str = "/opt/opennms/share/rrd";

/// Default age limit for the analyzed files.
pub const DEFAULT_NEWER_THAN: Duration = Duration::from_secs(48 * 60 * 60);

/// Settings of a single analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Root of the RRD/JRB tree.
    pub rrd_dir: PathBuf,
    /// Only files modified within this window are considered.
    pub newer_than: Duration,
    /// `storeByGroup` disabled: one metric per file, no group counting.
    pub single_metric: bool,
    /// List every node, interface and resource in the report.
    pub debug: bool,
    /// Worker threads for the walk; `0` lets rayon decide.
    pub threads: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            rrd_dir: PathBuf::from(DEFAULT_RRD_DIR),
            newer_than: DEFAULT_NEWER_THAN,
            single_metric: false,
            debug: false,
            threads: 0,
        }
    }
}

/// Counters accumulated while walking the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Occurrences per node identifier (`42`, `fs/Servers/web01`).
    pub nodes: BTreeMap<String, u64>,
    /// Occurrences per IP address of response time resources.
    pub interfaces: BTreeMap<String, u64>,
    /// Occurrences per RRD/JRB base file name, extension included.
    pub resources: BTreeMap<String, u64>,
    /// Number of RRD/JRB files holding a group of metrics.
    pub groups: u64,
    pub numeric_metrics: u64,
    pub string_metrics: u64,
    pub total_size_bytes: u64,
}

impl Stats {
    /// Combines two partial results. The operation is commutative, so the
    /// final totals do not depend on the order in which files were visited.
    pub fn merge(mut self, other: Stats) -> Stats {
        fn merge_map(into: &mut BTreeMap<String, u64>, from: BTreeMap<String, u64>) {
            for (key, count) in from {
                *into.entry(key).or_default() += count;
            }
        }
        merge_map(&mut self.nodes, other.nodes);
        merge_map(&mut self.interfaces, other.interfaces);
        merge_map(&mut self.resources, other.resources);
        self.groups += other.groups;
        self.numeric_metrics += other.numeric_metrics;
        self.string_metrics += other.string_metrics;
        self.total_size_bytes += other.total_size_bytes;
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    fn bump(map: &mut BTreeMap<String, u64>, key: impl Into<String>) {
        *map.entry(key.into()).or_default() += 1;
    }
}

/// Walks an RRD/JRB directory and produces a [`Report`].
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalyzerConfig,
    cutoff: SystemTime,
}

impl Analyzer {
    /// Creates an analyzer whose cutoff is `now - config.newer_than`.
    pub fn new(config: AnalyzerConfig) -> Self {
        let cutoff = SystemTime::now()
            .checked_sub(config.newer_than)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Self::with_cutoff(config, cutoff)
    }

    /// Creates an analyzer that only considers files modified strictly after
    /// `cutoff`.
    pub fn with_cutoff(config: AnalyzerConfig, cutoff: SystemTime) -> Self {
        Self { config, cutoff }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn cutoff(&self) -> SystemTime {
        self.cutoff
    }

    /// Walks the configured directory, following symbolic links.
    ///
    /// # Errors
    ///
    /// Fails only when the root cannot be used or the worker pool cannot be
    /// built. Problems with individual entries are logged and skipped.
    pub fn run(&self) -> Result<Report, AnalysisError> {
        let root = &self.config.rrd_dir;
        let metadata = fs::metadata(root).map_err(|source| AnalysisError::RootNotFound {
            path: root.clone(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(AnalysisError::NotADirectory(root.clone()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()?;

        let entries = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!(%err, "skipping entry");
                    None
                }
            });

        let stats = pool.install(|| {
            entries
                .par_bridge()
                .fold(Stats::default, |mut stats, entry| {
                    self.visit(&entry, &mut stats);
                    stats
                })
                .reduce(Stats::default, Stats::merge)
        });

        tracing::debug!(
            resources = stats.resource_count(),
            bytes = stats.total_size_bytes,
            "analysis finished"
        );

        Ok(Report {
            stats,
            debug: self.config.debug,
        })
    }

    fn visit(&self, entry: &DirEntry, stats: &mut Stats) {
        if !entry.file_type().is_file() {
            return;
        }
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "cannot stat file");
                return;
            }
        };
        match metadata.modified() {
            Ok(modified) if modified > self.cutoff => {}
            Ok(_) => return,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "no modification time");
                return;
            }
        }
        self.record_file(path, metadata.len(), stats);
    }

    /// Classifies a single file that already passed the age filter.
    pub fn record_file(&self, path: &Path, len: u64, stats: &mut Stats) {
        let Some(file_name) = path.file_name().map(|name| name.to_string_lossy()) else {
            return;
        };

        if let Some(resource) = classify::resource_name(&file_name) {
            if self.config.single_metric {
                tracing::debug!(path = %path.display(), "assuming a single metric per file");
                stats.numeric_metrics += 1;
            } else {
                stats.groups += 1;
                stats.numeric_metrics += count_numeric_metrics(path, resource);
            }
            stats.total_size_bytes += len;
            Stats::bump(&mut stats.resources, &*file_name);
            if let Some(node) = classify::node_id(path) {
                Stats::bump(&mut stats.nodes, node);
            }
            if let Some(address) = classify::interface_id(path) {
                Stats::bump(&mut stats.interfaces, address);
            }
        }

        if file_name == STRINGS_PROPERTIES {
            stats.string_metrics += count_string_metrics(path);
        }
    }
}

impl Display for Analyzer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "RRD Directory = {}", self.config.rrd_dir.display())?;
        writeln!(
            f,
            "Assuming storeByGroup enabled ? {}",
            !self.config.single_metric
        )?;
        writeln!(
            f,
            "Checking files newer than {}",
            humantime::format_rfc3339_seconds(self.cutoff)
        )?;
        write!(f, "...")
    }
}

// Numeric metrics of a group: entries of the sibling ds.properties whose
// value is the resource name.
fn count_numeric_metrics(path: &Path, resource: &str) -> u64 {
    let ds_file = sibling(path, DS_PROPERTIES);
    let count = Properties::load(&ds_file).count_values(resource);
    tracing::debug!(
        count,
        resource,
        ds_file = %ds_file.display(),
        "numeric metrics"
    );
    count as u64
}

fn count_string_metrics(path: &Path) -> u64 {
    let count = Properties::load(path).len();
    tracing::debug!(count, path = %path.display(), "string attributes");
    count as u64
}

fn sibling(path: &Path, name: &str) -> PathBuf {
    path.parent()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Outcome of [`Analyzer::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub stats: Stats,
    /// Include the sorted per-key listings when displayed.
    pub debug: bool,
}

fn write_sorted(f: &mut Formatter<'_>, data: &BTreeMap<String, u64>) -> FmtResult {
    for (rank, (key, count)) in data.iter().enumerate() {
        writeln!(f, " {:>8}: {} ({})", rank + 1, key, count)?;
    }
    Ok(())
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = &self.stats;
        if self.debug {
            writeln!(f)?;
            writeln!(f, "Nodes:")?;
            write_sorted(f, &s.nodes)?;
            writeln!(f, "IP Interfaces:")?;
            write_sorted(f, &s.interfaces)?;
            writeln!(f, "Resources:")?;
            write_sorted(f, &s.resources)?;
            writeln!(f)?;
        }
        writeln!(f, "Number of Nodes = {}", s.node_count())?;
        writeln!(f, "Number of IP Interfaces = {}", s.interface_count())?;
        writeln!(f, "Number of OpenNMS Resources = {}", s.resource_count())?;
        writeln!(f, "Number of Groups (Newts Resources) = {}", s.groups)?;
        writeln!(f, "Number of String Metrics = {}", s.string_metrics)?;
        writeln!(f, "Number of Numeric Metrics = {}", s.numeric_metrics)?;
        write!(f, "Total Size = {}", ByteSize::b(s.total_size_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(node: &str, groups: u64, bytes: u64) -> Stats {
        let mut s = Stats {
            groups,
            numeric_metrics: groups * 2,
            total_size_bytes: bytes,
            ..Stats::default()
        };
        Stats::bump(&mut s.nodes, node);
        Stats::bump(&mut s.resources, "ifIn.rrd");
        s
    }

    #[test]
    fn merge_is_order_independent() {
        let a = stats("1", 2, 100);
        let b = stats("2", 3, 50);
        let c = stats("1", 1, 7);

        let left = a.clone().merge(b.clone()).merge(c.clone());
        let right = c.merge(a).merge(b);
        assert_eq!(left, right);
        assert_eq!(left.groups, 6);
        assert_eq!(left.total_size_bytes, 157);
        assert_eq!(left.nodes.get("1"), Some(&2));
        assert_eq!(left.resources.get("ifIn.rrd"), Some(&3));
    }

    #[test]
    fn single_metric_skips_groups_and_sidecars() {
        let analyzer = Analyzer::new(AnalyzerConfig {
            single_metric: true,
            ..AnalyzerConfig::default()
        });
        let mut s = Stats::default();
        analyzer.record_file(Path::new("/nowhere/snmp/9/ifIn.rrd"), 10, &mut s);
        analyzer.record_file(Path::new("/nowhere/snmp/9/ifOut.jrb"), 20, &mut s);
        assert_eq!(s.groups, 0);
        assert_eq!(s.numeric_metrics, 2);
        assert_eq!(s.total_size_bytes, 30);
        assert_eq!(s.nodes.get("9"), Some(&2));
    }

    #[test]
    fn group_without_sidecar_has_no_numeric_metrics() {
        let analyzer = Analyzer::new(AnalyzerConfig::default());
        let mut s = Stats::default();
        analyzer.record_file(Path::new("/nowhere/response/10.0.0.1/icmp.rrd"), 5, &mut s);
        analyzer.record_file(Path::new("/nowhere/notes.txt"), 99, &mut s);
        assert_eq!(s.groups, 1);
        assert_eq!(s.numeric_metrics, 0);
        assert_eq!(s.total_size_bytes, 5);
        assert_eq!(s.interfaces.get("10.0.0.1"), Some(&1));
    }

    #[test]
    fn empty_report_states_zero() {
        let out = Report {
            stats: Stats::default(),
            debug: false,
        }
        .to_string();
        assert!(out.contains("Number of Nodes = 0"));
        assert!(out.contains("Number of IP Interfaces = 0"));
        assert!(out.contains("Number of OpenNMS Resources = 0"));
        assert!(!out.contains("Nodes:"));
    }

    #[test]
    fn verbose_report_lists_sorted_keys() {
        let mut s = Stats::default();
        Stats::bump(&mut s.nodes, "20");
        Stats::bump(&mut s.nodes, "10");
        Stats::bump(&mut s.nodes, "10");
        let out = Report {
            stats: s,
            debug: true,
        }
        .to_string();
        let first = out.find("        1: 10 (2)").expect("rank 1");
        let second = out.find("        2: 20 (1)").expect("rank 2");
        assert!(first < second);
        assert!(out.contains("Number of Nodes = 2"));
    }

    #[test]
    fn header_mentions_mode() {
        let analyzer = Analyzer::with_cutoff(
            AnalyzerConfig {
                single_metric: true,
                ..AnalyzerConfig::default()
            },
            SystemTime::UNIX_EPOCH,
        );
        let header = analyzer.to_string();
        assert!(header.contains("RRD Directory = /opt/opennms/share/rrd"));
        assert!(header.contains("storeByGroup enabled ? false"));
        assert!(header.contains("1970-01-01T00:00:00Z"));
    }
}
