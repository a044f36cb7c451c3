//! Lenient reader for the flat `key=value` sidecar files OpenNMS keeps next to
//! its RRD/JRB files (`ds.properties`, `strings.properties`).
//!
//! Not a Java properties parser: no escapes, no continuation lines, no
//! trimming and no comment syntax. A line is an entry only when it contains
//! exactly one `=`; any other line is dropped silently.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Base name of the sidecar describing the data sources of each RRD/JRB group.
pub const DS_PROPERTIES: &str = "ds.properties";

/// Base name of the sidecar holding the string attributes of a resource.
pub const STRINGS_PROPERTIES: &str = "strings.properties";

/// Ordered `key -> value` table read from a sidecar file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Reads `path`; a missing or unreadable file yields an empty table.
    pub fn load(path: &Path) -> Self {
        match fs::read(path) {
            Ok(bytes) => Self::parse(&String::from_utf8_lossy(&bytes)),
            Err(err) => {
                tracing::trace!(path = %path.display(), %err, "no properties");
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut entries = BTreeMap::new();
        for line in text.lines() {
            let mut parts = line.split('=');
            if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
                // Later duplicates win.
                entries.insert(key.to_owned(), value.to_owned());
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Number of entries whose value is exactly `value`.
    pub fn count_values(&self, value: &str) -> usize {
        self.entries.values().filter(|v| v.as_str() == value).count()
    }
}
