//! Path classification for the RRD/JRB directory.
//!
//! Matching is done on path segments rather than on the raw string, so a
//! segment only matches a literal when it is exactly that literal.

use std::path::{Component, Path};

/// File extensions of round-robin files (RRDtool and JRobin).
pub const RRD_EXTENSIONS: [&str; 2] = [".rrd", ".jrb"];

/// Parent segment of node directories written by Collectd.
const SNMP_DIR: &str = "snmp";
/// Marker used when `storeByForeignSource` is enabled: `snmp/fs/<source>/<id>`.
const FOREIGN_SOURCE_DIR: &str = "fs";
/// Parent segment of response time directories written by Pollerd.
const RESPONSE_DIR: &str = "response";

/// Returns the resource name of a round-robin file, that is its base name
/// without the extension, or `None` when `file_name` is not an RRD/JRB file.
pub fn resource_name(file_name: &str) -> Option<&str> {
    RRD_EXTENSIONS
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
}

/// Extracts the node identifier from a path such as `.../snmp/42/...` or
/// `.../snmp/fs/Servers/web01/...`.
///
/// The identifier must be followed by at least one more segment. When the
/// path contains several candidates the leftmost one wins.
pub fn node_id(path: &Path) -> Option<String> {
    let segments = segments(path);
    for (i, segment) in segments.iter().enumerate() {
        if segment != SNMP_DIR {
            continue;
        }
        match &segments[i + 1..] {
            [id, _, ..] if is_numeric(id) => return Some(id.clone()),
            [fs, source, id, _, ..] if fs == FOREIGN_SOURCE_DIR => {
                return Some(format!("{fs}/{source}/{id}"));
            }
            _ => {}
        }
    }
    None
}

/// Extracts the IP address from a path such as `.../response/10.0.0.1/...`.
pub fn interface_id(path: &Path) -> Option<String> {
    segments(path)
        .windows(3)
        .find(|w| w[0] == RESPONSE_DIR && is_address(&w[1]))
        .map(|w| w[1].clone())
}

fn segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::CurDir => Some(".".to_owned()),
            Component::ParentDir => Some("..".to_owned()),
            Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

// Digits and dots only; no attempt is made to validate the octets.
fn is_address(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}
