use std::fs;
use std::process::{Command, Output};

fn newts_sizing(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_newts-sizing"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run newts-sizing")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn size_reference_scenario() {
    let out = newts_sizing(&["size", "--total-metrics", "100000", "--disk-space", "500"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("The total samples per metric would be 105120"));
    assert!(text.contains("The recommended number of Cassandra instances would be 1"));
    assert!(text.contains("replication factor of 2 sets the minimum"));
}

#[test]
fn size_alias_and_injection_rate() {
    let out = newts_sizing(&["s", "-j", "5000", "-d", "1000", "-r", "3"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("The expected total number of metrics would be 1500000"));
}

#[test]
fn size_rejects_both_demands() {
    let out = newts_sizing(&[
        "size",
        "--total-metrics",
        "100",
        "--injection-rate",
        "5",
        "--disk-space",
        "500",
    ]);
    assert!(!out.status.success());
    assert!(!stdout(&out).contains("instances would be"));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("mutually exclusive"), "{err}");
}

#[test]
fn size_requires_disk_space() {
    let out = newts_sizing(&["size", "--total-metrics", "100"]);
    assert!(!out.status.success());
}

#[test]
fn analysis_of_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();
    let out = newts_sizing(&["analysis", "--rrd-dir", root, "--newer-than", "2days"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("Assuming storeByGroup enabled ? true"));
    assert!(text.contains("Number of Nodes = 0"));
    assert!(text.contains("Number of IP Interfaces = 0"));
    assert!(text.contains("Number of OpenNMS Resources = 0"));
}

#[test]
fn analysis_debug_listing() {
    let dir = tempfile::tempdir().unwrap();
    let node = dir.path().join("snmp").join("123");
    fs::create_dir_all(&node).unwrap();
    fs::write(node.join("node.rrd"), [0u8; 8]).unwrap();

    let root = dir.path().to_str().unwrap();
    let out = newts_sizing(&["a", "-r", root, "-s", "-d"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("Assuming storeByGroup enabled ? false"));
    assert!(text.contains("        1: 123 (1)"));
    assert!(text.contains("Number of Numeric Metrics = 1"));
    assert!(text.contains("Number of Groups (Newts Resources) = 0"));
}

#[test]
fn analysis_of_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let out = newts_sizing(&["analysis", "--rrd-dir", missing.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("cannot access RRD directory"));
}

#[cfg(target_os = "linux")]
#[test]
fn unwritable_stdout_is_reported() {
    let full = fs::File::options().write(true).open("/dev/full").unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_newts-sizing"))
        .args(["size", "-m", "100000", "-d", "500"])
        .env_remove("RUST_LOG")
        .stdout(full)
        .output()
        .expect("failed to run newts-sizing");

    assert_eq!(out.status.code(), Some(2));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("Error: cannot write report"), "{err}");
    assert!(!err.contains("panicked"), "{err}");
}
