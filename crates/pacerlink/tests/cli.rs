#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output};

fn pacerlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pacerlink"))
        .env_remove("PACERLINK_LOG")
        .arg("--log-level")
        .arg("off")
        .args(args)
        .output()
        .expect("pacerlink should run")
}

#[test]
fn encode_prints_frame_hex() {
    let output = pacerlink(&["encode", "--kind", "mcu-ack", "--hex", "01 02 03"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "5A 06 03 01 02 03 55");
}

#[test]
fn decode_emits_json() {
    let output = pacerlink(&["--format", "json", "decode", "5A 06 03 01 02 03 55"]);

    assert!(output.status.success());
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("decode should emit json");
    assert_eq!(payload["direction"], "mcu-to-host");
    assert_eq!(payload["kind"], "mcu-ack");
    assert_eq!(payload["category"], "ack");
    assert_eq!(payload["len"], 3);
    assert_eq!(payload["payload_hex"], "01 02 03");
    assert_eq!(payload["frame_len"], 7);
}

#[test]
fn encode_then_decode_text() {
    let encoded = pacerlink(&["encode", "--kind", "mcu-debug", "--text", "boot ok"]);
    assert!(encoded.status.success());
    let hex = String::from_utf8_lossy(&encoded.stdout).trim().to_string();

    let decoded = pacerlink(&["--format", "json", "decode", &hex]);
    assert!(decoded.status.success());
    let payload: serde_json::Value = serde_json::from_slice(&decoded.stdout).unwrap();
    assert_eq!(payload["text"], "boot ok");
}

#[test]
fn corrupt_frame_returns_60() {
    let output = pacerlink(&["decode", "5A 06 03 01 02 03 56"]);

    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("checksum mismatch"));
}

#[test]
fn bad_hex_returns_64() {
    let output = pacerlink(&["decode", "5A 0G"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn missing_device_returns_3() {
    let output = pacerlink(&[
        "send",
        "/dev/pacerlink-does-not-exist",
        "--kind",
        "host-ack",
        "--hex",
        "01",
    ]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn version_reports_package_version() {
    let output = pacerlink(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("pacerlink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_lists_protocol() {
    let output = pacerlink(&["version", "--extended"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("max_payload=100"));
    assert!(stdout.contains("max_frame=108"));
}

#[test]
fn extended_version_reports_build_info() {
    let output = pacerlink(&["version", "--extended"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let profile = stdout
        .lines()
        .find_map(|line| line.strip_prefix("profile: "))
        .expect("profile line");
    assert!(matches!(profile, "debug" | "release"), "profile {profile}");
    let target = stdout
        .lines()
        .find_map(|line| line.strip_prefix("target: "))
        .expect("target line");
    assert_ne!(target, "unknown");
    assert!(stdout.lines().any(|line| line.starts_with("git_hash: ")));
}
