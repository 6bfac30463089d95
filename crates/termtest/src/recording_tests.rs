#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;

use tempfile::TempDir;

#[test]
fn writes_numbered_frames_and_latest_symlink() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();

    let seq = rec.log_frame("hello screen").unwrap();
    assert_eq!(seq, 1);
    rec.flush().unwrap();

    let frame = std::fs::read_to_string(dir.path().join("000001.txt")).unwrap();
    assert_eq!(frame, "hello screen");

    let latest = std::fs::read_to_string(dir.path().join("latest.txt")).unwrap();
    assert_eq!(latest, "hello screen");
}

#[test]
fn jsonl_log_records_events_with_timestamps() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();

    rec.log_frame("frame one").unwrap();
    rec.log_send(b"hello\r").unwrap();
    rec.log_signal("SIGTERM").unwrap();
    rec.log_exit(&ExitInfo {
        code: Some(7),
        signal: None,
    })
    .unwrap();
    rec.flush().unwrap();

    let jsonl = std::fs::read_to_string(dir.path().join("recording.jsonl")).unwrap();
    let events: Vec<serde_json::Value> = jsonl
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(events.len(), 4);
    assert!(events.iter().all(|e| e.get("ms").is_some()));
    assert_eq!(events[0]["frame"], 1);
    assert_eq!(events[1]["send"], "hello\\r");
    assert_eq!(events[2]["signal"], "SIGTERM");
    assert_eq!(events[3]["exit"]["code"], 7);
}

#[test]
fn raw_dump_is_verbatim() {
    let dir = TempDir::new().unwrap();
    let mut rec = Recording::new(dir.path()).unwrap();

    rec.append_raw(b"\x1b[2Jraw bytes").unwrap();
    rec.flush().unwrap();

    let raw = std::fs::read(dir.path().join("raw.bin")).unwrap();
    assert_eq!(raw, b"\x1b[2Jraw bytes");
}

#[test]
fn control_bytes_are_readable_in_send_log() {
    assert_eq!(format_send(b"\x1b[B"), "<Esc>[B");
    assert_eq!(format_send(b"\x04"), "<C-d>");
    assert_eq!(format_send(b"\x7f"), "<Backspace>");
    assert_eq!(format_send(b"plain"), "plain");
}
