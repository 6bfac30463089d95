#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Integration tests spawning real processes in PTYs.

use std::time::{Duration, Instant};

use regex::Regex;
use termtest::{
    fire_event, render, render_with_options, user_event, Config, Error, RenderOptions,
    TermInstance,
};

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Generous wait budget so slow CI machines don't flake.
fn test_options() -> RenderOptions {
    RenderOptions {
        config: Some(Config {
            async_util_timeout: Duration::from_secs(5),
            ..Config::default()
        }),
        ..Default::default()
    }
}

async fn spawn_sh(script: &str) -> TermInstance {
    render_with_options("sh", &["-c", script], test_options())
        .await
        .unwrap()
}

#[tokio::test]
async fn render_finds_printed_text() {
    let instance = render_with_options("echo", &["hello world"], test_options())
        .await
        .unwrap();

    let element = instance.find_by_text("hello world").await.unwrap();
    assert!(element.text().contains("hello world"));

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn color_sequences_are_stripped_from_rendered_text() {
    let instance = spawn_sh(r#"printf '\033[1;32mgreen light\033[0m\n'; sleep 30"#).await;

    let element = instance.find_by_text("green light").await.unwrap();
    assert_eq!(element.text(), "green light");
    assert!(!instance.render_text().contains('\x1b'));

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn carriage_return_renders_as_overwrite() {
    let instance = spawn_sh(r#"printf 'Loading 1\rLoading 2\n'; sleep 30"#).await;

    instance.find_by_text("Loading 2").await.unwrap();
    assert!(instance.query_by_text("Loading 1").is_none());

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn repeated_queries_return_the_same_node() {
    let instance = spawn_sh("echo ready; sleep 30").await;

    let first = instance.find_by_text("ready").await.unwrap();
    let second = instance.get_by_text("ready").unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(first.text(), second.text());

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn get_by_text_rejects_multiple_matches() {
    let instance = spawn_sh("printf 'dup\\ndup\\n'; sleep 30").await;

    instance
        .wait_for(|| {
            let found = instance.query_all_by_text("dup");
            if found.len() == 2 {
                Ok(())
            } else {
                Err(Error::predicate("still waiting for both lines"))
            }
        })
        .await
        .unwrap();

    let err = instance.get_by_text("dup").unwrap_err();
    assert!(matches!(err, Error::MultipleElements { count: 2, .. }));
    // query_by_text returns the first in document order instead of failing.
    assert!(instance.query_by_text("dup").is_some());

    instance.cleanup().await.unwrap();
}

// Arrow-key navigation through a select prompt, driven by raw writes.
#[tokio::test]
async fn raw_writes_drive_menu_selection() {
    let script = fixture("menu.sh");
    let instance = render_with_options("sh", &[script.as_str()], test_options())
        .await
        .unwrap();

    let element = instance.find_by_text("First option").await.unwrap();
    instance
        .find_by_text(Regex::new("[\u{276f}>] One").unwrap())
        .await
        .unwrap();

    instance.clear();

    // Arrow-down, as an inquirer-style prompt receives it.
    fire_event::write(&element, b"\x1b\x5b\x42").await.unwrap();
    instance
        .find_by_text(Regex::new("[\u{276f}>] Two").unwrap())
        .await
        .unwrap();

    instance.clear();

    // Carriage return confirms the selection.
    fire_event::write(&element, b"\x0d").await.unwrap();
    instance.find_by_text("First option: Two").await.unwrap();

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn keyboard_types_in_order_exactly_once() {
    let script = fixture("greet.sh");
    let instance = render_with_options("sh", &[script.as_str()], test_options())
        .await
        .unwrap();

    let prompt = instance.find_by_text("What is your name?").await.unwrap();

    user_event::keyboard(&prompt, "Test").await.unwrap();
    instance.find_by_text("Test").await.unwrap();
    assert_eq!(instance.query_all_by_text("Test").len(), 1);

    instance.keyboard("[Enter]").await.unwrap();
    instance.find_by_text("Hello, Test!").await.unwrap();

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn sigterm_is_observed_as_exit() {
    let instance = spawn_sh("echo waiting; sleep 30").await;

    let element = instance.find_by_text("waiting").await.unwrap();
    fire_event::sigterm(&element).unwrap();

    instance
        .wait_for(|| {
            if element.has_exit() {
                Ok(())
            } else {
                Err(Error::predicate("still running"))
            }
        })
        .await
        .unwrap();

    let info = instance.exit_info().unwrap();
    assert_eq!(info.signal, Some(libc_signal::SIGTERM));

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn sigkill_is_observed_as_exit() {
    let instance = spawn_sh("echo waiting; sleep 30").await;

    let element = instance.find_by_text("waiting").await.unwrap();
    fire_event::sigkill(&element).unwrap();

    let info = instance.wait_for_exit().await.unwrap();
    assert_eq!(info.signal, Some(libc_signal::SIGKILL));

    instance.cleanup().await.unwrap();
}

// Signal numbers, kept local so the tests don't depend on nix directly.
mod libc_signal {
    pub const SIGTERM: i32 = 15;
    pub const SIGKILL: i32 = 9;
}

#[tokio::test]
async fn wait_rejects_after_configured_timeout() {
    let instance = render_with_options(
        "sleep",
        &["30"],
        RenderOptions {
            config: Some(Config {
                async_util_timeout: Duration::from_millis(300),
                ..Config::default()
            }),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let start = Instant::now();
    let err = instance.find_by_text("never appears").await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, Error::Timeout { .. }));
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(5));

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn burst_of_writes_flushes_as_one_batch() {
    let instance = render_with_options(
        "sh",
        &[
            "-c",
            r#"sleep 0.4; printf 'a\n'; sleep 0.05; printf 'b\n'; sleep 0.05; printf 'c\n'; sleep 30"#,
        ],
        RenderOptions {
            config: Some(Config {
                async_util_timeout: Duration::from_secs(5),
                error_debounce_timeout: Duration::from_millis(200),
                ..Config::default()
            }),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut batches = instance.subscribe_batches().unwrap();

    let first = tokio::time::timeout(Duration::from_secs(3), batches.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.mutations.len(), 3, "burst should collapse to one batch");

    // The quiet process produces no further batches.
    let silence = tokio::time::timeout(Duration::from_millis(600), batches.recv()).await;
    assert!(silence.is_err(), "expected no second batch");

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn invisible_rewrites_emit_no_mutations() {
    let instance = spawn_sh(r#"printf 'x\n'; sleep 0.4; printf '\033[Hx'; sleep 30"#).await;

    instance.find_by_text("x").await.unwrap();
    // Wait out the initial frame's debounce before listening.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut batches = instance.subscribe_batches().unwrap();
    let silence = tokio::time::timeout(Duration::from_millis(800), batches.recv()).await;
    assert!(silence.is_err(), "identical rewrite must not notify");

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn write_after_exit_is_an_error() {
    let instance = render_with_options("true", &[], test_options())
        .await
        .unwrap();

    let info = instance.wait_for_exit().await.unwrap();
    assert_eq!(info.code, Some(0));

    let err = instance.write_raw(b"anyone there?").await.unwrap_err();
    assert!(matches!(err, Error::WriteAfterExit { .. }));

    instance.cleanup().await.unwrap();
}

#[tokio::test]
async fn cleanup_settles_pending_waiters() {
    let instance = render_with_options("sleep", &["30"], test_options())
        .await
        .unwrap();

    let clone = instance.clone();
    let waiter = tokio::spawn(async move { clone.find_by_text("never").await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    instance.cleanup().await.unwrap();

    let settled = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(settled, Err(Error::TornDown)));

    // No further observation is possible after teardown.
    assert!(instance.subscribe_batches().is_none());
    assert!(instance.has_exit());
}

#[tokio::test]
async fn global_cleanup_tears_down_all_renders() {
    let first = render_with_options("sleep", &["30"], test_options())
        .await
        .unwrap();
    let second = render_with_options("sleep", &["30"], test_options())
        .await
        .unwrap();

    termtest::cleanup().await.unwrap();

    assert!(first.has_exit());
    assert!(second.has_exit());
}

#[tokio::test]
async fn global_cleanup_reaches_later_renders() {
    let first = render_with_options("sleep", &["30"], test_options())
        .await
        .unwrap();
    let second = render_with_options("sleep", &["30"], test_options())
        .await
        .unwrap();

    // Torn down out-of-band but still registered; the pass over the
    // registry must carry on to the remaining renders regardless.
    first.cleanup().await.unwrap();

    termtest::cleanup().await.unwrap();
    assert!(second.has_exit());
}

#[tokio::test]
async fn recording_writes_session_artifacts() {
    let dir = tempfile::TempDir::new().unwrap();

    let instance = render_with_options(
        "echo",
        &["recorded output"],
        RenderOptions {
            record_to: Some(dir.path().to_path_buf()),
            config: Some(Config {
                async_util_timeout: Duration::from_secs(5),
                ..Config::default()
            }),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    instance.find_by_text("recorded output").await.unwrap();
    instance.wait_for_exit().await.unwrap();
    instance.cleanup().await.unwrap();

    let jsonl = std::fs::read_to_string(dir.path().join("recording.jsonl")).unwrap();
    assert!(jsonl.contains(r#""frame""#));
    assert!(jsonl.contains(r#""exit""#));

    let raw = std::fs::read(dir.path().join("raw.bin")).unwrap();
    assert!(String::from_utf8_lossy(&raw).contains("recorded output"));

    let frame = std::fs::read_to_string(dir.path().join("000001.txt")).unwrap();
    assert!(frame.contains("recorded output"));
}

#[tokio::test]
async fn spawn_failure_surfaces_immediately() {
    let err = render("definitely-not-a-real-command-xyz", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Spawn { .. }));
}
