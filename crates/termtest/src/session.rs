// SPDX-License-Identifier: MIT

//! Render session: one spawned process and its live document.
//!
//! `render` spawns the child in a PTY and starts a pump task that owns the
//! read side: read a chunk, feed the screen, diff the tree, accumulate
//! mutations, flush a batch when the debounce window goes quiet. All tree
//! state sits behind one mutex so synchronous queries and the pump
//! interleave safely; suspension happens only at `find_by_*`/`wait_for`
//! boundaries.
//!
//! On EOF the pump reaps the child exactly once, publishes the exit through
//! a watch channel, and emits a final batch carrying an `exited` attribute
//! mutation on the root so exit-waiters re-evaluate.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nix::sys::signal::Signal;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::{get_config, Config};
use crate::error::{Error, Result};
use crate::observer::{BatchReceiver, BatchSender, Debouncer, MutationBatch};
use crate::pty::{ExitInfo, Pty, SpawnOptions};
use crate::recording::Recording;
use crate::screen::{Frame, Screen};
use crate::tree::{Mutation, Tree};

/// Options accepted by [`render_with_options`].
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub spawn: SpawnOptions,
    /// Per-render configuration; falls back to the shared record.
    pub config: Option<Config>,
    /// Record frames, sends, and the raw byte stream into this directory.
    pub record_to: Option<PathBuf>,
}

pub(crate) struct SessionState {
    pub screen: Screen,
    pub tree: Tree,
    pub recording: Option<Recording>,
}

pub(crate) struct SessionInner {
    command: String,
    pty: Pty,
    config: Config,
    pub(crate) state: Mutex<SessionState>,
    /// Sender half of the mutation channel; taken on cleanup so receivers
    /// observe closure.
    notify: Mutex<Option<BatchSender>>,
    batch_seq: AtomicU64,
    exit_tx: watch::Sender<Option<ExitInfo>>,
    exit_rx: watch::Receiver<Option<ExitInfo>>,
}

impl SessionInner {
    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn has_exit(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    pub(crate) fn exit_info(&self) -> Option<ExitInfo> {
        *self.exit_rx.borrow()
    }

    pub(crate) fn subscribe(&self) -> Option<BatchReceiver> {
        self.notify.lock().as_ref().map(|tx| tx.subscribe())
    }

    pub(crate) fn render_text(&self) -> String {
        self.state.lock().screen.render()
    }

    fn publish(&self, mutations: Vec<Mutation>) {
        if mutations.is_empty() {
            return;
        }
        let seq = self.batch_seq.fetch_add(1, Ordering::Relaxed);
        let batch = Arc::new(MutationBatch { seq, mutations });
        if let Some(tx) = self.notify.lock().as_ref() {
            let _ = tx.send(batch);
        }
    }

    /// Send raw bytes to the child's stdin. Fails once the child exited.
    pub(crate) async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if self.has_exit() {
            return Err(Error::WriteAfterExit {
                command: self.command.clone(),
            });
        }
        if let Some(rec) = self.state.lock().recording.as_mut() {
            rec.log_send(bytes)?;
        }
        self.pty.write(bytes).await
    }

    /// Deliver a signal to the child. A no-op after exit.
    pub(crate) fn signal(&self, sig: Signal) -> Result<()> {
        if self.has_exit() {
            return Ok(());
        }
        if let Some(rec) = self.state.lock().recording.as_mut() {
            rec.log_signal(sig.as_str())?;
        }
        self.pty.signal(sig)
    }
}

/// Handle to a rendered process, returned by [`render`].
///
/// Cloning is cheap and clones share the underlying session.
#[derive(Clone)]
pub struct TermInstance {
    pub(crate) inner: Arc<SessionInner>,
}

impl std::fmt::Debug for TermInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermInstance")
            .field("command", &self.inner.command)
            .finish_non_exhaustive()
    }
}

impl TermInstance {
    /// The command this render spawned, for diagnostics.
    pub fn command(&self) -> &str {
        &self.inner.command
    }

    /// Whether the process has exited. Synchronous, never blocks.
    pub fn has_exit(&self) -> bool {
        self.inner.has_exit()
    }

    /// Exit code/signal once known.
    pub fn exit_info(&self) -> Option<ExitInfo> {
        self.inner.exit_info()
    }

    /// Current rendered screen text.
    pub fn render_text(&self) -> String {
        self.inner.render_text()
    }

    /// Send raw bytes to the process, the escape hatch for control
    /// sequences with no semantic helper.
    pub async fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        self.inner.write_bytes(bytes).await
    }

    /// Discard everything rendered so far, so subsequent queries only see
    /// output produced after this point. The process itself is untouched;
    /// its next redraw repopulates the tree.
    pub fn clear(&self) {
        let mutations = {
            let mut st = self.inner.state.lock();
            st.screen.reset();
            st.tree.sync(&Frame::empty())
        };
        self.inner.publish(mutations);
    }

    /// Subscribe to flushed mutation batches. Only batches flushed after
    /// subscription are delivered. Returns `None` once torn down.
    #[doc(hidden)]
    pub fn subscribe_batches(&self) -> Option<BatchReceiver> {
        self.inner.subscribe()
    }

    /// Tear this render down: settle pending waiters, terminate the
    /// process if still alive, and wait for its exit notification.
    ///
    /// Idempotent; the process is killed with SIGKILL if it has not
    /// already exited.
    pub async fn cleanup(&self) -> Result<()> {
        // Dropping the sender closes the channel; pending waiters settle
        // with `TornDown` instead of hanging.
        drop(self.inner.notify.lock().take());

        if !self.has_exit() {
            let _ = self.inner.pty.signal(Signal::SIGKILL);
        }

        let mut rx = self.inner.exit_rx.clone();
        while rx.borrow().is_none() {
            if rx.changed().await.is_err() {
                break;
            }
        }

        if let Some(rec) = self.inner.state.lock().recording.as_mut() {
            rec.flush()?;
        }
        Ok(())
    }
}

/// Spawn `command args...` and return the bound query/event surface.
pub async fn render(command: &str, args: &[&str]) -> Result<TermInstance> {
    render_with_options(command, args, RenderOptions::default()).await
}

/// Like [`render`], with explicit spawn options, configuration, and
/// optional recording.
pub async fn render_with_options(
    command: &str,
    args: &[&str],
    options: RenderOptions,
) -> Result<TermInstance> {
    let config = options.config.unwrap_or_else(get_config);

    let recording = options
        .record_to
        .as_deref()
        .map(Recording::new)
        .transpose()?;

    let pty = Pty::spawn(command, args, &options.spawn)?;
    let (exit_tx, exit_rx) = watch::channel(None);

    let inner = Arc::new(SessionInner {
        command: command.to_string(),
        pty,
        config: config.clone(),
        state: Mutex::new(SessionState {
            screen: Screen::new(options.spawn.cols, options.spawn.rows),
            tree: Tree::new(),
            recording,
        }),
        notify: Mutex::new(Some(crate::observer::channel())),
        batch_seq: AtomicU64::new(0),
        exit_tx,
        exit_rx,
    });

    tokio::spawn(pump(Arc::clone(&inner)));

    // Give the child a moment to produce its first output before the
    // caller starts querying.
    tokio::time::sleep(config.render_await_time).await;

    let instance = TermInstance { inner };
    registry().lock().push(instance.clone());
    Ok(instance)
}

/// Tear down every render created since the last cleanup. Intended to run
/// once per test.
///
/// Every drained render is torn down even when an earlier one fails; the
/// first failure is returned after the rest have been handled.
pub async fn cleanup() -> Result<()> {
    let drained: Vec<TermInstance> = {
        let mut renders = registry().lock();
        renders.drain(..).collect()
    };
    let mut first_error = None;
    for instance in drained {
        if let Err(e) = instance.cleanup().await {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn registry() -> &'static Mutex<Vec<TermInstance>> {
    static RENDERS: Mutex<Vec<TermInstance>> = Mutex::new(Vec::new());
    &RENDERS
}

/// Read-side pump: PTY bytes through screen and tree into debounced
/// batches, then exit handling at EOF.
async fn pump(inner: Arc<SessionInner>) {
    let mut buf = [0u8; 4096];
    let mut debouncer = Debouncer::new(inner.config.error_debounce_timeout);

    loop {
        let flush_at = debouncer.deadline();
        tokio::select! {
            read = inner.pty.read(&mut buf) => match read {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let mutations = ingest(&inner, &buf[..n]);
                    debouncer.push(mutations);
                }
            },
            _ = sleep_until_opt(flush_at) => {
                if let Some(batch) = debouncer.take_batch() {
                    inner.publish(batch);
                }
            }
        }
    }

    // EOF: reap exactly once, then publish exit so waiters re-evaluate.
    let pid = inner.pty.pid();
    let info = tokio::task::spawn_blocking(move || Pty::reap_blocking(pid))
        .await
        .unwrap_or(ExitInfo {
            code: Some(1),
            signal: None,
        });

    let root = {
        let mut st = inner.state.lock();
        if let Some(rec) = st.recording.as_mut() {
            let _ = rec.log_exit(&info);
            let _ = rec.flush();
        }
        st.tree.root()
    };
    let _ = inner.exit_tx.send(Some(info));

    let mut mutations = debouncer.take_batch().unwrap_or_default();
    mutations.push(Mutation::attribute(root, "exited", None));
    inner.publish(mutations);
}

/// Feed one chunk through screen and tree, returning the resulting
/// mutations. Empty when nothing visible changed.
fn ingest(inner: &SessionInner, chunk: &[u8]) -> Vec<Mutation> {
    let mut st = inner.state.lock();
    if let Some(rec) = st.recording.as_mut() {
        let _ = rec.append_raw(chunk);
    }
    st.screen.feed(chunk);
    match st.screen.take_frame() {
        Some(frame) => {
            let mutations = st.tree.sync(&frame);
            if let Some(rec) = st.recording.as_mut() {
                let _ = rec.log_frame(&frame.text());
            }
            mutations
        }
        None => Vec::new(),
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}
