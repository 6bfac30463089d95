// SPDX-License-Identifier: MIT

//! Drive interactive command-line processes from tests.
//!
//! termtest spawns a process attached to a pseudo-terminal, incrementally
//! parses its output into a queryable document of rendered lines, and lets
//! tests wait for asynchronously appearing text and send keystrokes or
//! signals, in the style of a DOM testing library rather than raw
//! byte-stream matching.
//!
//! ```no_run
//! use termtest::{render, user_event, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let instance = render("my-cli", &["init"]).await?;
//!
//!     let prompt = instance.find_by_text("Project name?").await?;
//!     user_event::keyboard(&prompt, "demo[Enter]").await?;
//!
//!     instance.find_by_text("Created demo").await?;
//!     instance.cleanup().await?;
//!     Ok(())
//! }
//! ```
//!
//! Output is interpreted through a virtual terminal, so prompt libraries
//! that redraw with cursor movement, carriage returns, and clear sequences
//! produce the text a real screen would show. Redraw bursts are debounced
//! into batched mutation notifications, and `find_by_*`/`wait_for`
//! re-evaluate on each batch until they succeed or time out.
//!
//! Unix only: process control is built on PTYs and POSIX signals.

mod config;
mod error;
mod event;
mod observer;
mod pty;
mod queries;
mod recording;
mod screen;
mod session;
mod tree;
mod wait;

pub use config::{configure, get_config, Config, ConfigureOptions};
pub use error::{Error, Result};
pub use event::{fire_event, user_event};
pub use observer::{BatchReceiver, MutationBatch};
pub use pty::{ExitInfo, SpawnOptions};
pub use queries::{Element, Matcher};
pub use screen::{Frame, Screen};
pub use session::{cleanup, render, render_with_options, RenderOptions, TermInstance};
pub use tree::{Mutation, MutationKind, Node, NodeId, NodeKind};
pub use wait::{find_by_text, wait_for, WaitOptions};
