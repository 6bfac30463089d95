// SPDX-License-Identifier: MIT

//! Error taxonomy for the crate.
//!
//! Query cardinality violations (`NotFound`, `MultipleElements`) and wait
//! timeouts carry the rendered screen at the time of failure so test output
//! shows what the process actually printed.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by spawn, query, wait, and event operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing to a process that has already exited is a hard error, not a
    /// silent no-op.
    #[error("cannot write to '{command}': process has exited")]
    WriteAfterExit { command: String },

    #[error("unable to find an element matching {matcher}\n\nrendered output:\n{rendered}")]
    NotFound { matcher: String, rendered: String },

    #[error("found {count} elements matching {matcher}, expected exactly one\n\nrendered output:\n{rendered}")]
    MultipleElements {
        matcher: String,
        count: usize,
        rendered: String,
    },

    /// A `wait_for`/`find_by_*` exceeded its timeout. Carries the error from
    /// the final predicate attempt and the last rendered screen.
    #[error("timed out after {timeout:?}: {last_error}\n\nlast rendered output:\n{last_frame}")]
    Timeout {
        timeout: Duration,
        #[source]
        last_error: Box<Error>,
        last_frame: String,
    },

    /// The render was torn down (`cleanup`) while the operation was pending.
    #[error("render has been torn down")]
    TornDown,

    /// Unrecognized bracketed token in a `user_event::keyboard` sequence.
    #[error("unknown key token [{0}]")]
    UnknownKey(String),

    /// Generic predicate failure for `wait_for` callers.
    #[error("{0}")]
    Predicate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("system call failed: {0}")]
    Sys(#[from] nix::errno::Errno),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a predicate failure from anything displayable.
    pub fn predicate(msg: impl std::fmt::Display) -> Self {
        Error::Predicate(msg.to_string())
    }
}
