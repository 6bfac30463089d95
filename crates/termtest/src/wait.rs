// SPDX-License-Identifier: MIT

//! Asynchronous waiting: `wait_for` and `find_by_*`.
//!
//! A waiter evaluates its predicate immediately, then subscribes to the
//! mutation observer and re-evaluates on every flushed batch, racing a
//! timer of [`Config::async_util_timeout`](crate::Config). Predicate
//! failures during polling are swallowed and retried; the predicate is
//! expected to fail while the content has not appeared yet. When the timer
//! expires first, the final failure is surfaced inside
//! [`Error::Timeout`](crate::Error::Timeout) together with the last
//! rendered screen.
//!
//! Each waiter holds its own subscription; a timeout cancels only that
//! waiter. Waiters against a torn-down render settle with
//! [`Error::TornDown`](crate::Error::TornDown) rather than hanging.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;

use crate::error::{Error, Result};
use crate::pty::ExitInfo;
use crate::queries::{Element, Matcher};
use crate::session::TermInstance;

/// Options for a single wait.
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    /// Override for the configured `async_util_timeout`.
    pub timeout: Option<Duration>,
}

impl TermInstance {
    /// Poll `predicate` until it succeeds or the configured timeout
    /// elapses.
    pub async fn wait_for<T, F>(&self, predicate: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        self.wait_for_with_options(predicate, WaitOptions::default())
            .await
    }

    /// [`wait_for`](Self::wait_for) with an explicit timeout.
    pub async fn wait_for_with_options<T, F>(
        &self,
        mut predicate: F,
        options: WaitOptions,
    ) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let timeout = options
            .timeout
            .unwrap_or(self.inner.config().async_util_timeout);
        let deadline = tokio::time::Instant::now() + timeout;

        // Subscribe before the first evaluation so a batch flushed in
        // between cannot be missed.
        let receiver = self.inner.subscribe();

        let mut last_error = match predicate() {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let Some(mut receiver) = receiver else {
            return Err(Error::TornDown);
        };

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(Error::Timeout {
                        timeout,
                        last_error: Box::new(last_error),
                        last_frame: self.render_text(),
                    });
                }
                received = receiver.recv() => match received {
                    // A lagged waiter missed batches; the tree is current
                    // anyway, so just re-evaluate.
                    Ok(_) | Err(RecvError::Lagged(_)) => match predicate() {
                        Ok(value) => return Ok(value),
                        Err(e) => last_error = e,
                    },
                    Err(RecvError::Closed) => return Err(Error::TornDown),
                },
            }
        }
    }

    /// Wait for an element matching `matcher` to appear.
    pub async fn find_by_text(&self, matcher: impl Into<Matcher>) -> Result<Element> {
        self.find_by_text_with_options(matcher, WaitOptions::default())
            .await
    }

    /// [`find_by_text`](Self::find_by_text) with an explicit timeout.
    pub async fn find_by_text_with_options(
        &self,
        matcher: impl Into<Matcher>,
        options: WaitOptions,
    ) -> Result<Element> {
        let matcher = matcher.into();
        self.wait_for_with_options(|| self.get_by_text_matcher(&matcher), options)
            .await
    }

    /// Wait for the process to exit and return its exit info.
    pub async fn wait_for_exit(&self) -> Result<ExitInfo> {
        self.wait_for(|| {
            self.exit_info()
                .ok_or_else(|| Error::predicate("process has not exited"))
        })
        .await
    }
}

/// Free-function form of [`TermInstance::wait_for`].
pub async fn wait_for<T, F>(instance: &TermInstance, predicate: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    instance.wait_for(predicate).await
}

/// Free-function form of [`TermInstance::find_by_text`].
pub async fn find_by_text(instance: &TermInstance, matcher: impl Into<Matcher>) -> Result<Element> {
    instance.find_by_text(matcher).await
}
