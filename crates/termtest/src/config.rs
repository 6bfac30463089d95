// SPDX-License-Identifier: MIT

//! Process-wide configuration.
//!
//! Timeouts live in a single shared record with `configure`/`get_config`
//! access. There is no automatic scoping: a test that mutates the shared
//! record must capture a snapshot first and restore it afterwards. Tests
//! that need isolation should instead pass their own record through
//! [`RenderOptions::config`](crate::RenderOptions).

use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

/// Timing configuration shared by all renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Upper bound for `find_by_*` and `wait_for` before they fail with
    /// [`Error::Timeout`](crate::Error::Timeout).
    pub async_util_timeout: Duration,
    /// Quiet period after the last mutation before a batch is flushed to
    /// observers. Absorbs bursty multi-line redraws into one update.
    pub error_debounce_timeout: Duration,
    /// Grace period after spawn before `render` resolves, giving the child
    /// a chance to produce its first output.
    pub render_await_time: Duration,
}

impl Config {
    pub const DEFAULT: Config = Config {
        async_util_timeout: Duration::from_millis(1000),
        error_debounce_timeout: Duration::from_millis(30),
        render_await_time: Duration::from_millis(100),
    };
}

impl Default for Config {
    fn default() -> Self {
        Config::DEFAULT
    }
}

/// Partial update applied by [`configure`].
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptions {
    pub async_util_timeout: Option<Duration>,
    pub error_debounce_timeout: Option<Duration>,
    pub render_await_time: Option<Duration>,
}

static CONFIG: RwLock<Config> = RwLock::new(Config::DEFAULT);

/// Merge the given options into the shared configuration.
pub fn configure(options: ConfigureOptions) {
    let mut config = CONFIG.write();
    if let Some(t) = options.async_util_timeout {
        config.async_util_timeout = t;
    }
    if let Some(t) = options.error_debounce_timeout {
        config.error_debounce_timeout = t;
    }
    if let Some(t) = options.render_await_time {
        config.render_await_time = t;
    }
}

/// Snapshot of the shared configuration.
pub fn get_config() -> Config {
    CONFIG.read().clone()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
