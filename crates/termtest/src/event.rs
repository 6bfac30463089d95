// SPDX-License-Identifier: MIT

//! Event dispatch: raw writes, signals, and keyboard sequences.
//!
//! [`fire_event`] is the low-level surface: verbatim byte writes and
//! process signals, resolved through the element's owning session.
//! [`user_event`] sits on top and translates a human-readable key-sequence
//! string into control bytes: literal characters map to themselves and
//! bracketed tokens like `[ArrowDown]` map to fixed escape sequences, with
//! `[[` escaping a literal `[`. Each translated unit is written in order.

use crate::error::{Error, Result};

/// Key token table. Matches what a vt100-style terminal sends for each key.
fn token_bytes(token: &str) -> Option<&'static [u8]> {
    let bytes: &'static [u8] = match token {
        "ArrowUp" => b"\x1b[A",
        "ArrowDown" => b"\x1b[B",
        "ArrowRight" => b"\x1b[C",
        "ArrowLeft" => b"\x1b[D",
        "Enter" => b"\r",
        "Tab" => b"\t",
        "Escape" => b"\x1b",
        "Backspace" => b"\x7f",
        "Space" => b" ",
        _ => return None,
    };
    Some(bytes)
}

/// Translate a key-sequence string into write units, preserving order.
pub(crate) fn translate_keyboard(keys: &str) -> Result<Vec<Vec<u8>>> {
    let mut units = Vec::new();
    let mut chars = keys.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '[' {
            let mut unit = [0u8; 4];
            units.push(c.encode_utf8(&mut unit).as_bytes().to_vec());
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            units.push(b"[".to_vec());
            continue;
        }
        let mut token = String::new();
        loop {
            match chars.next() {
                Some(']') => break,
                Some(c) => token.push(c),
                None => return Err(Error::UnknownKey(token)),
            }
        }
        match token_bytes(&token) {
            Some(bytes) => units.push(bytes.to_vec()),
            None => return Err(Error::UnknownKey(token)),
        }
    }

    Ok(units)
}

/// Low-level events: raw writes and signals.
pub mod fire_event {
    use nix::sys::signal::Signal;

    use crate::error::Result;
    use crate::queries::Element;

    /// Forward raw bytes verbatim to the owning process's stdin. The
    /// escape hatch for arbitrary control sequences.
    pub async fn write(element: &Element, bytes: &[u8]) -> Result<()> {
        element.session.write_bytes(bytes).await
    }

    /// Deliver SIGTERM to the owning process.
    pub fn sigterm(element: &Element) -> Result<()> {
        element.session.signal(Signal::SIGTERM)
    }

    /// Deliver SIGKILL to the owning process.
    pub fn sigkill(element: &Element) -> Result<()> {
        element.session.signal(Signal::SIGKILL)
    }
}

/// High-level semantic events.
pub mod user_event {
    use crate::error::Result;
    use crate::queries::Element;

    /// Type a key sequence at the owning process. Literal characters pass
    /// through; bracketed tokens become control bytes.
    pub async fn keyboard(element: &Element, keys: &str) -> Result<()> {
        for unit in super::translate_keyboard(keys)? {
            element.session.write_bytes(&unit).await?;
        }
        Ok(())
    }
}

impl crate::session::TermInstance {
    /// Bound form of [`user_event::keyboard`], targeting this render.
    pub async fn keyboard(&self, keys: &str) -> Result<()> {
        for unit in translate_keyboard(keys)? {
            self.inner.write_bytes(&unit).await?;
        }
        Ok(())
    }

    /// Bound form of [`fire_event::sigterm`].
    pub fn sigterm(&self) -> Result<()> {
        self.inner.signal(nix::sys::signal::Signal::SIGTERM)
    }

    /// Bound form of [`fire_event::sigkill`].
    pub fn sigkill(&self) -> Result<()> {
        self.inner.signal(nix::sys::signal::Signal::SIGKILL)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
