// SPDX-License-Identifier: MIT

//! Stream parser: raw terminal output into rendered frames.
//!
//! Wraps the avt virtual terminal, which interprets cursor movement, line
//! and screen clears, carriage-return overwrites, and color/style sequences
//! and silently drops anything it does not recognize. The result is the
//! text a terminal screen would display, not a concatenation of every byte
//! ever received.
//!
//! A frame is emitted only when the rendered content actually changed, so
//! invisible writes (style-only updates, rewrites of identical text) never
//! propagate downstream.

/// One rendered snapshot of the terminal at a redraw boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Rendered lines, trailing whitespace and trailing blank lines removed.
    pub lines: Vec<String>,
}

impl Frame {
    pub fn empty() -> Self {
        Frame { lines: Vec::new() }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Terminal screen state with change detection.
pub struct Screen {
    vt: avt::Vt,
    cols: u16,
    rows: u16,
    /// Trailing bytes of an incomplete UTF-8 sequence, carried to the next
    /// chunk so arbitrary chunk boundaries render identically.
    carry: Vec<u8>,
    last: Option<Vec<String>>,
}

impl Screen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            vt: avt::Vt::new(cols as usize, rows as usize),
            cols,
            rows,
            carry: Vec::new(),
            last: None,
        }
    }

    /// Feed one chunk of raw output through the parser.
    ///
    /// Invalid bytes mid-stream become U+FFFD and the scan continues, so an
    /// incomplete multi-byte sequence at the end of the chunk is still
    /// carried rather than mangled.
    pub fn feed(&mut self, data: &[u8]) {
        let mut bytes = std::mem::take(&mut self.carry);
        bytes.extend_from_slice(data);

        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.vt.feed_str(text);
                    return;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        self.vt.feed_str(text);
                    }
                    match err.error_len() {
                        // Incomplete sequence at the end of the chunk.
                        None => {
                            self.carry = tail.to_vec();
                            return;
                        }
                        Some(invalid) => {
                            self.vt.feed_str("\u{fffd}");
                            rest = &tail[invalid..];
                        }
                    }
                }
            }
        }
    }

    /// Render the current screen state as text.
    pub fn render(&self) -> String {
        self.rendered_lines().join("\n")
    }

    /// Return a frame if the rendered content changed since the last one.
    pub fn take_frame(&mut self) -> Option<Frame> {
        let lines = self.rendered_lines();
        if self.last.as_ref() == Some(&lines) {
            return None;
        }
        self.last = Some(lines.clone());
        Some(Frame { lines })
    }

    /// Discard all rendered content, as if the terminal were cleared.
    /// Subsequent output from the process repopulates the screen.
    pub fn reset(&mut self) {
        self.vt = avt::Vt::new(self.cols as usize, self.rows as usize);
        self.carry.clear();
        self.last = Some(Vec::new());
    }

    fn rendered_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .vt
            .text()
            .iter()
            .map(|l| l.trim_end().to_string())
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }
}

#[cfg(test)]
#[path = "screen_tests.rs"]
mod tests;
