// SPDX-License-Identifier: MIT

//! Session recording for post-mortem debugging.
//!
//! When [`RenderOptions::record_to`](crate::RenderOptions) is set, a render
//! writes three artifacts into the directory: `recording.jsonl` (timestamped
//! events: frames, sends, signals, exit), `raw.bin` (the verbatim PTY byte
//! stream), and numbered `NNNNNN.txt` frame files with a `latest.txt`
//! symlink. A failed test can be replayed from these without re-running the
//! process.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::json;

use crate::error::Result;
use crate::pty::ExitInfo;

pub struct Recording {
    start: Instant,
    dir: PathBuf,
    jsonl: BufWriter<File>,
    raw: BufWriter<File>,
    frame_seq: u64,
}

impl Recording {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let jsonl = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dir.join("recording.jsonl"))?;

        let raw = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(dir.join("raw.bin"))?;

        Ok(Self {
            start: Instant::now(),
            dir: dir.to_path_buf(),
            jsonl: BufWriter::new(jsonl),
            raw: BufWriter::new(raw),
            frame_seq: 0,
        })
    }

    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn log(&mut self, event: serde_json::Value) -> Result<()> {
        writeln!(self.jsonl, "{}", event)?;
        Ok(())
    }

    /// Write a numbered frame file and log it. Returns the frame number.
    pub fn log_frame(&mut self, rendered: &str) -> Result<u64> {
        self.frame_seq += 1;
        let seq = self.frame_seq;

        let path = self.dir.join(format!("{:06}.txt", seq));
        std::fs::write(&path, rendered)?;

        let latest = self.dir.join("latest.txt");
        let _ = std::fs::remove_file(&latest);
        std::os::unix::fs::symlink(&path, &latest)?;

        self.log(json!({"ms": self.elapsed_ms(), "frame": seq}))
            .map(|_| seq)
    }

    pub fn log_send(&mut self, bytes: &[u8]) -> Result<()> {
        let printable = format_send(bytes);
        self.log(json!({"ms": self.elapsed_ms(), "send": printable}))
    }

    pub fn log_signal(&mut self, name: &str) -> Result<()> {
        self.log(json!({"ms": self.elapsed_ms(), "signal": name}))
    }

    pub fn log_exit(&mut self, info: &ExitInfo) -> Result<()> {
        self.log(json!({"ms": self.elapsed_ms(), "exit": info}))
    }

    pub fn append_raw(&mut self, data: &[u8]) -> Result<()> {
        self.raw.write_all(data)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.jsonl.flush()?;
        self.raw.flush()?;
        Ok(())
    }
}

/// Human-readable rendition of sent bytes for the event log.
fn format_send(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            0x1b => out.push_str("<Esc>"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x01..=0x1a => {
                out.push_str("<C-");
                out.push((b'a' + b - 1) as char);
                out.push('>');
            }
            0x7f => out.push_str("<Backspace>"),
            _ => out.push(b as char),
        }
    }
    out
}

#[cfg(test)]
#[path = "recording_tests.rs"]
mod tests;
