// SPDX-License-Identifier: MIT

//! Process channel: a child process attached to a pseudo-terminal.
//!
//! Creates a PTY pair, spawns the child on the slave side, and provides
//! async read/write on the master plus signal delivery. This module is the
//! only place with platform-specific process plumbing; everything above it
//! is platform-agnostic. The crate is Unix-only by design.

use std::ffi::CString;
use std::os::fd::{AsFd, AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::pty::{forkpty, Winsize};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{ForkResult, Pid};
use tokio::io::unix::AsyncFd;

use crate::error::{Error, Result};

/// Options for spawning the child process.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables set in the child.
    pub env: Vec<(String, String)>,
    /// Terminal width in columns.
    pub cols: u16,
    /// Terminal height in rows.
    pub rows: u16,
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            env: Vec::new(),
            cols: 80,
            rows: 24,
        }
    }
}

/// How the child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ExitInfo {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal number, if killed by a signal.
    pub signal: Option<i32>,
}

/// A running PTY with a child process attached.
#[derive(Debug)]
pub struct Pty {
    master_fd: AsyncFd<OwnedFd>,
    child_pid: Pid,
}

impl Pty {
    /// Spawn `command args...` in a new PTY.
    ///
    /// The executable is resolved against `PATH` before forking so launch
    /// failures surface synchronously as [`Error::Spawn`].
    pub fn spawn(command: &str, args: &[&str], options: &SpawnOptions) -> Result<Self> {
        let program = resolve_executable(command).map_err(|source| Error::Spawn {
            command: command.to_string(),
            source,
        })?;

        let winsize = Winsize {
            ws_row: options.rows,
            ws_col: options.cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: forkpty is safe to call; it creates a new PTY and forks.
        // In the child we immediately exec, so no shared state issues.
        let result = unsafe { forkpty(&winsize, None).map_err(Error::Sys)? };

        match result.fork_result {
            ForkResult::Child => {
                // SAFETY: restoring SIGPIPE to default is safe in the child
                // before exec; the child has no other threads at this point.
                unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl).ok() };
                // vt100 supports the basic escape sequences the screen
                // parser understands but not the alternate screen.
                std::env::set_var("TERM", "vt100");
                for (key, value) in &options.env {
                    std::env::set_var(key, value);
                }
                if let Some(ref dir) = options.cwd {
                    let _ = nix::unistd::chdir(dir.as_path());
                }
                exec_child(&program, command, args);
            }
            ForkResult::Parent { child } => {
                let master = result.master;
                set_non_blocking(&master)?;

                // SAFETY: we own the master fd from forkpty and transfer
                // ownership; it is not used elsewhere after this point.
                let owned: OwnedFd = unsafe { OwnedFd::from_raw_fd(master.into_raw_fd()) };
                let async_fd = AsyncFd::new(owned)?;

                Ok(Self {
                    master_fd: async_fd,
                    child_pid: child,
                })
            }
        }
    }

    /// Read output from the PTY (child's stdout/stderr). Returns 0 at EOF.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self.master_fd.readable().await?;
            match nb_read(self.master_fd.get_ref(), buf)? {
                Some(n) => return Ok(n),
                None => guard.clear_ready(),
            }
        }
    }

    /// Write raw bytes to the child's stdin.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            let mut guard = self.master_fd.writable().await?;
            match nb_write(self.master_fd.get_ref(), &data[written..])? {
                Some(n) => written += n,
                None => guard.clear_ready(),
            }
        }
        Ok(())
    }

    /// Deliver a signal to the child process.
    pub fn signal(&self, sig: Signal) -> Result<()> {
        nix::sys::signal::kill(self.child_pid, sig)?;
        Ok(())
    }

    /// Child process id.
    pub fn pid(&self) -> Pid {
        self.child_pid
    }

    /// Reap the child, blocking until it exits. Called exactly once, from
    /// the session pump's exit listener on a blocking thread.
    pub fn reap_blocking(pid: Pid) -> ExitInfo {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => ExitInfo {
                code: Some(code),
                signal: None,
            },
            Ok(WaitStatus::Signaled(_, sig, _)) => ExitInfo {
                code: None,
                signal: Some(sig as i32),
            },
            _ => ExitInfo {
                code: Some(1),
                signal: None,
            },
        }
    }
}

/// Exec the resolved program in the child. Never returns; exits 127 if the
/// exec itself fails (the executable was resolved pre-fork, so this only
/// happens on races like deletion between resolve and exec).
fn exec_child(program: &Path, argv0: &str, args: &[&str]) -> ! {
    let program_c = match CString::new(program.as_os_str().as_encoded_bytes()) {
        Ok(c) => c,
        Err(_) => std::process::exit(127),
    };
    let mut argv = Vec::with_capacity(args.len() + 1);
    match CString::new(argv0) {
        Ok(c) => argv.push(c),
        Err(_) => std::process::exit(127),
    }
    for arg in args {
        match CString::new(*arg) {
            Ok(c) => argv.push(c),
            Err(_) => std::process::exit(127),
        }
    }
    let _ = nix::unistd::execv(&program_c, &argv);
    std::process::exit(127)
}

/// Resolve a command name to an executable path the way execvp would.
fn resolve_executable(command: &str) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let is_executable_file = |path: &Path| {
        std::fs::metadata(path)
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    };

    if command.contains('/') {
        let path = PathBuf::from(command);
        if is_executable_file(&path) {
            return Ok(path);
        }
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such executable",
        ));
    }

    let search = std::env::var_os("PATH").unwrap_or_default();
    for dir in std::env::split_paths(&search) {
        let candidate = dir.join(command);
        if is_executable_file(&candidate) {
            return Ok(candidate);
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "executable not found in PATH",
    ))
}

fn set_non_blocking<F: AsRawFd>(fd: &F) -> nix::Result<()> {
    let flags = fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags))?;
    Ok(())
}

/// Non-blocking read; None if the fd would block. EIO means the PTY slave
/// side closed, which reads as EOF.
fn nb_read<F: AsRawFd>(fd: &F, buf: &mut [u8]) -> nix::Result<Option<usize>> {
    match nix::unistd::read(fd.as_raw_fd(), buf) {
        Ok(n) => Ok(Some(n)),
        Err(Errno::EAGAIN) => Ok(None),
        Err(Errno::EIO) => Ok(Some(0)),
        Err(e) => Err(e),
    }
}

/// Non-blocking write; None if the fd would block.
fn nb_write<F: AsFd>(fd: &F, buf: &[u8]) -> nix::Result<Option<usize>> {
    match nix::unistd::write(fd, buf) {
        Ok(n) => Ok(Some(n)),
        Err(Errno::EAGAIN) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
