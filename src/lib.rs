//! ptyspawn - run a program on a fresh pseudoterminal
//!
//! This crate allocates a PTY, forks a child bound to the slave side and
//! hands the caller the child's pid and the master descriptor:
//!
//! - `mode`: line discipline profile applied to the slave
//! - `marshal`: argv/envp vectors built before fork
//! - `spawn`: forkpty + exec, returns a [`ProcessHandle`]
//! - `reaper`: blocking wait and exit status decoding
//!
//! What happens on the master side afterwards (reading, writing, resizing) is
//! up to the caller.
//!
//! ```no_run
//! let handle = ptyspawn::spawn(["/bin/echo", "hello"], ["PATH=/bin"], "/")?;
//! let code = ptyspawn::wait_for(handle.pid())?;
//! assert_eq!(code, 0);
//! # Ok::<(), ptyspawn::Error>(())
//! ```
//!
//! Reference: https://www.man7.org/linux/man-pages/man3/forkpty.3.html

#[cfg(not(unix))]
compile_error!("ptyspawn only supports Unix-like systems");

mod child_log;
pub mod config;
mod error;
pub mod marshal;
pub mod mode;
pub mod reaper;
pub mod size;
pub mod spawn;

pub use config::{ModeOverrides, SpawnRequest};
pub use error::{Error, Result};
pub use mode::{ControlChar, TerminalMode};
pub use reaper::{wait_for, wait_termination, Termination, UNCLASSIFIED_EXIT};
pub use size::WindowSize;
pub use spawn::{spawn, ProcessHandle, PtyCommand};

pub use nix::unistd::Pid;
