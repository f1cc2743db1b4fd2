//! Spawning a child process on a new PTY
//!
//! The PTY pair is allocated and the process forked in one `forkpty` call, so
//! the child's controlling terminal, stdio and line discipline are in place
//! before any of our code runs in it.
//!
//! All argument, environment and path data is marshalled before the fork.
//! The child branch then only calls `chdir`, `execvpe`, `write` and `_exit`.
//!
//! Failures inside the child (bad working directory, program not found) are
//! not reported back to the parent. `spawn` succeeds and the child exits
//! early with a non-zero status, which the caller sees through
//! [`wait_for`](crate::reaper::wait_for):
//!
//! | Cause                          | Exit status |
//! |--------------------------------|-------------|
//! | `chdir` failed                 | 1           |
//! | program not found              | 127         |
//! | program found but not runnable | 126         |

use std::ffi::{CString, OsStr, OsString};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::ptr;

use libc::{c_char, c_int};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::Pid;

use crate::child_log;
use crate::error::{Error, Result};
use crate::marshal::{dup_entry, CStringArray};
use crate::mode::TerminalMode;
use crate::size::WindowSize;

/// Exit status of a child whose working directory could not be entered
pub const EXIT_CHDIR_FAILED: i32 = 1;
/// Exit status of a child whose program exists but could not be executed
pub const EXIT_EXEC_FAILED: i32 = 126;
/// Exit status of a child whose program could not be found
pub const EXIT_NOT_FOUND: i32 = 127;

/// A child process and the master side of its PTY
///
/// Both halves belong to the caller. Dropping the handle closes the master
/// descriptor; it does not reap the child, so call
/// [`wait_for`](crate::reaper::wait_for) with [`pid`](Self::pid) first or
/// keep the pid around.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    master: OwnedFd,
}

impl ProcessHandle {
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Raw master descriptor, still owned by the handle
    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    /// Give up the handle, keeping the pid and the master descriptor
    pub fn into_parts(self) -> (Pid, OwnedFd) {
        (self.pid, self.master)
    }
}

impl AsFd for ProcessHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.master.as_fd()
    }
}

impl AsRawFd for ProcessHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }
}

/// Spawn `command` on a new PTY with the default terminal mode
///
/// `command[0]` is resolved through the search path. `environment` is passed
/// as is: `KEY=VALUE` entries, duplicates left to the loader.
///
/// The master descriptor is marked close-on-exec only after `forkpty`
/// returns. If another thread forks in that window, its child inherits the
/// master, and possibly the slave glibc has not closed yet in the parent,
/// which delays EIO on the master until that child execs or exits. Callers
/// spawning from several threads should serialize their forks.
pub fn spawn<C, E, A, B, D>(command: C, environment: E, working_dir: D) -> Result<ProcessHandle>
where
    C: IntoIterator<Item = A>,
    A: AsRef<OsStr>,
    E: IntoIterator<Item = B>,
    B: AsRef<OsStr>,
    D: AsRef<OsStr>,
{
    let argv = CStringArray::new(command)?;
    let envp = CStringArray::new(environment)?;
    let cwd = marshal_working_dir(working_dir.as_ref())?;
    spawn_marshalled(&argv, &envp, &cwd, TerminalMode::default(), None)
}

/// Builder for a PTY child with a custom mode, environment or window size
#[derive(Debug, Clone)]
pub struct PtyCommand {
    argv: Vec<OsString>,
    env: Vec<OsString>,
    cwd: OsString,
    mode: TerminalMode,
    size: Option<WindowSize>,
}

impl PtyCommand {
    /// Start a command line with `program` as `argv[0]`
    ///
    /// The child inherits the parent's environment and working directory
    /// unless told otherwise.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        let env = std::env::vars_os()
            .map(|(key, value)| env_entry(&key, &value))
            .collect();

        PtyCommand {
            argv: vec![program.as_ref().to_os_string()],
            env,
            cwd: OsString::from("."),
            mode: TerminalMode::default(),
            size: None,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.argv.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.argv
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable, replacing any earlier value for `key`
    pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(mut self, key: K, value: V) -> Self {
        let key = key.as_ref();
        self.env.retain(|entry| !entry_has_key(entry, key));
        self.env.push(env_entry(key, value.as_ref()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        for (key, value) in vars {
            self = self.env(key, value);
        }
        self
    }

    pub fn env_remove<K: AsRef<OsStr>>(mut self, key: K) -> Self {
        let key = key.as_ref();
        self.env.retain(|entry| !entry_has_key(entry, key));
        self
    }

    /// Replace the environment with `entries`, passed to the child verbatim
    ///
    /// No parsing and no de-duplication: `KEY=VALUE` entries, repeated keys
    /// and entries without `=` all reach the loader as given.
    pub fn env_entries<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.env = entries
            .into_iter()
            .map(|e| e.as_ref().to_os_string())
            .collect();
        self
    }

    /// Start from an empty environment
    pub fn env_clear(mut self) -> Self {
        self.env.clear();
        self
    }

    pub fn current_dir<S: AsRef<OsStr>>(mut self, dir: S) -> Self {
        self.cwd = dir.as_ref().to_os_string();
        self
    }

    pub fn mode(mut self, mode: TerminalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Window size applied when the PTY is allocated
    pub fn window_size(mut self, size: WindowSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn get_argv(&self) -> &[OsString] {
        &self.argv
    }

    pub fn get_env(&self) -> &[OsString] {
        &self.env
    }

    pub fn get_current_dir(&self) -> &OsStr {
        &self.cwd
    }

    pub fn spawn(&self) -> Result<ProcessHandle> {
        let argv = CStringArray::new(&self.argv)?;
        let envp = CStringArray::new(&self.env)?;
        let cwd = marshal_working_dir(&self.cwd)?;
        spawn_marshalled(&argv, &envp, &cwd, self.mode.clone(), self.size)
    }
}

fn marshal_working_dir(dir: &OsStr) -> Result<CString> {
    dup_entry(dir.as_bytes(), 0).map_err(|e| match e {
        Error::InteriorNul { .. } => Error::InvalidWorkingDir,
        other => other,
    })
}

fn env_entry(key: &OsStr, value: &OsStr) -> OsString {
    let mut entry = Vec::with_capacity(key.len() + 1 + value.len());
    entry.extend_from_slice(key.as_bytes());
    entry.push(b'=');
    entry.extend_from_slice(value.as_bytes());
    OsString::from_vec(entry)
}

fn entry_has_key(entry: &OsStr, key: &OsStr) -> bool {
    let entry = entry.as_bytes();
    let key = key.as_bytes();
    entry.len() > key.len() && entry.starts_with(key) && entry[key.len()] == b'='
}

fn spawn_marshalled(
    argv: &CStringArray,
    envp: &CStringArray,
    cwd: &CString,
    mode: TerminalMode,
    size: Option<WindowSize>,
) -> Result<ProcessHandle> {
    let program = argv.get(0).ok_or(Error::EmptyCommand)?;

    let mut termios = mode.into_termios();
    let mut winsize = size.map(WindowSize::to_winsize);
    let winp = winsize
        .as_mut()
        .map_or(ptr::null_mut(), |ws| ws as *mut libc::winsize);
    let mut master: c_int = -1;

    // SAFETY: all pointers are valid for the duration of the call. In the
    // child we only touch memory marshalled above and async-signal-safe calls.
    let pid = unsafe { libc::forkpty(&mut master, ptr::null_mut(), &mut termios, winp) };

    match pid {
        -1 => {
            let errno = Errno::last();
            tracing::warn!(program = ?program, error = %errno, "forkpty failed");
            Err(Error::SpawnFailed(errno))
        },
        0 => {
            // SAFETY: we are the freshly forked child; this never returns
            unsafe { exec_child(argv, envp, cwd) }
        },
        child => {
            // SAFETY: forkpty handed us a fresh master descriptor we now own
            let master = unsafe { OwnedFd::from_raw_fd(master) };
            if let Err(e) = fcntl(master.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)) {
                tracing::warn!(error = %e, "could not mark PTY master close-on-exec");
            }
            let pid = Pid::from_raw(child);
            tracing::debug!(
                pid = pid.as_raw(),
                master_fd = master.as_raw_fd(),
                program = ?program,
                "spawned child on PTY"
            );
            Ok(ProcessHandle { pid, master })
        },
    }
}

/// Child side of the fork: enter `cwd` and exec, or `_exit`
///
/// # Safety
/// Must only be called in a freshly forked child. Calls nothing that is not
/// async-signal-safe.
unsafe fn exec_child(argv: &CStringArray, envp: &CStringArray, cwd: &CString) -> ! {
    if libc::chdir(cwd.as_ptr()) != 0 {
        child_log::report(b"chdir failed", cwd.as_bytes(), Errno::last() as c_int);
        libc::_exit(EXIT_CHDIR_FAILED);
    }

    let errno = exec_with_env(argv.as_ptr(), envp.as_ptr());

    let program = argv.get(0).map(|p| p.to_bytes()).unwrap_or_default();
    child_log::report(b"exec failed", program, errno as c_int);
    if errno == Errno::ENOENT {
        libc::_exit(EXIT_NOT_FOUND);
    }
    libc::_exit(EXIT_EXEC_FAILED);
}

/// PATH-searching exec with an explicit environment; returns only on failure
#[cfg(any(target_os = "linux", target_os = "android"))]
unsafe fn exec_with_env(argv: *const *const c_char, envp: *const *const c_char) -> Errno {
    libc::execvpe(*argv, argv, envp);
    Errno::last()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
unsafe fn exec_with_env(argv: *const *const c_char, envp: *const *const c_char) -> Errno {
    extern "C" {
        static mut environ: *const *const c_char;
    }
    // execvp searches PATH from the current environment, so install envp first
    environ = envp;
    libc::execvp(*argv, argv);
    Errno::last()
}
