//! Reaping spawned children
//!
//! One blocking `waitpid` per call, no timeout, no retry. To give up on a
//! wait, run it on its own thread and signal the child.
//!
//! Waiting twice on the same pid is undefined: after the first wait reaps
//! the child the identifier may already belong to an unrelated process.

use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;

use crate::error::{Error, Result};

/// Exit status reported for anything but a normal exit
pub const UNCLASSIFIED_EXIT: i32 = -1;

/// How a child ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with this status code
    Exited(i32),
    /// Killed by a signal
    Signaled(Signal),
    /// A status waitpid reported that is neither of the above
    Other,
}

impl Termination {
    /// Collapse to a single integer: the exit code, or `UNCLASSIFIED_EXIT`
    pub fn code(self) -> i32 {
        match self {
            Termination::Exited(code) => code,
            Termination::Signaled(_) | Termination::Other => UNCLASSIFIED_EXIT,
        }
    }

    pub fn success(self) -> bool {
        self == Termination::Exited(0)
    }
}

impl From<WaitStatus> for Termination {
    fn from(status: WaitStatus) -> Self {
        match status {
            WaitStatus::Exited(_, code) => Termination::Exited(code),
            WaitStatus::Signaled(_, signal, _) => Termination::Signaled(signal),
            _ => Termination::Other,
        }
    }
}

/// Block until `pid` terminates and decode how it ended
///
/// An invalid or already reaped pid is reported as `Error::Wait` with
/// whatever errno waitpid gave.
pub fn wait_termination(pid: Pid) -> Result<Termination> {
    let status = waitpid(pid, None).map_err(Error::Wait)?;
    let termination = Termination::from(status);
    match termination {
        Termination::Exited(code) => {
            tracing::debug!(pid = pid.as_raw(), code, "child exited");
        },
        Termination::Signaled(signal) => {
            tracing::warn!(pid = pid.as_raw(), signal = %signal, "child killed by signal");
        },
        Termination::Other => {
            tracing::warn!(pid = pid.as_raw(), status = ?status, "unclassified wait status");
        },
    }
    Ok(termination)
}

/// Block until `pid` terminates; its exit code, or `UNCLASSIFIED_EXIT`
pub fn wait_for(pid: Pid) -> Result<i32> {
    wait_termination(pid).map(Termination::code)
}
