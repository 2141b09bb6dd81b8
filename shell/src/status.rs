use nix::sys::wait::WaitStatus;
use std::fmt;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by the given signal number.
    Signaled(i32),
}

impl Completion {
    /// Maps a final wait status to a completion record.
    ///
    /// Returns `None` for statuses that do not mean the child is gone
    /// (still running, stopped, continued).
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Completion::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Completion::Signaled(signal as i32)),
            _ => None,
        }
    }

    pub fn is_signaled(&self) -> bool {
        matches!(self, Completion::Signaled(_))
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Exited(code) => write!(f, "exit value {code}"),
            Completion::Signaled(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}

/// Completion of the most recent foreground command, if any has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForegroundStatus(Option<Completion>);

impl ForegroundStatus {
    pub fn record(&mut self, completion: Completion) {
        self.0 = Some(completion);
    }

    pub fn last(&self) -> Option<Completion> {
        self.0
    }
}

impl fmt::Display for ForegroundStatus {
    /// Before any foreground command has run this reads `exit value 0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(completion) => completion.fmt(f),
            None => Completion::Exited(0).fmt(f),
        }
    }
}
