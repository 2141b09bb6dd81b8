//! Bookkeeping for commands running in the background.

use crate::error::ShellError;
use crate::status::Completion;
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A background job that has finished and been waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: Pid,
    pub completion: Completion,
}

impl fmt::Display for Reaped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background pid {} is done: {}", self.pid, self.completion)
    }
}

/// Ordered, bounded list of live background process ids.
#[derive(Debug)]
pub struct JobRegistry {
    pids: Vec<Pid>,
    capacity: usize,
}

impl JobRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            pids: Vec::new(),
            capacity,
        }
    }

    /// Starts tracking `pid`.
    ///
    /// When the registry is full the request is dropped and
    /// [`ShellError::RegistryFull`] is returned; the process itself keeps
    /// running untracked.
    pub fn add(&mut self, pid: Pid) -> Result<(), ShellError> {
        if self.pids.len() >= self.capacity {
            return Err(ShellError::RegistryFull);
        }
        if !self.pids.contains(&pid) {
            self.pids.push(pid);
        }
        Ok(())
    }

    /// Stops tracking `pid`. Returns `false` if it was not tracked.
    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.pids.iter().position(|&p| p == pid) {
            Some(at) => {
                self.pids.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Collects every tracked job that has finished, without blocking.
    pub fn reap(&mut self) -> Vec<Reaped> {
        self.reap_with(poll_exit)
    }

    /// Like [`reap`](Self::reap), with the non-blocking status check supplied
    /// by the caller. `poll` returns `Ok(None)` while the process is running.
    pub fn reap_with<F>(&mut self, mut poll: F) -> Vec<Reaped>
    where
        F: FnMut(Pid) -> nix::Result<Option<Completion>>,
    {
        let mut done = Vec::new();
        let snapshot = self.pids.clone();
        for pid in snapshot {
            match poll(pid) {
                Ok(Some(completion)) => {
                    debug!("reaped background pid {pid}: {completion}");
                    self.remove(pid);
                    done.push(Reaped { pid, completion });
                }
                Ok(None) => {}
                Err(Errno::ECHILD) => {
                    warn!("background pid {pid} is no longer our child; dropping it");
                    self.remove(pid);
                }
                Err(e) => warn!("waitpid({pid}) failed: {e}"),
            }
        }
        done
    }

    /// Sends SIGTERM to every tracked job and waits for each to end.
    ///
    /// With a grace period, a job still alive at the deadline is killed with
    /// SIGKILL. Without one the wait is unbounded.
    pub fn terminate_all(&mut self, grace: Option<Duration>) {
        for pid in std::mem::take(&mut self.pids) {
            debug!("terminating background pid {pid}");
            if let Err(e) = kill(pid, Signal::SIGTERM) {
                warn!("kill({pid}, SIGTERM) failed: {e}");
            }
            match grace {
                Some(grace) => wait_with_deadline(pid, Instant::now() + grace),
                None => wait_blocking(pid),
            }
        }
    }
}

fn poll_exit(pid: Pid) -> nix::Result<Option<Completion>> {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG))? {
        WaitStatus::StillAlive => Ok(None),
        status => Ok(Completion::from_wait_status(status)),
    }
}

fn wait_blocking(pid: Pid) {
    loop {
        match waitpid(pid, None) {
            Ok(status) if Completion::from_wait_status(status).is_some() => return,
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(_) => return,
        }
    }
}

fn wait_with_deadline(pid: Pid, deadline: Instant) {
    loop {
        match poll_exit(pid) {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(Errno::EINTR) => continue,
            Err(_) => return,
        }
        if Instant::now() >= deadline {
            warn!("background pid {pid} ignored SIGTERM; killing it");
            let _ = kill(pid, Signal::SIGKILL);
            wait_blocking(pid);
            return;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}
