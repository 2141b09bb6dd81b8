//! Foreground-only mode and the shell's signal dispositions.
//!
//! The mode flag is the one piece of state written from a signal handler, so
//! it lives in an atomic static instead of the session. Everything else about
//! it goes through [`ModeController`].

use log::debug;
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigaction, sigprocmask,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// The signal that flips foreground-only mode.
pub const TOGGLE_SIGNAL: Signal = Signal::SIGTSTP;

const ENTER_NOTICE: &[u8] = b"\nEntering foreground-only mode (& is now ignored)\n";
const EXIT_NOTICE: &[u8] = b"\nExiting foreground-only mode\n";

static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

/// Whether background requests are honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    ForegroundOnly,
}

/// Read access to the process-wide mode, plus installation of the handler
/// that is its only writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModeController;

impl ModeController {
    /// Current mode. Read it once per command and act on that value.
    pub fn current(&self) -> Mode {
        if FOREGROUND_ONLY.load(Ordering::SeqCst) {
            Mode::ForegroundOnly
        } else {
            Mode::Normal
        }
    }

    /// Installs the shell's dispositions: the toggle signal flips the mode,
    /// SIGINT is ignored so only foreground children can be interrupted.
    pub fn install(&self) -> nix::Result<()> {
        let toggle = SigAction::new(
            SigHandler::Handler(on_toggle),
            SaFlags::empty(),
            SigSet::all(),
        );
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        // SAFETY: `on_toggle` only touches an atomic and calls write(2).
        unsafe {
            sigaction(TOGGLE_SIGNAL, &toggle)?;
            sigaction(Signal::SIGINT, &ignore)?;
        }
        debug!("signal handlers installed");
        Ok(())
    }
}

/// Flips the mode and announces the new state. Async-signal-safe.
extern "C" fn on_toggle(_signal: libc::c_int) {
    let was_foreground_only = FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst);
    let notice = if was_foreground_only { EXIT_NOTICE } else { ENTER_NOTICE };
    // SAFETY: write(2) is async-signal-safe and `notice` is a static buffer.
    unsafe {
        libc::write(libc::STDOUT_FILENO, notice.as_ptr().cast(), notice.len());
    }
}

/// Keeps the toggle signal blocked while alive.
///
/// A toggle that arrives meanwhile stays pending and is handled once the
/// guard drops, so its notice never lands in the middle of a command.
pub struct ToggleBlock {
    set: SigSet,
}

impl ToggleBlock {
    pub fn new() -> nix::Result<Self> {
        let mut set = SigSet::empty();
        set.add(TOGGLE_SIGNAL);
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None)?;
        Ok(Self { set })
    }

    /// Unblocks the signal in a freshly forked child, which never drops the
    /// guard because it either execs or exits.
    pub fn release_in_child(&self) {
        let _ = sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.set), None);
    }
}

impl Drop for ToggleBlock {
    fn drop(&mut self) {
        let _ = sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.set), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_toggle_flips_the_mode() {
        let mode = ModeController;
        let start = mode.current();

        on_toggle(libc::SIGTSTP);
        assert_ne!(mode.current(), start);

        on_toggle(libc::SIGTSTP);
        assert_eq!(mode.current(), start);
    }
}
