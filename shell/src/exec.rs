//! Running external programs: fork, child setup, exec and foreground wait.

use crate::error::ShellError;
use crate::mode::{TOGGLE_SIGNAL, ToggleBlock};
use crate::redirect::Redirections;
use crate::status::Completion;
use log::{debug, warn};
use nix::errno::Errno;
use nix::fcntl::{OFlag, open};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::stat::Mode;
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, close, dup2, execvp, fork};
use std::ffi::{CStr, CString};
use std::io::{self, Write};
use std::os::unix::io::RawFd;
use std::process;

const NULL_DEVICE: &CStr = c"/dev/null";

/// A file path usable both in messages and in system calls.
#[derive(Debug)]
struct RedirectPath {
    display: String,
    c_path: CString,
}

impl RedirectPath {
    fn new(path: String) -> Result<Self, ShellError> {
        let c_path =
            CString::new(path.as_str()).map_err(|_| ShellError::NulByte(path.clone()))?;
        Ok(Self {
            display: path,
            c_path,
        })
    }
}

/// Everything needed to start one external command, prepared before `fork`
/// so the child does no parsing of its own.
#[derive(Debug)]
pub struct Launch {
    name: String,
    argv: Vec<CString>,
    input: Option<RedirectPath>,
    output: Option<RedirectPath>,
    background: bool,
}

impl Launch {
    /// `args` must already be stripped of the background marker and of the
    /// redirections described by `redirects`. `background` is the final
    /// dispatch decision, mode included.
    pub fn new(
        args: Vec<String>,
        redirects: Redirections,
        background: bool,
    ) -> Result<Self, ShellError> {
        let name = args.first().cloned().unwrap_or_default();
        let argv = args
            .into_iter()
            .map(|arg| CString::new(arg.as_str()).map_err(|_| ShellError::NulByte(arg)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            argv,
            input: redirects.input.map(RedirectPath::new).transpose()?,
            output: redirects.output.map(RedirectPath::new).transpose()?,
            background,
        })
    }

    /// Installs the child's stdin and stdout. On failure returns the line to
    /// show the user.
    fn apply_redirections(&self) -> Result<(), String> {
        match &self.input {
            Some(path) => redirect_fd(&path.c_path, OFlag::O_RDONLY, libc::STDIN_FILENO)
                .map_err(|_| format!("cannot open {} for input", path.display))?,
            None if self.background => {
                redirect_fd(NULL_DEVICE, OFlag::O_RDONLY, libc::STDIN_FILENO)
                    .map_err(|_| "cannot open /dev/null for input".to_string())?
            }
            None => {}
        }
        match &self.output {
            Some(path) => redirect_fd(
                &path.c_path,
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                libc::STDOUT_FILENO,
            )
            .map_err(|_| format!("cannot open {} for output", path.display))?,
            None if self.background => {
                redirect_fd(NULL_DEVICE, OFlag::O_WRONLY, libc::STDOUT_FILENO)
                    .map_err(|_| "cannot open /dev/null for output".to_string())?
            }
            None => {}
        }
        Ok(())
    }
}

/// Result of [`spawn`] as seen by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spawned {
    /// Started in the background; not waited on.
    Background(Pid),
    /// Ran in the foreground and finished. `None` if the wait itself failed.
    Foreground(Option<Completion>),
}

/// Forks and runs `launch`.
///
/// A foreground command is waited on with the toggle signal blocked from
/// before the fork until the child is gone. The only error is a failed
/// `fork`, which the caller must treat as fatal.
pub fn spawn(launch: &Launch) -> Result<Spawned, ShellError> {
    // the child must not inherit unflushed shell output
    let _ = io::stdout().flush();

    let block = if launch.background {
        None
    } else {
        ToggleBlock::new()
            .inspect_err(|e| warn!("could not block {TOGGLE_SIGNAL}: {e}"))
            .ok()
    };

    // SAFETY: the shell is single-threaded, and the child only adjusts
    // signals and descriptors before it execs or exits.
    match unsafe { fork() } {
        Err(e) => Err(ShellError::Fork(e)),
        Ok(ForkResult::Child) => run_child(launch, block.as_ref()),
        Ok(ForkResult::Parent { child }) => {
            debug!(
                "spawned {:?} as pid {child} ({})",
                launch.name,
                if launch.background { "background" } else { "foreground" }
            );
            if launch.background {
                return Ok(Spawned::Background(child));
            }
            let completion = wait_foreground(child);
            drop(block);
            Ok(Spawned::Foreground(completion))
        }
    }
}

fn wait_foreground(child: Pid) -> Option<Completion> {
    loop {
        match waitpid(child, None) {
            Ok(status) => {
                if let Some(completion) = Completion::from_wait_status(status) {
                    return Some(completion);
                }
            }
            Err(Errno::EINTR) => {}
            Err(e) => {
                warn!("waitpid({child}) failed: {e}");
                return None;
            }
        }
    }
}

fn run_child(launch: &Launch, block: Option<&ToggleBlock>) -> ! {
    reset_child_signals(block, launch.background);

    if let Err(message) = launch.apply_redirections() {
        child_fail(&message);
    }

    // `> file` on its own only creates the file
    let Some(program) = launch.argv.first() else {
        process::exit(0);
    };
    match execvp(program, &launch.argv) {
        Ok(never) => match never {},
        Err(_) => child_fail(&format!("{}: no such file or directory", launch.name)),
    }
}

/// Gives a freshly forked child its own dispositions.
///
/// The toggle signal is set to ignore before it is unblocked, so a toggle
/// left pending from the parent's block is discarded instead of running the
/// shell's handler in the child.
fn reset_child_signals(block: Option<&ToggleBlock>, background: bool) {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: installing SIG_IGN / SIG_DFL runs no Rust code in handlers.
    unsafe {
        let _ = sigaction(TOGGLE_SIGNAL, &ignore);
        if !background {
            let _ = sigaction(Signal::SIGINT, &default);
        }
    }
    if let Some(block) = block {
        block.release_in_child();
    }
}

fn child_fail(message: &str) -> ! {
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "{message}");
    let _ = stdout.flush();
    process::exit(1)
}

fn redirect_fd(path: &CStr, flags: OFlag, target: RawFd) -> nix::Result<()> {
    let fd = open(path, flags, Mode::S_IRUSR | Mode::S_IWUSR)?;
    if fd != target {
        dup2(fd, target)?;
        close(fd)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::raise;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_launch_keeps_argv_and_targets() {
        let mut tokens = words("sort -r < in.txt > out.txt");
        let redirects = Redirections::resolve(&mut tokens);
        let launch = Launch::new(tokens, redirects, false).unwrap();

        assert_eq!(launch.name, "sort");
        assert_eq!(launch.argv, vec![c"sort".to_owned(), c"-r".to_owned()]);
        assert_eq!(launch.input.as_ref().unwrap().display, "in.txt");
        assert_eq!(launch.output.as_ref().unwrap().c_path.as_c_str(), c"out.txt");
        assert!(!launch.background);
    }

    #[test]
    fn test_launch_rejects_nul_bytes() {
        let err =
            Launch::new(vec!["ec\0ho".to_string()], Redirections::default(), true).unwrap_err();
        assert!(matches!(err, ShellError::NulByte(ref word) if word == "ec\0ho"));

        let redirects = Redirections {
            input: None,
            output: Some("o\0ut".to_string()),
        };
        let err = Launch::new(vec!["ls".to_string()], redirects, false).unwrap_err();
        assert!(matches!(err, ShellError::NulByte(_)));
    }

    static TOGGLES_SEEN: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_toggle(_signal: libc::c_int) {
        TOGGLES_SEEN.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_pending_toggle_is_discarded_by_child_setup() {
        let counting = SigAction::new(
            SigHandler::Handler(count_toggle),
            SaFlags::empty(),
            SigSet::empty(),
        );
        unsafe { sigaction(TOGGLE_SIGNAL, &counting) }.unwrap();

        // the signal mask is per thread, so the toggle stays pending here
        let block = ToggleBlock::new().unwrap();
        raise(TOGGLE_SIGNAL).unwrap();
        assert_eq!(TOGGLES_SEEN.load(Ordering::SeqCst), 0);

        reset_child_signals(Some(&block), true);
        std::mem::forget(block);

        let mask = SigSet::thread_get_mask().unwrap();
        assert!(!mask.contains(TOGGLE_SIGNAL));
        assert_eq!(TOGGLES_SEEN.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_launch_without_command_word() {
        let mut tokens = words("> created.txt");
        let redirects = Redirections::resolve(&mut tokens);
        let launch = Launch::new(tokens, redirects, false).unwrap();
        assert_eq!(launch.name, "");
        assert!(launch.argv.is_empty());
        assert!(launch.output.is_some());
    }
}
