use crate::command::{CommandFactory, ExitCode};
use crate::config::ShellConfig;
use crate::error::ShellError;
use crate::exec::{self, Launch, Spawned};
use crate::expand::expand_pid;
use crate::input::LineSource;
use crate::lexer::{is_ignorable, split_into_tokens, strip_background_marker};
use crate::mode::{Mode, ModeController};
use crate::redirect::Redirections;
use crate::session::Session;
use anyhow::Result;
use log::{debug, warn};
use std::io::{self, Write};
use std::time::Duration;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports the built-ins defined in this crate.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// What the read-eval loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The shell's read-eval loop.
///
/// Each line is expanded, split into words and either handed to a built-in or
/// run as an external program. Finished background jobs are reported before
/// every prompt.
///
/// Example
/// ```
/// use minish::{Flow, Interpreter, ShellConfig};
/// let mut sh = Interpreter::new(&ShellConfig::default());
/// let mut out = Vec::new();
/// assert_eq!(sh.eval("status", &mut out).unwrap(), Flow::Continue);
/// assert_eq!(out, b"exit value 0\n");
/// ```
pub struct Interpreter {
    session: Session,
    builtins: Vec<Box<dyn CommandFactory>>,
    mode: ModeController,
    prompt: String,
    exit_grace: Option<Duration>,
    pid: u32,
}

impl Interpreter {
    /// Create an interpreter with the `exit`, `cd` and `status` built-ins.
    pub fn new(config: &ShellConfig) -> Self {
        use crate::builtin::*;
        Self {
            session: Session::new(config.limits),
            builtins: vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Status>::default()),
            ],
            mode: ModeController,
            prompt: config.prompt.clone(),
            exit_grace: config.exit_grace,
            pid: std::process::id(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until `exit` or end of input, then cleans up background jobs.
    ///
    /// Returns the shell's exit code. An error means the shell cannot go on,
    /// e.g. a failed `fork`.
    pub fn repl(&mut self, source: &mut dyn LineSource) -> Result<ExitCode> {
        let mut stdout = io::stdout();
        loop {
            self.report_finished_jobs(&mut stdout)?;
            let Some(line) = source.next_line(&self.prompt)? else {
                debug!("end of input");
                break;
            };
            if self.eval(&line, &mut stdout)? == Flow::Exit {
                break;
            }
        }
        self.shutdown();
        Ok(0)
    }

    /// Reaps finished background jobs and prints one line for each.
    pub fn report_finished_jobs(&mut self, out: &mut dyn Write) -> io::Result<()> {
        for done in self.session.jobs.reap() {
            writeln!(out, "{done}")?;
        }
        out.flush()
    }

    /// Terminates every tracked background job and waits for it.
    pub fn shutdown(&mut self) {
        if !self.session.jobs.is_empty() {
            debug!("terminating {} background job(s)", self.session.jobs.len());
        }
        self.session.jobs.terminate_all(self.exit_grace);
    }

    /// Evaluates one input line, writing the shell's own messages to `out`.
    pub fn eval(&mut self, line: &str, out: &mut dyn Write) -> Result<Flow> {
        let mut tokens = match self.split_line(line) {
            Ok(Some(tokens)) => tokens,
            Ok(None) => return Ok(Flow::Continue),
            Err(e) => {
                writeln!(out, "{e}")?;
                return Ok(Flow::Continue);
            }
        };
        let wants_background = strip_background_marker(&mut tokens);
        if tokens.is_empty() {
            return Ok(Flow::Continue);
        }

        if self.run_builtin(&tokens, out)? {
            out.flush()?;
            return Ok(if self.session.should_exit {
                Flow::Exit
            } else {
                Flow::Continue
            });
        }

        let background = wants_background && self.mode.current() == Mode::Normal;
        self.run_external(tokens, background, out)?;
        out.flush()?;
        Ok(Flow::Continue)
    }

    fn split_line(&self, line: &str) -> Result<Option<Vec<String>>, ShellError> {
        if is_ignorable(line) {
            return Ok(None);
        }
        let limits = self.session.limits;
        if line.chars().count() >= limits.max_line_len {
            return Err(ShellError::LineTooLong {
                limit: limits.max_line_len,
            });
        }
        let line = expand_pid(line, self.pid, limits.max_line_len)?;
        split_into_tokens(&line, limits.max_tokens).map(Some)
    }

    /// Returns `false` if `tokens` does not name a built-in.
    fn run_builtin(&mut self, tokens: &[String], out: &mut dyn Write) -> Result<bool> {
        let name = tokens[0].as_str();
        let args: Vec<&str> = tokens[1..].iter().map(String::as_str).collect();
        for factory in &self.builtins {
            if let Some(cmd) = factory.try_create(name, &args) {
                cmd.execute(out, &mut self.session)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn run_external(
        &mut self,
        mut tokens: Vec<String>,
        background: bool,
        out: &mut dyn Write,
    ) -> Result<()> {
        let redirects = Redirections::resolve(&mut tokens);
        let launch = match Launch::new(tokens, redirects, background) {
            Ok(launch) => launch,
            Err(e) => {
                writeln!(out, "{e}")?;
                return Ok(());
            }
        };
        out.flush()?;

        match exec::spawn(&launch)? {
            Spawned::Background(pid) => {
                if let Err(e) = self.session.jobs.add(pid) {
                    warn!("background pid {pid} is running untracked");
                    writeln!(out, "{e}")?;
                }
                writeln!(out, "background pid is {pid}")?;
            }
            Spawned::Foreground(Some(completion)) => {
                self.session.foreground.record(completion);
                if completion.is_signaled() {
                    writeln!(out, "{completion}")?;
                }
            }
            Spawned::Foreground(None) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;

    fn eval(sh: &mut Interpreter, line: &str) -> (Flow, String) {
        let mut out = Vec::new();
        let flow = sh.eval(line, &mut out).unwrap();
        (flow, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_comments_and_blank_lines_do_nothing() {
        let mut sh = Interpreter::new(&ShellConfig::default());
        for line in ["", "   ", "# comment", "#", "  # indented"] {
            assert_eq!(eval(&mut sh, line), (Flow::Continue, String::new()));
        }
    }

    #[test]
    fn test_overlong_comment_is_still_skipped() {
        let mut sh = Interpreter::new(&ShellConfig::default());
        let comment = format!("#{}", "x".repeat(3000));
        assert_eq!(eval(&mut sh, &comment), (Flow::Continue, String::new()));
    }

    #[test]
    fn test_status_builtin() {
        let mut sh = Interpreter::new(&ShellConfig::default());
        assert_eq!(eval(&mut sh, "status"), (Flow::Continue, "exit value 0\n".into()));
        // a trailing `&` is dropped for built-ins
        assert_eq!(eval(&mut sh, "status &"), (Flow::Continue, "exit value 0\n".into()));
    }

    #[test]
    fn test_exit_builtin_ends_the_loop() {
        let mut sh = Interpreter::new(&ShellConfig::default());
        let (flow, out) = eval(&mut sh, "exit");
        assert_eq!(flow, Flow::Exit);
        assert!(out.is_empty());
        assert!(sh.session().should_exit);
    }

    #[test]
    fn test_pid_is_expanded_before_dispatch() {
        let mut sh = Interpreter::new(&ShellConfig::default());
        let pid = std::process::id();
        let (_, out) = eval(&mut sh, "cd /nonexistent_minish_dir_$$");
        assert_eq!(out, format!("/nonexistent_minish_dir_{pid}: no such file or directory\n"));
    }

    #[test]
    fn test_capacity_errors_are_reported() {
        let config = ShellConfig {
            limits: Limits {
                max_line_len: 32,
                max_tokens: 3,
                max_background: 1,
            },
            ..ShellConfig::default()
        };
        let mut sh = Interpreter::new(&config);

        let (flow, out) = eval(&mut sh, "status a b c");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "too many arguments (max 3)\n");

        let (_, out) = eval(&mut sh, &"x".repeat(32));
        assert_eq!(out, "input line too long (max 32 characters)\n");
    }

    #[test]
    fn test_nul_byte_is_reported_not_spawned() {
        let mut sh = Interpreter::new(&ShellConfig::default());
        let (flow, out) = eval(&mut sh, "ec\0ho hi");
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "ec\0ho: argument contains a NUL byte\n");
        assert_eq!(sh.session().foreground.last(), None);
    }
}
