use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::interpreter::Factory;
use crate::session::Session;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process. They never run in the background.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "status".
    fn name() -> &'static str;

    /// Executes the command against the shell session.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        match BuiltinCommand::execute(*self, stdout, session) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "{e}")?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        _session: &mut Session,
    ) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Terminate all background jobs, then exit the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        session.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; defaults to $HOME when omitted. Extra words are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        let target = match self.args.into_iter().next() {
            Some(target) => target,
            None => session
                .get_var("HOME")
                .ok_or_else(|| anyhow!("cd: HOME not set"))?,
        };
        env::set_current_dir(&target).map_err(|_| anyhow!("{target}: no such file or directory"))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print how the most recent foreground command ended.
pub struct Status {}

impl BuiltinCommand for Status {
    fn name() -> &'static str {
        "status"
    }

    fn execute(self, stdout: &mut dyn Write, session: &mut Session) -> Result<ExitCode> {
        writeln!(stdout, "{}", session.foreground)?;
        Ok(0)
    }
}
