use argh::FromArgs;
use env_logger::Env;
use minish::input::{EditorInput, LineSource, PlainInput};
use minish::mode::ModeController;
use minish::{InputMode, Interpreter, Limits, ShellConfig};
use std::io::Write;
use std::process;
use std::time::Duration;

#[derive(FromArgs)]
/// A small interactive shell with background jobs and redirection.
struct Args {
    #[argh(option, default = "String::from(\": \")")]
    /// prompt shown before each command line.
    prompt: String,

    #[argh(option, default = "2048")]
    /// maximum command line length in characters, newline included.
    max_line: usize,

    #[argh(option, default = "512")]
    /// maximum number of words in a command.
    max_args: usize,

    #[argh(option, default = "100")]
    /// maximum number of background processes tracked at once.
    max_background: usize,

    #[argh(option, default = "5000")]
    /// milliseconds `exit` waits for a background job after SIGTERM before
    /// sending SIGKILL; 0 waits forever.
    exit_grace_ms: u64,

    #[argh(switch)]
    /// read plain lines from stdin even on a terminal.
    plain: bool,
}

impl Args {
    fn into_config(self) -> ShellConfig {
        ShellConfig {
            limits: Limits {
                max_line_len: self.max_line,
                max_tokens: self.max_args,
                max_background: self.max_background,
            },
            prompt: self.prompt,
            exit_grace: (self.exit_grace_ms > 0).then(|| Duration::from_millis(self.exit_grace_ms)),
            input: if self.plain {
                InputMode::Plain
            } else {
                InputMode::Auto
            },
        }
    }
}

fn line_source(mode: InputMode) -> anyhow::Result<Box<dyn LineSource>> {
    if mode == InputMode::Auto && atty::is(atty::Stream::Stdin) {
        Ok(Box::new(EditorInput::new()?))
    } else {
        Ok(Box::new(PlainInput::stdin()))
    }
}

fn run(config: ShellConfig) -> anyhow::Result<i32> {
    ModeController.install()?;
    let mut source = line_source(config.input)?;
    let mut shell = Interpreter::new(&config);
    shell.repl(source.as_mut())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let config = argh::from_env::<Args>().into_config();

    let code = match run(config) {
        Ok(code) => code,
        Err(e) => {
            let mut stdout = std::io::stdout();
            let _ = writeln!(stdout, "{e}");
            let _ = stdout.flush();
            1
        }
    };
    process::exit(code);
}
