use std::time::Duration;

/// Capacity limits enforced by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum line length in characters, counting the line terminator.
    pub max_line_len: usize,
    /// Maximum number of words in a single command.
    pub max_tokens: usize,
    /// Maximum number of background processes tracked at once.
    pub max_background: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_len: 2048,
            max_tokens: 512,
            max_background: 100,
        }
    }
}

/// How lines are read from standard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Use the line editor when stdin is a terminal, plain reads otherwise.
    Auto,
    /// Always read plain lines from stdin.
    Plain,
}

/// Runtime configuration of a shell session.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub limits: Limits,
    pub prompt: String,
    /// How long `exit` waits for a background job after SIGTERM before
    /// escalating to SIGKILL. `None` waits forever.
    pub exit_grace: Option<Duration>,
    pub input: InputMode,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            prompt: ": ".to_string(),
            exit_grace: Some(Duration::from_secs(5)),
            input: InputMode::Auto,
        }
    }
}
