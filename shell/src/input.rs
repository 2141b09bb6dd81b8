//! Sources of command lines: an interactive line editor or plain stdin.

use crate::mode::TOGGLE_SIGNAL;
use anyhow::Result;
use nix::sys::signal::raise;
use rustyline::error::ReadlineError;
use rustyline::{
    Cmd, ConditionalEventHandler, DefaultEditor, Event, EventContext, EventHandler, KeyEvent,
    RepeatCount,
};
use std::io::{self, BufRead, ErrorKind, Write};

/// Something the shell can read command lines from.
pub trait LineSource {
    /// Shows `prompt` and blocks until a full line is available.
    ///
    /// The returned line has its newline and leading spaces removed.
    /// `Ok(None)` means the input is exhausted.
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Strips the trailing newline and any leading spaces.
pub fn normalize(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.trim_start_matches(' ')
}

/// Reads lines from any buffered reader, writing the prompt to `prompt_out`.
pub struct PlainInput<R, W> {
    reader: R,
    prompt_out: W,
}

impl<R: BufRead, W: Write> PlainInput<R, W> {
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self { reader, prompt_out }
    }
}

impl PlainInput<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LineSource for PlainInput<R, W> {
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut buf = Vec::new();
        loop {
            write!(self.prompt_out, "{prompt}")?;
            self.prompt_out.flush()?;

            buf.clear();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        let raw = String::from_utf8_lossy(&buf);
        Ok(Some(normalize(&raw).to_string()))
    }
}

/// Interactive input through a rustyline editor. No history is kept.
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    pub fn new() -> Result<Self> {
        let mut editor = DefaultEditor::new()?;
        // In raw mode Ctrl-Z reaches us as a key, not as a signal.
        editor.bind_sequence(
            KeyEvent::ctrl('Z'),
            EventHandler::Conditional(Box::new(RaiseToggle)),
        );
        Ok(Self { editor })
    }
}

impl LineSource for EditorInput {
    fn next_line(&mut self, prompt: &str) -> Result<Option<String>> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => return Ok(Some(normalize(&line).to_string())),
                // the shell ignores SIGINT; Ctrl-C just gives a fresh prompt
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(None),
                Err(ReadlineError::Io(e)) if e.kind() == ErrorKind::Interrupted => continue,
                Err(ReadlineError::Errno(e)) if e as i32 == libc::EINTR => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

struct RaiseToggle;

impl ConditionalEventHandler for RaiseToggle {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        _ctx: &EventContext,
    ) -> Option<Cmd> {
        let _ = raise(TOGGLE_SIGNAL);
        Some(Cmd::Noop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_normalize_strips_newline_and_leading_spaces() {
        assert_eq!(normalize("   ls -la\n"), "ls -la");
        assert_eq!(normalize("echo hi  "), "echo hi  ");
        assert_eq!(normalize("pwd\r\n"), "pwd");
        assert_eq!(normalize("\n"), "");
    }

    #[test]
    fn test_plain_input_prompts_for_every_line() {
        let mut prompts = Vec::new();
        let mut source = PlainInput::new(Cursor::new("  echo a\n\nstatus"), &mut prompts);

        assert_eq!(source.next_line(": ").unwrap().as_deref(), Some("echo a"));
        assert_eq!(source.next_line(": ").unwrap().as_deref(), Some(""));
        assert_eq!(source.next_line(": ").unwrap().as_deref(), Some("status"));
        assert_eq!(source.next_line(": ").unwrap(), None);
        drop(source);

        assert_eq!(String::from_utf8(prompts).unwrap(), ": : : : ");
    }

    #[test]
    fn test_plain_input_replaces_invalid_utf8() {
        let mut source = PlainInput::new(Cursor::new(b"echo \xff\n".to_vec()), io::sink());
        assert_eq!(source.next_line("").unwrap().as_deref(), Some("echo \u{fffd}"));
    }
}
