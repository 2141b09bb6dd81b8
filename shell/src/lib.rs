//! A small interactive Unix shell.
//!
//! Each input line is expanded (`$$` becomes the shell's pid), split into
//! words and either run as a built-in (`exit`, `cd`, `status`) or forked and
//! executed as an external program. External commands may redirect stdin and
//! stdout with `<` and `>`, and a trailing `&` runs them in the background
//! unless SIGTSTP has switched the shell into foreground-only mode.
//!
//! The main entry point is [`Interpreter`]. Components are public so they can
//! be tested and reused on their own.

mod builtin;
pub mod command;
pub mod config;
pub mod error;
pub mod exec;
pub mod expand;
pub mod input;
mod interpreter;
pub mod jobs;
pub mod lexer;
pub mod mode;
pub mod redirect;
pub mod session;
pub mod status;

pub use config::{InputMode, Limits, ShellConfig};
pub use error::ShellError;
pub use interpreter::{Flow, Interpreter};
