use thiserror::Error;

/// Errors raised by the shell core.
///
/// The `Display` text of every variant is the exact line shown to the user.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Input line (after `$$` expansion) does not fit in the line buffer.
    #[error("input line too long (max {limit} characters)")]
    LineTooLong { limit: usize },

    /// Command line has more words than a command may carry.
    #[error("too many arguments (max {limit})")]
    TooManyTokens { limit: usize },

    /// The background registry has no free slot.
    #[error("process list full; process not added")]
    RegistryFull,

    /// A word cannot be handed to the OS because it contains a NUL byte.
    #[error("{0}: argument contains a NUL byte")]
    NulByte(String),

    /// `fork` failed. Fatal to the shell.
    #[error("failed to create child process")]
    Fork(#[source] nix::Error),
}
