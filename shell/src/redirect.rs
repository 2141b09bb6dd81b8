/// Kind of redirection
///
/// Only the two basic forms are recognized, each as a standalone word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// Input redirection (`<`): standard input is read from a file.
    Input,
    /// Output redirection (`>`): standard output is written to a file, truncating it.
    Output,
}

impl RedirectKind {
    /// The operator word for this kind.
    pub fn operator(self) -> &'static str {
        match self {
            RedirectKind::Input => "<",
            RedirectKind::Output => ">",
        }
    }
}

/// Returns the position of the file path that belongs to the first `kind`
/// operator in `tokens`.
///
/// An operator in last position has no path to bind and counts as absent.
pub fn find_redirect_target(tokens: &[String], kind: RedirectKind) -> Option<usize> {
    let op_at = tokens.iter().position(|t| t == kind.operator())?;
    let path_at = op_at + 1;
    (path_at < tokens.len()).then_some(path_at)
}

/// Redirection targets of a single command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Redirections {
    pub input: Option<String>,
    pub output: Option<String>,
}

impl Redirections {
    /// Resolves input then output redirection, removing each operator and its
    /// path from `tokens` so the program never sees them as arguments.
    pub fn resolve(tokens: &mut Vec<String>) -> Self {
        let input = take_redirect(tokens, RedirectKind::Input);
        let output = take_redirect(tokens, RedirectKind::Output);
        Self { input, output }
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }
}

fn take_redirect(tokens: &mut Vec<String>, kind: RedirectKind) -> Option<String> {
    let path_at = find_redirect_target(tokens, kind)?;
    tokens.remove(path_at - 1);
    Some(tokens.remove(path_at - 1))
}
