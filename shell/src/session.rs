use crate::config::Limits;
use crate::jobs::JobRegistry;
use crate::status::ForegroundStatus;
use std::collections::HashMap;
use std::env as stdenv;

/// Shell-wide state owned by the read-eval loop.
///
/// The session contains:
/// - `vars`: environment variables captured at startup, used by built-ins.
/// - `jobs`: background processes still to be reaped.
/// - `foreground`: how the last foreground command ended.
/// - `should_exit`: set by `exit` so the loop knows when to stop.
///
/// The foreground-only flag is not here: a signal handler writes it, see
/// [`crate::mode`].
#[derive(Debug)]
pub struct Session {
    pub vars: HashMap<String, String>,
    pub limits: Limits,
    pub jobs: JobRegistry,
    pub foreground: ForegroundStatus,
    pub should_exit: bool,
}

impl Session {
    /// Capture the process environment into a new session.
    pub fn new(limits: Limits) -> Self {
        Self {
            vars: stdenv::vars().collect(),
            limits,
            jobs: JobRegistry::new(limits.max_background),
            foreground: ForegroundStatus::default(),
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override a variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_set_and_get_var() {
        let mut session = Session::new(Limits::default());
        session.vars.clear();

        assert_eq!(session.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        session.set_var("KEY", "VALUE");
        assert_eq!(session.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new(Limits::default());
        assert!(session.get_var("PATH").is_some());
        assert!(session.jobs.is_empty());
        assert_eq!(session.foreground.last(), None);
        assert!(!session.should_exit);
    }
}
