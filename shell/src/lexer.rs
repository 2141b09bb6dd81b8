//! Line filtering and tokenization for the shell's command language.
//!
//! The language is deliberately flat: a command line is a sequence of words
//! separated by spaces. There is no quoting, so `<`, `>` and `&` are only
//! operators when they stand alone as a word.

use crate::error::ShellError;

/// Returns `true` for lines the shell should skip without parsing:
/// whitespace-only lines and comments starting with `#` after any spaces.
pub fn is_ignorable(line: &str) -> bool {
    line.trim().is_empty() || line.trim_start_matches(' ').starts_with('#')
}

/// Splits a line into its space-separated words.
///
/// Runs of spaces never produce empty words. Other whitespace, such as a tab,
/// is part of the word it sits in. Fails with
/// [`ShellError::TooManyTokens`] if the line holds more than `max_tokens`
/// words instead of truncating the command.
pub fn split_into_tokens(line: &str, max_tokens: usize) -> Result<Vec<String>, ShellError> {
    let mut tokens = Vec::new();
    for word in line.split(' ').filter(|w| !w.is_empty()) {
        if tokens.len() == max_tokens {
            return Err(ShellError::TooManyTokens { limit: max_tokens });
        }
        tokens.push(word.to_string());
    }
    Ok(tokens)
}

/// Removes a trailing `&` word and reports whether it was there.
pub fn strip_background_marker(tokens: &mut Vec<String>) -> bool {
    if tokens.last().is_some_and(|t| t == "&") {
        tokens.pop();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_spaces() {
        let tokens = split_into_tokens("ls -la dir", 512).unwrap();
        assert_eq!(tokens, vec!["ls", "-la", "dir"]);
    }

    #[test]
    fn test_consecutive_spaces_produce_no_empty_words() {
        let tokens = split_into_tokens("echo   a  b  ", 512).unwrap();
        assert_eq!(tokens, vec!["echo", "a", "b"]);
    }

    #[test]
    fn test_tabs_stay_inside_words() {
        let tokens = split_into_tokens("echo a\tb \t", 512).unwrap();
        assert_eq!(tokens, vec!["echo", "a\tb", "\t"]);
    }

    #[test]
    fn test_token_limit_is_exact() {
        let line = vec!["x"; 512].join(" ");
        assert_eq!(split_into_tokens(&line, 512).unwrap().len(), 512);

        let line = vec!["x"; 513].join(" ");
        let err = split_into_tokens(&line, 512).unwrap_err();
        assert!(matches!(err, ShellError::TooManyTokens { limit: 512 }));
    }

    #[test]
    fn test_ignorable_lines() {
        assert!(is_ignorable(""));
        assert!(is_ignorable("    "));
        assert!(is_ignorable(" \t "));
        assert!(is_ignorable("# a comment"));
        assert!(is_ignorable("  #indented comment"));
        assert!(!is_ignorable("echo # not a comment"));
        assert!(!is_ignorable("ls"));
        assert!(!is_ignorable("\t# starts with a tab"));
    }

    #[test]
    fn test_strip_background_marker() {
        let mut tokens = vec!["sleep".to_string(), "5".to_string(), "&".to_string()];
        assert!(strip_background_marker(&mut tokens));
        assert_eq!(tokens, vec!["sleep", "5"]);

        // only a trailing, standalone `&` counts
        let mut tokens = vec!["echo".to_string(), "&".to_string(), "x".to_string()];
        assert!(!strip_background_marker(&mut tokens));
        let mut tokens = vec!["echo".to_string(), "a&".to_string()];
        assert!(!strip_background_marker(&mut tokens));
        assert_eq!(tokens.len(), 2);

        let mut empty: Vec<String> = Vec::new();
        assert!(!strip_background_marker(&mut empty));
    }
}
