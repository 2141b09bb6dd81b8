use crate::error::ShellError;

/// The placeholder replaced by the shell's process id.
pub const PID_PLACEHOLDER: &str = "$$";

/// Replaces every `$$` in `line` with `pid`, left to right.
///
/// Occurrences never overlap (`$$$` expands the first two characters only) and
/// inserted text is not scanned again. `max_line_len` counts the line
/// terminator, so the expanded text may hold at most `max_line_len - 1`
/// characters.
pub fn expand_pid(line: &str, pid: u32, max_line_len: usize) -> Result<String, ShellError> {
    let expanded = line.replace(PID_PLACEHOLDER, &pid.to_string());
    if expanded.chars().count() >= max_line_len {
        return Err(ShellError::LineTooLong {
            limit: max_line_len,
        });
    }
    Ok(expanded)
}
