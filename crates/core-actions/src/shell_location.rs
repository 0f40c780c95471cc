//! Parsing of shell-command output lines into file locations:
//! `file:line:snippet` or `file:line:col:snippet` become
//! `{ path, line_num, snippet }`. Malformed lines fail the whole parse —
//! this module deliberately does not try to recover a partial result from
//! a batch with one bad line.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellLocation {
    pub path: String,
    pub line_num: usize,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShellLocationError {
    #[error("Unsupported format: {0:?}")]
    UnsupportedFormat(String),
}

/// Parse one output line. The column field, when present, is consumed to
/// disambiguate the two forms but is not retained — spec's location record
/// carries only `{ path, line_num, snippet }`.
pub fn parse_shell_location(line: &str) -> Result<ShellLocation, ShellLocationError> {
    let malformed = || ShellLocationError::UnsupportedFormat(line.to_string());

    let mut parts = line.splitn(3, ':');
    let path = parts.next().ok_or_else(malformed)?;
    let line_str = parts.next().ok_or_else(malformed)?;
    let rest = parts.next().ok_or_else(malformed)?;
    if path.is_empty() {
        return Err(malformed());
    }
    let line_num: usize = line_str.parse().map_err(|_| malformed())?;

    let snippet = match rest.split_once(':') {
        Some((maybe_col, remainder))
            if !maybe_col.is_empty() && maybe_col.bytes().all(|b| b.is_ascii_digit()) =>
        {
            remainder.to_string()
        }
        _ => rest.to_string(),
    };

    Ok(ShellLocation {
        path: path.to_string(),
        line_num,
        snippet,
    })
}

/// Parse every non-empty line of a shell command's captured output. A single
/// malformed line fails the whole batch (spec: "malformed lines fail the
/// whole parse").
pub fn parse_shell_output(output: &str) -> Result<Vec<ShellLocation>, ShellLocationError> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(parse_shell_location)
        .collect()
}
