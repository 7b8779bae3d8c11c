//! Comment bodies from stdin.

use std::io::{self, IsTerminal, Read};

/// Read a comment body piped on stdin.
///
/// Returns `None` when stdin is a terminal, so nothing was piped.
pub fn read_body() -> Result<Option<String>, String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    stdin
        .lock()
        .read_to_string(&mut buffer)
        .map_err(|e| format!("reading stdin: {}", e))?;
    Ok(Some(normalize_body(&buffer)))
}

/// Drop trailing blank lines and whitespace; a non-empty body ends with one newline.
pub fn normalize_body(raw: &str) -> String {
    let trimmed = raw.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_body() {
        let cases = vec![
            ("Hello", "Hello\n"),
            ("Hello\n\n\n", "Hello\n"),
            ("  indented\n  code  \n", "  indented\n  code\n"),
            ("\n\n", ""),
            ("", ""),
        ];

        for (input, want) in cases {
            assert_eq!(normalize_body(input), want, "normalize_body({:?})", input);
        }
    }
}
