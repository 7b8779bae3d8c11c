//! Output formatting utilities with TTY auto-detection and semantic styling.

use std::fmt::Write as _;
use std::io::IsTerminal;

use chrono::{DateTime, FixedOffset, Local};
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use comments::comment::Comment;

/// Output format for commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-optimized: colors, relative dates
    #[default]
    Pretty,
    /// Script-friendly: no colors, absolute dates
    Plain,
    /// Machine-readable JSON with ISO 8601 timestamps
    Json,
    /// Machine-readable YAML with ISO 8601 timestamps
    Yaml,
}

impl OutputFormat {
    /// Resolve the output format, applying TTY auto-detection.
    ///
    /// If format is Pretty but stdout is not a TTY, returns Plain.
    pub fn resolve(self) -> Self {
        match self {
            OutputFormat::Pretty if !std::io::stdout().is_terminal() => OutputFormat::Plain,
            other => other,
        }
    }
}

/// Print a value as JSON or YAML.
pub fn print_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<(), String> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)
                .map_err(|e| format!("YAML serialization failed: {}", e))?;
            print!("{}", yaml);
        }
        _ => {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| format!("JSON serialization failed: {}", e))?;
            println!("{}", json);
        }
    }
    Ok(())
}

// ============================================================================
// Semantic Styling
// ============================================================================

/// Style for identifiers - always dimmed.
pub fn style_id(id: &str) -> ColoredString {
    id.dimmed()
}

pub fn style_author(author: &str) -> ColoredString {
    author.bold()
}

/// Placeholders (unknown parents) stand out in yellow.
pub fn style_placeholder(id: &str) -> ColoredString {
    id.yellow()
}

// ============================================================================
// Date formatting
// ============================================================================

/// Format a datetime as short relative time (e.g., "5m", "3h", "2d", "1w", "2mo", "1y").
pub fn format_relative_short(dt: DateTime<FixedOffset>) -> String {
    let now = Local::now().fixed_offset();
    let duration = now.signed_duration_since(dt);

    let seconds = duration.num_seconds().abs();
    let minutes = duration.num_minutes().abs();
    let hours = duration.num_hours().abs();
    let days = duration.num_days().abs();

    if seconds < 60 {
        "now".to_string()
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else if hours < 24 {
        format!("{}h", hours)
    } else if days < 7 {
        format!("{}d", days)
    } else if days < 30 {
        format!("{}w", days / 7)
    } else if days < 365 {
        format!("{}mo", days / 30)
    } else {
        format!("{}y", days / 365)
    }
}

// ============================================================================
// Console view
// ============================================================================

/// Prefix every line of `text` (including blank ones) with `prefix`.
pub fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Heading line for a comment: `<author> wrote, at <date>`.
pub fn comment_heading(comment: &Comment, pretty: bool) -> String {
    let meta = comment.metadata();
    let author = meta
        .get("author")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let date = match meta.get(comments::comment::DATE_KEY) {
        Some(value) => value.to_string(),
        None => "????-??-??".to_string(),
    };

    if pretty {
        let relative = meta
            .date()
            .map(|d| format!(" ({})", format_relative_short(*d)))
            .unwrap_or_default();
        format!(
            "{} wrote, at {}{}  {}",
            style_author(&author),
            date,
            relative.as_str().dimmed(),
            style_id(comment.uid())
        )
    } else {
        format!("{} wrote, at {}", author, date)
    }
}

/// Console rendering of loaded comments, indented by reply level.
pub fn console_view<'a>(comments: impl IntoIterator<Item = &'a Comment>, pretty: bool) -> String {
    let mut out = String::new();
    for comment in comments {
        let prefix = "\t".repeat(comment.level());
        let _ = writeln!(out, "{}{}", prefix, comment_heading(comment, pretty));
        let body = comment.body().unwrap_or_default();
        let _ = writeln!(out, "{}", indent(body, &format!("{}\t", prefix)));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use comments::comment::parse_date;
    use comments::store::Store;
    use chrono::Duration;

    #[test]
    fn test_format_relative_short() {
        let now = Local::now().fixed_offset();
        let cases = vec![
            (Duration::seconds(10), "now"),
            (Duration::minutes(5), "5m"),
            (Duration::hours(3), "3h"),
            (Duration::days(2), "2d"),
            (Duration::days(14), "2w"),
            (Duration::days(60), "2mo"),
            (Duration::days(800), "2y"),
        ];

        for (ago, want) in cases {
            let got = format_relative_short(now - ago);
            assert_eq!(got, want, "{:?} ago = {:?}, want {:?}", ago, got, want);
        }
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\n\nb", "  "), "  a\n  \n  b");
        assert_eq!(indent("", "  "), "");
    }

    #[test]
    fn test_console_view_plain() {
        let store = Store::new("/tmp", ".md");
        let mut top = Comment::draft(&store, "post", "a", 0, 0, None);
        top.metadata_mut().insert("author", "Alice");
        top.metadata_mut()
            .insert("date", parse_date("2020-01-01").unwrap());
        top.set_body("Hello\nthere");

        let mut reply = Comment::draft(&store, "post", "b", 1, 1, Some("a"));
        reply.set_body("Hi");

        let got = console_view([&top, &reply], false);
        assert_eq!(
            got,
            "Alice wrote, at 2020-01-01 00:00:00+00:00\n\tHello\n\tthere\n\n\tUnknown wrote, at ????-??-??\n\t\tHi\n\n"
        );
    }
}
