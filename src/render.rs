//! Markdown rendering for comment bodies.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};

/// Output format for comment bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Html5,
    Xhtml,
    /// Raw markdown, passed through verbatim
    Markdown,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Html5 => "html5",
            Format::Xhtml => "xhtml",
            Format::Markdown => "markdown",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html5" | "html" => Ok(Format::Html5),
            "xhtml" => Ok(Format::Xhtml),
            "markdown" | "md" => Ok(Format::Markdown),
            other => Err(format!(
                "unknown output format '{}' (expected html5, xhtml or markdown)",
                other
            )),
        }
    }
}

/// Turns markdown into the requested format.
pub trait Render {
    fn render(&self, markdown: &str, format: Format) -> String;
}

/// CommonMark renderer backed by pulldown-cmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

impl Render for Markdown {
    fn render(&self, markdown: &str, format: Format) -> String {
        if format == Format::Markdown {
            return markdown.to_string();
        }

        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);

        // pulldown-cmark already emits self-closing void tags, valid for both formats
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, Parser::new_ext(markdown, options));
        out.truncate(out.trim_end().len());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        let cases = vec![
            ("html5", Some(Format::Html5)),
            ("HTML", Some(Format::Html5)),
            ("xhtml", Some(Format::Xhtml)),
            ("markdown", Some(Format::Markdown)),
            (" md ", Some(Format::Markdown)),
            ("pdf", None),
        ];

        for (input, want) in cases {
            let got = input.parse::<Format>().ok();
            assert_eq!(got, want, "{:?}.parse() = {:?}, want {:?}", input, got, want);
        }
    }

    #[test]
    fn test_render_html() {
        let got = Markdown.render(
            "# Hello World\n\nThis is *parsed* properly.\n",
            Format::Html5,
        );
        assert_eq!(
            got,
            "<h1>Hello World</h1>\n<p>This is <em>parsed</em> properly.</p>"
        );
    }

    #[test]
    fn test_void_tags_self_close() {
        let cases = vec![
            ("a  \nb\n", "<p>a<br />\nb</p>"),
            ("one\n\n---\n\ntwo\n", "<p>one</p>\n<hr />\n<p>two</p>"),
            ("![cat](cat.png)\n", "<p><img src=\"cat.png\" alt=\"cat\" /></p>"),
        ];

        for format in [Format::Html5, Format::Xhtml] {
            for (input, want) in &cases {
                let got = Markdown.render(input, format);
                assert_eq!(&got, want, "render({:?}, {})", input, format);
            }
        }
    }

    #[test]
    fn test_render_markdown_passthrough() {
        let body = "# Title\n\n  keep   spacing\n";
        assert_eq!(Markdown.render(body, Format::Markdown), body);
    }

    #[test]
    fn test_format_display_round_trips() {
        for format in [Format::Html5, Format::Xhtml, Format::Markdown] {
            assert_eq!(format.to_string().parse::<Format>(), Ok(format));
        }
    }
}
