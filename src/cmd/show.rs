use std::path::Path;

use clap::Args;
use serde::Serialize;

use comments::comment::Metadata;
use comments::config::Config;
use comments::render::Format;

use crate::args::FormatArgs;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct ShowArgs {
    /// Page slug
    slug: String,

    /// Keep bodies as markdown in structured output
    #[arg(long)]
    raw: bool,

    /// Substitute unreadable comments instead of failing
    #[arg(long)]
    tolerant: bool,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    slug: &'a str,
    comments: Vec<CommentOutput<'a>>,
    placeholders: Vec<&'a str>,
}

#[derive(Serialize)]
struct CommentOutput<'a> {
    uid: &'a str,
    level: usize,
    order: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
    metadata: &'a Metadata,
    body: String,
}

pub fn run(args: ShowArgs, root: &Path, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();

    let mut thread = super::load_thread(&args.slug, root, config, false)?;
    thread
        .load_comments(args.tolerant || config.tolerant)
        .map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Pretty | OutputFormat::Plain => {
            let pretty = format == OutputFormat::Pretty;
            if thread.is_empty() {
                println!("No comments on '{}'", args.slug);
                return Ok(());
            }
            print!("{}", output::console_view(&thread, pretty));

            let waiting: Vec<&str> = thread
                .entries()
                .iter()
                .filter(|e| e.is_placeholder())
                .map(|e| e.uid())
                .collect();
            if !waiting.is_empty() {
                println!("Replies waiting for missing comments:");
                for uid in waiting {
                    if pretty {
                        println!("  {}", output::style_placeholder(uid));
                    } else {
                        println!("  {}", uid);
                    }
                }
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let body_format = if args.raw {
                Format::Markdown
            } else {
                config.output_format
            };

            let mut bodies = Vec::with_capacity(thread.len());
            for comment in thread.iter_mut() {
                bodies.push(comment.parse(body_format).map_err(|e| e.to_string())?);
            }

            let data = ShowOutput {
                slug: thread.slug(),
                comments: thread
                    .iter()
                    .zip(bodies)
                    .map(|(c, body)| CommentOutput {
                        uid: c.uid(),
                        level: c.level(),
                        order: c.order(),
                        parent: c.parent(),
                        metadata: c.metadata(),
                        body,
                    })
                    .collect(),
                placeholders: thread
                    .entries()
                    .iter()
                    .filter(|e| e.is_placeholder())
                    .map(|e| e.uid())
                    .collect(),
            };
            output::print_structured(&data, format)?;
        }
    }

    Ok(())
}
