use std::path::Path;

use chrono::Local;
use clap::Args;
use serde::Serialize;

use comments::comment::MetaValue;
use comments::config::Config;
use comments::thread::NewComment;

use crate::args::{FormatArgs, parse_meta};
use crate::input;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct AddArgs {
    /// Page slug
    slug: String,

    /// Comment body in markdown (read from stdin when omitted)
    body: Option<String>,

    /// Identifier of the comment this replies to
    #[arg(short, long)]
    parent: Option<String>,

    /// Author name
    #[arg(short, long)]
    author: Option<String>,

    /// Use this identifier instead of generating one
    #[arg(long)]
    uid: Option<String>,

    /// Position among siblings (default: after everything in the thread)
    #[arg(long)]
    order: Option<u64>,

    /// Extra metadata line, KEY=VALUE (repeatable)
    #[arg(short, long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
    meta: Vec<(String, MetaValue)>,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Serialize)]
struct AddOutput {
    slug: String,
    uid: String,
    level: usize,
    order: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    path: String,
}

pub fn run(args: AddArgs, root: &Path, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();

    let body = match args.body {
        Some(body) => input::normalize_body(&body),
        None => input::read_body()?.unwrap_or_default(),
    };
    if body.trim().is_empty() {
        return Err("comment body required (argument or stdin)".to_string());
    }

    let mut thread = super::load_thread(&args.slug, root, config, true)?;

    let new = NewComment {
        uid: args.uid,
        order: args.order,
        ..match args.parent.as_deref() {
            Some(parent) => NewComment::reply_to(parent),
            None => NewComment::default(),
        }
    };
    let comment = thread.add(new).map_err(|e| e.to_string())?;

    let meta = comment.metadata_mut();
    if let Some(author) = args.author {
        meta.insert("author", author);
    }
    meta.insert(comments::comment::DATE_KEY, Local::now().fixed_offset());
    for (key, value) in args.meta {
        meta.insert(key, value);
    }
    comment.save(Some(&body)).map_err(|e| e.to_string())?;

    let data = AddOutput {
        slug: args.slug.clone(),
        uid: comment.uid().to_string(),
        level: comment.level(),
        order: comment.order(),
        parent: comment.parent().map(str::to_string),
        path: comment.path().display().to_string(),
    };

    thread.save().map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Pretty => {
            println!("Added {} to {}", output::style_id(&data.uid), data.slug);
            println!("  {}", data.path);
        }
        OutputFormat::Plain => {
            println!("{}", data.uid);
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            output::print_structured(&data, format)?;
        }
    }

    Ok(())
}
