use std::path::Path;

use chrono::Local;
use clap::Args;
use serde::Serialize;

use comments::config::Config;
use comments::generator::{Generator, Shape};
use comments::thread::Thread;

use crate::args::FormatArgs;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct GenerateArgs {
    /// Page slug
    slug: String,

    /// Top-level comments
    #[arg(long, default_value = "2")]
    count: usize,

    /// Replies per comment
    #[arg(long, default_value = "1")]
    children: usize,

    /// Deepest reply level
    #[arg(long, default_value = "2")]
    depth: usize,

    /// Author written into every generated comment
    #[arg(long, default_value = "Generator")]
    author: String,

    /// Replace an existing thread log
    #[arg(long)]
    force: bool,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Serialize)]
struct GenerateOutput<'a> {
    slug: &'a str,
    path: String,
    uids: &'a [String],
}

pub fn run(args: GenerateArgs, root: &Path, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();

    let mut thread = Thread::open(&args.slug, config, root);
    let log = thread.thread_path();
    if log.exists() && !args.force {
        return Err(format!(
            "thread already exists: {}\nUse --force to overwrite",
            log.display()
        ));
    }

    let shape = Shape {
        count: args.count,
        children: args.children,
        depth: args.depth,
    };
    let uids = Generator::new(&mut thread)
        .generate(shape)
        .map_err(|e| e.to_string())?;

    let date = Local::now().fixed_offset();
    for comment in thread.iter_mut() {
        let body = match comment.parent() {
            Some(parent) => format!("# Reply to {}\n\nGenerated comment {}.\n", parent, comment.uid()),
            None => format!("# Comment {}\n\nGenerated top-level comment.\n", comment.uid()),
        };
        let meta = comment.metadata_mut();
        meta.insert("author", args.author.as_str());
        meta.insert(comments::comment::DATE_KEY, date);
        comment.save(Some(&body)).map_err(|e| e.to_string())?;
    }
    thread.save().map_err(|e| e.to_string())?;

    match format {
        OutputFormat::Pretty | OutputFormat::Plain => {
            println!("Generated {} comments in {}", uids.len(), log.display());
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let data = GenerateOutput {
                slug: &args.slug,
                path: log.display().to_string(),
                uids: &uids,
            };
            output::print_structured(&data, format)?;
        }
    }

    Ok(())
}
