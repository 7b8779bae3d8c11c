use std::path::Path;

use clap::Args;
use serde::Serialize;

use comments::config::Config;

use crate::args::FormatArgs;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct UidArgs {
    /// Page slug
    slug: String,

    /// How many identifiers to generate
    #[arg(short = 'n', long, default_value = "1")]
    count: usize,

    /// Fail on the first collision instead of retrying
    #[arg(long)]
    no_retry: bool,

    #[command(flatten)]
    format: FormatArgs,
}

#[derive(Serialize)]
struct UidOutput<'a> {
    slug: &'a str,
    uids: &'a [String],
}

pub fn run(args: UidArgs, root: &Path, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();

    let mut thread = super::load_thread(&args.slug, root, config, true)?;
    let mut uids = Vec::with_capacity(args.count);
    for _ in 0..args.count {
        let uid = thread
            .uids_mut()
            .next(!args.no_retry)
            .map_err(|e| e.to_string())?;
        uids.push(uid);
    }

    match format {
        OutputFormat::Pretty | OutputFormat::Plain => {
            for uid in &uids {
                println!("{}", uid);
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let data = UidOutput {
                slug: &args.slug,
                uids: &uids,
            };
            output::print_structured(&data, format)?;
        }
    }

    Ok(())
}
