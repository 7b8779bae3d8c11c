use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use comments::config;

mod args;
mod cmd;
mod input;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "comments")]
#[command(version = env!("COMMENTS_VERSION"))]
#[command(about = "Threaded comments stored next to a static site")]
#[command(
    long_about = "comments - File-backed comment threads for static sites.\n\nEach page slug owns a thread log (<slug>.thread) listing its comments in\ndisplay order, and a directory holding one markdown file per comment.\nReplies to unknown comments are kept under a placeholder until the\nparent appears."
)]
struct Cli {
    /// Site root (manifest lookup and relative storage paths)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(flatten)]
    storage: args::StorageArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a thread in display order
    #[command(alias = "cat")]
    Show(cmd::show::ShowArgs),

    /// Add a comment to a thread
    #[command(alias = "new")]
    Add(cmd::add::AddArgs),

    /// Generate unused comment identifiers
    Uid(cmd::uid::UidArgs),

    /// Fill a thread with synthetic comments
    Generate(cmd::generate::GenerateArgs),

    /// Check a thread log against its comment files
    Validate(cmd::validate::ValidateArgs),

    /// Configuration introspection
    Config(cmd::config_cmd::ConfigArgs),
}

fn main() {
    // Use try_parse to catch errors and normalize exit code
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Exit with 0 for help/version, 1 for actual errors
            let exit_code = if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                0
            } else {
                1
            };
            process::exit(exit_code);
        }
    };

    logging::init_logging(cli.verbose);

    let mut loaded = config::load_config(&cli.root);
    cli.storage.apply(&mut loaded);

    let root = cli.root.as_path();
    let result = match cli.command {
        Commands::Show(args) => cmd::show::run(args, root, &loaded.config),
        Commands::Add(args) => cmd::add::run(args, root, &loaded.config),
        Commands::Uid(args) => cmd::uid::run(args, root, &loaded.config),
        Commands::Generate(args) => cmd::generate::run(args, root, &loaded.config),
        Commands::Validate(args) => cmd::validate::run(args, root, &loaded.config),
        Commands::Config(args) => cmd::config_cmd::run(args, root, &loaded),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        process::exit(1);
    }
}
