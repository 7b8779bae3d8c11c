use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use comments::comment::DATE_KEY;
use comments::config::Config;
use comments::error::Error;
use comments::store::{Store, THREAD_EXTENSION};
use comments::thread::Thread;

use crate::args::FormatArgs;
use crate::output::{self, OutputFormat};

/// Issue code descriptions
fn issue_description(code: &str) -> &'static str {
    match code {
        "E000" => "Cannot read thread log",
        "E001" => "Malformed thread log line",
        "E002" => "Invalid identifier",
        "E003" => "Reply placed under its own subtree",
        "E004" => "Comment file missing",
        "E005" => "Comment file unreadable",
        "W001" => "Reply to unknown comment",
        "W002" => "Comment file not listed in thread log",
        "W003" => "Comment without date",
        _ => "Unknown issue",
    }
}

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Args)]
pub struct ValidateArgs {
    /// Page slug (omit with --all)
    #[arg(required_unless_present = "all")]
    slug: Option<String>,

    /// Validate every thread under the storage root
    #[arg(short = 'a', long)]
    all: bool,

    /// Show threads without issues too
    #[arg(long)]
    verbose_files: bool,

    #[command(flatten)]
    format: FormatArgs,
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl Issue {
    fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            line: None,
            severity: Severity::Error,
            code: code.to_string(),
            message: message.into(),
        }
    }

    fn error_at(code: &str, line: usize, message: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            ..Self::error(code, message)
        }
    }

    fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            line: None,
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadResult {
    pub slug: String,
    pub path: String,
    pub comments: usize,
    pub issues: Vec<Issue>,
}

impl ThreadResult {
    fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub errors: usize,
    pub warnings: usize,
    pub threads: Vec<ThreadResult>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

pub fn run(args: ValidateArgs, root: &Path, config: &Config) -> Result<(), String> {
    let format = args.format.resolve();
    let store = config.store(root);

    let slugs = if args.all {
        find_slugs(&store)?
    } else {
        args.slug.into_iter().collect()
    };

    let threads: Vec<ThreadResult> = slugs
        .iter()
        .map(|slug| validate_thread(slug, root, config))
        .collect();

    let summary = ValidationSummary {
        total: threads.len(),
        valid: threads.iter().filter(|t| t.is_valid()).count(),
        errors: threads.iter().map(|t| t.count(Severity::Error)).sum(),
        warnings: threads.iter().map(|t| t.count(Severity::Warning)).sum(),
        threads,
    };

    match format {
        OutputFormat::Pretty => output_pretty(&summary, args.verbose_files),
        OutputFormat::Plain => output_plain(&summary, args.verbose_files),
        OutputFormat::Json | OutputFormat::Yaml => output::print_structured(&summary, format)?,
    }

    if summary.errors > 0 {
        process::exit(1);
    }

    Ok(())
}

/// Slugs of every thread log directly under the storage root.
fn find_slugs(store: &Store) -> Result<Vec<String>, String> {
    let entries = match fs::read_dir(store.root()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(format!("reading {}: {}", store.root().display(), e)),
    };

    let suffix = format!(".{}", THREAD_EXTENSION);
    let mut slugs: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            e.file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(&suffix))
                .filter(|slug| !slug.is_empty())
                .map(str::to_string)
        })
        .collect();
    slugs.sort();
    Ok(slugs)
}

// ============================================================================
// Checks
// ============================================================================

fn validate_thread(slug: &str, root: &Path, config: &Config) -> ThreadResult {
    let mut thread = Thread::open(slug, config, root);
    let mut result = ThreadResult {
        slug: slug.to_string(),
        path: thread.thread_path().display().to_string(),
        comments: 0,
        issues: Vec::new(),
    };

    if let Err(e) = thread.load() {
        result.issues.push(load_issue(&e));
        return result;
    }
    result.comments = thread.len();

    let mut placeholders: Vec<&String> = thread.placeholders().iter().collect();
    placeholders.sort();
    for uid in placeholders {
        result.issues.push(Issue::warning(
            "W001",
            format!("replies to '{}', which is not in the thread", uid),
        ));
    }

    let mut listed = BTreeSet::new();
    for comment in thread.iter_mut() {
        listed.insert(comment.uid().to_string());
        match comment.load() {
            Ok(()) => {
                if comment.metadata().date().is_none() {
                    result.issues.push(Issue::warning(
                        "W003",
                        format!("'{}' has no {} metadata", comment.uid(), DATE_KEY),
                    ));
                }
            }
            Err(e) if e.is_missing_file() => {
                result.issues.push(Issue::error(
                    "E004",
                    format!("'{}': {} does not exist", comment.uid(), comment.path().display()),
                ));
            }
            Err(e) => {
                result
                    .issues
                    .push(Issue::error("E005", format!("'{}': {}", comment.uid(), e)));
            }
        }
    }

    for uid in unlisted_files(thread.store(), slug, &listed) {
        result.issues.push(Issue::warning(
            "W002",
            format!("'{}' has a comment file but no thread entry", uid),
        ));
    }

    result
}

fn load_issue(e: &Error) -> Issue {
    match e {
        Error::MalformedThreadLine { line, reason, .. } => {
            Issue::error_at("E001", *line, reason.clone())
        }
        Error::InvalidUid(uid) => Issue::error("E002", format!("'{}'", uid)),
        Error::ParentCycle(uid) => Issue::error("E003", format!("'{}'", uid)),
        other => Issue::error("E000", other.to_string()),
    }
}

/// Identifiers with a comment file that the thread log doesn't mention.
fn unlisted_files(store: &Store, slug: &str, listed: &BTreeSet<String>) -> Vec<String> {
    let dir: PathBuf = store.comment_dir(slug);
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut uids: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().and_then(|n| store.uid_from_file_name(n)))
        .filter(|uid| !listed.contains(uid))
        .collect();
    uids.sort();
    uids
}

// ============================================================================
// Output
// ============================================================================

fn output_pretty(summary: &ValidationSummary, verbose: bool) {
    if summary.errors == 0 && summary.warnings == 0 {
        println!(
            "Validated {} threads: {}",
            summary.total.to_string().bold(),
            "all valid ✓".green()
        );
    } else {
        let mut parts = vec![format!("{} valid", summary.valid)];
        if summary.errors > 0 {
            parts.push(format!("{} errors", summary.errors).red().to_string());
        }
        if summary.warnings > 0 {
            parts.push(
                format!("{} warnings", summary.warnings)
                    .yellow()
                    .to_string(),
            );
        }
        println!(
            "Validated {} threads: {}",
            summary.total.to_string().bold(),
            parts.join(", ")
        );
    }

    for thread in &summary.threads {
        if thread.is_valid() && !verbose {
            continue;
        }

        if thread.is_valid() {
            println!("  {} {}", "✓".green(), thread.path.dimmed());
            continue;
        }

        println!("  {} ({} comments)", thread.path, thread.comments);
        for issue in &thread.issues {
            let severity_marker = match issue.severity {
                Severity::Error => "E".red(),
                Severity::Warning => "W".yellow(),
            };
            let location = issue.line.map(|l| format!(":{}", l)).unwrap_or_default();
            println!(
                "    {} {} {}: {}{}",
                severity_marker,
                issue.code.dimmed(),
                issue_description(&issue.code),
                issue.message,
                location.dimmed()
            );
        }
    }
}

fn output_plain(summary: &ValidationSummary, verbose: bool) {
    println!(
        "Validated {} threads: {} valid, {} errors, {} warnings",
        summary.total, summary.valid, summary.errors, summary.warnings
    );

    for thread in &summary.threads {
        if thread.is_valid() {
            if verbose {
                println!("OK: {}", thread.path);
            }
            continue;
        }

        for issue in &thread.issues {
            let location = issue.line.map(|l| format!(":{}", l)).unwrap_or_default();
            println!(
                "{}: {}{}: [{}] {}: {}",
                issue.severity.to_string().to_uppercase(),
                thread.path,
                location,
                issue.code,
                issue_description(&issue.code),
                issue.message
            );
        }
    }
}
