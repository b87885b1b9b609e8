//! HTTP fixture linter CLI
//!
//! Validates markdown HTTP fixtures before they are used in tests, and checks
//! recorded responses against them.
//!
//! Usage:
//!   http-fixture-lint check <FILES>... [OPTIONS]
//!   http-fixture-lint verify <FIXTURE> --response <FILE> [OPTIONS]

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use http_fixture::{Failure, MatchOptions, MatchResult, Scope};
use http_fixture_lint::{lint_files, verify_file, LintIssue, LintOptions, LintResult, Severity};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// HTTP fixture linter
#[derive(Parser, Debug)]
#[command(name = "http-fixture-lint")]
#[command(author, version, about = "Validate markdown HTTP fixtures")]
struct Cli {
    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lint fixture files
    Check(CheckArgs),
    /// Verify a recorded response against a fixture
    Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    /// Fixture files to check
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", env = "HTTP_FIXTURE_OUTPUT")]
    output: OutputFormat,

    /// Only report errors (skip warning checks)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Strict mode - treat warnings as errors
    #[arg(short, long, env = "HTTP_FIXTURE_STRICT", value_parser = BoolishValueParser::new())]
    strict: bool,
}

#[derive(clap::Args, Debug)]
struct VerifyArgs {
    /// Fixture file holding the expected response
    fixture: PathBuf,

    /// JSON file holding the observed response
    #[arg(short, long)]
    response: PathBuf,

    /// Compare the protocol version too
    #[arg(long)]
    check_protocol_version: bool,

    /// Do not compare the status code
    #[arg(long)]
    ignore_status: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", env = "HTTP_FIXTURE_OUTPUT")]
    output: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let passed = match cli.command {
        Command::Check(args) => run_check(&args)?,
        Command::Verify(args) => run_verify(&args)?,
    };

    std::process::exit(if passed { 0 } else { 1 });
}

/// Logs go to stderr so that stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_check(args: &CheckArgs) -> anyhow::Result<bool> {
    let options = LintOptions {
        errors_only: args.errors_only,
    };
    let result = lint_files(&args.files, &options);

    match args.output {
        OutputFormat::Json => {
            let output = serde_json::to_string_pretty(&result).context("failed to encode result")?;
            println!("{output}");
        }
        OutputFormat::Text => {
            println!("{BOLD}{CYAN}HTTP Fixture Linter{RESET}");
            println!("{DIM}{RULE}{RESET}");
            println!(
                "{DIM}Checking:{RESET} {BOLD}{}{RESET} fixture file(s)",
                args.files.len()
            );
            print_results(&result);
            print_summary(&result, args.strict);
        }
    }

    Ok(result.is_valid(args.strict))
}

/// Group issues by file, keeping the order files were checked in.
fn issues_by_file(result: &LintResult) -> Vec<(&Path, Vec<&LintIssue>)> {
    let mut groups: Vec<(&Path, Vec<&LintIssue>)> = Vec::new();
    for issue in &result.issues {
        match groups
            .iter()
            .position(|(file, _)| *file == issue.file.as_path())
        {
            Some(idx) => groups[idx].1.push(issue),
            None => groups.push((issue.file.as_path(), vec![issue])),
        }
    }
    groups
}

fn print_results(result: &LintResult) {
    println!();

    if result.issues.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
        println!();
        return;
    }

    for (file, issues) in issues_by_file(result) {
        let file_errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        let file_warnings = issues.len() - file_errors;

        let status_indicator = if file_errors > 0 {
            format!("{RED}FAIL{RESET}")
        } else {
            format!("{YELLOW}WARN{RESET}")
        };

        let counts = match (file_errors, file_warnings) {
            (0, w) => format!(" {DIM}({YELLOW}{w} warning(s){RESET}{DIM}){RESET}"),
            (e, 0) => format!(" {DIM}({RED}{e} error(s){RESET}{DIM}){RESET}"),
            (e, w) => format!(
                " {DIM}({RED}{e} error(s){RESET}{DIM}, {YELLOW}{w} warning(s){RESET}{DIM}){RESET}"
            ),
        };

        println!(
            "{status_indicator} {BOLD}{CYAN}{}{RESET}{counts}",
            file.display()
        );

        for issue in issues {
            let color = severity_color(issue.severity);
            let marker = format!("{color}|{RESET}");

            let position = match (issue.line, &issue.location) {
                (Some(line), _) => format!("{DIM}[{RESET}{CYAN}line {line}{RESET}{DIM}]{RESET} "),
                (None, Some(location)) => {
                    format!("{DIM}[{RESET}{CYAN}{location}{RESET}{DIM}]{RESET} ")
                }
                (None, None) => String::new(),
            };

            println!(
                "  {marker} {position}{BOLD}{color}{}{RESET}: {} {DIM}({color}{}{DIM}){RESET}",
                issue.severity.label(),
                issue.message,
                issue.code
            );

            if let Some(suggestion) = &issue.suggestion {
                println!("  {marker}   {GREEN}-> {suggestion}{RESET}");
            }
        }
        println!();
    }
}

fn print_summary(result: &LintResult, strict: bool) {
    println!("{DIM}{RULE}{RESET}");
    println!("{BOLD}{CYAN}Summary{RESET}");
    println!("{DIM}{RULE}{RESET}");
    println!(
        "  {DIM}Files checked:{RESET} {BOLD}{}{RESET}",
        result.files_checked
    );

    if result.errors > 0 {
        println!("  {RED}Errors:{RESET}    {BOLD}{RED}{}{RESET}", result.errors);
    } else {
        println!("  {GREEN}Errors:{RESET}    {BOLD}{GREEN}0{RESET}");
    }

    if result.warnings > 0 {
        println!(
            "  {YELLOW}Warnings:{RESET}  {BOLD}{YELLOW}{}{RESET}",
            result.warnings
        );
    } else {
        println!("  {DIM}Warnings:{RESET}  {BOLD}0{RESET}");
    }

    println!();

    if !result.has_errors() && !result.has_warnings() {
        println!("{GREEN}{BOLD}All checks passed!{RESET}");
    } else if result.is_valid(strict) {
        println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
    } else if result.has_errors() {
        println!("{RED}{BOLD}Linting failed with errors{RESET}");
    } else {
        println!("{RED}{BOLD}Linting failed with warnings (strict mode){RESET}");
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
    }
}

fn run_verify(args: &VerifyArgs) -> anyhow::Result<bool> {
    let options = MatchOptions {
        check_protocol_version: args.check_protocol_version,
        check_status: !args.ignore_status,
    };
    let result = verify_file(&args.fixture, &args.response, &options).with_context(|| {
        format!(
            "could not verify {} against {}",
            args.response.display(),
            args.fixture.display()
        )
    })?;

    match args.output {
        OutputFormat::Json => {
            let output = serde_json::to_string_pretty(&result).context("failed to encode result")?;
            println!("{output}");
        }
        OutputFormat::Text => print_verification(&args.fixture, &result),
    }

    Ok(result.is_success())
}

fn print_verification(fixture: &Path, result: &MatchResult) {
    if result.is_success() {
        println!("{GREEN}PASS{RESET} {BOLD}{CYAN}{}{RESET}", fixture.display());
        return;
    }

    println!(
        "{RED}FAIL{RESET} {BOLD}{CYAN}{}{RESET} {DIM}({RED}{} mismatch(es){RESET}{DIM}){RESET}",
        fixture.display(),
        result.failures().len()
    );
    for failure in result.failures() {
        print_failure(failure);
    }
}

fn print_failure(failure: &Failure) {
    let scope_color = match failure.scope {
        Scope::Status | Scope::Protocol => YELLOW,
        Scope::Header => CYAN,
        Scope::Body => RED,
    };
    let actual = failure
        .actual
        .as_ref()
        .map_or_else(|| "nothing".to_string(), |v| v.to_string());
    let path = if failure.path.is_empty() {
        "$"
    } else {
        failure.path.as_str()
    };

    println!(
        "  {RED}|{RESET} {scope_color}{}{RESET} {DIM}[{RESET}{CYAN}{path}{RESET}{DIM}]{RESET}",
        failure.scope
    );
    println!("  {RED}|{RESET}   {GREEN}expected{RESET} {}", failure.expected);
    println!("  {RED}|{RESET}   {RED}got{RESET}      {actual}");
}
