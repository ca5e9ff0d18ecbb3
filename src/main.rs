use std::env;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;
mod file_utils;
mod models;
mod progress;

use commands::migration::migrate_runtime_data;
use progress::RunSummary;

const USAGE_EXIT: i32 = 2;

#[derive(Debug, PartialEq)]
struct Options {
    directory: PathBuf,
    dry_run: bool,
    report: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Invocation {
    Help,
    Version,
    Migrate(Options),
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let mut args = env::args_os();
    let program = args
        .next()
        .as_deref()
        .and_then(|p| Path::new(p).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "runtime_csv_migrate".to_string());
    let args: Vec<String> = match args.map(|a| a.into_string()).collect::<Result<Vec<_>, _>>() {
        Ok(args) => args,
        Err(bad) => {
            eprintln!("❌ Error: argument {:?} is not valid UTF-8", bad);
            usage(&program);
            process::exit(USAGE_EXIT);
        }
    };

    let options = match parse_args(&args) {
        Ok(Invocation::Help) => {
            usage(&program);
            return Ok(());
        }
        Ok(Invocation::Version) => {
            println!(
                "{} v{} (built {}, {})",
                program,
                env!("RUNTIME_CSV_MIGRATE_VERSION"),
                env!("BUILD_DATE"),
                env!("TARGET")
            );
            return Ok(());
        }
        Ok(Invocation::Migrate(options)) => options,
        Err(msg) => {
            eprintln!("❌ Error: {}", msg);
            usage(&program);
            process::exit(USAGE_EXIT);
        }
    };

    let root = match file_utils::validate_directory(&options.directory) {
        Ok(root) => root,
        Err(msg) => {
            let cwd = env::current_dir().unwrap_or_default();
            eprintln!("\n❌ {}.\nSearching in {}", msg, cwd.display());
            process::exit(USAGE_EXIT);
        }
    };

    println!(
        "\n+++ Migration of runtime data column order : {} ...{}\n",
        root.display(),
        if options.dry_run { " (dry run)" } else { "" }
    );
    tracing::info!(root = %root.display(), dry_run = options.dry_run, "migration started");

    let mut summary = RunSummary::new(&root, options.dry_run);
    let result = migrate_runtime_data(&root, options.dry_run, &mut summary);

    // the report is written even when a fatal error stops the walk
    if let Some(report) = &options.report {
        summary.write_report(report)?;
    }
    result?;

    println!("\n... Migration processing complete.\n");
    summary.finish();
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Interpret the arguments after the program name.
fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut directory = None;
    let mut dry_run = false;
    let mut report = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Invocation::Help),
            "--version" => return Ok(Invocation::Version),
            "--dry-run" | "-n" => dry_run = true,
            "--report" => {
                let path = iter.next().ok_or("--report requires a file path")?;
                report = Some(PathBuf::from(path));
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("unknown option '{}'", flag));
            }
            dir => {
                if directory.is_some() {
                    return Err(format!("unexpected extra argument '{}'", dir));
                }
                directory = Some(PathBuf::from(dir));
            }
        }
    }

    let directory = directory.ok_or("missing <directory> argument")?;
    Ok(Invocation::Migrate(Options {
        directory,
        dry_run,
        report,
    }))
}

fn usage(program: &str) {
    println!();
    println!("{} [--dry-run] [--report <file.json>] <directory>", program);
    println!();
    println!("Traverse tree and possibly rewrite *-runtime.csv files to the new column order.");
    println!();
    println!("OPTIONS:");
    println!("  -n, --dry-run         Classify files only, do not rewrite anything");
    println!("      --report <file>   Write a JSON report with the outcome of every file");
    println!("  -h, --help            Show this help");
    println!("      --version         Show version and build information");
    println!();
    println!("NOTES:");
    println!("  - Files already in the new format are skipped, re-running is safe");
    println!("  - Set RUST_LOG=debug for diagnostic output on stderr");
    println!();
}
