// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! weave: sort integer files on cooperative coroutines, then merge them.

mod output;
mod report;

use std::fs::File;
use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use log::LevelFilter;

use weave_sort::{sort_files, store_ints};

/// Sort each input file in its own coroutine, merge the results and write
/// them, space-separated, to OUT_FILE.
#[derive(Debug, Parser)]
#[command(name = "weave", version)]
struct Cli {
    /// More logging (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Stack size per coroutine, in bytes.
    #[arg(long, value_name = "BYTES")]
    stack_size: Option<usize>,

    /// File receiving the merged output (truncated).
    out_file: PathBuf,

    /// Files of whitespace-separated integers.
    #[arg(required = true)]
    in_files: Vec<PathBuf>,
}

fn main() {
    output::init();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("{}: {:#}", output::error_label(), err);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    check_inputs(&cli.in_files)?;

    let sorted = sort_files(&cli.in_files, cli.stack_size)
        .context("sorting failed, no output written")?;
    let merged = sorted.merged();
    store_ints(&merged, &cli.out_file)?;

    report::print(&cli.in_files, &sorted.report, merged.len(), &cli.out_file);
    Ok(())
}

/// Every input must be readable before any task is scheduled.
fn check_inputs(paths: &[PathBuf]) -> anyhow::Result<()> {
    let mut unreadable = 0;
    for path in paths {
        if let Err(err) = File::open(path) {
            eprintln!(
                "{}: cannot read {}: {}",
                output::error_label(),
                output::file_path(&path.display().to_string()),
                err
            );
            unreadable += 1;
        }
    }
    if unreadable > 0 {
        bail!("{} input file(s) cannot be read", unreadable);
    }
    Ok(())
}
