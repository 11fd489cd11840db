//! ImpactForge: environmental footprint dashboard
//!
//! Entry point that sets up logging, loads the datasets once and renders the
//! dashboard for one category or interactively.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use impactforge::app::{render_view, run_interactive};
use impactforge::report::ReportOptions;
use impactforge::{Args, ClusterParams, Session};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "impactforge=debug" } else { "impactforge=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    // A load failure stops here, before any data view is rendered
    let session = Session::open(&args.sources(), ClusterParams::default())
        .map_err(|err| anyhow::anyhow!("Error reading data files: {}", err))?;

    std::fs::create_dir_all(&args.output_dir)?;
    let options = ReportOptions {
        max_rows: args.rows,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.interactive {
        let stdin = io::stdin();
        let rendered = run_interactive(&session, stdin.lock(), &mut out, &args.output_dir, &options)?;
        writeln!(out, "\n{} dashboard(s) rendered", rendered)?;
    } else {
        render_view(&session, &args.category, &args.output_dir, &options, &mut out)?;
    }

    out.flush()?;
    Ok(())
}
