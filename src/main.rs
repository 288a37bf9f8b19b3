/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

use anyhow::Context;

use std::process;

use tracing::{ info, warn };

mod actions;
mod allocate;
mod compare;
mod datestamp;
mod error;
mod index;
mod logging;
mod options;
mod progress;
mod scan;

use actions::{ exec_copies, BatchReport };
use allocate::allocate;
use compare::{ ContentComparator, DigestComparator, PixelComparator };
use datestamp::ExifExtractor;
use index::TimestampIndex;
use options::{ CompareMode, Options, Verbosity };
use progress::{ BarReporter, ProgressReporter, SilentReporter };
use scan::scan_path;

/// scan -> read dates -> allocate names -> copy. The source list is captured
/// in full before the first copy, so writing into SCAN_DIR itself is safe.
fn run(opts: &Options, reporter: &dyn ProgressReporter) -> error::Result<BatchReport>
{
    info!("scan {}", opts.in_dir.display());
    let skip = if opts.out_dir.starts_with(&opts.in_dir) {
        Some(opts.out_dir.as_path())
    } else {
        None
    };
    let sd = scan_path(&opts.in_dir, opts.recursive, skip);
    info!("{} media files, {} ignored", sd.files.len(), sd.ignored.len());

    let index = TimestampIndex::build(sd.files, &ExifExtractor, reporter);
    if index.is_empty() {
        warn!("no photos or videos found in {}", opts.in_dir.display());
    }

    let cmp: Box<dyn ContentComparator> = match opts.compare {
        CompareMode::Pixel => Box::new(PixelComparator),
        CompareMode::Digest => Box::new(DigestComparator),
    };
    let plan = allocate(&opts.naming(), &index, cmp.as_ref())?;

    if opts.dry_run {
        info!("dry run, nothing will be written");
    } else {
        info!("output to {}", opts.out_dir.display());
    }
    let mut report = exec_copies(plan, &opts.out_dir, cmp.as_ref(), opts.dry_run, reporter);
    report.ignored = sd.ignored;
    Ok(report)
}

fn main() -> anyhow::Result<()>
{
    let mut opts = options::args_to_opts();
    logging::init_logger(opts.verbosity);

    options::validate(&mut opts).context("invalid arguments")?;

    let reporter: Box<dyn ProgressReporter> = if opts.verbosity >= Verbosity::Verbose {
        Box::new(BarReporter::new())
    } else {
        Box::new(SilentReporter)
    };

    let report = run(&opts, reporter.as_ref()).context("batch aborted")?;
    println!("{}", report);

    if report.has_failures() {
        process::exit(2);
    }
    Ok(())
}
