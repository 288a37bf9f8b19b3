/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

//! copy executor: place each allocated file in the output directory

use filetime::FileTime;

use std::fmt;
use std::fs::{ self, File, OpenOptions };
use std::io;
use std::path::{ Path, PathBuf };

use tracing::{ debug, warn };

use crate::allocate::{ AllocationPlan, Duplicate };
use crate::compare::ContentComparator;
use crate::error::{ Error, FileFailure, Result, Stage };
use crate::progress::ProgressReporter;

pub type CopyPair = (PathBuf, PathBuf); // src, dst

/// Everything the run did, per file
#[derive(Debug, Default)]
pub struct BatchReport {
    pub dry_run: bool,
    pub copied: Vec<CopyPair>,
    /// destination already held this exact content
    pub present: Vec<CopyPair>,
    pub duplicates: Vec<Duplicate>,
    pub failures: Vec<FileFailure>,
    /// not a recognized photo or video
    pub ignored: Vec<PathBuf>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool
    {
        !self.failures.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        let verb = if self.dry_run { "would copy" } else { "copied" };
        for (src, dst) in self.copied.iter() {
            writeln!(f, "{:>10} {} -> {}", verb, src.display(), dst.display())?;
        }
        for (src, dst) in self.present.iter() {
            writeln!(f, "{:>10} {} = {}", "present", src.display(), dst.display())?;
        }
        for d in self.duplicates.iter() {
            writeln!(f, "{:>10} {} (same as {})", "duplicate", d.source.path.display(),
                d.duplicate_of.display())?;
        }
        for ff in self.failures.iter() {
            writeln!(f, "{:>10} {}: {}", "FAILED", ff.path.display(), ff.reason)?;
        }
        write!(f, "{} {}, {} already present, {} duplicates skipped, {} failed, {} ignored",
            self.copied.len(), verb, self.present.len(), self.duplicates.len(),
            self.failures.len(), self.ignored.len())
    }
}

enum Placed {
    Copied,
    Present,
}

/// Copy every planned file into `outdir`. Sources are only ever read; a
/// failure on one file is recorded and the batch moves on.
pub fn exec_copies(plan: AllocationPlan, outdir: &Path, cmp: &dyn ContentComparator,
    dry_run: bool, reporter: &dyn ProgressReporter) -> BatchReport
{
    let mut report = BatchReport {
        dry_run,
        duplicates: plan.duplicates,
        failures: plan.failures,
        ..BatchReport::default()
    };

    let total = plan.assignments.len();
    reporter.on_copy_start(total);

    for (n, a) in plan.assignments.iter().enumerate() {
        let src = a.source.path.clone();
        let dst = outdir.join(a.file_name());

        let placed = if dry_run {
            preview(&src, &dst, cmp)
        } else {
            place(&src, &dst, cmp)
        };
        match placed {
            Ok(Placed::Copied) => {
                debug!("{} -> {}", src.display(), dst.display());
                report.copied.push((src, dst));
            },
            Ok(Placed::Present) => {
                debug!("{} already at {}", src.display(), dst.display());
                report.present.push((src, dst));
            },
            Err(e) => {
                warn!("copy of {} failed: {}", src.display(), e);
                report.failures.push(FileFailure::new(&src, Stage::Copy, &e));
            },
        }
        reporter.on_copy_progress(n + 1, total);
    }

    let copy_failures = report.failures.iter()
        .filter(|f| f.stage == Stage::Copy)
        .count();
    reporter.on_copy_complete(report.copied.len(), copy_failures);
    report
}

fn place(src: &Path, dst: &Path, cmp: &dyn ContentComparator) -> Result<Placed>
{
    if same_file(src, dst) {
        return Ok(Placed::Present);
    }
    match copy_with_metadata(src, dst) {
        Ok(()) => Ok(Placed::Copied),
        Err(Error::Io(ref e)) if e.kind() == io::ErrorKind::AlreadyExists => {
            if cmp.identical(src, dst)? {
                Ok(Placed::Present)
            } else {
                Err(Error::DestinationExists(dst.to_path_buf()))
            }
        },
        Err(e) => Err(e),
    }
}

/// What `place` would do, without writing
fn preview(src: &Path, dst: &Path, cmp: &dyn ContentComparator) -> Result<Placed>
{
    if same_file(src, dst) {
        return Ok(Placed::Present);
    }
    if fs::symlink_metadata(dst).is_err() {
        return Ok(Placed::Copied);
    }
    if cmp.identical(src, dst)? {
        Ok(Placed::Present)
    } else {
        Err(Error::DestinationExists(dst.to_path_buf()))
    }
}

fn same_file(a: &Path, b: &Path) -> bool
{
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Copy bytes, then access/modification times and permissions. Never
/// replaces an existing file; a partial destination is removed on failure.
pub fn copy_with_metadata(src: &Path, dst: &Path) -> Result<()>
{
    let meta = fs::metadata(src)?;
    let mut input = File::open(src)?;
    let mut output = OpenOptions::new().write(true).create_new(true).open(dst)?;

    let written = io::copy(&mut input, &mut output)
        .and_then(|_| output.sync_all());
    drop(output);

    let res = written
        .and_then(|_| {
            let atime = FileTime::from_last_access_time(&meta);
            let mtime = FileTime::from_last_modification_time(&meta);
            filetime::set_file_times(dst, atime, mtime)
        })
        .and_then(|_| fs::set_permissions(dst, meta.permissions()));

    if let Err(e) = res {
        // only ever the file created above
        if let Err(rm) = fs::remove_file(dst) {
            warn!("could not remove partial copy {}: {}", dst.display(), rm);
        }
        return Err(e.into());
    }
    Ok(())
}
