/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

use chrono::{ DateTime, Local, NaiveDateTime };

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use tracing::{ debug, enabled, info, Level };

use crate::datestamp::MetadataExtractor;
use crate::progress::ProgressReporter;
use crate::scan::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampRecord {
    Dated(NaiveDateTime),
    Undated,
}

/// Capture timestamp per source file, in enumeration order. Built once and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct TimestampIndex {
    entries: Vec<(SourceFile, TimestampRecord)>,
}

impl TimestampIndex {
    /// Runs the extractor exactly once per file. A file whose metadata can't
    /// be read is Undated, never a batch failure.
    pub fn build(files: Vec<SourceFile>, extractor: &dyn MetadataExtractor,
        reporter: &dyn ProgressReporter) -> TimestampIndex
    {
        let total = files.len();
        reporter.on_extract_start(total);

        let mut entries = Vec::with_capacity(total);
        for (n, sf) in files.into_iter().enumerate() {
            let rec = match extractor.extract(&sf.path) {
                Some(dt) => TimestampRecord::Dated(dt),
                None => TimestampRecord::Undated,
            };
            debug!("{:?} {}: {:?}", sf.kind, sf.path.display(), rec);
            if rec == TimestampRecord::Undated && enabled!(Level::DEBUG) {
                debug!("no capture date in {}, {}", sf.path.display(), fs_times(&sf.path));
            }
            entries.push((sf, rec));
            reporter.on_extract_progress(n + 1, total);
        }

        let idx = TimestampIndex { entries };
        info!("{} dated, {} undated", idx.dated_count(), idx.undated_count());
        reporter.on_extract_complete(idx.dated_count(), idx.undated_count());
        idx
    }

    pub fn entries(&self) -> &[(SourceFile, TimestampRecord)]
    {
        &self.entries
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    pub fn dated_count(&self) -> usize
    {
        self.entries.iter()
            .filter(|(_, rec)| *rec != TimestampRecord::Undated)
            .count()
    }

    pub fn undated_count(&self) -> usize
    {
        self.len() - self.dated_count()
    }
}

/// Filesystem times of a file, for diagnostics only; never used for naming
fn fs_times(path: &Path) -> String
{
    let show = |t: std::io::Result<SystemTime>| match t {
        Ok(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => String::from("unknown"),
    };
    match fs::metadata(path) {
        Ok(m) => format!("modified {}, created {}", show(m.modified()), show(m.created())),
        Err(e) => format!("no filesystem times: {}", e),
    }
}
