/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

use indicatif::{ ProgressBar, ProgressStyle };

use std::sync::Mutex;

/// Progress callbacks for the extraction and copy passes. All methods
/// default to no-ops.
pub trait ProgressReporter {
    fn on_extract_start(&self, _total: usize) {}
    fn on_extract_progress(&self, _done: usize, _total: usize) {}
    fn on_extract_complete(&self, _dated: usize, _undated: usize) {}
    fn on_copy_start(&self, _total: usize) {}
    fn on_copy_progress(&self, _done: usize, _total: usize) {}
    fn on_copy_complete(&self, _copied: usize, _failed: usize) {}
}

pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Terminal progress bars, one per pass
pub struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    pub fn new() -> Self
    {
        BarReporter { bar: Mutex::new(None) }
    }

    fn start(&self, total: usize, what: &str)
    {
        let pb = ProgressBar::new(total as u64);
        let template = format!("  {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} ({{eta}} remaining)", what);
        if let Ok(style) = ProgressStyle::with_template(&template) {
            pb.set_style(style.progress_chars("━╸─"));
        }
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn set(&self, done: usize)
    {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(done as u64);
            }
        }
    }

    fn finish(&self)
    {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl Default for BarReporter {
    fn default() -> Self
    {
        Self::new()
    }
}

impl ProgressReporter for BarReporter {
    fn on_extract_start(&self, total: usize)
    {
        self.start(total, "Reading dates");
    }

    fn on_extract_progress(&self, done: usize, _total: usize)
    {
        self.set(done);
    }

    fn on_extract_complete(&self, dated: usize, undated: usize)
    {
        self.finish();
        eprintln!("  \x1b[32m✓\x1b[0m {} dated, {} without capture date", dated, undated);
    }

    fn on_copy_start(&self, total: usize)
    {
        self.start(total, "Copying");
    }

    fn on_copy_progress(&self, done: usize, _total: usize)
    {
        self.set(done);
    }

    fn on_copy_complete(&self, copied: usize, failed: usize)
    {
        self.finish();
        eprintln!("  \x1b[32m✓\x1b[0m {} copied, {} failed", copied, failed);
    }
}
