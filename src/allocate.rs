/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

//! destination name allocation
//!
//! Dated files are named `prefix_YYYY-MM-DD_HHMMSS`. Files sharing a
//! timestamp form a collision group, walked in enumeration order: the first
//! member keeps the bare name, each later member is compared against the
//! members already confirmed distinct, and is either dropped as a true
//! duplicate or given the next suffix (`a`, `b`, ... `z`, `aa`, `ab`, ...).
//! Undated files are numbered `prefix_N` in enumeration order.

use chrono::NaiveDateTime;

use std::collections::HashMap;
use std::path::{ Path, PathBuf };

use tracing::{ debug, info, warn };

use crate::compare::ContentComparator;
use crate::error::{ Error, FileFailure, Result, Stage };
use crate::index::{ TimestampIndex, TimestampRecord };
use crate::scan::SourceFile;

/// Settings that shape destination names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub prefix: String,
    pub original_name: bool,
    pub first_number: usize,
}

impl Naming {
    pub fn new(prefix: &str) -> Naming
    {
        Naming {
            prefix: String::from(prefix),
            original_name: false,
            first_number: 1,
        }
    }

    fn allocation(&self, base: String, suffix: Option<String>, sf: &SourceFile) -> NameAllocation
    {
        let tail = if self.original_name {
            Some(sanitize(&sf.stem())).filter(|s| !s.is_empty())
        } else {
            None
        };
        NameAllocation { base, suffix, tail }
    }
}

fn sanitize(name: &str) -> String
{
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAllocation {
    /// prefix plus timestamp or sequence number
    pub base: String,
    pub suffix: Option<String>,
    /// sanitized original stem, when requested
    pub tail: Option<String>,
}

impl NameAllocation {
    pub fn stem(&self) -> String
    {
        let mut s = self.base.clone();
        if let Some(ref suffix) = self.suffix {
            s.push_str(suffix);
        }
        if let Some(ref tail) = self.tail {
            s.push('_');
            s.push_str(tail);
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub source: SourceFile,
    pub name: NameAllocation,
}

impl Assignment {
    /// destination file name, original extension kept verbatim
    pub fn file_name(&self) -> String
    {
        format!("{}{}", self.name.stem(), self.source.extension())
    }
}

/// A file left out because its content matches an earlier group member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub source: SourceFile,
    pub duplicate_of: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    pub assignments: Vec<Assignment>,
    pub duplicates: Vec<Duplicate>,
    pub failures: Vec<FileFailure>,
}

/// Suffix for the n-th (1 based) distinct member after the first:
/// 1 -> a, 26 -> z, 27 -> aa, 53 -> ba
pub fn suffix_for(n: usize) -> String
{
    let mut n = n;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    out.iter().rev().collect()
}

pub fn allocate(naming: &Naming, index: &TimestampIndex, cmp: &dyn ContentComparator)
    -> Result<AllocationPlan>
{
    let mut plan = AllocationPlan::default();

    // groups keep first-occurrence order
    let mut groups: Vec<(NaiveDateTime, Vec<&SourceFile>)> = Vec::new();
    let mut slots: HashMap<NaiveDateTime, usize> = HashMap::new();
    let mut undated: Vec<&SourceFile> = Vec::new();

    for (sf, rec) in index.entries() {
        match rec {
            TimestampRecord::Dated(ts) => {
                let slot = *slots.entry(*ts).or_insert_with(|| {
                    groups.push((*ts, Vec::new()));
                    groups.len() - 1
                });
                groups[slot].1.push(sf);
            },
            TimestampRecord::Undated => undated.push(sf),
        }
    }

    for (ts, members) in groups.iter_mut() {
        members.sort_by_key(|sf| sf.index);
        allocate_group(naming, ts, members, cmp, &mut plan);
    }

    undated.sort_by_key(|sf| sf.index);
    for (n, sf) in undated.into_iter().enumerate() {
        let base = format!("{}_{}", naming.prefix, naming.first_number + n);
        plan.assignments.push(Assignment {
            source: sf.clone(),
            name: naming.allocation(base, None, sf),
        });
    }

    verify_unique(&plan.assignments)?;
    info!("allocated {} names, {} duplicates, {} unresolved",
        plan.assignments.len(), plan.duplicates.len(), plan.failures.len());
    Ok(plan)
}

fn allocate_group(naming: &Naming, ts: &NaiveDateTime, members: &[&SourceFile],
    cmp: &dyn ContentComparator, plan: &mut AllocationPlan)
{
    let base = format!("{}_{}", naming.prefix, ts.format("%Y-%m-%d_%H%M%S"));

    // members found distinct so far, in the order they were confirmed
    let mut confirmed: Vec<&SourceFile> = Vec::with_capacity(members.len());

    for sf in members {
        match find_match(sf, &confirmed, cmp) {
            Ok(Some(orig)) => {
                debug!("{} duplicates {}", sf.file_name(), orig.file_name());
                plan.duplicates.push(Duplicate {
                    source: (*sf).clone(),
                    duplicate_of: orig.path.clone(),
                });
            },
            Ok(None) => {
                let suffix = match confirmed.len() {
                    0 => None,
                    n => Some(suffix_for(n)),
                };
                plan.assignments.push(Assignment {
                    source: (*sf).clone(),
                    name: naming.allocation(base.clone(), suffix, sf),
                });
                confirmed.push(*sf);
            },
            Err(e) => {
                warn!("{}: {}", sf.path.display(), e);
                plan.failures.push(FileFailure::new(&sf.path, Stage::Compare, &e));
            },
        }
    }
}

fn find_match<'a>(sf: &SourceFile, confirmed: &[&'a SourceFile], cmp: &dyn ContentComparator)
    -> Result<Option<&'a SourceFile>>
{
    for c in confirmed {
        if cmp.identical(&c.path, &sf.path)? {
            return Ok(Some(*c));
        }
    }
    Ok(None)
}

/// Destination names must be unique ignoring case, since the target
/// filesystem may fold case.
pub fn verify_unique(assignments: &[Assignment]) -> Result<()>
{
    let mut seen: HashMap<String, &Path> = HashMap::with_capacity(assignments.len());
    for a in assignments {
        let name = a.file_name();
        if let Some(first) = seen.insert(name.to_lowercase(), &a.source.path) {
            return Err(Error::NameCollision {
                name,
                first: first.to_path_buf(),
                second: a.source.path.clone(),
            });
        }
    }
    Ok(())
}
