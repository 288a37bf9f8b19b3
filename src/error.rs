/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

use std::io;
use std::path::{ Path, PathBuf };

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not compare {} with {}: {source}", .left.display(), .right.display())]
    Comparison {
        left: PathBuf,
        right: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination already exists with different content: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Two sources were given the same destination name. Never expected;
    /// indicates an allocation defect and aborts the batch.
    #[error("destination name {name} allocated to both {} and {}", .first.display(), .second.display())]
    NameCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Which pass gave up on a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compare,
    Copy,
}

/// A per-file problem that was recovered from; the file needs manual review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub stage: Stage,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: &Path, stage: Stage, err: &Error) -> FileFailure
    {
        FileFailure {
            path: path.to_path_buf(),
            stage,
            reason: err.to_string(),
        }
    }
}
