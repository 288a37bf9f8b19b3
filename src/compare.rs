/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

//! content comparators used to tell true duplicates from files that merely
//! share a capture timestamp

use sha2::{ Digest, Sha256 };

use std::fs::{ self, File };
use std::io::{ self, Read };
use std::path::Path;

use tracing::debug;

use crate::error::{ Error, Result };
use crate::scan::{ media_kind, MediaKind };

/// Decide whether two files hold the same content. Differing sizes or formats
/// are simply "not identical"; only a failed read is an error.
pub trait ContentComparator {
    fn identical(&self, a: &Path, b: &Path) -> Result<bool>;
}

fn compare_err(a: &Path, b: &Path, source: io::Error) -> Error
{
    Error::Comparison {
        left: a.to_path_buf(),
        right: b.to_path_buf(),
        source,
    }
}

/// Compares decoded pixels, so a re-encoded copy of the same picture counts
/// as a duplicate. Anything that isn't a pair of images goes through
/// `DigestComparator`; images the decoder can't handle (raw) fall back to a
/// byte comparison.
pub struct PixelComparator;

impl ContentComparator for PixelComparator {
    fn identical(&self, a: &Path, b: &Path) -> Result<bool>
    {
        if media_kind(a) != Some(MediaKind::Image) || media_kind(b) != Some(MediaKind::Image) {
            return DigestComparator.identical(a, b);
        }

        let abuf = fs::read(a).map_err(|e| compare_err(a, b, e))?;
        let bbuf = fs::read(b).map_err(|e| compare_err(a, b, e))?;

        match (image::load_from_memory(&abuf), image::load_from_memory(&bbuf)) {
            (Ok(aimg), Ok(bimg)) => {
                let aimg = aimg.to_rgba8();
                let bimg = bimg.to_rgba8();
                Ok(aimg.dimensions() == bimg.dimensions() && aimg.as_raw() == bimg.as_raw())
            },
            _ => {
                debug!("byte compare {} / {}", a.display(), b.display());
                Ok(abuf == bbuf)
            }
        }
    }
}

/// Byte exact comparison by SHA-256 fingerprint
pub struct DigestComparator;

impl ContentComparator for DigestComparator {
    fn identical(&self, a: &Path, b: &Path) -> Result<bool>
    {
        let alen = fs::metadata(a).map_err(|e| compare_err(a, b, e))?.len();
        let blen = fs::metadata(b).map_err(|e| compare_err(a, b, e))?.len();
        if alen != blen {
            return Ok(false);
        }
        let ahash = hash_file(a).map_err(|e| compare_err(a, b, e))?;
        let bhash = hash_file(b).map_err(|e| compare_err(a, b, e))?;
        Ok(ahash == bhash)
    }
}

pub fn hash_file(fname: &Path) -> io::Result<Vec<u8>>
{
    let mut h = Sha256::new();
    let mut buf = [0u8; 4096];

    let mut f = File::open(fname)?;
    loop {
        let nbytes = f.read(&mut buf)?;
        if nbytes == 0 { break; }
        h.update(&buf[0..nbytes]);
    }
    Ok(h.finalize().to_vec())
}
