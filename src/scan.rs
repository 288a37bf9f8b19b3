/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

//! enumerate the media files of a source directory

use ignore::WalkBuilder;

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::path::{ Path, PathBuf };

use tracing::{ debug, warn };

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "heic", "heif", "webp", "gif", "bmp",
    "dng", "cr2", "cr3", "nef", "arw", "orf", "rw2", "pef", "srw", "raf",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "3gp", "avi", "mts", "m2ts", "mkv",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

/// Classify a path by its extension, None for anything not a photo or video
pub fn media_kind(path: &Path) -> Option<MediaKind>
{
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// One input file. `index` is its zero based position in the enumeration
/// and is the only ordering signal for files without a capture date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    pub path: PathBuf,
    pub index: usize,
    pub kind: MediaKind,
}

impl SourceFile {
    pub fn file_name(&self) -> String
    {
        self.path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String
    {
        self.path.file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// extension with its leading dot, case kept as-is; empty if none
    pub fn extension(&self) -> String
    {
        self.path.extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()
    }
}

pub struct ScanData {
    pub files: Vec<SourceFile>,
    pub ignored: Vec<PathBuf>,
}

/// Walk `dir` and capture the full list of media files before anything is
/// written. `skip` names a subtree to leave out (the destination, when it
/// lives inside the source).
pub fn scan_path(dir: &Path, recursive: bool, skip: Option<&Path>) -> ScanData
{
    let mut walk = WalkBuilder::new(dir);
    walk.standard_filters(false)
        .follow_links(false)
        .sort_by_file_path(files_first);
    if !recursive {
        walk.max_depth(Some(1));
    }
    if let Some(skip) = skip {
        if skip != dir {
            let skip = skip.to_path_buf();
            walk.filter_entry(move |ent| ent.path() != skip);
        }
    }

    let mut sd = ScanData { files: Vec::new(), ignored: Vec::new() };
    for res in walk.build() {
        let ent = match res {
            Ok(ent) => ent,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        match ent.file_type() {
            Some(ft) if ft.is_file() => (),
            Some(ft) if ft.is_symlink() => {
                // linked files are taken, linked directories are not walked
                match fs::metadata(ent.path()) {
                    Ok(m) if m.is_file() => (),
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("dangling link, ignored: {}: {}", ent.path().display(), e);
                        sd.ignored.push(ent.into_path());
                        continue;
                    }
                }
            },
            _ => continue,
        }

        let path = ent.into_path();
        match media_kind(&path) {
            Some(kind) => {
                let index = sd.files.len();
                debug!("found {} #{}", path.display(), index);
                sd.files.push(SourceFile { path, index, kind });
            },
            None => {
                warn!("unknown file type, ignored: {}", path.display());
                sd.ignored.push(path);
            }
        }
    }
    sd
}

/// Sibling order for the walk: every file of a directory comes before any of
/// its subdirectories, each run in natural order.
fn files_first(a: &Path, b: &Path) -> Ordering
{
    let name = |p: &Path| p.file_name().unwrap_or_else(|| p.as_os_str()).to_os_string();
    a.is_dir().cmp(&b.is_dir())
        .then_with(|| natural_cmp(&name(a), &name(b)))
}

fn chunks(s: &str) -> Vec<(bool, &str)>
{
    let mut out = Vec::new();
    let mut start = 0;
    let mut digit = None;
    for (i, c) in s.char_indices() {
        let d = c.is_ascii_digit();
        if let Some(prev) = digit {
            if prev != d {
                out.push((prev, &s[start..i]));
                start = i;
            }
        }
        digit = Some(d);
    }
    if let Some(d) = digit {
        out.push((d, &s[start..]));
    }
    out
}

fn cmp_digits(a: &str, b: &str) -> Ordering
{
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural filename order: runs of digits compare by value, so IMG2 sorts
/// before IMG10. Falls back to plain ordering to stay total.
pub fn natural_cmp(a: &OsStr, b: &OsStr) -> Ordering
{
    let a = a.to_string_lossy();
    let b = b.to_string_lossy();
    let ca = chunks(&a);
    let cb = chunks(&b);

    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = match (x, y) {
            ((true, xs), (true, ys)) => cmp_digits(xs, ys),
            ((_, xs), (_, ys)) => xs.cmp(ys),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len()).then_with(|| a.cmp(&b))
}


#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn names(sd: &ScanData, root: &Path) -> Vec<String>
    {
        sd.files.iter()
            .map(|f| f.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn t_natural_cmp() {
        let mut v = vec!["IMG10.JPG", "IMG2.JPG", "IMG1.JPG", "IMG02b.JPG"];
        v.sort_by(|a, b| natural_cmp(OsStr::new(a), OsStr::new(b)));
        assert_eq!(v, vec!["IMG1.JPG", "IMG2.JPG", "IMG02b.JPG", "IMG10.JPG"]);

        assert_eq!(natural_cmp(OsStr::new("a"), OsStr::new("a")), Ordering::Equal);
        assert_ne!(natural_cmp(OsStr::new("a01"), OsStr::new("a1")), Ordering::Equal);
    }

    #[test]
    fn t_media_kind() {
        assert_eq!(media_kind(Path::new("x/P6114455.JPG")), Some(MediaKind::Image));
        assert_eq!(media_kind(Path::new("clip.MoV")), Some(MediaKind::Video));
        assert_eq!(media_kind(Path::new("notes.txt")), None);
        assert_eq!(media_kind(Path::new("README")), None);
    }

    #[test]
    fn t_scan_path() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("sub")).unwrap();
        for f in ["IMG10.JPG", "IMG2.JPG", "notes.txt", "sub/IMG1.JPG"].iter() {
            fs::write(root.join(f), f.as_bytes()).unwrap();
        }

        let flat = scan_path(root, false, None);
        assert_eq!(names(&flat, root), vec!["IMG2.JPG", "IMG10.JPG"]);
        assert_eq!(flat.files[0].index, 0);
        assert_eq!(flat.files[1].index, 1);
        assert_eq!(flat.ignored.len(), 1);

        let deep = scan_path(root, true, None);
        assert_eq!(names(&deep, root), vec!["IMG2.JPG", "IMG10.JPG", "sub/IMG1.JPG"]);
        assert_eq!(deep.files[2].index, 2);

        let skipped = scan_path(root, true, Some(&root.join("sub")));
        assert_eq!(names(&skipped, root), vec!["IMG2.JPG", "IMG10.JPG"]);

        // a directory sorting ahead of the root files is still visited after them
        fs::create_dir_all(root.join("a/deeper")).unwrap();
        fs::write(root.join("a/x.jpg"), b"x").unwrap();
        fs::write(root.join("a/deeper/y.jpg"), b"y").unwrap();
        fs::write(root.join("b.jpg"), b"b").unwrap();
        fs::write(root.join("sub/z.jpg"), b"z").unwrap();
        let ordered = scan_path(root, true, None);
        assert_eq!(names(&ordered, root), vec![
            "IMG2.JPG", "IMG10.JPG", "b.jpg",
            "a/x.jpg", "a/deeper/y.jpg",
            "sub/IMG1.JPG", "sub/z.jpg",
        ]);
        let idx: Vec<usize> = ordered.files.iter().map(|f| f.index).collect();
        assert_eq!(idx, (0..7).collect::<Vec<usize>>());
    }

    #[cfg(unix)]
    #[test]
    fn t_scan_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        let elsewhere = tmp.path().join("elsewhere");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&elsewhere).unwrap();
        fs::write(elsewhere.join("real.jpg"), b"real").unwrap();
        fs::write(root.join("IMG1.JPG"), b"one").unwrap();
        std::os::unix::fs::symlink(elsewhere.join("real.jpg"), root.join("IMG2.JPG")).unwrap();
        std::os::unix::fs::symlink(elsewhere.join("gone.jpg"), root.join("IMG3.JPG")).unwrap();
        std::os::unix::fs::symlink(&elsewhere, root.join("linkdir")).unwrap();

        let sd = scan_path(&root, true, None);
        assert_eq!(names(&sd, &root), vec!["IMG1.JPG", "IMG2.JPG"]);
        assert_eq!(sd.ignored, vec![root.join("IMG3.JPG")]);
    }

    #[test]
    fn t_source_file_parts() {
        let sf = SourceFile {
            path: PathBuf::from("in/P6114455.JPG"),
            index: 0,
            kind: MediaKind::Image,
        };
        assert_eq!(sf.file_name(), "P6114455.JPG");
        assert_eq!(sf.stem(), "P6114455");
        assert_eq!(sf.extension(), ".JPG");
    }
}
