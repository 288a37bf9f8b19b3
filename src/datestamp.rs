/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

//! capture date extraction from embedded metadata

use chrono::{ DateTime, NaiveDateTime, Timelike };
use exif::{ In, Reader, Tag, Value };

use std::fs::File;
use std::io::{ BufReader, Read, Seek, SeekFrom };
use std::path::Path;

use tracing::debug;

use crate::scan::{ media_kind, MediaKind };

/// Given a file, produce its capture timestamp if the metadata has one.
/// Implementations must not fail: unreadable or unsupported metadata is None.
pub trait MetadataExtractor {
    fn extract(&self, path: &Path) -> Option<NaiveDateTime>;
}

/// Reads EXIF from images and the QuickTime movie header from videos
pub struct ExifExtractor;

impl MetadataExtractor for ExifExtractor {
    fn extract(&self, path: &Path) -> Option<NaiveDateTime>
    {
        let dt = match media_kind(path) {
            Some(MediaKind::Image) => read_exif_date(path),
            Some(MediaKind::Video) => read_quicktime_date(path),
            None => None,
        };
        if dt.is_none() {
            debug!("no capture date in {}", path.display());
        }
        dt.and_then(|d| d.with_nanosecond(0))
    }
}

// CreateDate, DateTimeOriginal, ModifyDate in that order
const EXIF_DATE_TAGS: [Tag; 3] = [
    Tag::DateTimeDigitized,
    Tag::DateTimeOriginal,
    Tag::DateTime,
];

fn read_exif_date(path: &Path) -> Option<NaiveDateTime>
{
    let f = File::open(path).ok()?;
    let mut reader = BufReader::new(f);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("exif read failed for {}: {}", path.display(), e);
            return None;
        }
    };

    for tag in EXIF_DATE_TAGS.iter() {
        let field = match exif.get_field(*tag, In::PRIMARY) {
            Some(field) => field,
            None => continue,
        };
        if let Value::Ascii(ref vals) = field.value {
            let parsed = vals.first()
                .and_then(|raw| std::str::from_utf8(raw).ok())
                .and_then(parse_date);
            if parsed.is_some() {
                debug!("{}: date from {}", path.display(), tag);
                return parsed;
            }
        }
    }
    None
}

/// Parse an EXIF style "2022:04:04 11:20:22" (or dashed) date. Anything after
/// the seconds, such as subseconds or a zone offset, is ignored.
pub fn parse_date(s: &str) -> Option<NaiveDateTime>
{
    let s = s.trim().trim_matches('"');
    let head = s.get(..19)?;
    NaiveDateTime::parse_from_str(head, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(head, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

#[derive(Debug, Clone, Copy)]
struct Atom {
    start: u64,
    end: u64,
}

// seconds between 1904-01-01 and 1970-01-01
const QT_EPOCH_OFFSET: i64 = 2_082_844_800;

fn read_quicktime_date(path: &Path) -> Option<NaiveDateTime>
{
    let mut f = File::open(path).ok()?;
    let len = f.metadata().ok()?.len();
    let moov = find_atom(&mut f, 0, len, *b"moov")?;
    let mvhd = find_atom(&mut f, moov.start, moov.end, *b"mvhd")?;

    f.seek(SeekFrom::Start(mvhd.start)).ok()?;
    let mut ver_flags = [0u8; 4];
    f.read_exact(&mut ver_flags).ok()?;
    let secs = if ver_flags[0] == 1 {
        let mut buf = [0u8; 8];
        f.read_exact(&mut buf).ok()?;
        u64::from_be_bytes(buf)
    } else {
        let mut buf = [0u8; 4];
        f.read_exact(&mut buf).ok()?;
        u64::from(u32::from_be_bytes(buf))
    };
    if secs == 0 {
        // unset by the recorder
        return None;
    }
    let unix = i64::try_from(secs).ok()?.checked_sub(QT_EPOCH_OFFSET)?;
    DateTime::from_timestamp(unix, 0).map(|dt| dt.naive_utc())
}

fn find_atom(f: &mut File, start: u64, end: u64, kind: [u8; 4]) -> Option<Atom>
{
    let mut offset = start;
    while offset + 8 <= end {
        f.seek(SeekFrom::Start(offset)).ok()?;
        let mut header = [0u8; 8];
        f.read_exact(&mut header).ok()?;
        let mut size = u64::from(u32::from_be_bytes([header[0], header[1], header[2], header[3]]));
        let mut header_len = 8;

        if size == 1 {
            let mut ext = [0u8; 8];
            f.read_exact(&mut ext).ok()?;
            size = u64::from_be_bytes(ext);
            header_len = 16;
        } else if size == 0 {
            size = end - offset;
        }
        if size < header_len {
            return None;
        }
        let atom_end = offset.saturating_add(size).min(end);
        if header[4..8] == kind {
            return Some(Atom { start: offset + header_len, end: atom_end });
        }
        offset = atom_end;
    }
    None
}


#[cfg(test)]
pub mod test {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    /// Minimal JPEG holding an APP1 segment with a single IFD0 DateTime tag
    pub fn jpeg_with_date(date: &str) -> Vec<u8>
    {
        assert_eq!(date.len(), 19);
        let mut tiff: Vec<u8> = vec![b'M', b'M', 0x00, 0x2a, 0, 0, 0, 8];
        tiff.extend_from_slice(&[0x00, 0x01]);             // one entry
        tiff.extend_from_slice(&[0x01, 0x32, 0x00, 0x02]); // DateTime, ASCII
        tiff.extend_from_slice(&[0, 0, 0, 20]);            // count incl. NUL
        tiff.extend_from_slice(&[0, 0, 0, 26]);            // value offset
        tiff.extend_from_slice(&[0, 0, 0, 0]);             // no next IFD
        tiff.extend_from_slice(date.as_bytes());
        tiff.push(0);

        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(&tiff);
        let seglen = (app1.len() + 2) as u16;

        let mut out = vec![0xff, 0xd8, 0xff, 0xe1];
        out.extend_from_slice(&seglen.to_be_bytes());
        out.extend_from_slice(&app1);
        out.extend_from_slice(&[0xff, 0xd9]);
        out
    }

    fn atom(kind: &[u8; 4], body: &[u8]) -> Vec<u8>
    {
        let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    fn mp4_with_created(qt_secs: u32) -> Vec<u8>
    {
        let mut mvhd = vec![0u8; 4];
        mvhd.extend_from_slice(&qt_secs.to_be_bytes());
        mvhd.extend_from_slice(&qt_secs.to_be_bytes());
        mvhd.extend_from_slice(&[0u8; 12]);

        let mut out = atom(b"ftyp", b"isom\0\0\0\0isommp41");
        out.extend(atom(b"moov", &atom(b"mvhd", &mvhd)));
        out
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime
    {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn t_parse_date() {
        assert_eq!(parse_date("2022:04:04 11:20:22"), Some(at(2022, 4, 4, 11, 20, 22)));
        assert_eq!(parse_date("2022-04-04 11:20:22"), Some(at(2022, 4, 4, 11, 20, 22)));
        assert_eq!(parse_date("2022:04:04 11:20:22+02:00"), Some(at(2022, 4, 4, 11, 20, 22)));
        assert_eq!(parse_date("2022:04:04 11:20:22.451"), Some(at(2022, 4, 4, 11, 20, 22)));
        assert_eq!(parse_date("0000:00:00 00:00:00"), None);
        assert_eq!(parse_date("garbage"), None);
    }

    #[test]
    fn t_exif_date() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("P6114455.JPG");
        fs::write(&p, jpeg_with_date("2022:04:04 11:20:22")).unwrap();

        assert_eq!(ExifExtractor.extract(&p), Some(at(2022, 4, 4, 11, 20, 22)));
    }

    #[test]
    fn t_no_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let jpg = tmp.path().join("P6124545.JPG");
        fs::write(&jpg, [0xff, 0xd8, 0xff, 0xd9]).unwrap();
        let junk = tmp.path().join("broken.mov");
        fs::write(&junk, b"not a movie").unwrap();

        assert_eq!(ExifExtractor.extract(&jpg), None);
        assert_eq!(ExifExtractor.extract(&junk), None);
        assert_eq!(ExifExtractor.extract(&tmp.path().join("missing.jpg")), None);
    }

    #[test]
    fn t_quicktime_date() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("clip.MP4");
        // 2022-04-04 11:20:22 UTC
        let unix = at(2022, 4, 4, 11, 20, 22).and_utc().timestamp();
        fs::write(&p, mp4_with_created((unix + QT_EPOCH_OFFSET) as u32)).unwrap();
        assert_eq!(ExifExtractor.extract(&p), Some(at(2022, 4, 4, 11, 20, 22)));

        let unset = tmp.path().join("unset.mov");
        fs::write(&unset, mp4_with_created(0)).unwrap();
        assert_eq!(ExifExtractor.extract(&unset), None);
    }
}
