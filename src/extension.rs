use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Bytes read from the head of a file for signature sniffing.
const SNIFF_LEN: usize = 512;

const SUPPLEMENTAL_SUFFIX: &str = ".supplemental-metadata";

/// File type recognized from leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedType {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Webp,
    /// Plain TIFF or a TIFF-based RAW (NEF/ARW/DNG/...) that cannot be told
    /// apart from the byte-order marker alone.
    Tiff,
    /// Canon CR2, distinguishable by its "CR" marker at offset 8.
    Cr2,
    Heic,
    Avif,
    Mp4,
    Mov,
    Matroska,
    Avi,
    MpegTs,
}

impl SniffedType {
    /// Extension appended on correction.
    pub fn extension(self) -> &'static str {
        match self {
            SniffedType::Png => "png",
            SniffedType::Jpeg => "jpg",
            SniffedType::Gif => "gif",
            SniffedType::Bmp => "bmp",
            SniffedType::Webp => "webp",
            SniffedType::Tiff => "tif",
            SniffedType::Cr2 => "cr2",
            SniffedType::Heic => "heic",
            SniffedType::Avif => "avif",
            SniffedType::Mp4 => "mp4",
            SniffedType::Mov => "mov",
            SniffedType::Matroska => "mkv",
            SniffedType::Avi => "avi",
            SniffedType::MpegTs => "ts",
        }
    }

    /// Extensions considered already correct for this type.
    fn accepted_extensions(self) -> &'static [&'static str] {
        match self {
            SniffedType::Png => &["png"],
            SniffedType::Jpeg => &["jpg", "jpeg", "jpe"],
            SniffedType::Gif => &["gif"],
            SniffedType::Bmp => &["bmp"],
            SniffedType::Webp => &["webp"],
            // A bare byte-order marker cannot separate RAW sub-variants, so
            // every TIFF-based extension counts as correct.
            SniffedType::Tiff => &["tif", "tiff", "nef", "arw", "dng", "orf", "rw2", "pef", "srw"],
            SniffedType::Cr2 => &["cr2"],
            SniffedType::Heic => &["heic", "heif"],
            SniffedType::Avif => &["avif"],
            SniffedType::Mp4 => &["mp4", "m4v", "3gp"],
            SniffedType::Mov => &["mov", "qt"],
            SniffedType::Matroska => &["mkv", "webm"],
            SniffedType::Avi => &["avi"],
            SniffedType::MpegTs => &["ts", "mts", "m2ts"],
        }
    }

    pub fn is_jpeg(self) -> bool {
        self == SniffedType::Jpeg
    }

    pub fn is_tiff_based_raw(self) -> bool {
        matches!(self, SniffedType::Tiff | SniffedType::Cr2)
    }
}

/// Sniff a file type from its leading bytes. Unrecognized content is None.
pub fn sniff_type(header: &[u8]) -> Option<SniffedType> {
    if header.len() < 12 {
        return None;
    }

    if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
        return Some(SniffedType::Png);
    }
    if header.starts_with(&[0xff, 0xd8, 0xff]) {
        return Some(SniffedType::Jpeg);
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return Some(SniffedType::Gif);
    }
    if header.starts_with(b"RIFF") {
        if header[8..12] == *b"WEBP" {
            return Some(SniffedType::Webp);
        }
        if header[8..12] == *b"AVI " {
            return Some(SniffedType::Avi);
        }
        return None;
    }
    if header.starts_with(&[0x49, 0x49, 0x2a, 0x00]) {
        // Little-endian TIFF; Canon stamps "CR" at offset 8.
        if header[8..10] == *b"CR" {
            return Some(SniffedType::Cr2);
        }
        return Some(SniffedType::Tiff);
    }
    if header.starts_with(&[0x4d, 0x4d, 0x00, 0x2a]) {
        return Some(SniffedType::Tiff);
    }
    if header.starts_with(&[0x1a, 0x45, 0xdf, 0xa3]) {
        return Some(SniffedType::Matroska);
    }
    if header.starts_with(b"BM") {
        return Some(SniffedType::Bmp);
    }
    if header[4..8] == *b"ftyp" {
        let brand = &header[8..12];
        const HEIC_BRANDS: &[&[u8; 4]] = &[
            b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
        ];
        if HEIC_BRANDS.iter().any(|b| brand == *b) {
            return Some(SniffedType::Heic);
        }
        if brand == b"avif" || brand == b"avis" {
            return Some(SniffedType::Avif);
        }
        if brand == b"qt  " {
            return Some(SniffedType::Mov);
        }
        return Some(SniffedType::Mp4);
    }
    // MPEG transport stream: 0x47 sync byte repeating at the 188-byte packet
    // stride.
    if header[0] == 0x47 && header.len() > 376 && header[188] == 0x47 && header[376] == 0x47 {
        return Some(SniffedType::MpegTs);
    }

    None
}

/// Knobs for a correction pass.
#[derive(Debug, Clone, Default)]
pub struct FixOptions {
    /// Leave files already recognized as JPEG alone.
    pub skip_jpeg: bool,
    /// Leave TIFF-based RAW content alone; the byte-order marker cannot
    /// discriminate RAW sub-variants, so corrections there risk false
    /// positives.
    pub conservative: bool,
}

/// One file the corrector could not fix.
#[derive(Debug)]
pub struct FixFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Outcome of a directory-wide correction pass.
#[derive(Debug, Default)]
pub struct FixReport {
    pub corrected: u64,
    pub skipped: u64,
    /// Applied renames, old media path → new media path, for callers that
    /// track entities by path.
    pub renames: Vec<(PathBuf, PathBuf)>,
    pub failures: Vec<FixFailure>,
}

/// Sniffs true file types and repairs lying extensions, keeping each media
/// file and its sidecar renamed as one atomic pair.
pub struct ExtensionCorrector;

impl ExtensionCorrector {
    pub fn new() -> Self {
        Self
    }

    /// Correct every media file under `dir`. Per-file problems degrade to
    /// reported failures; the walk always finishes.
    pub fn fix_directory(&self, dir: &Path, options: &FixOptions) -> FixReport {
        let mut report = FixReport::default();

        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".json"))
            {
                continue;
            }
            if !correction_candidate(path) {
                continue;
            }

            match self.fix_file(path, options) {
                Ok(FileOutcome::Corrected(new_path)) => {
                    report.corrected += 1;
                    report.renames.push((path.to_path_buf(), new_path));
                }
                Ok(FileOutcome::AlreadyCorrect) | Ok(FileOutcome::Unrecognized) => {}
                Ok(FileOutcome::Excluded) => report.skipped += 1,
                Err(error) => {
                    warn!(path = %path.display(), %error, "extension fix failed");
                    report.failures.push(FixFailure {
                        path: path.to_path_buf(),
                        error,
                    });
                }
            }
        }

        report
    }

    /// Sniff one file and, on a mismatch, atomically rename it together
    /// with its sidecar.
    pub fn fix_file(&self, path: &Path, options: &FixOptions) -> Result<FileOutcome> {
        let header = read_header(path)?;
        let Some(sniffed) = sniff_type(&header) else {
            return Ok(FileOutcome::Unrecognized);
        };

        if options.skip_jpeg && sniffed.is_jpeg() {
            return Ok(FileOutcome::Excluded);
        }
        if options.conservative && sniffed.is_tiff_based_raw() {
            return Ok(FileOutcome::Excluded);
        }

        let current_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if sniffed
            .accepted_extensions()
            .contains(&current_ext.as_str())
        {
            return Ok(FileOutcome::AlreadyCorrect);
        }

        let new_path = corrected_path(path, sniffed.extension())?;
        let sidecar_renames = sidecar_renames(path, &new_path);
        rename_pair(path, &new_path, &sidecar_renames)?;

        debug!(
            from = %path.display(),
            to = %new_path.display(),
            sidecars = sidecar_renames.len(),
            "extension corrected"
        );
        Ok(FileOutcome::Corrected(new_path))
    }
}

impl Default for ExtensionCorrector {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-file result of [`ExtensionCorrector::fix_file`].
#[derive(Debug)]
pub enum FileOutcome {
    Corrected(PathBuf),
    AlreadyCorrect,
    /// Signature not recognized; left untouched and not counted.
    Unrecognized,
    /// Excluded by `skip_jpeg` or `conservative`.
    Excluded,
}

/// Correction only considers files that look like media by name; a name with
/// a recognized non-media mime type (documents the export also ships) is
/// never renamed. Unknown or missing extensions still get sniffed.
fn correction_candidate(path: &Path) -> bool {
    // Motion-photo clips keep their vendor extension; their sidecar is named
    // after the paired image and a rename would orphan it.
    if path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp") || e.eq_ignore_ascii_case("mv"))
    {
        return false;
    }
    match mime_guess::from_path(path).first() {
        Some(mime) => {
            mime.type_() == mime_guess::mime::IMAGE || mime.type_() == mime_guess::mime::VIDEO
        }
        None => true,
    }
}

fn read_header(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut buf = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file
            .read(&mut buf[filled..])
            .map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

/// The corrected name keeps the full original name and appends the sniffed
/// extension: `x.jpg` becomes `x.jpg.png`.
fn corrected_path(path: &Path, ext: &str) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::NotFound(path.to_path_buf()))?;
    Ok(path.with_file_name(format!("{name}.{ext}")))
}

/// Sidecars carrying the original media name, paired with their post-rename
/// targets. The suffix form is preserved.
fn sidecar_renames(media: &Path, new_media: &Path) -> Vec<(PathBuf, PathBuf)> {
    let (Some(old_name), Some(new_name)) = (
        media.file_name().and_then(|n| n.to_str()),
        new_media.file_name().and_then(|n| n.to_str()),
    ) else {
        return Vec::new();
    };
    let dir = match media.parent() {
        Some(dir) => dir,
        None => return Vec::new(),
    };

    let suffixes = [
        format!("{SUPPLEMENTAL_SUFFIX}.json"),
        ".json".to_string(),
    ];

    let mut renames = Vec::new();
    for suffix in &suffixes {
        let old_sidecar = dir.join(format!("{old_name}{suffix}"));
        if old_sidecar.is_file() {
            renames.push((old_sidecar, dir.join(format!("{new_name}{suffix}"))));
        }
    }
    renames
}

/// Stage-then-commit rename of a media file and its sidecars.
///
/// The media file moves to a staging name first, sidecars follow, then the
/// staged media commits to its final name. Any failure unwinds the renames
/// already applied; if even the unwind fails the caller gets the distinct
/// partially-applied error with the staging location.
fn rename_pair(media: &Path, new_media: &Path, sidecars: &[(PathBuf, PathBuf)]) -> Result<()> {
    for (_, target) in sidecars {
        if target.exists() {
            return Err(Error::io(
                target,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target sidecar exists"),
            ));
        }
    }
    if new_media.exists() {
        return Err(Error::io(
            new_media,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target name exists"),
        ));
    }

    let staging = staging_name(new_media);
    fs::rename(media, &staging).map_err(|e| Error::io(media, e))?;

    for (i, (from, to)) in sidecars.iter().enumerate() {
        if let Err(err) = fs::rename(from, to) {
            for (prev_from, prev_to) in &sidecars[..i] {
                let _ = fs::rename(prev_to, prev_from);
            }
            let _ = fs::rename(&staging, media);
            return Err(Error::io(from, err));
        }
    }

    if let Err(err) = fs::rename(&staging, new_media) {
        for (from, to) in sidecars {
            let _ = fs::rename(to, from);
        }
        if fs::rename(&staging, media).is_err() {
            // The media file is stranded at the staging name while the
            // sidecars were rolled back: surface where it was left.
            return Err(Error::PartialRename {
                media: media.to_path_buf(),
                sidecar: sidecars
                    .first()
                    .map(|(from, _)| from.clone())
                    .unwrap_or_else(|| media.to_path_buf()),
                left_at: staging,
            });
        }
        return Err(Error::io(new_media, err));
    }

    Ok(())
}

fn staging_name(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("staged");
    target.with_file_name(format!(".{name}.fixtmp"))
}
