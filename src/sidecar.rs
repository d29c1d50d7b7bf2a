use std::path::{Path, PathBuf};

use tracing::debug;

use crate::extras;
use crate::media::SidecarCandidate;

/// Longest JSON sidecar filename the export produces; anything longer gets
/// cut to this total length, `.json` suffix included.
const MAX_JSON_NAME_LEN: usize = 51;

/// Suffix Google inserts between the media name and `.json`.
const SUPPLEMENTAL_SUFFIX: &str = ".supplemental-metadata";

const JSON_EXT: &str = ".json";

/// Extensions a Takeout export can contain, used by the cross-extension and
/// extension-restoration strategies.
const MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "avif", "bmp", "tif", "tiff", "dng",
    "cr2", "nef", "arw", "orf", "rw2", "mp4", "mov", "avi", "mkv", "webm", "m4v", "mpg", "mpeg",
    "mts", "m2ts", "3gp", "wmv", "mp", "mv",
];

/// Image extensions a `.MP`/`.MV` motion-photo clip can be paired with.
const MOTION_PHOTO_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic"];

/// Number of strategies in the cascade (basic 1-6, aggressive 7-10).
pub const STRATEGY_COUNT: usize = 10;
const BASIC_STRATEGIES: usize = 6;

/// Per-call hit/miss accounting, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct SidecarStats {
    /// Wins per strategy, indexed by strategy number minus one.
    pub hits: [u64; STRATEGY_COUNT],
    /// Files for which no strategy produced an existing sidecar.
    pub misses: u64,
}

impl SidecarStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_hits(&self) -> u64 {
        self.hits.iter().sum()
    }

    fn record(&mut self, found: Option<&SidecarCandidate>) {
        match found {
            Some(candidate) => self.hits[candidate.strategy - 1] += 1,
            None => self.misses += 1,
        }
    }
}

/// Locates the JSON metadata sidecar for a media file via an ordered cascade
/// of filename-transformation heuristics.
///
/// Strategies run strictly in order and the first one producing at least one
/// existing candidate wins; within a strategy a `supplemental-metadata`
/// candidate beats a plain `.json` one. The matcher never fails: empty
/// stems, missing extensions, non-ASCII names, and unreadable directories
/// all come back as no match.
pub struct SidecarMatcher;

impl SidecarMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Find the sidecar for `media_path`. Aggressive mode appends the
    /// looser strategies 7-10 after the basic six.
    pub fn find(&self, media_path: &Path, aggressive: bool) -> Option<PathBuf> {
        self.select(media_path, aggressive).map(|c| c.path)
    }

    /// Like [`find`](Self::find), recording a hit/miss into `stats`.
    pub fn find_with_stats(
        &self,
        media_path: &Path,
        aggressive: bool,
        stats: &mut SidecarStats,
    ) -> Option<PathBuf> {
        let found = self.select(media_path, aggressive);
        stats.record(found.as_ref());
        found.map(|c| c.path)
    }

    fn select(&self, media_path: &Path, aggressive: bool) -> Option<SidecarCandidate> {
        let dir = media_path.parent()?;
        let filename = media_path.file_name()?.to_str()?;
        if filename.is_empty() {
            return None;
        }

        let limit = if aggressive {
            STRATEGY_COUNT
        } else {
            BASIC_STRATEGIES
        };

        for strategy in 1..=limit {
            for name in candidate_names(filename, strategy) {
                let path = dir.join(&name);
                if path.is_file() {
                    debug!(
                        media = %media_path.display(),
                        sidecar = %name,
                        strategy,
                        "sidecar matched"
                    );
                    return Some(SidecarCandidate { path, strategy });
                }
            }
        }
        None
    }
}

impl Default for SidecarMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidate JSON filenames for one strategy, supplemental variant first.
/// Exposed for the truncation round-trip tests.
pub fn candidate_names(filename: &str, strategy: usize) -> Vec<String> {
    match strategy {
        1 => json_variants(filename),
        2 => truncated_variants(filename),
        3 => bracket_swap_variants(filename),
        4 => stem_of(filename).map(json_variants).unwrap_or_default(),
        5 => suffix_stripped_variants(filename),
        6 => motion_photo_variants(filename),
        7 => cross_extension_variants(filename),
        8 => partial_stripped_variants(filename),
        9 => partial_restored_variants(filename),
        10 => dangling_variants(filename),
        _ => Vec::new(),
    }
}

/// `<base>.supplemental-metadata.json` then `<base>.json`.
fn json_variants(base: &str) -> Vec<String> {
    vec![
        format!("{base}{SUPPLEMENTAL_SUFFIX}{JSON_EXT}"),
        format!("{base}{JSON_EXT}"),
    ]
}

fn stem_of(filename: &str) -> Option<&str> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    (stem != filename && !stem.is_empty()).then_some(stem)
}

fn ext_of(filename: &str) -> Option<&str> {
    Path::new(filename).extension()?.to_str()
}

fn truncate_at_boundary(s: &str, mut end: usize) -> &str {
    if end >= s.len() {
        return s;
    }
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Recompute the export's deterministic truncation: the name portion (media
/// name, optionally with the supplemental suffix) is cut so the whole JSON
/// filename fits in 51 bytes; the `.json` suffix survives intact.
fn truncated_json_name(base: &str) -> Option<String> {
    if base.len() + JSON_EXT.len() <= MAX_JSON_NAME_LEN {
        return None;
    }
    let keep = MAX_JSON_NAME_LEN - JSON_EXT.len();
    Some(format!("{}{JSON_EXT}", truncate_at_boundary(base, keep)))
}

fn truncated_variants(filename: &str) -> Vec<String> {
    let mut v = Vec::new();
    if let Some(name) = truncated_json_name(&format!("{filename}{SUPPLEMENTAL_SUFFIX}")) {
        v.push(name);
    }
    if let Some(name) = truncated_json_name(filename) {
        v.push(name);
    }
    v
}

/// `name(N).ext` → `name.ext(N)`: the duplicate-number token moves from
/// before the extension to after it, as the export writes sidecars for
/// numbered duplicates.
fn bracket_swap_variants(filename: &str) -> Vec<String> {
    let ext = match ext_of(filename) {
        Some(ext) => ext,
        None => return Vec::new(),
    };
    let stem = match stem_of(filename) {
        Some(stem) => stem,
        None => return Vec::new(),
    };

    let (open, close) = match (stem.rfind('('), stem.rfind(')')) {
        (Some(open), Some(close)) => (open, close),
        _ => return Vec::new(),
    };
    if close != stem.len() - 1 || open + 1 >= close {
        return Vec::new();
    }
    let number = &stem[open + 1..close];
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Vec::new();
    }
    let bare = &stem[..open];

    vec![
        format!("{bare}.{ext}{SUPPLEMENTAL_SUFFIX}({number}){JSON_EXT}"),
        format!("{bare}.{ext}({number}){JSON_EXT}"),
    ]
}

/// Strip a complete localized "edited" suffix and re-derive candidates.
fn suffix_stripped_variants(filename: &str) -> Vec<String> {
    let cleaned = extras::remove_extra(filename);
    if cleaned == filename {
        return Vec::new();
    }
    let mut v = json_variants(&cleaned);
    v.extend(truncated_variants(&cleaned));
    v
}

/// For a `.MP`/`.MV` clip, the sidecar is named after the paired image.
fn motion_photo_variants(filename: &str) -> Vec<String> {
    let ext = match ext_of(filename) {
        Some(ext) => ext,
        None => return Vec::new(),
    };
    if !ext.eq_ignore_ascii_case("mp") && !ext.eq_ignore_ascii_case("mv") {
        return Vec::new();
    }
    let stem = match stem_of(filename) {
        Some(stem) => stem,
        None => return Vec::new(),
    };

    let mut v = Vec::new();
    for img_ext in MOTION_PHOTO_IMAGE_EXTENSIONS {
        v.extend(json_variants(&format!("{stem}.{img_ext}")));
        v.extend(json_variants(&format!(
            "{stem}.{}",
            img_ext.to_ascii_uppercase()
        )));
    }
    v
}

/// Same stem, any known media extension.
fn cross_extension_variants(filename: &str) -> Vec<String> {
    let stem = match stem_of(filename) {
        Some(stem) => stem,
        None => return Vec::new(),
    };
    let own_ext = ext_of(filename).unwrap_or("");

    let mut v = Vec::new();
    for ext in MEDIA_EXTENSIONS {
        if ext.eq_ignore_ascii_case(own_ext) {
            continue;
        }
        v.extend(json_variants(&format!("{stem}.{ext}")));
    }
    v
}

/// Strip a prefix-truncated edited suffix (mid-token truncation) from the
/// stem, keeping the original extension.
fn partial_stripped_variants(filename: &str) -> Vec<String> {
    let stem = match stem_of(filename) {
        Some(stem) => stem,
        None => return Vec::new(),
    };
    let cleaned = extras::remove_partial_extra(stem);
    if cleaned == stem || cleaned.is_empty() {
        return Vec::new();
    }

    let mut v = Vec::new();
    if let Some(ext) = ext_of(filename) {
        v.extend(json_variants(&format!("{cleaned}.{ext}")));
    }
    v.extend(json_variants(&cleaned));
    v.extend(truncated_variants(&cleaned));
    v
}

/// Partial strip combined with re-deriving the media extension: the
/// truncation may have eaten the extension too, so every known one is tried.
fn partial_restored_variants(filename: &str) -> Vec<String> {
    let stem = stem_of(filename).unwrap_or(filename);
    let cleaned = extras::remove_partial_extra(stem);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut v = Vec::new();
    for ext in MEDIA_EXTENSIONS {
        v.extend(json_variants(&format!("{cleaned}.{ext}")));
    }
    v
}

/// Last-resort removal of a dangling one/two-character truncation remnant.
fn dangling_variants(filename: &str) -> Vec<String> {
    let stem = match stem_of(filename) {
        Some(stem) => stem,
        None => return Vec::new(),
    };
    let Some(cleaned) = extras::remove_dangling_suffix(stem) else {
        return Vec::new();
    };
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut v = Vec::new();
    if let Some(ext) = ext_of(filename) {
        v.extend(json_variants(&format!("{cleaned}.{ext}")));
    }
    v.extend(json_variants(&cleaned));
    v
}
