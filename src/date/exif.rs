use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use exif::{In, Tag};
use regex::Regex;
use tracing::debug;

/// External EXIF-reading collaborator seam.
///
/// Implementations return a tag-name → display-value map; any error from the
/// reader is treated by callers as "no EXIF available" and never propagated
/// up the date cascade.
pub trait ExifReader {
    fn read_tags(&self, path: &Path) -> anyhow::Result<HashMap<String, String>>;
}

/// Datetime tags in priority order, including the aliases different tools
/// use for the same field.
const DATE_TAGS: &[&str] = &[
    "DateTimeOriginal",
    "CreateDate",
    "DateTimeDigitized",
    "DateTime",
    "ModifyDate",
];

/// Built-in reader backed by kamadak-exif.
pub struct KamadakExifReader;

impl ExifReader for KamadakExifReader {
    fn read_tags(&self, path: &Path) -> anyhow::Result<HashMap<String, String>> {
        let file = File::open(path)?;
        let exif = exif::Reader::new().read_from_container(&mut BufReader::new(file))?;

        let wanted = [
            (Tag::DateTimeOriginal, "DateTimeOriginal"),
            (Tag::DateTimeDigitized, "CreateDate"),
            (Tag::DateTime, "DateTime"),
            (Tag::GPSLatitude, "GPSLatitude"),
            (Tag::GPSLongitude, "GPSLongitude"),
        ];

        let mut tags = HashMap::new();
        for (tag, name) in wanted {
            if let Some(field) = exif.get_field(tag, In::PRIMARY) {
                tags.insert(name.to_string(), field.display_value().to_string());
            }
        }
        Ok(tags)
    }
}

/// Extract a capture date through the reader. Reader failures are logged at
/// debug and become None.
pub fn exif_date(reader: &dyn ExifReader, path: &Path) -> Option<NaiveDateTime> {
    let tags = match reader.read_tags(path) {
        Ok(tags) => tags,
        Err(err) => {
            debug!(path = %path.display(), %err, "exif reader failed");
            return None;
        }
    };

    for tag in DATE_TAGS {
        if let Some(value) = tags.get(*tag) {
            if let Some(dt) = parse_exif_datetime(value) {
                return Some(dt);
            }
        }
    }
    None
}

// Full datetime with any of the separator styles seen in the wild, plus an
// optional subsecond fraction that is parsed past and dropped.
static EXIF_DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[:./\\-](\d{2})[:./\\-](\d{2})[ T](\d{2})[:.](\d{2})[:.](\d{2})(?:\.\d+)?")
        .unwrap()
});

/// Parse an EXIF datetime string.
/// EXIF datetimes have no timezone info - they are local time as-is.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim().trim_matches('"');

    if let Some(c) = EXIF_DATETIME_RE.captures(trimmed) {
        let date = chrono::NaiveDate::from_ymd_opt(
            c[1].parse().ok()?,
            c[2].parse().ok()?,
            c[3].parse().ok()?,
        )?;
        return date.and_hms_opt(
            c[4].parse().ok()?,
            c[5].parse().ok()?,
            c[6].parse().ok()?,
        );
    }

    let cleaned = trimmed.replace(['-', '/', '\\', '.'], ":");
    if let Ok(d) = chrono::NaiveDate::parse_from_str(cleaned.split(' ').next()?, "%Y:%m:%d") {
        return d.and_hms_opt(0, 0, 0);
    }

    None
}

/// In-memory reader for tests and for callers that already hold tag maps
/// produced by an out-of-process tool.
pub struct MapExifReader {
    tags: HashMap<String, String>,
}

impl MapExifReader {
    pub fn empty() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    pub fn new(tags: HashMap<String, String>) -> Self {
        Self { tags }
    }

    pub fn with_tag(name: &str, value: &str) -> Self {
        let mut tags = HashMap::new();
        tags.insert(name.to_string(), value.to_string());
        Self { tags }
    }
}

impl ExifReader for MapExifReader {
    fn read_tags(&self, _path: &Path) -> anyhow::Result<HashMap<String, String>> {
        Ok(self.tags.clone())
    }
}
