pub mod exif;
pub mod folder;
pub mod guess;
pub mod json;

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::date::exif::ExifReader;

/// Which cascade rung produced a date. Ordering is the priority ladder:
/// earlier variants are more trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DateSource {
    SidecarJson,
    Exif,
    FilenameGuess,
    FolderYear,
}

/// Result of date resolution: the timestamp plus its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDateTime,
    pub source: DateSource,
}

/// Best-effort capture-date resolution across four independent sources.
///
/// Each rung is fault-tolerant on its own: malformed JSON, a failing EXIF
/// reader, a non-calendar filename match, or an out-of-bounds folder year
/// all yield nothing and the cascade moves on. A fully exhausted cascade is
/// a valid outcome, not an error.
pub struct DateResolver;

impl DateResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a capture date for `media_path`, first non-empty source wins:
    /// sidecar JSON, then EXIF, then filename, then enclosing-folder year.
    pub fn resolve(
        &self,
        media_path: &Path,
        sidecar_path: Option<&Path>,
        exif_reader: &dyn ExifReader,
    ) -> Option<ResolvedDate> {
        type Extractor<'a> = Box<dyn Fn() -> Option<NaiveDateTime> + 'a>;

        let extractors: [(DateSource, Extractor); 4] = [
            (
                DateSource::SidecarJson,
                Box::new(|| sidecar_path.and_then(json::taken_time)),
            ),
            (
                DateSource::Exif,
                Box::new(|| exif::exif_date(exif_reader, media_path)),
            ),
            (
                DateSource::FilenameGuess,
                Box::new(|| guess::guess_date_from_path(media_path)),
            ),
            (
                DateSource::FolderYear,
                Box::new(|| folder::folder_date(media_path)),
            ),
        ];

        for (source, extract) in &extractors {
            if let Some(date) = extract() {
                debug!(path = %media_path.display(), ?source, %date, "date resolved");
                return Some(ResolvedDate {
                    date,
                    source: *source,
                });
            }
        }

        debug!(path = %media_path.display(), "no date source matched");
        None
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new()
    }
}
