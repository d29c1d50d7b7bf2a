use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::date::DateSource;

/// Sentinel label for the year-folder (non-album) copy of a file.
pub const YEAR_LABEL: &str = "year";

/// One physical location a logical media item occupies: the year folder or a
/// named album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAssociation {
    pub label: String,
    pub path: PathBuf,
}

impl FileAssociation {
    pub fn year(path: impl Into<PathBuf>) -> Self {
        Self {
            label: YEAR_LABEL.to_string(),
            path: path.into(),
        }
    }

    pub fn album(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

/// Canonical aggregate for one logical media item.
///
/// Created with a single association per discovered physical file, then
/// progressively merged as matching fingerprints are found. All associated
/// files are byte-identical once `content_hash` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEntity {
    /// Physical copies keyed by label. An entity never holds two different
    /// paths under the same label; the BTreeMap keeps iteration order
    /// deterministic.
    pub associations: BTreeMap<String, PathBuf>,
    /// Hex SHA-256 of file content, None until fingerprinting runs.
    pub content_hash: Option<String>,
    pub size_bytes: u64,
    /// Best-effort capture timestamp. Set once; a dateless merge partner
    /// never clears it.
    pub resolved_date: Option<NaiveDateTime>,
    /// Which cascade rung produced `resolved_date`.
    pub date_source: Option<DateSource>,
    /// True once any contributing file was found partner-shared. Monotonic.
    pub partner_shared: bool,
}

impl MediaEntity {
    fn single(label: String, path: PathBuf, size_bytes: u64) -> Self {
        let mut associations = BTreeMap::new();
        associations.insert(label, path);
        Self {
            associations,
            content_hash: None,
            size_bytes,
            resolved_date: None,
            date_source: None,
            partner_shared: false,
        }
    }

    /// Entity for a file discovered in the year folder.
    pub fn year_based(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self::single(YEAR_LABEL.to_string(), path.into(), size_bytes)
    }

    /// Entity for a file discovered in an album folder.
    pub fn album_based(album: impl Into<String>, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self::single(album.into(), path.into(), size_bytes)
    }

    /// True iff any association is a named album.
    pub fn has_album_associations(&self) -> bool {
        self.associations.keys().any(|label| label != YEAR_LABEL)
    }

    /// True iff the year-folder copy is present.
    pub fn is_year_based(&self) -> bool {
        self.associations.contains_key(YEAR_LABEL)
    }

    /// Preferred on-disk copy: the year-folder path when present, otherwise
    /// the first album path in label order.
    pub fn primary_path(&self) -> Option<&Path> {
        self.associations
            .get(YEAR_LABEL)
            .or_else(|| self.associations.values().next())
            .map(PathBuf::as_path)
    }

    /// Grouping key for duplicate detection, None until hashed.
    pub fn fingerprint_key(&self) -> Option<(&str, u64)> {
        self.content_hash
            .as_deref()
            .map(|hash| (hash, self.size_bytes))
    }

    /// Record the resolved date unless one is already set.
    pub fn set_date(&mut self, date: NaiveDateTime, source: DateSource) {
        if self.resolved_date.is_none() {
            self.resolved_date = Some(date);
            self.date_source = Some(source);
        }
    }

    /// Rewrite the path under `label`, used after extension correction.
    pub fn rewrite_path(&mut self, label: &str, new_path: PathBuf) {
        if let Some(slot) = self.associations.get_mut(label) {
            *slot = new_path;
        }
    }
}

/// Ephemeral record of a sidecar candidate produced during matching. Never
/// persisted; used only to select the winning match.
#[derive(Debug, Clone)]
pub struct SidecarCandidate {
    pub path: PathBuf,
    pub strategy: usize,
}
