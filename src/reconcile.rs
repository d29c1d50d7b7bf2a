use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::date::exif::ExifReader;
use crate::date::json;
use crate::date::DateResolver;
use crate::extension::{ExtensionCorrector, FixOptions, FixReport};
use crate::fingerprint::{self, DEFAULT_CONCURRENCY};
use crate::media::MediaEntity;
use crate::merge::{EntityMerger, MergeConflict};
use crate::sidecar::{SidecarMatcher, SidecarStats};

/// One physical file handed in by the external discovery collaborator,
/// already classified as a year-folder or album copy.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// `YEAR_LABEL` or an album directory name.
    pub label: String,
    pub path: PathBuf,
}

impl DiscoveredFile {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Passed through to the extension corrector.
    pub fix: FixOptions,
    /// Enable the looser sidecar strategies (7-10).
    pub aggressive_sidecar: bool,
    /// Worker bound for batch hashing.
    pub max_concurrency: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            fix: FixOptions::default(),
            aggressive_sidecar: false,
            max_concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Everything a caller needs to hand the result to a mover and to report
/// what happened on the way.
#[derive(Debug)]
pub struct ReconcileReport {
    /// Final aggregates, deterministic order, ready for the mover.
    pub entities: Vec<MediaEntity>,
    pub fix: FixReport,
    pub sidecar_stats: SidecarStats,
    pub merge_conflicts: Vec<MergeConflict>,
    /// Files dropped because they could not be read for hashing.
    pub unhashable: Vec<PathBuf>,
    /// Entities for which every date source came up empty.
    pub undated: u64,
}

/// Drive the full reconcile over a discovered file set.
///
/// Stage order matters: extensions are corrected first so every later
/// name-based step sees the corrected names, then fingerprints group the
/// physical copies, then each aggregate is annotated from its sidecar and
/// the date cascade.
pub fn reconcile(
    files: Vec<DiscoveredFile>,
    options: &ReconcileOptions,
    exif_reader: &dyn ExifReader,
) -> ReconcileReport {
    // Stage 1: fix extensions in every directory the inputs touch, and
    // rewrite input paths the corrector renamed.
    let dirs: BTreeSet<PathBuf> = files
        .iter()
        .filter_map(|f| f.path.parent().map(PathBuf::from))
        .collect();

    let corrector = ExtensionCorrector::new();
    let mut fix = FixReport::default();
    for dir in dirs {
        let report = corrector.fix_directory(&dir, &options.fix);
        fix.corrected += report.corrected;
        fix.skipped += report.skipped;
        fix.renames.extend(report.renames);
        fix.failures.extend(report.failures);
    }

    let mut files = files;
    for file in files.iter_mut() {
        if let Some((_, new_path)) = fix.renames.iter().find(|(old, _)| *old == file.path) {
            file.path = new_path.clone();
        }
    }

    // Stage 2: fingerprint all physical copies on the bounded pool.
    let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
    let fingerprints = fingerprint::fingerprint_many(&paths, options.max_concurrency);

    let mut entities = Vec::with_capacity(files.len());
    let mut unhashable = Vec::new();
    for file in &files {
        let Some(fp) = fingerprints.get(&file.path) else {
            debug!(path = %file.path.display(), "dropped: not hashable");
            unhashable.push(file.path.clone());
            continue;
        };
        // album_based with the sentinel label is exactly a year entity.
        let mut entity = MediaEntity::album_based(file.label.clone(), &file.path, fp.size);
        entity.content_hash = Some(fp.digest.clone());
        entities.push(entity);
    }

    // Stage 3: group identical copies into aggregates.
    let outcome = EntityMerger::new().merge(entities);
    let mut entities = outcome.entities;
    let merge_conflicts = outcome.conflicts;

    // Stage 4: sidecar + date per aggregate. The sidecar is looked up per
    // physical file; the first association that has one wins.
    let matcher = SidecarMatcher::new();
    let resolver = DateResolver::new();
    let mut sidecar_stats = SidecarStats::new();
    let mut undated = 0u64;

    for entity in entities.iter_mut() {
        let mut sidecar = None;
        for path in entity.associations.values() {
            if let Some(found) =
                matcher.find_with_stats(path, options.aggressive_sidecar, &mut sidecar_stats)
            {
                sidecar = Some(found);
                break;
            }
        }

        if let Some(ref sidecar_path) = sidecar {
            if let Some(meta) = json::read_sidecar(sidecar_path) {
                entity.partner_shared = entity.partner_shared || meta.partner_shared();
            }
        }

        let primary = entity.primary_path().map(PathBuf::from);
        if let Some(primary) = primary {
            if let Some(resolved) =
                resolver.resolve(&primary, sidecar.as_deref(), exif_reader)
            {
                entity.set_date(resolved.date, resolved.source);
            }
        }
        if entity.resolved_date.is_none() {
            undated += 1;
        }
    }

    info!(
        entities = entities.len(),
        corrected = fix.corrected,
        conflicts = merge_conflicts.len(),
        undated,
        "reconcile finished"
    );

    ReconcileReport {
        entities,
        fix,
        sidecar_stats,
        merge_conflicts,
        unhashable,
        undated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::exif::MapExifReader;
    use crate::media::YEAR_LABEL;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const PNG_BYTES: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 13, b'I', b'H', b'D', b'R', 9,
        9, 9, 9,
    ];

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn end_to_end_duplicate_with_bad_extension() {
        let tmp = TempDir::new().unwrap();
        let year = tmp.path().join("Photos from 2020");
        let album = tmp.path().join("Trip");
        fs::create_dir_all(&year).unwrap();
        fs::create_dir_all(&album).unwrap();

        let year_copy = write(&year, "x.jpg", PNG_BYTES);
        write(
            &year,
            "x.jpg.json",
            br#"{"photoTakenTime":{"timestamp":"1577836800"}}"#,
        );
        let album_copy = write(&album, "x.jpg", PNG_BYTES);

        let report = reconcile(
            vec![
                DiscoveredFile::new(YEAR_LABEL, &year_copy),
                DiscoveredFile::new("Trip", &album_copy),
            ],
            &ReconcileOptions::default(),
            &MapExifReader::empty(),
        );

        assert_eq!(report.fix.corrected, 2);
        assert!(report.merge_conflicts.is_empty());
        assert_eq!(report.entities.len(), 1);

        let entity = &report.entities[0];
        assert!(entity.is_year_based());
        assert!(entity.has_album_associations());
        assert_eq!(
            entity.associations[YEAR_LABEL],
            year.join("x.jpg.png")
        );
        assert_eq!(
            entity
                .resolved_date
                .unwrap()
                .format("%Y-%m-%d")
                .to_string(),
            "2020-01-01"
        );
        assert_eq!(report.undated, 0);
        assert_eq!(report.sidecar_stats.total_hits(), 1);
    }

    #[test]
    fn vanished_file_is_reported_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let year = tmp.path().join("Photos from 2019");
        fs::create_dir_all(&year).unwrap();
        let real = write(&year, "a.png", PNG_BYTES);
        let ghost = year.join("ghost.png");

        let report = reconcile(
            vec![
                DiscoveredFile::new(YEAR_LABEL, &real),
                DiscoveredFile::new("Trip", &ghost),
            ],
            &ReconcileOptions::default(),
            &MapExifReader::empty(),
        );

        assert_eq!(report.unhashable, vec![ghost]);
        assert_eq!(report.entities.len(), 1);
    }

    #[test]
    fn dateless_entity_counts_as_undated() {
        let tmp = TempDir::new().unwrap();
        let album = tmp.path().join("Somewhere");
        fs::create_dir_all(&album).unwrap();
        let media = write(&album, "mystery.png", PNG_BYTES);

        let report = reconcile(
            vec![DiscoveredFile::new("Somewhere", &media)],
            &ReconcileOptions::default(),
            &MapExifReader::empty(),
        );

        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.undated, 1);
        assert!(report.entities[0].resolved_date.is_none());
    }
}
