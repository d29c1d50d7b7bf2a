use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

use crate::error::Error;
use crate::media::MediaEntity;

/// A group member that could not be folded in without violating data
/// integrity. The member is skipped, not silently dropped.
#[derive(Debug)]
pub struct MergeConflict {
    /// Primary path of the skipped member.
    pub path: PathBuf,
    pub error: Error,
}

/// Result of a merge pass.
#[derive(Debug)]
pub struct MergeOutcome {
    pub entities: Vec<MediaEntity>,
    pub conflicts: Vec<MergeConflict>,
}

/// Groups fingerprint-identical entities into canonical aggregates.
///
/// Grouping key is `(content_hash, size_bytes)`. The fold is deterministic:
/// group members are sorted by primary path before any order-sensitive step
/// (association union, date precedence), so the outcome is identical for any
/// permutation of the input. Merging an already-merged set again yields the
/// same result.
pub struct EntityMerger;

impl EntityMerger {
    pub fn new() -> Self {
        Self
    }

    /// Merge entities sharing a fingerprint. Entities without a hash pass
    /// through ungrouped. All-or-nothing per matched group: a member whose
    /// associations collide is reported and skipped, the rest still merge.
    pub fn merge(&self, entities: Vec<MediaEntity>) -> MergeOutcome {
        let mut groups: HashMap<(String, u64), Vec<MediaEntity>> = HashMap::new();
        let mut unhashed: Vec<MediaEntity> = Vec::new();

        for entity in entities {
            match entity.content_hash.clone() {
                Some(hash) => groups
                    .entry((hash, entity.size_bytes))
                    .or_default()
                    .push(entity),
                None => unhashed.push(entity),
            }
        }

        let mut merged: Vec<MediaEntity> = Vec::with_capacity(groups.len() + unhashed.len());
        let mut conflicts: Vec<MergeConflict> = Vec::new();

        for (_, mut members) in groups {
            members.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
            merged.push(fold_group(members, &mut conflicts));
        }
        merged.extend(unhashed);

        // Deterministic output order regardless of HashMap iteration.
        merged.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        MergeOutcome {
            entities: merged,
            conflicts,
        }
    }
}

impl Default for EntityMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_key(entity: &MediaEntity) -> PathBuf {
    entity
        .primary_path()
        .map(PathBuf::from)
        .unwrap_or_default()
}

/// Fold a sorted group into one aggregate. Members are taken in order; each
/// one either unions cleanly or is reported as a conflict and skipped.
fn fold_group(members: Vec<MediaEntity>, conflicts: &mut Vec<MergeConflict>) -> MediaEntity {
    let mut iter = members.into_iter();
    // Groups are never empty by construction.
    let mut result = iter.next().expect("fingerprint group with no members");

    for member in iter {
        // Validate the whole member before touching the aggregate, so a
        // rejected member leaves no partial union behind.
        let collision = member.associations.iter().find_map(|(label, path)| {
            match result.associations.get(label) {
                Some(existing) if existing != path => {
                    Some((label.clone(), existing.clone(), path.clone()))
                }
                _ => None,
            }
        });

        if let Some((label, existing, incoming)) = collision {
            let error = Error::DuplicateAssociation {
                label,
                existing,
                incoming,
            };
            warn!(%error, "merge conflict, member skipped");
            conflicts.push(MergeConflict {
                path: sort_key(&member),
                error,
            });
            continue;
        }

        for (label, path) in member.associations {
            result.associations.entry(label).or_insert(path);
        }
        if result.resolved_date.is_none() && member.resolved_date.is_some() {
            result.resolved_date = member.resolved_date;
            result.date_source = member.date_source;
        }
        result.partner_shared = result.partner_shared || member.partner_shared;
    }

    result
}
