//! Core reconciliation logic for a Google Takeout media export.
//!
//! Takes the messy, redundant file set a Takeout produces (media files plus
//! loosely-associated JSON sidecars spread over a year folder and album
//! folders) and recovers structured truth from it: each physical file gets
//! its metadata sidecar located, its capture date resolved, its extension
//! corrected, and byte-identical copies are merged into one logical entity
//! carrying every directory association.
//!
//! Orchestration, CLI, and the final move/copy emission live outside this
//! crate; the pieces here are the reusable middle.

pub mod date;
pub mod error;
pub mod extension;
pub mod extras;
pub mod fingerprint;
pub mod media;
pub mod merge;
pub mod reconcile;
pub mod sidecar;

pub use date::{exif::ExifReader, exif::KamadakExifReader, DateResolver, DateSource, ResolvedDate};
pub use error::{Error, Result};
pub use extension::{
    ExtensionCorrector, FileOutcome, FixFailure, FixOptions, FixReport, SniffedType,
};
pub use fingerprint::{fingerprint, fingerprint_many, identical, Fingerprint, DEFAULT_CONCURRENCY};
pub use media::{FileAssociation, MediaEntity, SidecarCandidate, YEAR_LABEL};
pub use merge::{EntityMerger, MergeConflict, MergeOutcome};
pub use reconcile::{reconcile, DiscoveredFile, ReconcileOptions, ReconcileReport};
pub use sidecar::{SidecarMatcher, SidecarStats};
