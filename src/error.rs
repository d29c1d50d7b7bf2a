use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for reconcile operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Distinct, reportable failure conditions.
///
/// Not-found outcomes (no sidecar, no date, no EXIF) are `Option::None`
/// results, never errors. This enum covers only the conditions a caller must
/// be able to act on per file or per group without losing the rest of a
/// batch.
#[derive(Error, Debug)]
pub enum Error {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "duplicate association label {label:?}: {existing} and {incoming} claim the same label"
    )]
    DuplicateAssociation {
        label: String,
        existing: PathBuf,
        incoming: PathBuf,
    },

    #[error("rename of {media} partially applied; sidecar {sidecar} left at {left_at}")]
    PartialRename {
        media: PathBuf,
        sidecar: PathBuf,
        left_at: PathBuf,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path)
        } else {
            Error::Io { path, source }
        }
    }
}
