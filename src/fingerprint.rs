use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

/// Default worker count for batch hashing; bounds simultaneous open file
/// handles and buffer memory.
pub const DEFAULT_CONCURRENCY: usize = 4;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Content identity key: hex SHA-256 digest plus byte size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub digest: String,
    pub size: u64,
}

/// Streaming SHA-256 over one file. A vanished file surfaces as the
/// distinct [`Error::NotFound`]; other IO problems as [`Error::Io`].
pub fn fingerprint(path: &Path) -> Result<Fingerprint> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| Error::io(path, e))?
        .len();

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(Fingerprint {
        digest: hex::encode(hasher.finalize()),
        size,
    })
}

/// Hash a batch of files on a bounded worker pool.
///
/// Unreadable files are omitted from the result rather than aborting the
/// batch; one bad file never costs the rest. Workers share nothing but the
/// collected output.
pub fn fingerprint_many(
    paths: &[PathBuf],
    max_concurrency: usize,
) -> BTreeMap<PathBuf, Fingerprint> {
    let workers = max_concurrency.max(1);

    let hash_all = |paths: &[PathBuf]| -> Vec<(PathBuf, Fingerprint)> {
        paths
            .par_iter()
            .filter_map(|path| match fingerprint(path) {
                Ok(fp) => Some((path.clone(), fp)),
                Err(err) => {
                    debug!(path = %path.display(), %err, "skipping unhashable file");
                    None
                }
            })
            .collect()
    };

    let pairs = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| hash_all(paths)),
        // Pool construction only fails on resource exhaustion; degrade to
        // the caller's thread.
        Err(_) => paths
            .iter()
            .filter_map(|path| fingerprint(path).ok().map(|fp| (path.clone(), fp)))
            .collect(),
    };

    pairs.into_iter().collect()
}

/// Byte-identity check, short-circuiting on size before any hashing.
pub fn identical(a: &Path, b: &Path) -> Result<bool> {
    let size_a = std::fs::metadata(a).map_err(|e| Error::io(a, e))?.len();
    let size_b = std::fs::metadata(b).map_err(|e| Error::io(b, e))?.len();
    if size_a != size_b {
        return Ok(false);
    }
    Ok(fingerprint(a)?.digest == fingerprint(b)?.digest)
}
