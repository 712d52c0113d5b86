//! Streaming XXH64 content digests.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use xxhash_rust::xxh64::{xxh64, Xxh64};

use hashsync_common::{ContentHash, Error, Result};

/// Read buffer size.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Seed shared by every digest so values are stable across machines.
const SEED: u64 = 0;

/// Digest an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::from_u64(xxh64(data, SEED))
}

/// Digest everything a reader yields, `CHUNK_SIZE` bytes at a time.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = Xxh64::new(SEED);
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(ContentHash::from_u64(hasher.digest()))
}

/// Digest a file without loading it into memory.
///
/// # Errors
/// - `Error::Hash` if the file cannot be opened or read
pub fn hash_file(path: &Path) -> Result<ContentHash> {
    let hash_error = |source| Error::Hash {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(hash_error)?;
    hash_reader(file).map_err(hash_error)
}

/// Digest a file on the blocking pool.
pub async fn hash_file_blocking(path: PathBuf) -> Result<ContentHash> {
    let error_path = path.clone();
    tokio::task::spawn_blocking(move || hash_file(&path))
        .await
        .map_err(|e| Error::Hash {
            path: error_path,
            source: io::Error::other(e),
        })?
}
