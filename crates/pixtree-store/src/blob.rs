//! Content-addressed blob storage.

use std::fs;
use std::path::PathBuf;

use pixtree_types::{ContentHash, ImageFormat};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::fs::{read_optional, remove_optional, write_atomic};
use crate::layout::StoreLayout;

const ALL_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Webp,
    ImageFormat::Gif,
    ImageFormat::Unknown,
];

/// Where a blob ended up after [`BlobStore::put`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub hash: ContentHash,
    /// Path relative to the working-copy root, e.g. `images/{hex}.png`.
    pub relative_path: String,
    pub size: u64,
    pub format: ImageFormat,
    /// `false` when identical bytes were already present.
    pub created: bool,
}

/// Relative path for a blob with the given hash and format.
pub fn blob_relative_path(hash: &ContentHash, format: ImageFormat) -> String {
    format!("images/{}.{}", hash.to_hex(), format.extension())
}

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - `put` is idempotent: identical bytes yield the same hash and are stored
///   at most once.
/// - `get` verifies the content against its hash before returning it.
/// - A failed `put` leaves no partial blob behind.
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their hash and relative path.
    fn put(&self, data: &[u8]) -> StoreResult<StoredBlob>;

    /// Read the bytes for a hash. Fails with `BlobNotFound` if absent.
    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>>;

    /// Check whether a blob exists.
    fn exists(&self, hash: &ContentHash) -> StoreResult<bool>;

    /// Delete a blob. Returns `true` if it existed.
    ///
    /// Callers must ensure no node still references the hash.
    fn delete(&self, hash: &ContentHash) -> StoreResult<bool>;

    /// All stored hashes, sorted.
    fn list(&self) -> StoreResult<Vec<ContentHash>>;

    /// Total bytes across all stored blobs.
    fn total_bytes(&self) -> StoreResult<u64> {
        let mut total = 0u64;
        for hash in self.list()? {
            total += self.get(&hash)?.len() as u64;
        }
        Ok(total)
    }
}

/// Blob store backed by the working copy's `images/` directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(layout: &StoreLayout) -> Self {
        Self {
            dir: layout.images_dir(),
        }
    }

    fn path_for(&self, hash: &ContentHash, format: ImageFormat) -> PathBuf {
        self.dir
            .join(format!("{}.{}", hash.to_hex(), format.extension()))
    }

    /// Locate the stored file for a hash, whatever its extension.
    fn find(&self, hash: &ContentHash) -> Option<PathBuf> {
        ALL_FORMATS
            .iter()
            .map(|f| self.path_for(hash, *f))
            .find(|p| p.is_file())
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, data: &[u8]) -> StoreResult<StoredBlob> {
        let hash = ContentHash::of(data);
        let format = ImageFormat::sniff(data);
        let path = self.path_for(&hash, format);

        let created = if path.is_file() {
            false
        } else {
            write_atomic(&path, data)?;
            true
        };
        debug!(hash = %hash.short_hex(), size = data.len(), created, "put blob");

        Ok(StoredBlob {
            hash,
            relative_path: blob_relative_path(&hash, format),
            size: data.len() as u64,
            format,
            created,
        })
    }

    fn get(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let path = self.find(hash).ok_or(StoreError::BlobNotFound(*hash))?;
        let data = read_optional(&path)?.ok_or(StoreError::BlobNotFound(*hash))?;
        let computed = ContentHash::of(&data);
        if computed != *hash {
            return Err(StoreError::HashMismatch {
                expected: *hash,
                computed,
            });
        }
        Ok(data)
    }

    fn exists(&self, hash: &ContentHash) -> StoreResult<bool> {
        Ok(self.find(hash).is_some())
    }

    fn delete(&self, hash: &ContentHash) -> StoreResult<bool> {
        let mut removed = false;
        for format in ALL_FORMATS {
            removed |= remove_optional(&self.path_for(hash, format))?;
        }
        if removed {
            debug!(hash = %hash.short_hex(), "deleted blob");
        }
        Ok(removed)
    }

    fn list(&self) -> StoreResult<Vec<ContentHash>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut hashes = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.split('.').next()) else {
                continue;
            };
            // Skip temp files and anything else that is not a blob.
            if let Ok(hash) = ContentHash::from_hex(stem) {
                hashes.push(hash);
            }
        }
        hashes.sort();
        hashes.dedup();
        Ok(hashes)
    }

    fn total_bytes(&self) -> StoreResult<u64> {
        let mut total = 0u64;
        for hash in self.list()? {
            if let Some(path) = self.find(&hash) {
                total += fs::metadata(path)?.len();
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

    fn store() -> (tempfile::TempDir, FsBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.create().unwrap();
        let store = FsBlobStore::new(&layout);
        (dir, store)
    }

    fn files_in(dir: &std::path::Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn put_and_get() {
        let (_dir, store) = store();
        let stored = store.put(PNG).unwrap();
        assert!(stored.created);
        assert_eq!(stored.format, ImageFormat::Png);
        assert_eq!(
            stored.relative_path,
            format!("images/{}.png", stored.hash.to_hex())
        );
        assert_eq!(store.get(&stored.hash).unwrap(), PNG);
    }

    #[test]
    fn put_twice_stores_one_file() {
        let (dir, store) = store();
        let first = store.put(PNG).unwrap();
        let second = store.put(PNG).unwrap();
        assert_eq!(first.hash, second.hash);
        assert_eq!(first.relative_path, second.relative_path);
        assert!(!second.created);
        assert_eq!(files_in(&dir.path().join("images")), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_dir, store) = store();
        let err = store.get(&ContentHash::of(b"never")).unwrap_err();
        assert!(matches!(err, StoreError::BlobNotFound(_)));
    }

    #[test]
    fn get_detects_corruption() {
        let (dir, store) = store();
        let stored = store.put(b"plain bytes").unwrap();
        fs::write(dir.path().join(&stored.relative_path), b"tampered").unwrap();
        assert!(matches!(
            store.get(&stored.hash),
            Err(StoreError::HashMismatch { .. })
        ));
    }

    #[test]
    fn delete_removes_file() {
        let (_dir, store) = store();
        let stored = store.put(PNG).unwrap();
        assert!(store.delete(&stored.hash).unwrap());
        assert!(!store.exists(&stored.hash).unwrap());
        assert!(!store.delete(&stored.hash).unwrap());
    }

    #[test]
    fn list_and_total_bytes() {
        let (_dir, store) = store();
        let a = store.put(b"aaaa").unwrap();
        let b = store.put(PNG).unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&a.hash));
        assert!(listed.contains(&b.hash));
        assert_eq!(store.total_bytes().unwrap(), 4 + PNG.len() as u64);
    }

    #[test]
    fn unknown_format_uses_bin_extension() {
        let (_dir, store) = store();
        let stored = store.put(b"not an image").unwrap();
        assert!(stored.relative_path.ends_with(".bin"));
    }
}
