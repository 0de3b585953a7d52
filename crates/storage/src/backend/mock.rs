//! In-memory storage backend for testing.

use super::{BoxSyncWrite, FileInfoStream};
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::file::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use time::UtcDateTime;
use tokio::sync::RwLock;

type Files = Arc<RwLock<HashMap<PathBuf, (UtcDateTime, Vec<u8>)>>>;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Every write is
/// counted so tests can assert that a cache hit didn't touch storage.
///
/// # Examples
///
/// ```
/// use cartridge_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("Cache/1234-abcd/icon.jpg", b"\xFF\xD8\xFF"),
/// ]);
/// assert!(backend.exists(Path::new("Cache/1234-abcd/icon.jpg")).await?);
///
/// backend.write(Path::new("Cache/1234-abcd/7.MP3"), b"ID3").await?;
/// assert_eq!(backend.writes(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    files: Files,
    dirs: RwLock<HashSet<PathBuf>>,
    writes: Arc<AtomicUsize>,
}

impl MockBackend {
    /// Create a mock backend holding `files`, all stamped with the current time.
    ///
    /// # Panics
    ///
    /// On any path [`validate_path`] rejects; a broken fixture is a broken test.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let now = UtcDateTime::now();
        let files = files
            .into_iter()
            .map(|(path, data)| {
                let path: PathBuf = path.into();
                match validate_path(&path) {
                    Ok(validated) => (validated, (now, data.into())),
                    Err(_) => panic!("MockBackend::with_files: invalid path {}", path.display()),
                }
            })
            .collect();
        Self {
            name: "mock".to_string(),
            files: Arc::new(RwLock::new(files)),
            dirs: RwLock::new(HashSet::new()),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of completed `write()` calls and flushed `writer()`s.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Directories requested through `create_dir()`.
    pub async fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = self.dirs.read().await.iter().cloned().collect();
        dirs.sort();
        dirs
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

/// Buffers everything and publishes the file on `flush()`.
struct MockWriter {
    path: PathBuf,
    buffer: Vec<u8>,
    files: Files,
    writes: Arc<AtomicUsize>,
}
impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Writers are used from `spawn_blocking`, outside the async context.
        self.files.blocking_write().insert(self.path.clone(), (UtcDateTime::now(), self.buffer.clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Copy out under the lock; it must not be held across a yield.
            let mut entries: Vec<FileInfo> = self
                .files
                .read()
                .await
                .iter()
                .filter(|(path, _)| validated_prefix.as_ref().is_none_or(|pfx| path.starts_with(pfx)))
                .map(|(path, (modified, data))| FileInfo::new(path.clone(), data.len() as u64, *modified))
                .collect();
            entries.sort_by(|a, b| a.path.cmp(&b.path));
            for info in entries {
                yield Ok(info);
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.files.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        let (_modified, data) =
            self.files.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))?;
        Ok(data)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.files.write().await.insert(path, (UtcDateTime::now(), data.to_vec()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let path = validate_path(path)?;
        Ok(Box::new(MockWriter {
            path,
            buffer: Vec::new(),
            files: Arc::clone(&self.files),
            writes: Arc::clone(&self.writes),
        }))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        self.files.write().await.remove(&path).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let path = validate_path(path)?;
        if self.files.read().await.contains_key(&path) {
            exn::bail!(ErrorKind::NotADirectory(path));
        }
        self.dirs.write().await.insert(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new("Cache/id/icon.jpg"), b"jpeg").await.unwrap();
        assert_eq!(backend.read(Path::new("Cache/id/icon.jpg")).await.unwrap(), b"jpeg");
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing.gws")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_writer_publishes_on_flush() {
        let backend = MockBackend::default();
        let mut writer = backend.writer(Path::new("Cache/id/42.WAV")).await.unwrap();
        tokio::task::spawn_blocking(move || {
            writer.write_all(b"RIFF").unwrap();
            writer.flush().unwrap();
        })
        .await
        .unwrap();
        assert_eq!(backend.read(Path::new("Cache/id/42.WAV")).await.unwrap(), b"RIFF");
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn test_unflushed_writer_leaves_nothing_behind() {
        let backend = MockBackend::default();
        let mut writer = backend.writer(Path::new("Cache/id/42.WAV")).await.unwrap();
        writer.write_all(b"RIFF").unwrap();
        drop(writer);
        assert!(!backend.exists(Path::new("Cache/id/42.WAV")).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MockBackend::with_files([("run1.gws", b"data")]);
        backend.delete(Path::new("run1.gws")).await.unwrap();
        assert!(!backend.exists(Path::new("run1.gws")).await.unwrap());
        let err = backend.delete(Path::new("run1.gws")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_dir() {
        let backend = MockBackend::with_files([("Cache", b"file")]);
        backend.create_dir(Path::new("Savegames_and_Logs/abcd_Cart")).await.unwrap();
        assert_eq!(backend.dirs().await, vec![PathBuf::from("Savegames_and_Logs/abcd_Cart")]);
        assert!(backend.create_dir(Path::new("Cache")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let backend = MockBackend::with_files([
            ("Saves/abcd_Cart/run1.gws", b"a"),
            ("Saves/abcd_Cart/run2.gws", b"b"),
            ("Saves/abcd_Other/run3.gws", b"c"),
        ]);
        let files = backend.list(Some(Path::new("Saves/abcd_Cart"))).await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.path.starts_with("Saves/abcd_Cart")));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape"), b"bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", b"bad")]);
    }
}
