//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the single seam between
//! the cartridge caches and wherever their files actually live (a directory
//! on local disk in production, a `HashMap` in tests).

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use crate::file::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::io::Write;
use std::path::Path;
use std::pin::Pin;

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
pub type BoxSyncWrite = Box<dyn Write + Send + 'static>;

/// Unified interface for storage backends.
///
/// All operations are asynchronous; the cache keeps CPU-bound codec work on
/// the blocking pool and only awaits the backend for I/O.
///
/// # Path Handling
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cartridge_storage::{backend::StorageBackend, error::Result};
///
/// async fn cached_icon(backend: &dyn StorageBackend) -> Result<Option<Vec<u8>>> {
///     let path = Path::new("Cache/1234-abcd/icon.jpg");
///     if backend.exists(path).await? {
///         Ok(Some(backend.read(path).await?))
///     } else {
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// List all files matching an optional prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream metadata for every file below an optional prefix.
    ///
    /// Listing a prefix that doesn't exist yields an empty stream rather
    /// than an error. Errors for individual entries are yielded in-line so
    /// the caller can decide whether one bad entry spoils the listing.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use cartridge_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut saves = backend.list_stream(Some(Path::new("Savegames_and_Logs/1234_Cart")));
    /// while let Some(info) = saves.try_next().await? {
    ///     println!("{}: {} bytes", info.path.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, replacing any existing file.
    ///
    /// # Notes
    /// - Implementations create parent directories as needed.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Open a file for streaming writes.
    ///
    /// Returns a `'static` boxed [`Write`] suitable for use inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking). Opening happens
    /// before returning.
    ///
    /// # Notes
    /// - Implementations create parent directories as needed.
    /// - Callers must `flush()` before dropping so errors are propagated.
    ///   The mock backend only publishes the file on `flush()`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// # use cartridge_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut writer = backend.writer(Path::new("Cache/1234-abcd/42.WAV")).await?;
    /// tokio::task::spawn_blocking(move || {
    ///     std::io::Write::write_all(&mut writer, b"RIFF....WAVE")?;
    ///     std::io::Write::flush(&mut writer)
    /// }).await.unwrap().unwrap();
    /// # Ok(())
    /// # }
    /// ```
    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite>;

    /// Delete a file.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Make sure a directory (and its parents) exists.
    ///
    /// Fails with [`NotADirectory`](crate::error::ErrorKind::NotADirectory)
    /// when a file already occupies the path.
    async fn create_dir(&self, path: &Path) -> Result<()>;
}
