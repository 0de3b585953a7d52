//! Local filesystem storage backend.
//!
//! Files are stored below a configured directory and accessed using
//! `tokio::fs` for async I/O.

use crate::backend::{BoxSyncWrite, FileInfoStream};
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory. Listings are
/// breadth-first with each directory's entries sorted by name, so repeated
/// scans of an unchanged tree return files in the same order.
///
/// # Examples
///
/// ```no_run
/// use cartridge_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/home/player/.local/share/cartridge")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but isn't a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() && !root.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(root));
        }
        // Blocking is fine here: it happens once, before any cartridge is opened.
        std::fs::create_dir_all(&root).map_err(|e| Self::map_io_error(e, &root))?;
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(path.as_ref())?))
    }

    fn map_io_error(e: IoError, path: &Path) -> ErrorKind {
        match e.kind() {
            IoErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            IoErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            IoErrorKind::AlreadyExists | IoErrorKind::NotADirectory => ErrorKind::NotADirectory(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Read one directory level, relative to the root and sorted by name.
    ///
    /// Returns the files below `prefix` and the subdirectories that may
    /// still lead to (or lie within) it. A directory that doesn't exist is
    /// empty.
    async fn read_level(&self, dir: &Path, prefix: Option<&Path>) -> Result<(Vec<FileInfo>, Vec<PathBuf>)> {
        let mut entries = match fs::read_dir(self.root.join(dir)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok((Vec::new(), Vec::new())),
            Err(err) => exn::bail!(Self::map_io_error(err, dir)),
        };
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, dir))? {
            children.push(entry);
        }
        children.sort_by_key(|entry| entry.file_name());

        let (mut files, mut dirs) = (Vec::new(), Vec::new());
        for entry in children {
            let relative = dir.join(entry.file_name());
            let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &relative))?;
            if metadata.is_dir() {
                if prefix.is_none_or(|pfx| relative.starts_with(pfx) || pfx.starts_with(&relative)) {
                    dirs.push(relative);
                }
            } else if metadata.is_file() && prefix.is_none_or(|pfx| relative.starts_with(pfx)) {
                let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
                files.push(FileInfo::new(relative, metadata.len(), modified));
            }
            // Anything else is most likely a broken symlink; leave it out.
        }
        Ok((files, dirs))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };
        // Walk from the prefix when it names a directory, otherwise from its
        // parent so a prefix naming a single file still matches.
        let start = match &prefix {
            Some(pfx) if self.root.join(pfx).is_dir() => pfx.clone(),
            Some(pfx) => pfx.parent().map(Path::to_path_buf).unwrap_or_default(),
            None => PathBuf::new(),
        };

        Box::pin(stream! {
            let mut queue = VecDeque::from([start]);
            while let Some(dir) = queue.pop_front() {
                match self.read_level(&dir, prefix.as_deref()).await {
                    Ok((files, dirs)) => {
                        queue.extend(dirs);
                        for file in files {
                            yield Ok(file);
                        }
                    },
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(self.absolute_path(path)?).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(self.absolute_path(path)?).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        Ok(fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn writer(&self, path: &Path) -> Result<BoxSyncWrite> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let file = fs::File::create(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(Box::new(file.into_std().await))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_file(self.absolute_path(path)?).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        match fs::metadata(&abs_path).await {
            Ok(metadata) if !metadata.is_dir() => exn::bail!(ErrorKind::NotADirectory(path.to_path_buf())),
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == IoErrorKind::NotFound => {},
            Err(err) => exn::bail!(Self::map_io_error(err, path)),
        }
        Ok(fs::create_dir_all(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }
}
