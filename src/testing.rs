//! Test doubles shared by the cache tests.

use crate::model::{Cartridge, MediaKind, Resource};
use crate::observer::{ChangeObserver, Field};
use async_trait::async_trait;
use cartridge_media::error::{ErrorKind as MediaErrorKind, Result as MediaResult};
use cartridge_media::{BoxSyncRead, DecodedImage, Fit, ImageCodec, Transcoder};
use cartridge_storage::backend::{BoxSyncWrite, FileInfoStream, MockBackend, StorageBackend};
use cartridge_storage::error::{ErrorKind as StorageErrorKind, Result as StorageResult};
use futures::StreamExt;
use image::DynamicImage;
use std::collections::HashSet;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub(crate) const ICON: &[u8] = b"icon artwork";
pub(crate) const POSTER: &[u8] = b"poster artwork";

pub(crate) fn cartridge() -> Cartridge {
    Cartridge {
        id: "a1b2c3d4-e5f6".to_string(),
        name: "Whispering Pines".to_string(),
        filename: "Whispering Pines.gwc".to_string(),
        icon: Some(ICON.to_vec()),
        poster: Some(POSTER.to_vec()),
        resources: vec![
            Resource { id: 1, kind: MediaKind::Jpg, data: b"not a sound".to_vec() },
            Resource { id: 7, kind: MediaKind::Mp3, data: b"ID3 mp3 bytes".to_vec() },
            Resource { id: 42, kind: MediaKind::Fdl, data: b"fdl bytes".to_vec() },
        ],
        ..Default::default()
    }
}

/// Encodes as `IMG` + width + source, so tests can tell which artwork was used.
#[derive(Default)]
pub(crate) struct FakeCodec {
    pub resizes: AtomicUsize,
    pub decodes: AtomicUsize,
}
impl FakeCodec {
    pub(crate) fn resizes(&self) -> usize {
        self.resizes.load(Ordering::SeqCst)
    }

    pub(crate) fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub(crate) fn encoded(source: &[u8], width: u32) -> Vec<u8> {
        let mut out = b"IMG".to_vec();
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(source);
        out
    }
}
impl ImageCodec for FakeCodec {
    fn resize(&self, source: &[u8], min_width: u32, _fit: Fit) -> MediaResult<Vec<u8>> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        if source.starts_with(b"BAD") {
            exn::bail!(MediaErrorKind::Decode);
        }
        Ok(Self::encoded(source, min_width))
    }

    fn decode(&self, encoded: &[u8]) -> MediaResult<DecodedImage> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        let Some(width) = encoded.strip_prefix(b"IMG").and_then(|rest| rest.get(..4)) else {
            exn::bail!(MediaErrorKind::Decode);
        };
        let width = u32::from_le_bytes([width[0], width[1], width[2], width[3]]);
        Ok(Arc::new(DynamicImage::new_rgb8(width, width)))
    }
}

/// "Transcodes" by prefixing `RIFF`. Sources starting with `BAD` fail up
/// front, sources starting with `BROKEN` fail halfway through reading.
#[derive(Default)]
pub(crate) struct FakeTranscoder {
    pub calls: AtomicUsize,
}
impl FakeTranscoder {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
impl Transcoder for FakeTranscoder {
    fn transcode(&self, source: &[u8]) -> MediaResult<BoxSyncRead> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.starts_with(b"BAD") {
            exn::bail!(MediaErrorKind::Transcode);
        }
        let wav = [b"RIFF".as_slice(), source].concat();
        if source.starts_with(b"BROKEN") {
            return Ok(Box::new(Cursor::new(wav).chain(FailingReader)));
        }
        Ok(Box::new(Cursor::new(wav)))
    }
}

struct FailingReader;
impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::InvalidData, "truncated FDL stream"))
    }
}

/// Records every notification.
#[derive(Clone, Default)]
pub(crate) struct Recorder(Arc<Mutex<Vec<Field>>>);
impl Recorder {
    pub(crate) fn fields(&self) -> Vec<Field> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, field: Field) -> usize {
        self.0.lock().unwrap().iter().filter(|f| **f == field).count()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}
impl ChangeObserver for Recorder {
    fn changed(&self, field: Field) {
        self.0.lock().unwrap().push(field);
    }
}

/// Wraps a [`MockBackend`] and misbehaves on request.
#[derive(Default)]
pub(crate) struct FaultyBackend {
    pub inner: MockBackend,
    /// `write()` to these paths stores half the data, then fails.
    pub torn_writes: HashSet<PathBuf>,
    /// `exists()` on these paths fails.
    pub failing_exists: HashSet<PathBuf>,
    /// When set, listings are taken immediately but only handed out once
    /// the gate is notified.
    pub list_gate: Option<Arc<Notify>>,
}

fn io_failure(message: &'static str) -> cartridge_storage::error::Error {
    exn::Exn::from(StorageErrorKind::Io(io::Error::other(message)))
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    fn name(&self) -> &str {
        "faulty"
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let listing = self.inner.list_stream(prefix);
        match &self.list_gate {
            None => listing,
            Some(gate) => Box::pin(
                futures::stream::once(async move {
                    let files: Vec<_> = listing.collect().await;
                    gate.notified().await;
                    futures::stream::iter(files)
                })
                .flatten(),
            ),
        }
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        if self.failing_exists.contains(path) {
            return Err(io_failure("stat failed"));
        }
        self.inner.exists(path).await
    }

    async fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        if self.torn_writes.contains(path) {
            self.inner.write(path, &data[..data.len() / 2]).await?;
            return Err(io_failure("disk full"));
        }
        self.inner.write(path, data).await
    }

    async fn writer(&self, path: &Path) -> StorageResult<BoxSyncWrite> {
        self.inner.writer(path).await
    }

    async fn delete(&self, path: &Path) -> StorageResult<()> {
        self.inner.delete(path).await
    }

    async fn create_dir(&self, path: &Path) -> StorageResult<()> {
        self.inner.create_dir(path).await
    }
}
