//! Sound asset cache.
//!
//! Playable sounds are cached as standalone files so a media player can open
//! them by path. WAV and MP3 payloads are copied verbatim; FDL payloads are
//! transcoded to WAV on the way out. The index maps resource ids to files
//! that are known to exist and be complete.

use crate::error::{ErrorKind, Result};
use crate::model::{Cartridge, Resource};
use crate::observer::{Field, Notifier};
use crate::paths::PathNamer;
use crate::task::blocking;
use cartridge_media::Transcoder;
use cartridge_storage::BackendHandle;
use exn::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// Where a resource's cached file is, if anywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CachedMedia {
    /// The file exists and is complete.
    Cached(PathBuf),
    /// The file would live here but doesn't exist.
    NotCached(PathBuf),
    /// Not a sound resource of this cartridge.
    NotFound,
}
impl CachedMedia {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Cached(path) | Self::NotCached(path) => Some(path),
            Self::NotFound => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Outcome of [`SoundCache::rebuild`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoundRebuild {
    pub reused: usize,
    pub generated: usize,
    /// Resources that could not be cached; playback of these will fail.
    pub failed: Vec<u32>,
}

pub struct SoundCache {
    cartridge: Arc<Cartridge>,
    backend: BackendHandle,
    transcoder: Arc<dyn Transcoder>,
    namer: Arc<PathNamer>,
    index: RwLock<HashMap<u32, PathBuf>>,
    pub(crate) notifier: Notifier,
}
impl SoundCache {
    pub(crate) fn new(
        cartridge: Arc<Cartridge>,
        backend: BackendHandle,
        transcoder: Arc<dyn Transcoder>,
        namer: Arc<PathNamer>,
    ) -> Self {
        Self {
            cartridge,
            backend,
            transcoder,
            namer,
            index: RwLock::new(HashMap::new()),
            notifier: Notifier::default(),
        }
    }

    /// Rebuild the index from scratch, caching every playable resource that
    /// isn't on disk yet.
    ///
    /// A resource whose file can't be checked, transcoded or written is
    /// skipped and listed in [`SoundRebuild::failed`]; the other resources
    /// are still cached.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn rebuild(&self) -> Result<SoundRebuild> {
        let mut index = HashMap::new();
        let mut report = SoundRebuild::default();
        for resource in self.cartridge.sounds() {
            let path = self.namer.sound(resource.id, resource.kind);
            match self.backend.exists(&path).await {
                Ok(true) => {
                    tracing::debug!(resource = resource.id, path = %path.display(), "reusing cached sound");
                    index.insert(resource.id, path);
                    report.reused += 1;
                    continue;
                },
                Ok(false) => {},
                Err(err) => {
                    tracing::warn!(
                        resource = resource.id,
                        path = %path.display(),
                        error = %err,
                        "failed to check cached sound"
                    );
                    report.failed.push(resource.id);
                    continue;
                },
            }
            match self.generate(resource, &path).await {
                Ok(()) => {
                    index.insert(resource.id, path);
                    report.generated += 1;
                },
                Err(err) => {
                    tracing::warn!(resource = resource.id, error = %err, "failed to cache sound");
                    report.failed.push(resource.id);
                },
            }
        }
        *self.index.write().await = index;
        tracing::info!(
            reused = report.reused,
            generated = report.generated,
            failed = report.failed.len(),
            "sound cache ready"
        );
        self.notifier.notify(Field::Sounds);
        Ok(report)
    }

    /// Look up the cached file of a sound resource.
    ///
    /// With `recreate_if_missing`, a missing file is generated again before
    /// returning; without it, the would-be path is returned as
    /// [`CachedMedia::NotCached`].
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn cached_path(&self, resource_id: u32, recreate_if_missing: bool) -> Result<CachedMedia> {
        let Some(resource) = self.cartridge.resource(resource_id).filter(|r| r.kind.is_sound()) else {
            return Ok(CachedMedia::NotFound);
        };
        let indexed = self.index.read().await.get(&resource_id).cloned();
        let path = indexed.clone().unwrap_or_else(|| self.namer.sound(resource.id, resource.kind));

        if !self.backend.exists(&path).await.or_raise(|| ErrorKind::Storage)? {
            if !recreate_if_missing {
                if self.index.write().await.remove(&resource_id).is_some() {
                    self.notifier.notify(Field::Sounds);
                }
                return Ok(CachedMedia::NotCached(path));
            }
            self.generate(resource, &path).await?;
        }

        if indexed.as_ref() != Some(&path) {
            self.index.write().await.insert(resource_id, path.clone());
            self.notifier.notify(Field::Sounds);
        }
        Ok(CachedMedia::Cached(path))
    }

    /// [`cached_path`](Self::cached_path), recreating missing files.
    pub async fn ensure_cached(&self, resource_id: u32) -> Result<Option<PathBuf>> {
        Ok(match self.cached_path(resource_id, true).await? {
            CachedMedia::Cached(path) => Some(path),
            CachedMedia::NotCached(_) | CachedMedia::NotFound => None,
        })
    }

    /// The indexed file of a resource, without touching storage.
    pub async fn lookup(&self, resource_id: u32) -> Option<PathBuf> {
        self.index.read().await.get(&resource_id).cloned()
    }

    /// Snapshot of the whole index.
    pub async fn paths(&self) -> HashMap<u32, PathBuf> {
        self.index.read().await.clone()
    }

    /// Write one resource to `path`, removing whatever was left behind if
    /// that fails.
    async fn generate(&self, resource: &Resource, path: &Path) -> Result<()> {
        let written = if resource.kind.needs_transcode() {
            self.transcode(resource.id, path).await
        } else {
            self.backend.write(path, &resource.data).await.or_raise(|| ErrorKind::Storage)
        };

        match written {
            Ok(()) => {
                tracing::info!(resource = resource.id, path = %path.display(), "cached sound");
                Ok(())
            },
            Err(err) => {
                match self.backend.delete(path).await {
                    Ok(()) => {},
                    Err(delete_err) if delete_err.is_not_found() => {},
                    Err(delete_err) => {
                        tracing::warn!(path = %path.display(), error = %delete_err, "failed to remove partial sound");
                    },
                }
                Err(err)
            },
        }
    }

    /// Stream the transcoded resource into `path` on the blocking pool.
    async fn transcode(&self, id: u32, path: &Path) -> Result<()> {
        let mut writer = self.backend.writer(path).await.or_raise(|| ErrorKind::Storage)?;
        let transcoder = Arc::clone(&self.transcoder);
        let cartridge = Arc::clone(&self.cartridge);
        let len = blocking(move || -> Result<u64> {
            let resource = cartridge.resource(id).ok_or_raise(|| ErrorKind::Transcode(id))?;
            let mut wav = transcoder.transcode(&resource.data).or_raise(|| ErrorKind::Transcode(id))?;
            let len = std::io::copy(&mut wav, &mut writer).or_raise(|| ErrorKind::Transcode(id))?;
            writer.flush().or_raise(|| ErrorKind::Storage)?;
            Ok(len)
        })
        .await??;
        tracing::debug!(resource = id, len, "transcoded sound");
        Ok(())
    }
}
