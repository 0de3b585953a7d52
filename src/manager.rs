//! Per-cartridge entry point tying the caches together.

use crate::error::{ErrorKind, Result};
use crate::images::{ImageCache, ImagePopulation};
use crate::model::Cartridge;
use crate::observer::{ChangeObserver, Notifier};
use crate::paths::PathNamer;
use crate::savegames::{Reconcile, SavegameCatalog};
use crate::sounds::{CachedMedia, SoundCache, SoundRebuild};
use cartridge_config::{ImageConfig, LayoutConfig};
use cartridge_media::{ImageCodec, JpegCodec, Transcoder, Unsupported};
use cartridge_storage::BackendHandle;
use cartridge_storage::backend::BoxSyncWrite;
use exn::ResultExt;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::instrument;

/// Codecs the host provides.
#[derive(Clone)]
pub struct Capabilities {
    pub images: Arc<dyn ImageCodec>,
    pub transcoder: Arc<dyn Transcoder>,
}
impl Capabilities {
    /// Uses `images` for artwork; FDL sounds can't be cached until a
    /// transcoder is added with [`with_transcoder`](Self::with_transcoder).
    pub fn new(images: impl ImageCodec + 'static) -> Self {
        Self { images: Arc::new(images), transcoder: Arc::new(Unsupported) }
    }

    pub fn from_config(config: &ImageConfig) -> Self {
        Self::new(JpegCodec::new(config.jpeg_quality))
    }

    pub fn with_transcoder(mut self, transcoder: impl Transcoder + 'static) -> Self {
        self.transcoder = Arc::new(transcoder);
        self
    }
}
impl Default for Capabilities {
    fn default() -> Self {
        Self::new(JpegCodec::default())
    }
}

/// Outcome of [`CartridgeCache::import_or_make_cache`].
#[derive(Debug)]
pub struct ImportReport {
    pub images: ImagePopulation,
    pub sounds: SoundRebuild,
    pub savegames: Reconcile,
}

/// A log file opened in the savegame directory.
///
/// Writes go straight to storage; use it from a blocking context and
/// `flush()` before dropping it.
pub struct LogFile {
    path: PathBuf,
    writer: BoxSyncWrite,
}
impl LogFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Derived assets and saves of one loaded cartridge.
///
/// # Examples
///
/// ```no_run
/// use cartridge_cache::{Capabilities, Cartridge, CartridgeCache, Field};
/// use cartridge_config::Config;
/// use cartridge_storage::backend::LocalBackend;
/// use std::sync::Arc;
///
/// # async fn example(cartridge: Cartridge) -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::load(None)?;
/// let backend = Arc::new(LocalBackend::new("local", config.storage_root()?)?);
/// let capabilities = Capabilities::from_config(&config.images);
/// let cache = CartridgeCache::new(Arc::new(cartridge), backend, capabilities, &config.layout)?
///     .with_observer(|field: Field| println!("{field} changed"));
/// let report = cache.import_or_make_cache().await?;
/// println!("{} saves, {} sounds failed", report.savegames.loaded, report.sounds.failed.len());
/// # Ok(())
/// # }
/// ```
pub struct CartridgeCache {
    cartridge: Arc<Cartridge>,
    backend: BackendHandle,
    namer: Arc<PathNamer>,
    images: ImageCache,
    sounds: SoundCache,
    savegames: SavegameCatalog,
}
impl CartridgeCache {
    pub fn new(
        cartridge: Arc<Cartridge>,
        backend: BackendHandle,
        capabilities: Capabilities,
        layout: &LayoutConfig,
    ) -> Result<Self> {
        let namer = Arc::new(PathNamer::new(&cartridge, layout)?);
        let mut ids = HashSet::new();
        if !cartridge.resources.iter().all(|r| ids.insert(r.id)) {
            exn::bail!(ErrorKind::InvalidCartridge("duplicate resource id"));
        }
        tracing::debug!(
            cartridge = %cartridge.id,
            backend = backend.name(),
            cache = %namer.cache_root().display(),
            savegames = %namer.savegame_root().display(),
            "cartridge cache created"
        );
        let images =
            ImageCache::new(Arc::clone(&cartridge), Arc::clone(&backend), capabilities.images, Arc::clone(&namer));
        let sounds =
            SoundCache::new(Arc::clone(&cartridge), Arc::clone(&backend), capabilities.transcoder, Arc::clone(&namer));
        Ok(Self {
            images,
            sounds,
            savegames: SavegameCatalog::new(Arc::clone(&cartridge), Arc::clone(&backend), Arc::clone(&namer)),
            cartridge,
            backend,
            namer,
        })
    }

    /// Announce changes of every cache to `observer`.
    pub fn with_observer(mut self, observer: impl ChangeObserver + 'static) -> Self {
        let notifier = Notifier::new(Arc::new(observer));
        self.images.notifier = notifier.clone();
        self.sounds.notifier = notifier.clone();
        self.savegames.notifier = notifier;
        self
    }

    /// Bring every cache up to date with storage.
    ///
    /// Images, sounds and savegames are handled concurrently and all three
    /// have finished when this returns. Per-item failures end up in the
    /// report; failing to create the cache directories is an error.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn import_or_make_cache(&self) -> Result<ImportReport> {
        for dir in [self.namer.cache_root(), self.namer.savegame_root()] {
            self.backend.create_dir(dir).await.or_raise(|| ErrorKind::Storage)?;
        }
        let (images, sounds, savegames) =
            futures::join!(self.images.populate(), self.sounds.rebuild(), self.savegames.reconcile());
        let report = ImportReport { images, sounds: sounds?, savegames: savegames? };
        tracing::info!(
            images = report.images.ready.len(),
            sounds = report.sounds.reused + report.sounds.generated,
            savegames = report.savegames.loaded,
            "cartridge cache ready"
        );
        Ok(report)
    }

    /// See [`SoundCache::cached_path`].
    pub async fn media_cache_path(&self, resource_id: u32, recreate_if_missing: bool) -> Result<CachedMedia> {
        self.sounds.cached_path(resource_id, recreate_if_missing).await
    }

    /// Open a new, timestamped log file in the savegame directory.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn create_log_file(&self) -> Result<LogFile> {
        let path = self.namer.log(UtcDateTime::now())?;
        let writer = self.backend.writer(&path).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(path = %path.display(), "created log file");
        Ok(LogFile { path, writer })
    }

    pub fn cartridge(&self) -> &Arc<Cartridge> {
        &self.cartridge
    }

    pub fn paths(&self) -> &PathNamer {
        &self.namer
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn sounds(&self) -> &SoundCache {
        &self.sounds
    }

    pub fn savegames(&self) -> &SavegameCatalog {
        &self.savegames
    }
}
