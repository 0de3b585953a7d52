//! Derived image cache: icon, thumbnail and poster.
//!
//! Each slot is generated at most once from the cartridge artwork and then
//! reused from storage for as long as the file exists. A cached file that no
//! longer decodes is reported as corruption and never silently replaced;
//! [`ImageCache::invalidate`] is the way to force regeneration.

use crate::error::{Error, ErrorKind, Result};
use crate::model::Cartridge;
use crate::observer::{Field, Notifier};
use crate::paths::PathNamer;
use crate::task::blocking;
use cartridge_media::{DecodedImage, Fit, ImageCodec};
use cartridge_storage::BackendHandle;
use exn::ResultExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Slot {
    Icon,
    Thumbnail,
    Poster,
}
impl Slot {
    /// Generation order used by [`ImageCache::populate`].
    pub const ALL: [Slot; 3] = [Slot::Thumbnail, Slot::Icon, Slot::Poster];

    pub fn file_name(self) -> &'static str {
        match self {
            Self::Icon => "icon.jpg",
            Self::Thumbnail => "thumb.jpg",
            Self::Poster => "poster.jpg",
        }
    }

    pub fn min_width(self) -> u32 {
        match self {
            Self::Icon => 32,
            Self::Thumbnail => 173,
            Self::Poster => 432,
        }
    }

    pub fn fit(self) -> Fit {
        match self {
            Self::Icon | Self::Thumbnail => Fit::Square,
            Self::Poster => Fit::Full,
        }
    }

    pub fn field(self) -> Field {
        match self {
            Self::Icon => Field::Icon,
            Self::Thumbnail => Field::Thumbnail,
            Self::Poster => Field::Poster,
        }
    }
}

/// Outcome of [`ImageCache::populate`].
#[derive(Debug, Default)]
pub struct ImagePopulation {
    /// Slots holding an image.
    pub ready: Vec<Slot>,
    /// Slots without any source artwork.
    pub missing: Vec<Slot>,
    pub failed: Vec<(Slot, Error)>,
}

pub struct ImageCache {
    cartridge: Arc<Cartridge>,
    backend: BackendHandle,
    codec: Arc<dyn ImageCodec>,
    namer: Arc<PathNamer>,
    slots: RwLock<HashMap<Slot, DecodedImage>>,
    pub(crate) notifier: Notifier,
}
impl ImageCache {
    pub(crate) fn new(
        cartridge: Arc<Cartridge>,
        backend: BackendHandle,
        codec: Arc<dyn ImageCodec>,
        namer: Arc<PathNamer>,
    ) -> Self {
        Self { cartridge, backend, codec, namer, slots: RwLock::new(HashMap::new()), notifier: Notifier::default() }
    }

    /// The image currently held for `slot`, without touching storage.
    pub async fn get(&self, slot: Slot) -> Option<DecodedImage> {
        self.slots.read().await.get(&slot).cloned()
    }

    /// Return the image for `slot`, generating and persisting it first if
    /// its file doesn't exist.
    ///
    /// An existing file is always decoded again, so a file damaged since the
    /// last call surfaces as [`CacheCorruption`](ErrorKind::CacheCorruption)
    /// and the stale handle is dropped. Returns `Ok(None)` when the
    /// cartridge has no artwork for the slot.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn get_or_create(&self, slot: Slot) -> Result<Option<DecodedImage>> {
        let path = self.namer.image(slot);
        let image = if self.backend.exists(&path).await.or_raise(|| ErrorKind::Storage)? {
            let bytes = self.backend.read(&path).await.or_raise(|| ErrorKind::Storage)?;
            match self.decode(bytes).await {
                Ok(image) => {
                    tracing::debug!(path = %path.display(), "loaded cached image");
                    image
                },
                Err(err) => {
                    if self.slots.write().await.remove(&slot).is_some() {
                        self.notifier.notify(slot.field());
                    }
                    return Err(err).or_raise(|| ErrorKind::CacheCorruption(path));
                },
            }
        } else {
            let Some(source) = self.source(slot) else {
                tracing::debug!("no artwork to derive from");
                return Ok(None);
            };
            let codec = Arc::clone(&self.codec);
            let source = source.to_vec();
            let encoded = blocking(move || codec.resize(&source, slot.min_width(), slot.fit()))
                .await?
                .or_raise(|| ErrorKind::Image)?;
            self.backend.write(&path, &encoded).await.or_raise(|| ErrorKind::Storage)?;
            tracing::info!(path = %path.display(), len = encoded.len(), "generated image");
            self.decode(encoded).await.or_raise(|| ErrorKind::Image)?
        };
        self.slots.write().await.insert(slot, Arc::clone(&image));
        self.notifier.notify(slot.field());
        Ok(Some(image))
    }

    /// Delete the file backing `slot` and forget the decoded image, so the
    /// next [`get_or_create`](Self::get_or_create) generates it again.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn invalidate(&self, slot: Slot) -> Result<()> {
        let path = self.namer.image(slot);
        match self.backend.delete(&path).await {
            Ok(()) => tracing::info!(path = %path.display(), "deleted cached image"),
            Err(err) if err.is_not_found() => {},
            Err(err) => return Err(err).or_raise(|| ErrorKind::Storage),
        }
        if self.slots.write().await.remove(&slot).is_some() {
            self.notifier.notify(slot.field());
        }
        Ok(())
    }

    /// Make sure every slot is available, collecting failures per slot.
    pub async fn populate(&self) -> ImagePopulation {
        let mut population = ImagePopulation::default();
        for slot in Slot::ALL {
            match self.get_or_create(slot).await {
                Ok(Some(_)) => population.ready.push(slot),
                Ok(None) => population.missing.push(slot),
                Err(err) => {
                    tracing::warn!(%slot, error = %err, "failed to prepare image");
                    population.failed.push((slot, err));
                },
            }
        }
        population
    }

    /// Icons and thumbnails fall back to the poster; posters only use the poster.
    fn source(&self, slot: Slot) -> Option<&[u8]> {
        let poster = self.cartridge.poster.as_deref();
        match slot {
            Slot::Icon | Slot::Thumbnail => self.cartridge.icon.as_deref().or(poster),
            Slot::Poster => poster,
        }
    }

    async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedImage> {
        let codec = Arc::clone(&self.codec);
        blocking(move || codec.decode(&bytes)).await?.or_raise(|| ErrorKind::Image)
    }
}
