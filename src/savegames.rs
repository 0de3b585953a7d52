//! Savegame catalog.
//!
//! The catalog is rebuilt from the savegame directory on startup and kept in
//! step with it afterwards. Names are unique: adding a save under an existing
//! name replaces the old one.

use crate::error::{ErrorKind, Result};
use crate::model::Cartridge;
use crate::observer::{Field, Notifier};
use crate::paths::PathNamer;
use cartridge_savegame::{Savegame, SavegameInfo};
use cartridge_storage::BackendHandle;
use exn::ResultExt;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcDateTime;
use tokio::sync::RwLock;
use tracing::instrument;

/// A save known to the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavegameRecord {
    pub name: String,
    pub path: PathBuf,
    pub cartridge_id: String,
    pub saved_at: UtcDateTime,
    /// Payload size in bytes.
    pub length: u32,
}
impl SavegameRecord {
    fn new(path: PathBuf, info: SavegameInfo) -> Self {
        Self {
            name: info.name,
            path,
            cartridge_id: info.cartridge_id,
            saved_at: info.saved_at,
            length: info.payload_len,
        }
    }

    /// Newer saves win; equal timestamps fall back to the path so the
    /// outcome doesn't depend on listing order.
    fn supersedes(&self, other: &Self) -> bool {
        (self.saved_at, &self.path) > (other.saved_at, &other.path)
    }
}

/// Outcome of [`SavegameCatalog::reconcile`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconcile {
    pub loaded: usize,
    /// Files that were not imported: unreadable, not a save of this
    /// cartridge, or shadowed by a newer save with the same name.
    pub skipped: Vec<PathBuf>,
}

pub struct SavegameCatalog {
    cartridge: Arc<Cartridge>,
    backend: BackendHandle,
    namer: Arc<PathNamer>,
    records: RwLock<Vec<SavegameRecord>>,
    pub(crate) notifier: Notifier,
}
impl SavegameCatalog {
    pub(crate) fn new(cartridge: Arc<Cartridge>, backend: BackendHandle, namer: Arc<PathNamer>) -> Self {
        Self { cartridge, backend, namer, records: RwLock::new(Vec::new()), notifier: Notifier::default() }
    }

    /// Replace the catalog with the saves found in the savegame directory.
    ///
    /// Files that can't be read or parsed are logged and skipped; only a
    /// failing directory listing is an error. The catalog stays locked for
    /// the whole scan, so [`add`](Self::add) and [`remove`](Self::remove)
    /// land either before the listing or after the new catalog is in place.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn reconcile(&self) -> Result<Reconcile> {
        let mut catalog = self.records.write().await;
        let root = self.namer.savegame_root();
        let files = self.backend.list(Some(root)).await.or_raise(|| ErrorKind::Storage)?;
        let mut found: HashMap<String, SavegameRecord> = HashMap::new();
        let mut skipped = Vec::new();

        for file in files.into_iter().filter(|f| self.namer.is_savegame(f)) {
            let bytes = match self.backend.read(&file.path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(path = %file.path.display(), error = %err, "skipping unreadable savegame");
                    skipped.push(file.path);
                    continue;
                },
            };
            let info = match SavegameInfo::parse(&bytes) {
                Ok(info) => info,
                Err(err) => {
                    tracing::warn!(path = %file.path.display(), error = %err, "skipping invalid savegame");
                    skipped.push(file.path);
                    continue;
                },
            };
            if info.cartridge_id != self.cartridge.id {
                tracing::warn!(
                    path = %file.path.display(),
                    owner = %info.cartridge_id,
                    "skipping savegame of another cartridge"
                );
                skipped.push(file.path);
                continue;
            }

            let record = SavegameRecord::new(file.path, info);
            match found.entry(record.name.clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(record);
                },
                Entry::Occupied(mut entry) => {
                    let shadowed = if record.supersedes(entry.get()) { entry.insert(record) } else { record };
                    tracing::warn!(
                        name = %shadowed.name,
                        path = %shadowed.path.display(),
                        "skipping duplicate savegame"
                    );
                    skipped.push(shadowed.path);
                },
            }
        }

        let mut records: Vec<_> = found.into_values().collect();
        records.sort_by(|a, b| a.saved_at.cmp(&b.saved_at).then_with(|| a.name.cmp(&b.name)));
        let loaded = records.len();
        *catalog = records;
        drop(catalog);
        tracing::info!(loaded, skipped = skipped.len(), "savegame catalog reconciled");
        self.notifier.notify(Field::Savegames);
        Ok(Reconcile { loaded, skipped })
    }

    /// Persist a save and add it to the catalog, replacing any save with
    /// the same name.
    #[instrument(skip_all, fields(cartridge = %self.cartridge.id, name = %savegame.name))]
    pub async fn add(&self, savegame: &Savegame) -> Result<SavegameRecord> {
        if savegame.cartridge_id != self.cartridge.id {
            exn::bail!(ErrorKind::Savegame);
        }
        let path = self.namer.savegame(&savegame.name);
        let bytes = savegame.encode().or_raise(|| ErrorKind::Savegame)?;

        let mut records = self.records.write().await;
        if let Some(position) = records.iter().position(|r| r.name == savegame.name) {
            let replaced = records.remove(position);
            tracing::info!(path = %replaced.path.display(), "replacing savegame");
            if replaced.path != path {
                self.delete_file(&replaced.path).await;
            }
        }
        self.backend.write(&path, &bytes).await.or_raise(|| ErrorKind::Storage)?;
        let record = SavegameRecord::new(path, savegame.info());
        records.push(record.clone());
        drop(records);

        tracing::info!(path = %record.path.display(), "added savegame");
        self.notifier.notify(Field::Savegames);
        Ok(record)
    }

    /// Remove a save from the catalog and delete its file.
    ///
    /// Failing to delete the file is logged, the record is removed anyway.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn remove(&self, name: &str) -> Option<SavegameRecord> {
        let record = {
            let mut records = self.records.write().await;
            let position = records.iter().position(|r| r.name == name)?;
            records.remove(position)
        };
        self.delete_file(&record.path).await;
        tracing::info!(path = %record.path.display(), "removed savegame");
        self.notifier.notify(Field::Savegames);
        Some(record)
    }

    pub async fn find_by_name(&self, name: &str) -> Option<SavegameRecord> {
        self.records.read().await.iter().find(|r| r.name == name).cloned()
    }

    /// Snapshot of the catalog, oldest first.
    pub async fn records(&self) -> Vec<SavegameRecord> {
        self.records.read().await.clone()
    }

    /// Read a save back for restoring, verifying its checksum.
    #[instrument(skip(self), fields(cartridge = %self.cartridge.id))]
    pub async fn load(&self, name: &str) -> Result<Option<Savegame>> {
        let Some(record) = self.find_by_name(name).await else {
            return Ok(None);
        };
        let bytes = self.backend.read(&record.path).await.or_raise(|| ErrorKind::Storage)?;
        let savegame = Savegame::parse(&bytes).or_raise(|| ErrorKind::CacheCorruption(record.path.clone()))?;
        Ok(Some(savegame))
    }

    async fn delete_file(&self, path: &Path) {
        match self.backend.delete(path).await {
            Ok(()) => {},
            Err(err) if err.is_not_found() => tracing::debug!(path = %path.display(), "savegame file already gone"),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "failed to delete savegame file"),
        }
    }
}
