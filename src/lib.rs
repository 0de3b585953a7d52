//! On-disk state of a loaded cartridge.
//!
//! A [`CartridgeCache`] owns everything a player derives from a cartridge
//! and keeps across restarts:
//!
//! - **Images** ([`ImageCache`]): icon, thumbnail and poster generated from
//!   the cartridge artwork once and reused afterwards.
//! - **Sounds** ([`SoundCache`]): playable resources written out as files,
//!   transcoding the proprietary FDL format to WAV.
//! - **Savegames** ([`SavegameCatalog`]): the saves found on disk, kept
//!   unique by name as saves are added and removed.
//!
//! Paths come from [`PathNamer`] and all I/O goes through a
//! [`StorageBackend`](cartridge_storage::StorageBackend).

pub mod error;
mod images;
mod manager;
mod model;
mod observer;
mod paths;
mod savegames;
mod sounds;
mod task;
#[cfg(test)]
mod testing;

pub use crate::images::{ImageCache, ImagePopulation, Slot};
pub use crate::manager::{Capabilities, CartridgeCache, ImportReport, LogFile};
pub use crate::model::{Cartridge, MediaKind, Resource};
pub use crate::observer::{ChangeObserver, Field};
pub use crate::paths::PathNamer;
pub use crate::savegames::{Reconcile, SavegameCatalog, SavegameRecord};
pub use crate::sounds::{CachedMedia, SoundCache, SoundRebuild};
