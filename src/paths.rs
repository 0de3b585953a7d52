//! Deterministic storage paths for a cartridge's derived files.
//!
//! | What            | Path                                                        |
//! |-----------------|-------------------------------------------------------------|
//! | derived image   | `<cache_dir>/<id>/{icon,thumb,poster}.jpg`                  |
//! | cached sound    | `<cache_dir>/<id>/<resource id>.<EXT>` (FDL becomes `WAV`)  |
//! | savegame        | `<savegame_dir>/<id[..4]>_<stem>/<slug>-<crc32>.gws`        |
//! | log file        | `<savegame_dir>/<id[..4]>_<stem>/<yyyyMMddHHmmss>_<stem>.gwl` |
//!
//! `stem` is the cartridge filename without its extension. Nothing here
//! touches storage.

use crate::error::{ErrorKind, Result};
use crate::images::Slot;
use crate::model::{Cartridge, MediaKind};
use cartridge_config::LayoutConfig;
use cartridge_storage::{FileInfo, validate_path};
use exn::{OptionExt, ResultExt};
use rslug::slugify;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use time::macros::format_description;

/// Characters of the cartridge id prefixed to the savegame directory.
const SAVEGAME_ID_PREFIX: usize = 4;

#[derive(Clone, Debug)]
pub struct PathNamer {
    cache_root: PathBuf,
    savegame_root: PathBuf,
    stem: String,
    savegame_extension: String,
    log_extension: String,
}
impl PathNamer {
    /// Fails with [`InvalidCartridge`](ErrorKind::InvalidCartridge) when the
    /// id or the filename can't be turned into a single path segment.
    pub fn new(cartridge: &Cartridge, layout: &LayoutConfig) -> Result<Self> {
        let id = cartridge.id.as_str();
        if id.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidCartridge("empty id"));
        }
        if !is_segment(id) {
            exn::bail!(ErrorKind::InvalidCartridge("id is not a valid file name"));
        }
        let stem = Path::new(cartridge.filename.trim())
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.trim().is_empty())
            .ok_or_raise(|| ErrorKind::InvalidCartridge("filename has no usable stem"))?;
        if !is_segment(stem) {
            exn::bail!(ErrorKind::InvalidCartridge("filename is not a valid file name"));
        }
        let prefix: String = id.chars().take(SAVEGAME_ID_PREFIX).collect();

        let cache_root = validate_path(layout.cache_dir.join(id))
            .or_raise(|| ErrorKind::InvalidCartridge("cache directory escapes the storage root"))?;
        let savegame_root = validate_path(layout.savegame_dir.join(format!("{prefix}_{stem}")))
            .or_raise(|| ErrorKind::InvalidCartridge("savegame directory escapes the storage root"))?;
        Ok(Self {
            cache_root,
            savegame_root,
            stem: stem.to_string(),
            savegame_extension: layout.savegame_extension.clone(),
            log_extension: layout.log_extension.clone(),
        })
    }

    /// Directory holding derived images and cached sounds.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Directory holding savegames and logs.
    pub fn savegame_root(&self) -> &Path {
        &self.savegame_root
    }

    pub fn image(&self, slot: Slot) -> PathBuf {
        self.cache_root.join(slot.file_name())
    }

    pub fn sound(&self, id: u32, kind: MediaKind) -> PathBuf {
        self.cache_root.join(format!("{id}.{}", kind.cache_extension()))
    }

    /// Canonical file for a save name.
    ///
    /// The slug keeps the file recognisable; the checksum of the raw name
    /// keeps names that slugify identically apart.
    pub fn savegame(&self, name: &str) -> PathBuf {
        let slug = slugify!(name);
        let slug = if slug.is_empty() { "save" } else { slug.as_str() };
        let hash = crc32fast::hash(name.as_bytes());
        self.savegame_root.join(format!("{slug}-{hash:08x}.{}", self.savegame_extension))
    }

    pub fn log(&self, at: UtcDateTime) -> Result<PathBuf> {
        let stamp = at
            .format(format_description!("[year][month][day][hour][minute][second]"))
            .or_raise(|| ErrorKind::InvalidCartridge("log timestamp can't be formatted"))?;
        Ok(self.savegame_root.join(format!("{stamp}_{}.{}", self.stem, self.log_extension)))
    }

    /// Whether a listed file is a savegame directly inside the savegame directory.
    pub fn is_savegame(&self, file: &FileInfo) -> bool {
        file.path.parent() == Some(self.savegame_root.as_path()) && file.has_extension(&self.savegame_extension)
    }
}

fn is_segment(name: &str) -> bool {
    validate_path(name).is_ok_and(|path| path.components().count() == 1 && path == Path::new(name))
}
