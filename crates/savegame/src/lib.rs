//! Savegame files.
//!
//! A save is a small binary header followed by the opaque engine state:
//!
//! | Field         | Encoding                             |
//! |---------------|--------------------------------------|
//! | signature     | `02 0A 53 59 4E 43 00` (`"\x02\nSYNC\0"`) |
//! | version       | `u8`, currently `1`                  |
//! | cartridge id  | `u16` length + UTF-8                 |
//! | name          | `u16` length + UTF-8                 |
//! | saved at      | `i64` unix seconds                   |
//! | payload len   | `u32`                                |
//! | payload crc   | `u32` CRC-32 of the payload          |
//! | payload       | `payload len` bytes                  |
//!
//! All integers are little-endian. [`SavegameInfo::parse`] reads only what
//! the catalog needs (header plus a length check), while [`Savegame::parse`]
//! also verifies the payload checksum.

pub mod error;
mod format;

pub use crate::format::{SIGNATURE, VERSION};
use crate::error::Result;
use time::UtcDateTime;

/// Header metadata of a save file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavegameInfo {
    pub cartridge_id: String,
    pub name: String,
    pub saved_at: UtcDateTime,
    pub payload_len: u32,
    pub checksum: u32,
}
impl SavegameInfo {
    /// Parse the header and check the file holds exactly the declared payload.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (info, _payload) = format::decode(bytes)?;
        Ok(info)
    }
}

/// A complete save: metadata plus engine state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Savegame {
    pub cartridge_id: String,
    pub name: String,
    pub saved_at: UtcDateTime,
    pub payload: Vec<u8>,
}
impl Savegame {
    /// A save stamped with the current time, truncated to whole seconds.
    pub fn new(cartridge_id: impl Into<String>, name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        let now = UtcDateTime::now();
        Self {
            cartridge_id: cartridge_id.into(),
            name: name.into(),
            saved_at: UtcDateTime::from_unix_timestamp(now.unix_timestamp()).unwrap_or(now),
            payload: payload.into(),
        }
    }

    pub fn with_saved_at(mut self, saved_at: UtcDateTime) -> Self {
        self.saved_at = saved_at;
        self
    }

    /// Serialize to the on-disk format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        format::encode(self)
    }

    /// Parse a complete save, verifying its checksum.
    #[tracing::instrument(level = "debug", skip_all, fields(len = bytes.len()))]
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (info, payload) = format::decode(bytes)?;
        format::verify(&info, payload)?;
        Ok(Self {
            cartridge_id: info.cartridge_id,
            name: info.name,
            saved_at: info.saved_at,
            payload: payload.to_vec(),
        })
    }

    pub fn info(&self) -> SavegameInfo {
        SavegameInfo {
            cartridge_id: self.cartridge_id.clone(),
            name: self.name.clone(),
            saved_at: self.saved_at,
            payload_len: u32::try_from(self.payload.len()).unwrap_or(u32::MAX),
            checksum: crc32fast::hash(&self.payload),
        }
    }
}
