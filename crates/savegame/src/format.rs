use crate::error::{ErrorKind, Result};
use crate::{Savegame, SavegameInfo};
use exn::OptionExt;
use time::UtcDateTime;

/// Leading bytes of every save file.
pub const SIGNATURE: &[u8; 7] = b"\x02\x0ASYNC\x00";
/// Current format version.
pub const VERSION: u8 = 1;

pub(crate) fn encode(save: &Savegame) -> Result<Vec<u8>> {
    let id_len = u16::try_from(save.cartridge_id.len()).ok().ok_or_raise(|| ErrorKind::FieldTooLong("cartridge id"))?;
    let name_len = u16::try_from(save.name.len()).ok().ok_or_raise(|| ErrorKind::FieldTooLong("name"))?;
    let payload_len = u32::try_from(save.payload.len()).ok().ok_or_raise(|| ErrorKind::FieldTooLong("payload"))?;

    let capacity = SIGNATURE.len() + 23 + save.cartridge_id.len() + save.name.len() + save.payload.len();
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(SIGNATURE);
    out.push(VERSION);
    out.extend_from_slice(&id_len.to_le_bytes());
    out.extend_from_slice(save.cartridge_id.as_bytes());
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(save.name.as_bytes());
    out.extend_from_slice(&save.saved_at.unix_timestamp().to_le_bytes());
    out.extend_from_slice(&payload_len.to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&save.payload).to_le_bytes());
    out.extend_from_slice(&save.payload);
    Ok(out)
}

/// Split a file into its header and payload. The checksum is not verified.
pub(crate) fn decode(bytes: &[u8]) -> Result<(SavegameInfo, &[u8])> {
    let mut cursor = Cursor { bytes };
    if cursor.take(SIGNATURE.len())? != SIGNATURE {
        exn::bail!(ErrorKind::InvalidSignature);
    }
    let version = cursor.u8()?;
    if version != VERSION {
        exn::bail!(ErrorKind::UnsupportedVersion(version));
    }
    let cartridge_id = cursor.string("cartridge id")?;
    let name = cursor.string("name")?;
    let timestamp = cursor.i64()?;
    let saved_at =
        UtcDateTime::from_unix_timestamp(timestamp).ok().ok_or_raise(|| ErrorKind::InvalidTimestamp(timestamp))?;
    let payload_len = cursor.u32()?;
    let checksum = cursor.u32()?;
    let payload = cursor.take(payload_len as usize)?;
    if !cursor.bytes.is_empty() {
        exn::bail!(ErrorKind::TrailingData);
    }
    Ok((SavegameInfo { cartridge_id, name, saved_at, payload_len, checksum }, payload))
}

pub(crate) fn verify(info: &SavegameInfo, payload: &[u8]) -> Result<()> {
    let actual = crc32fast::hash(payload);
    if actual != info.checksum {
        exn::bail!(ErrorKind::ChecksumMismatch { expected: info.checksum, actual });
    }
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
}
impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.bytes.len() < len {
            exn::bail!(ErrorKind::Truncated);
        }
        let (head, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn string(&mut self, field: &'static str) -> Result<String> {
        let len = self.u16()?;
        let raw = self.take(usize::from(len))?;
        Ok(std::str::from_utf8(raw).ok().ok_or_raise(|| ErrorKind::InvalidUtf8(field))?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn save() -> Savegame {
        Savegame::new("0f1e2d3c-4b5a", "Chapter 2", b"engine state".to_vec())
            .with_saved_at(UtcDateTime::from_unix_timestamp(1_700_000_000).unwrap())
    }

    #[test]
    fn test_layout() {
        let bytes = save().encode().unwrap();
        assert!(bytes.starts_with(b"\x02\nSYNC\x00\x01"));
        // signature, version, two length-prefixed strings, timestamp, length, crc, payload
        assert_eq!(bytes.len(), 7 + 1 + 2 + 13 + 2 + 9 + 8 + 4 + 4 + 12);
        assert!(bytes.ends_with(b"engine state"));
    }

    #[test]
    fn test_parse_restores_everything() {
        let original = save();
        let parsed = Savegame::parse(&original.encode().unwrap()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.info(), SavegameInfo::parse(&original.encode().unwrap()).unwrap());
    }

    #[test]
    fn test_empty_payload() {
        let original = Savegame::new("id", "empty", Vec::<u8>::new());
        let info = SavegameInfo::parse(&original.encode().unwrap()).unwrap();
        assert_eq!(info.payload_len, 0);
        assert_eq!(info.name, "empty");
    }

    #[test]
    fn test_checksum_is_verified_on_full_parse_only() {
        let mut bytes = save().encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(SavegameInfo::parse(&bytes).is_ok());
        let err = Savegame::parse(&bytes).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ChecksumMismatch { .. }));
    }

    #[rstest]
    #[case::empty(0)]
    #[case::inside_signature(3)]
    #[case::inside_header(20)]
    #[case::inside_payload(50)]
    fn test_truncated(#[case] keep: usize) {
        let bytes = save().encode().unwrap();
        let err = SavegameInfo::parse(&bytes[..keep]).unwrap_err();
        assert_eq!(*err, ErrorKind::Truncated);
    }

    #[test]
    fn test_trailing_data() {
        let mut bytes = save().encode().unwrap();
        bytes.extend_from_slice(b"junk");
        assert_eq!(*SavegameInfo::parse(&bytes).unwrap_err(), ErrorKind::TrailingData);
    }

    #[test]
    fn test_bad_signature_and_version() {
        let mut bytes = save().encode().unwrap();
        bytes[7] = 2;
        assert_eq!(*SavegameInfo::parse(&bytes).unwrap_err(), ErrorKind::UnsupportedVersion(2));
        bytes[0] = b'P';
        assert_eq!(*SavegameInfo::parse(&bytes).unwrap_err(), ErrorKind::InvalidSignature);
        assert_eq!(*SavegameInfo::parse(b"PK\x03\x04 some zip file").unwrap_err(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_invalid_utf8_name() {
        let mut bytes = save().encode().unwrap();
        // first byte of the name
        bytes[7 + 1 + 2 + 13 + 2] = 0xFF;
        assert_eq!(*SavegameInfo::parse(&bytes).unwrap_err(), ErrorKind::InvalidUtf8("name"));
    }

    #[test]
    fn test_name_too_long() {
        let save = Savegame::new("id", "x".repeat(usize::from(u16::MAX) + 1), Vec::<u8>::new());
        assert_eq!(*save.encode().unwrap_err(), ErrorKind::FieldTooLong("name"));
    }
}
