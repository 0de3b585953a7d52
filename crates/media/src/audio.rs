//! Audio transcoding.

use crate::error::{ErrorKind, Result};
use std::io::Read;

pub type BoxSyncRead = Box<dyn Read + Send + 'static>;

/// Converts a proprietary sound payload into a playable stream.
///
/// The returned reader may decode lazily; errors surfacing while it is read
/// are just as fatal to the conversion as an error returned up front.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, source: &[u8]) -> Result<BoxSyncRead>;
}

/// A [`Transcoder`] for hosts without a decoder: every request fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;
impl Transcoder for Unsupported {
    fn transcode(&self, _source: &[u8]) -> Result<BoxSyncRead> {
        exn::bail!(ErrorKind::Unsupported("no audio transcoder configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_always_fails() {
        let err = Unsupported.transcode(b"FDL payload").err().unwrap();
        assert!(matches!(&*err, ErrorKind::Unsupported(_)));
    }
}
