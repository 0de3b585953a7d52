//! Capabilities the cartridge cache borrows from the host.
//!
//! Neither resizing artwork nor decoding the proprietary sound format is the
//! cache's business, so both sit behind small traits:
//!
//! - [`ImageCodec`] crops/scales source artwork into an encoded derived image
//!   and decodes cached files back into a displayable handle. [`JpegCodec`] is
//!   the implementation shipped with this crate.
//! - [`Transcoder`] turns a proprietary audio payload into a readable stream of
//!   a playable format. Hosts without a decoder can use [`Unsupported`], which
//!   fails every request.
//!
//! All methods are synchronous and CPU-bound; callers are expected to run them
//! on a blocking thread.

mod audio;
pub mod error;
mod image;

pub use crate::audio::{BoxSyncRead, Transcoder, Unsupported};
pub use crate::image::{DecodedImage, Fit, ImageCodec, JpegCodec};
