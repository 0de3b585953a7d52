//! The loaded cartridge, as far as the cache is concerned.
//!
//! Cartridges are parsed elsewhere; the cache only ever reads them through a
//! shared `Arc<Cartridge>`.

use derive_more::Display;

/// A loaded game package.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cartridge {
    /// Stable GUID-like identifier.
    pub id: String,
    pub name: String,
    pub description: String,
    pub starting_description: String,
    /// Name of the file the cartridge was loaded from, e.g. `Whispering Pines.gwc`.
    pub filename: String,
    /// Encoded icon artwork.
    pub icon: Option<Vec<u8>>,
    /// Encoded splash/poster artwork.
    pub poster: Option<Vec<u8>>,
    pub resources: Vec<Resource>,
}
impl Cartridge {
    pub fn resource(&self, id: u32) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Resources that can be played as sound, in cartridge order.
    pub fn sounds(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| r.kind.is_sound())
    }
}

/// A media payload embedded in a cartridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    /// Unique within its cartridge.
    pub id: u32,
    pub kind: MediaKind,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Bmp,
    Png,
    Jpg,
    Gif,
    Wav,
    Mp3,
    /// Proprietary sound format, transcoded to WAV before playback.
    Fdl,
    Snd,
    Ogg,
    Swf,
    Txt,
}
impl MediaKind {
    pub fn is_sound(self) -> bool {
        matches!(self, Self::Wav | Self::Mp3 | Self::Fdl)
    }

    pub fn needs_transcode(self) -> bool {
        matches!(self, Self::Fdl)
    }

    /// Extension of the cached file, always upper-case.
    pub fn cache_extension(self) -> &'static str {
        match self {
            Self::Bmp => "BMP",
            Self::Png => "PNG",
            Self::Jpg => "JPG",
            Self::Gif => "GIF",
            Self::Wav | Self::Fdl => "WAV",
            Self::Mp3 => "MP3",
            Self::Snd => "SND",
            Self::Ogg => "OGG",
            Self::Swf => "SWF",
            Self::Txt => "TXT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(MediaKind::Fdl, "WAV", true)]
    #[case(MediaKind::Wav, "WAV", true)]
    #[case(MediaKind::Mp3, "MP3", true)]
    #[case(MediaKind::Ogg, "OGG", false)]
    #[case(MediaKind::Jpg, "JPG", false)]
    #[case(MediaKind::Txt, "TXT", false)]
    fn test_media_kind(#[case] kind: MediaKind, #[case] extension: &str, #[case] sound: bool) {
        assert_eq!(kind.cache_extension(), extension);
        assert_eq!(kind.is_sound(), sound);
        assert_eq!(kind.needs_transcode(), kind == MediaKind::Fdl);
    }

    #[test]
    fn test_sounds_keep_cartridge_order() {
        let cartridge = Cartridge {
            resources: vec![
                Resource { id: 9, kind: MediaKind::Mp3, data: vec![] },
                Resource { id: 3, kind: MediaKind::Png, data: vec![] },
                Resource { id: 4, kind: MediaKind::Fdl, data: vec![] },
            ],
            ..Default::default()
        };
        assert_eq!(cartridge.sounds().map(|r| r.id).collect::<Vec<_>>(), vec![9, 4]);
        assert_eq!(cartridge.resource(3).map(|r| r.kind), Some(MediaKind::Png));
        assert!(cartridge.resource(5).is_none());
    }
}
