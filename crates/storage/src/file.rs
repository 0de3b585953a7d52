use std::path::PathBuf;
use time::UtcDateTime;

/// File metadata returned by storage backends when listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Relative path from storage root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: UtcDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: UtcDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// Case-insensitive extension check (`"gws"` matches `SAVE.GWS`).
    pub fn has_extension(&self, extension: &str) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_extension() {
        let now = UtcDateTime::now();
        assert!(FileInfo::new("Saves/abcd_cart/run1.gws", 10, now).has_extension("gws"));
        assert!(FileInfo::new("Saves/abcd_cart/RUN1.GWS", 10, now).has_extension("gws"));
        assert!(!FileInfo::new("Saves/abcd_cart/run1.gwl", 10, now).has_extension("gws"));
        assert!(!FileInfo::new("Saves/abcd_cart/gws", 10, now).has_extension("gws"));
    }
}
