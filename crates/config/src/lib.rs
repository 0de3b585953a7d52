//! Layered configuration for the cartridge cache.
//!
//! Values are merged, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A configuration file: either the one passed to [`Config::load`]
//!    (TOML, YAML or JSON, chosen by extension) or `config.toml` in the
//!    platform configuration directory, if present
//! 3. Environment variables prefixed with `CARTRIDGE_`, using `__` to
//!    separate nested keys (`CARTRIDGE_LAYOUT__CACHE_DIR=Cache`)
//!
//! The merged result is validated before it is returned.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

const ENV_PREFIX: &str = "CARTRIDGE_";
const CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub layout: LayoutConfig,
    pub images: ImageConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory every cache and savegame path is relative to. Defaults to
    /// the platform data directory.
    pub root: Option<PathBuf>,
}

/// Where derived assets and saves live below the storage root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub cache_dir: PathBuf,
    pub savegame_dir: PathBuf,
    /// Without the leading dot.
    pub savegame_extension: String,
    /// Without the leading dot.
    pub log_extension: String,
}
impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("Cache"),
            savegame_dir: PathBuf::from("Savegames_and_Logs"),
            savegame_extension: "gws".to_string(),
            log_extension: "gwl".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub jpeg_quality: u8,
}
impl Default for ImageConfig {
    fn default() -> Self {
        Self { jpeg_quality: 85 }
    }
}

impl Config {
    /// Load configuration from defaults, a file and the environment.
    ///
    /// An explicit `path` must exist; the platform configuration file is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match path {
            Some(path) => merge_file(figment, path)?,
            None => match project_dirs() {
                Some(dirs) => {
                    let path = dirs.config_dir().join(CONFIG_FILE);
                    tracing::debug!(path = %path.display(), "looking for platform configuration file");
                    figment.merge(Toml::file(path))
                },
                None => figment,
            },
        };
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate configuration from a caller-assembled stack.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_dir("layout.cache_dir", &self.layout.cache_dir)?;
        check_dir("layout.savegame_dir", &self.layout.savegame_dir)?;
        check_extension("layout.savegame_extension", &self.layout.savegame_extension)?;
        check_extension("layout.log_extension", &self.layout.log_extension)?;
        if self.layout.savegame_extension.eq_ignore_ascii_case(&self.layout.log_extension) {
            exn::bail!(ErrorKind::Invalid {
                field: "layout.log_extension",
                reason: "must differ from the savegame extension",
            });
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            exn::bail!(ErrorKind::Invalid { field: "images.jpeg_quality", reason: "must be between 1 and 100" });
        }
        Ok(())
    }

    /// The configured storage root, or the platform data directory.
    pub fn storage_root(&self) -> Result<PathBuf> {
        self.storage
            .root
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
            .ok_or_raise(|| ErrorKind::NoStorageRoot)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "cartridge-cache")
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default().to_ascii_lowercase();
    tracing::debug!(path = %path.display(), format = %extension, "loading configuration file");
    Ok(match extension.as_str() {
        "toml" => figment.merge(Toml::file(path)),
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        "json" => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(extension)),
    })
}

fn check_dir(field: &'static str, dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        exn::bail!(ErrorKind::Invalid { field, reason: "must not be empty" });
    }
    if !dir.components().all(|c| matches!(c, Component::Normal(_))) {
        exn::bail!(ErrorKind::Invalid { field, reason: "must be a relative path without `.` or `..`" });
    }
    Ok(())
}

fn check_extension(field: &'static str, extension: &str) -> Result<()> {
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        exn::bail!(ErrorKind::Invalid { field, reason: "must be alphanumeric without a leading dot" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::from_figment(defaults()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.layout.cache_dir, Path::new("Cache"));
        assert_eq!(config.layout.savegame_dir, Path::new("Savegames_and_Logs"));
        assert_eq!(config.layout.savegame_extension, "gws");
        assert_eq!(config.layout.log_extension, "gwl");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let toml = r#"
            [layout]
            cache_dir = "derived"

            [images]
            jpeg_quality = 70
        "#;
        let config = Config::from_figment(defaults().merge(Toml::string(toml))).unwrap();
        assert_eq!(config.layout.cache_dir, Path::new("derived"));
        assert_eq!(config.layout.savegame_dir, Path::new("Savegames_and_Logs"));
        assert_eq!(config.images.jpeg_quality, 70);
    }

    #[rstest]
    #[case::absolute_cache_dir("[layout]\ncache_dir = \"/var/cache\"", "layout.cache_dir")]
    #[case::traversing_savegame_dir("[layout]\nsavegame_dir = \"../saves\"", "layout.savegame_dir")]
    #[case::dotted_extension("[layout]\nsavegame_extension = \".gws\"", "layout.savegame_extension")]
    #[case::empty_extension("[layout]\nlog_extension = \"\"", "layout.log_extension")]
    #[case::same_extensions("[layout]\nlog_extension = \"GWS\"", "layout.log_extension")]
    #[case::zero_quality("[images]\njpeg_quality = 0", "images.jpeg_quality")]
    fn test_validation(#[case] toml: &str, #[case] expected_field: &str) {
        let err = Config::from_figment(defaults().merge(Toml::string(toml))).unwrap_err();
        match &*err {
            ErrorKind::Invalid { field, .. } => assert_eq!(*field, expected_field),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let figment = defaults().merge(Toml::string("[images]\njpeg_quality = \"high\""));
        let err = Config::from_figment(figment).unwrap_err();
        assert_eq!(*err, ErrorKind::Parse);
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cartridge.yaml");
        std::fs::write(&path, "storage:\n  root: /srv/wherigo\nlayout:\n  log_extension: log\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.storage_root().unwrap(), Path::new("/srv/wherigo"));
        assert_eq!(config.layout.log_extension, "log");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::FileNotFound(path));
    }

    #[test]
    fn test_load_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[layout]").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat("ini".to_string()));
    }
}
