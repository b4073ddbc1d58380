use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::MediaCategory;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://www.douban.com/";

/// Root application configuration, loaded from `~/.config/shelf/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub fetch: FetchConfig,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub library_path: String,
}

/// Everything the scraper needs to talk to the catalogue site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub referer: String,
    pub search_base_url: String,
    pub search_limit: usize,
    pub cast_limit: usize,
    pub detail_timeout_secs: u64,
    pub cover_timeout_secs: u64,
    pub hosts: HostsConfig,
}

/// Detail-page host for each category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostsConfig {
    pub movie: String,
    pub book: String,
    pub music: String,
}

impl HostsConfig {
    pub fn routes(&self) -> Vec<(String, MediaCategory)> {
        vec![
            (self.movie.clone(), MediaCategory::Movie),
            (self.book.clone(), MediaCategory::Book),
            (self.music.clone(), MediaCategory::Music),
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub on_duplicate: DuplicatePolicy,
}

/// What an import does when the catalogue entry is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Refresh catalogue fields of the stored item, keep the user's fields.
    #[default]
    Update,
    /// Leave the stored item alone and report the conflict.
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "update" => Ok(Self::Update),
            "reject" => Ok(Self::Reject),
            _ => Err(format!("Invalid DuplicatePolicy: {s}")),
        }
    }
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("shelf");

        Self {
            library_path: data_dir.to_string_lossy().to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            search_base_url: "https://www.douban.com".to_string(),
            search_limit: 5,
            cast_limit: 5,
            detail_timeout_secs: 10,
            cover_timeout_secs: 15,
            hosts: HostsConfig::default(),
        }
    }
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            movie: "movie.douban.com".to_string(),
            book: "book.douban.com".to_string(),
            music: "music.douban.com".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/shelf/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SHELF_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("shelf")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the standard path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn set_library_path(&mut self, path: PathBuf) {
        self.core.library_path = path.to_string_lossy().to_string();
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.core.library_path).join("collection.db")
    }

    /// Path to the covers cache directory.
    pub fn covers_dir(&self) -> PathBuf {
        PathBuf::from(&self.core.library_path).join("covers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.fetch.search_limit, 5);
        assert_eq!(cfg.fetch.detail_timeout_secs, 10);
        assert_eq!(cfg.fetch.cover_timeout_secs, 15);
        assert_eq!(cfg.import.on_duplicate, DuplicatePolicy::Update);
        assert!(!cfg.core.library_path.is_empty());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.import.on_duplicate = DuplicatePolicy::Reject;
        cfg.fetch.hosts.movie = "movie.example.test".to_string();
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.import.on_duplicate, DuplicatePolicy::Reject);
        assert_eq!(loaded.fetch.hosts.movie, "movie.example.test");
        assert_eq!(loaded.fetch.user_agent, cfg.fetch.user_agent);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[fetch]\nsearch_limit = 8\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.fetch.search_limit, 8);
        assert_eq!(loaded.fetch.cast_limit, 5);
        assert_eq!(loaded.fetch.hosts.book, "book.douban.com");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_shelf_config.toml")).unwrap();
        assert_eq!(cfg.fetch.referer, DEFAULT_REFERER);
    }

    #[test]
    fn test_derived_paths() {
        let mut cfg = AppConfig::default();
        cfg.set_library_path(PathBuf::from("/srv/shelf"));
        assert_eq!(cfg.database_path(), PathBuf::from("/srv/shelf/collection.db"));
        assert_eq!(cfg.covers_dir(), PathBuf::from("/srv/shelf/covers"));
    }
}
