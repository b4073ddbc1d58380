//! Local cover cache.
//!
//! Covers live in one flat directory as `{key}{ext}`. A file at the expected
//! path is the whole index: if it exists the cover is cached and no request
//! is made.

use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::Url;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};
use crate::http::CatalogueClient;
use crate::identifiers::Isbn;

const DEFAULT_EXTENSION: &str = ".jpg";
const MAX_EXTENSION_LEN: usize = 5;

/// Picks the cache key for a cover by identifier priority:
/// ISBN, then IMDb id, then catalogue id. `None` means the caller should
/// fall back to hashing the cover URL.
pub struct CoverKey;

impl CoverKey {
    pub fn select(
        isbn: Option<&str>,
        imdb_id: Option<&str>,
        source_id: Option<&str>,
    ) -> Option<String> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }

        present(isbn)
            .map(Isbn::normalize)
            .or_else(|| present(imdb_id).map(str::to_string))
            .or_else(|| present(source_id).map(str::to_string))
    }
}

fn sanitize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Suffix of the URL path including the dot, or `.jpg` when there is none
/// or it is too long to be a real extension.
fn extension_of(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rfind('.') {
        Some(idx) if idx > 0 && file.len() - idx <= MAX_EXTENSION_LEN => file[idx..].to_string(),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

fn is_http_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

/// File name a cover is stored under: sanitized key, or the MD5 hex of the
/// URL when no key is given, plus the URL's extension.
pub fn cover_file_name(cover_url: &str, cache_key: Option<&str>) -> String {
    let stem = match cache_key.map(sanitize_key).filter(|k| !k.is_empty()) {
        Some(key) => key,
        None => format!("{:x}", md5::compute(cover_url.trim().as_bytes())),
    };
    format!("{stem}{}", extension_of(cover_url))
}

/// Writes `bytes` to a uniquely named temp file in `dir`, then renames it over
/// `path`. Readers never observe a partial cover.
fn store_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub struct CoverCache {
    client: CatalogueClient,
    dir: PathBuf,
    timeout: std::time::Duration,
}

impl CoverCache {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = CatalogueClient::new(config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &ScrapeConfig, client: CatalogueClient) -> Self {
        Self {
            client,
            dir: config.covers_dir.clone(),
            timeout: config.cover_timeout,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the cover would have, whether or not it is cached yet.
    pub fn target_path(&self, cover_url: &str, cache_key: Option<&str>) -> PathBuf {
        self.dir.join(cover_file_name(cover_url, cache_key))
    }

    /// Existing cache file for this cover, without any network access.
    pub fn cached_path(&self, cover_url: Option<&str>, cache_key: Option<&str>) -> Option<PathBuf> {
        let url = cover_url.map(str::trim).filter(|u| is_http_url(u))?;
        let path = self.target_path(url, cache_key);
        path.is_file().then_some(path)
    }

    /// Materializes a cover locally. `Ok(None)` when there is nothing to
    /// fetch (no URL or not HTTP). A cached file is returned as-is.
    pub async fn resolve(
        &self,
        cover_url: Option<&str>,
        cache_key: Option<&str>,
    ) -> Result<Option<PathBuf>> {
        let Some(url) = cover_url.map(str::trim).filter(|u| is_http_url(u)) else {
            return Ok(None);
        };

        let path = self.target_path(url, cache_key);
        if path.is_file() {
            debug!(path = %path.display(), "cover cache hit");
            return Ok(Some(path));
        }

        let bytes = self.client.get_bytes(url, self.timeout).await?;
        if bytes.is_empty() {
            return Err(ScrapeError::EmptyBody(url.to_string()));
        }

        let len = bytes.len();
        let dir = self.dir.clone();
        let target = path.clone();
        let stored = tokio::task::spawn_blocking(move || store_atomically(&dir, &target, &bytes))
            .await
            .map_err(std::io::Error::other)?;

        match stored {
            Ok(()) => {
                info!(url, path = %path.display(), bytes = len, "cover downloaded");
                Ok(Some(path))
            }
            // Another download of the same key finished first.
            Err(_) if path.is_file() => {
                debug!(path = %path.display(), "cover stored concurrently");
                Ok(Some(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fail-soft [`resolve`](Self::resolve): errors are logged and yield `None`.
    pub async fn resolve_soft(
        &self,
        cover_url: Option<&str>,
        cache_key: Option<&str>,
    ) -> Option<PathBuf> {
        match self.resolve(cover_url, cache_key).await {
            Ok(path) => path,
            Err(e) => {
                warn!(url = cover_url.unwrap_or_default(), error = %e, "cover download failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> CoverCache {
        let mut config = ScrapeConfig::default();
        config.covers_dir = dir.path().join("covers");
        CoverCache::new(&config).unwrap()
    }

    #[test]
    fn key_priority() {
        assert_eq!(
            CoverKey::select(Some("9787506365437"), Some("tt0111161"), Some("1292052")).as_deref(),
            Some("9787506365437")
        );
        assert_eq!(
            CoverKey::select(Some(" "), Some("tt0111161"), Some("1292052")).as_deref(),
            Some("tt0111161")
        );
        assert_eq!(CoverKey::select(None, None, Some("1292052")).as_deref(), Some("1292052"));
        assert_eq!(CoverKey::select(None, None, None), None);
    }

    #[test]
    fn isbn10_and_isbn13_share_a_key() {
        assert_eq!(
            CoverKey::select(Some("0306406152"), None, None),
            CoverKey::select(Some("978-0-306-40615-7"), None, None)
        );
    }

    #[test]
    fn file_names() {
        let url = "https://img2.doubanio.com/view/photo/s_ratio_poster/public/p480747492.jpg";
        assert_eq!(cover_file_name(url, Some("tt0111161")), "tt0111161.jpg");
        assert_eq!(
            cover_file_name("https://x.test/a/cover.webp?x=1", Some("a/b c")),
            "a_b_c.webp"
        );
        assert_eq!(cover_file_name("https://x.test/a/cover", Some("k")), "k.jpg");
        assert_eq!(cover_file_name("https://x.test/a/cover.verylong", Some("k")), "k.jpg");

        let hashed = cover_file_name(url, None);
        assert_eq!(hashed.len(), 32 + ".jpg".len());
        assert!(hashed.ends_with(".jpg"));
        assert_eq!(hashed, cover_file_name(url, None));
    }

    #[tokio::test]
    async fn resolve_twice_fetches_once() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/view/s29053580.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(b"\xFF\xD8\xFFfake-jpeg".to_vec())
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let url = format!("{}/view/s29053580.jpg", server.url());

        let first = cache.resolve(Some(&url), Some("1292052")).await.unwrap().unwrap();
        let second = cache.resolve(Some(&url), Some("1292052")).await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(first.file_name().unwrap(), "1292052.jpg");
        assert!(std::fs::metadata(&first).unwrap().len() > 0);
        assert!(!first.with_extension("jpg.part").exists());
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_downloads_of_one_key_both_succeed() {
        let mut server = Server::new_async().await;
        let body = vec![0xAB_u8; 2 * 1024 * 1024];
        let _m = server
            .mock("GET", "/big.jpg")
            .with_status(200)
            .with_body(body.clone())
            .expect_at_least(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let cache = std::sync::Arc::new(cache_in(&dir));
        let url = format!("{}/big.jpg", server.url());

        for round in 0..10 {
            let key = format!("k{round}");
            let (a, b) = tokio::join!(
                tokio::spawn({
                    let (cache, url, key) = (cache.clone(), url.clone(), key.clone());
                    async move { cache.resolve(Some(&url), Some(&key)).await }
                }),
                tokio::spawn({
                    let (cache, url, key) = (cache.clone(), url.clone(), key.clone());
                    async move { cache.resolve(Some(&url), Some(&key)).await }
                }),
            );
            let a = a.unwrap().unwrap().unwrap();
            let b = b.unwrap().unwrap().unwrap();
            assert_eq!(a, b);
            assert_eq!(std::fs::read(&a).unwrap().len(), body.len());
        }

        let leftovers = std::fs::read_dir(cache.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_name().to_string_lossy().starts_with('k'))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn isbn_wins_over_imdb_for_file_name() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/cover.png")
            .with_status(200)
            .with_body("png")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let key = CoverKey::select(Some("9787506365437"), Some("tt0111161"), None);
        let path = cache
            .resolve(Some(&format!("{}/cover.png", server.url())), key.as_deref())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "9787506365437.png");
    }

    #[tokio::test]
    async fn absent_or_non_http_url_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        assert!(cache.resolve(None, Some("k")).await.unwrap().is_none());
        assert!(cache.resolve(Some("data:image/png;base64,AAAA"), None).await.unwrap().is_none());
        assert!(cache.resolve(Some("/local/cover.jpg"), None).await.unwrap().is_none());
        assert!(!cache.dir().exists());
    }

    #[tokio::test]
    async fn failures_leave_no_file() {
        let mut server = Server::new_async().await;
        let _missing = server.mock("GET", "/404.jpg").with_status(404).create_async().await;
        let _empty = server
            .mock("GET", "/empty.jpg")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        let err = cache
            .resolve(Some(&format!("{}/404.jpg", server.url())), Some("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 404, .. }));

        let err = cache
            .resolve(Some(&format!("{}/empty.jpg", server.url())), Some("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::EmptyBody(_)));

        assert!(cache
            .resolve_soft(Some(&format!("{}/404.jpg", server.url())), Some("a"))
            .await
            .is_none());
        assert!(cache.cached_path(Some(&format!("{}/404.jpg", server.url())), Some("a")).is_none());
    }

    #[tokio::test]
    async fn cached_path_finds_existing_file_offline() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let url = "https://img1.doubanio.com/view/subject/s/public/s29053580.jpg";

        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.dir().join("9787506365437.jpg"), b"jpeg").unwrap();

        let found = cache.cached_path(Some(url), Some("9787506365437")).unwrap();
        assert_eq!(found, cache.dir().join("9787506365437.jpg"));
        let resolved = cache.resolve(Some(url), Some("9787506365437")).await.unwrap();
        assert_eq!(resolved, Some(found));
    }
}
