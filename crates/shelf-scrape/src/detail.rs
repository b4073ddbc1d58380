use reqwest::Url;
use shelf_core::MediaCategory;
use tracing::{debug, warn};

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};
use crate::extract::ExtractorRegistry;
use crate::http::CatalogueClient;
use crate::types::DetailRecord;

/// Fetches a detail page and turns it into a [`DetailRecord`].
pub struct DetailNormalizer {
    client: CatalogueClient,
    registry: ExtractorRegistry,
    config: ScrapeConfig,
}

impl DetailNormalizer {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = CatalogueClient::new(&config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: ScrapeConfig, client: CatalogueClient) -> Self {
        Self {
            client,
            registry: ExtractorRegistry::new(config.cast_limit),
            config,
        }
    }

    /// Category of a detail reference, decided by its host alone.
    pub fn category_of(&self, detail_ref: &str) -> Result<MediaCategory> {
        let url = Url::parse(detail_ref.trim())
            .map_err(|_| ScrapeError::MalformedReference(detail_ref.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScrapeError::MalformedReference(detail_ref.to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ScrapeError::MalformedReference(detail_ref.to_string()))?;
        self.config
            .route_host(host, url.port())
            .ok_or_else(|| ScrapeError::MalformedReference(detail_ref.to_string()))
    }

    pub async fn fetch_detail(&self, detail_ref: &str) -> Result<DetailRecord> {
        let category = self.category_of(detail_ref)?;
        let detail_ref = detail_ref.trim();
        debug!(url = detail_ref, %category, "fetching detail page");

        let html = self
            .client
            .get_text(detail_ref, self.config.detail_timeout)
            .await?;
        self.registry.extract(category, &html, Some(detail_ref))
    }

    /// Like [`fetch_detail`](Self::fetch_detail) but logs and drops errors.
    pub async fn fetch_detail_soft(&self, detail_ref: &str) -> Option<DetailRecord> {
        match self.fetch_detail(detail_ref).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(url = detail_ref, error = %e, "detail fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const MOVIE: &str = include_str!("fixtures/movie_detail.html");
    const BOOK: &str = include_str!("fixtures/book_detail.html");

    fn normalizer_for(server: &Server, category: MediaCategory) -> DetailNormalizer {
        let mut config = ScrapeConfig::default();
        let host = server.host_with_port();
        config.routes.retain(|(_, c)| *c != category);
        config.routes.push((host, category));
        DetailNormalizer::new(config).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_normalizes_movie() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/subject/1292052/")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(MOVIE)
            .expect(1)
            .create_async()
            .await;

        let normalizer = normalizer_for(&server, MediaCategory::Movie);
        let url = format!("{}/subject/1292052/", server.url());
        let record = normalizer.fetch_detail(&url).await.unwrap();

        assert_eq!(record.media_type, MediaCategory::Movie);
        assert_eq!(record.source_id.as_deref(), Some("1292052"));
        assert_eq!(record.detail_url.as_deref(), Some(url.as_str()));
        assert_eq!(record.imdb_id.as_deref(), Some("tt0111161"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn movie_host_never_runs_book_extractor() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/subject/4913064/")
            .with_status(200)
            .with_body(BOOK)
            .create_async()
            .await;

        let normalizer = normalizer_for(&server, MediaCategory::Movie);
        let record = normalizer
            .fetch_detail(&format!("{}/subject/4913064/", server.url()))
            .await
            .unwrap();

        assert_eq!(record.media_type, MediaCategory::Movie);
        assert_eq!(record.title.as_deref(), Some("活着"));
        assert!(record.isbn.is_none());
        assert!(record.author.is_none());
        assert!(record.publisher.is_none());
    }

    #[tokio::test]
    async fn unknown_host_is_rejected_without_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        // The mock server is not routed to any category.
        let normalizer = DetailNormalizer::new(ScrapeConfig::default()).unwrap();
        let err = normalizer
            .fetch_detail(&format!("{}/subject/1/", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedReference(_)));
        assert!(!err.is_transient());
        assert!(normalizer.fetch_detail_soft("not a url").await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/subject/1/")
            .with_status(502)
            .create_async()
            .await;

        let normalizer = normalizer_for(&server, MediaCategory::Book);
        let err = normalizer
            .fetch_detail(&format!("{}/subject/1/", server.url()))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn category_from_default_hosts() {
        let normalizer = DetailNormalizer::new(ScrapeConfig::default()).unwrap();
        assert_eq!(
            normalizer
                .category_of("https://book.douban.com/subject/4913064/")
                .unwrap(),
            MediaCategory::Book
        );
        assert!(normalizer.category_of("https://www.douban.com/subject/1/").is_err());
        assert!(normalizer.category_of("ftp://movie.douban.com/subject/1/").is_err());
    }
}
