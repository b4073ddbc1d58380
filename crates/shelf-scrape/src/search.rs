use reqwest::Url;
use scraper::Html;
use shelf_core::MediaCategory;
use tracing::{debug, warn};

use crate::config::ScrapeConfig;
use crate::error::Result;
use crate::extract::fields::{element_text, parse_selector};
use crate::http::CatalogueClient;
use crate::identifiers::{onclick_subject_id, subject_id, unwrap_redirect};
use crate::types::SearchCandidate;

/// Category-scoped search against the catalogue's listing page.
pub struct SearchResolver {
    client: CatalogueClient,
    config: ScrapeConfig,
}

impl SearchResolver {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = CatalogueClient::new(&config)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: ScrapeConfig, client: CatalogueClient) -> Self {
        Self { client, config }
    }

    pub fn search_url(&self, query: &str, category: MediaCategory) -> String {
        format!(
            "{}/search?cat={}&q={}",
            self.config.search_base_url,
            category.search_code(),
            urlencoding::encode(query.trim())
        )
    }

    /// Up to `search_limit` candidates in listing order. A blank query
    /// returns an empty list without touching the network.
    pub async fn try_search(
        &self,
        query: &str,
        category: MediaCategory,
    ) -> Result<Vec<SearchCandidate>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = self.search_url(query, category);
        debug!(%url, "searching catalogue");
        let html = self.client.get_text(&url, self.config.detail_timeout).await?;
        let candidates = parse_search_html(&html, &url, self.config.search_limit)?;
        debug!(count = candidates.len(), "search results parsed");
        Ok(candidates)
    }

    /// Fail-soft search: errors are logged and produce an empty list.
    pub async fn search(&self, query: &str, category: MediaCategory) -> Vec<SearchCandidate> {
        match self.try_search(query, category).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(query, %category, error = %e, "search failed");
                Vec::new()
            }
        }
    }
}

/// Reduces a listing page to candidates. Entries without a usable title link
/// are skipped and do not count towards `limit`.
pub fn parse_search_html(html: &str, page_url: &str, limit: usize) -> Result<Vec<SearchCandidate>> {
    let result_selector = parse_selector(".result")?;
    let link_selector = parse_selector(".title a")?;
    let base = Url::parse(page_url).ok();

    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for entry in document.select(&result_selector) {
        if out.len() >= limit {
            break;
        }
        let Some(link) = entry.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href").map(str::trim).filter(|h| !h.is_empty())
        else {
            continue;
        };
        let title = element_text(&link);
        if title.is_empty() {
            continue;
        }

        let absolute = match &base {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        };
        let detail_ref = unwrap_redirect(&absolute);
        let source_id = subject_id(&detail_ref).or_else(|| {
            link.value()
                .attr("onclick")
                .and_then(onclick_subject_id)
        });

        out.push(SearchCandidate {
            title,
            detail_ref,
            source_id,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const FIXTURE: &str = include_str!("fixtures/search_movie.html");

    fn listing(entries: usize) -> String {
        let mut html = String::from("<html><body>");
        for i in 0..entries {
            html.push_str(&format!(
                r#"<div class="result"><div class="title"><h3><a href="https://movie.douban.com/subject/{id}/">Entry {i}</a></h3></div></div>"#,
                id = 1000 + i
            ));
        }
        html.push_str("</body></html>");
        html
    }

    fn resolver_for(server: &Server) -> SearchResolver {
        let mut config = ScrapeConfig::default();
        config.search_base_url = server.url();
        SearchResolver::new(config).unwrap()
    }

    #[test]
    fn parses_saved_search_fixture() {
        let results =
            parse_search_html(FIXTURE, "https://www.douban.com/search?cat=1002&q=x", 5).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "肖申克的救赎");
        assert_eq!(results[0].detail_ref, "https://movie.douban.com/subject/1292052/");
        assert_eq!(results[0].source_id.as_deref(), Some("1292052"));
        assert_eq!(results[1].source_id.as_deref(), Some("26759539"));
        assert_eq!(results[2].detail_ref, "https://movie.douban.com/subject/35405893/");
    }

    #[test]
    fn twelve_entries_cap_at_five_in_order() {
        let results = parse_search_html(&listing(12), "https://www.douban.com/search", 5).unwrap();
        let titles: Vec<_> = results.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Entry 0", "Entry 1", "Entry 2", "Entry 3", "Entry 4"]);
    }

    #[test]
    fn entries_without_links_do_not_count() {
        let html = format!(
            r#"<div class="result"><div class="title"><h3>no link</h3></div></div>{}"#,
            listing(6)
        );
        let results = parse_search_html(&html, "https://www.douban.com/search", 5).unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0].title, "Entry 0");
    }

    #[test]
    fn relative_links_resolve_against_page() {
        let html = r#"<div class="result"><div class="title"><a href="/subject/7/">Rel</a></div></div>"#;
        let results = parse_search_html(html, "https://movie.douban.com/search?q=x", 5).unwrap();
        assert_eq!(results[0].detail_ref, "https://movie.douban.com/subject/7/");
        assert_eq!(results[0].source_id.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn search_sends_category_code_and_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cat".to_string(), "1001".to_string()),
                Matcher::UrlEncoded("q".to_string(), "活着".to_string()),
            ]))
            .with_status(200)
            .with_body(listing(12))
            .expect(1)
            .create_async()
            .await;

        let resolver = resolver_for(&server);
        let results = resolver.try_search(" 活着 ", MediaCategory::Book).await.unwrap();
        assert_eq!(results.len(), 5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_query_makes_no_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let resolver = resolver_for(&server);
        assert!(resolver.search("   ", MediaCategory::Movie).await.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failed_search_is_soft() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let resolver = resolver_for(&server);
        assert!(resolver.try_search("x", MediaCategory::Music).await.is_err());
        assert!(resolver.search("x", MediaCategory::Music).await.is_empty());
    }
}
