use std::path::{Path, PathBuf};

use serde::Serialize;
use shelf_core::{CollectionItem, Database, DuplicatePolicy};
use tracing::{debug, info};

use crate::assemble::{assemble, assemble_from_detail};
use crate::config::ScrapeConfig;
use crate::cover::{CoverCache, CoverKey};
use crate::detail::DetailNormalizer;
use crate::error::Result;
use crate::http::CatalogueClient;
use crate::search::SearchResolver;
use crate::types::{DetailRecord, SearchCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ImportOutcome {
    Created { id: i64 },
    /// The catalogue entry was already stored; its catalogue fields were refreshed.
    Updated { id: i64 },
    /// The catalogue entry was already stored and the policy forbids touching it.
    Rejected { existing_id: i64 },
}

impl ImportOutcome {
    pub fn id(&self) -> i64 {
        match *self {
            Self::Created { id } | Self::Updated { id } => id,
            Self::Rejected { existing_id } => existing_id,
        }
    }
}

/// Search → detail → cover → assembly → storage.
pub struct Importer<'a> {
    db: &'a Database,
    search: SearchResolver,
    detail: DetailNormalizer,
    covers: CoverCache,
    policy: DuplicatePolicy,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a Database, config: ScrapeConfig, policy: DuplicatePolicy) -> Result<Self> {
        let client = CatalogueClient::new(&config)?;
        Ok(Self {
            db,
            covers: CoverCache::with_client(&config, client.clone()),
            search: SearchResolver::with_client(config.clone(), client.clone()),
            detail: DetailNormalizer::with_client(config, client),
            policy,
        })
    }

    pub fn search(&self) -> &SearchResolver {
        &self.search
    }

    pub async fn import_candidate(&self, candidate: &SearchCandidate) -> Result<ImportOutcome> {
        let detail = self.detail.fetch_detail(&candidate.detail_ref).await?;
        let source_id = candidate
            .source_id
            .as_deref()
            .or(detail.source_id.as_deref());
        let cover = self.fetch_cover(&detail, source_id).await;
        let item = assemble(candidate, &detail, cover.as_deref());
        self.store(item)
    }

    pub async fn import_url(&self, url: &str) -> Result<ImportOutcome> {
        let detail = self.detail.fetch_detail(url).await?;
        let cover = self.fetch_cover(&detail, detail.source_id.as_deref()).await;
        let item = assemble_from_detail(&detail, cover.as_deref())?;
        self.store(item)
    }

    async fn fetch_cover(&self, detail: &DetailRecord, source_id: Option<&str>) -> Option<PathBuf> {
        let key = CoverKey::select(detail.isbn.as_deref(), detail.imdb_id.as_deref(), source_id);
        self.covers
            .resolve_soft(detail.cover_url.as_deref(), key.as_deref())
            .await
    }

    fn store(&self, item: CollectionItem) -> Result<ImportOutcome> {
        let existing = match item.source_id.as_deref() {
            Some(source_id) => self.db.find_by_source_id(source_id)?,
            None => None,
        };

        let Some(mut existing) = existing else {
            let id = self.db.insert_item(&item)?;
            info!(id, title = %item.title, media_type = %item.media_type, "item imported");
            return Ok(ImportOutcome::Created { id });
        };

        let id = existing.id.unwrap_or_default();
        match self.policy {
            DuplicatePolicy::Reject => {
                info!(existing_id = id, source_id = ?item.source_id, "import rejected, already stored");
                Ok(ImportOutcome::Rejected { existing_id: id })
            }
            DuplicatePolicy::Update => {
                existing.refresh_catalogue_fields(&item);
                self.db.update_item(&existing)?;
                info!(id, title = %existing.title, "stored item refreshed");
                Ok(ImportOutcome::Updated { id })
            }
        }
    }

    /// Re-resolves a missing cover: relinks an existing cache file when one
    /// matches, otherwise downloads it again. Returns the cover path now
    /// stored, if any.
    pub async fn refresh_cover(&self, id: i64) -> Result<Option<PathBuf>> {
        let item = self.db.get_item(id)?;
        if let Some(current) = item.local_cover_path.as_deref()
            && Path::new(current).is_file()
        {
            debug!(id, path = current, "cover present, nothing to refresh");
            return Ok(Some(PathBuf::from(current)));
        }

        let key = CoverKey::select(
            item.isbn.as_deref(),
            item.imdb_id.as_deref(),
            item.source_id.as_deref(),
        );
        let url = item.cover_url.as_deref();
        let path = match self.covers.cached_path(url, key.as_deref()) {
            Some(path) => {
                info!(id, path = %path.display(), "cover relinked from cache");
                Some(path)
            }
            None => self.covers.resolve(url, key.as_deref()).await?,
        };

        if let Some(path) = &path {
            self.db.set_cover_path(id, Some(&path.to_string_lossy()))?;
        } else if item.local_cover_path.is_some() {
            self.db.set_cover_path(id, None)?;
        }
        Ok(path)
    }
}
