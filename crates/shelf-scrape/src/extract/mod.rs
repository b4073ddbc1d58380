//! Category extractors and the registry that picks one per detail page.

pub mod book;
pub mod fields;
pub mod movie;
pub mod music;

use std::collections::HashMap;

use shelf_core::MediaCategory;

use crate::error::{Result, ScrapeError};
use crate::identifiers::subject_id;
use crate::types::DetailRecord;

pub use book::BookExtractor;
pub use fields::{labeled_value, parse_year, DetailPage};
pub use movie::MovieExtractor;
pub use music::MusicExtractor;

/// Fills the category-specific fields of a record from a parsed page.
pub trait DetailExtractor: Send + Sync {
    fn category(&self) -> MediaCategory;

    fn extract(&self, page: &DetailPage, record: &mut DetailRecord) -> Result<()>;
}

/// Fields every detail page shares regardless of category.
fn extract_common(page: &DetailPage, record: &mut DetailRecord) -> Result<()> {
    record.title = page.first_text(r#"h1 span[property="v:itemreviewed"]"#)?;
    record.cover_url = page.first_attr("#mainpic img", "src")?;
    record.douban_rating = page
        .first_text(".rating_num")?
        .and_then(|t| fields::parse_rating(&t));
    Ok(())
}

/// One extractor per category, chosen by the category alone.
pub struct ExtractorRegistry {
    extractors: HashMap<MediaCategory, Box<dyn DetailExtractor>>,
}

impl ExtractorRegistry {
    pub fn new(cast_limit: usize) -> Self {
        let mut registry = Self {
            extractors: HashMap::new(),
        };
        registry.register(Box::new(MovieExtractor::new(cast_limit)));
        registry.register(Box::new(BookExtractor));
        registry.register(Box::new(MusicExtractor));
        registry
    }

    /// Replaces any extractor already registered for the same category.
    pub fn register(&mut self, extractor: Box<dyn DetailExtractor>) {
        self.extractors.insert(extractor.category(), extractor);
    }

    pub fn get(&self, category: MediaCategory) -> Option<&dyn DetailExtractor> {
        self.extractors.get(&category).map(|e| &**e)
    }

    /// Parses `html` and runs the common fields plus the extractor for
    /// `category`. Nothing else runs, whatever markup the page carries.
    pub fn extract(
        &self,
        category: MediaCategory,
        html: &str,
        detail_url: Option<&str>,
    ) -> Result<DetailRecord> {
        let extractor = self
            .get(category)
            .ok_or_else(|| ScrapeError::Parse(format!("no extractor registered for {category}")))?;

        let page = DetailPage::parse(html)?;
        let mut record = DetailRecord::empty(category);
        extract_common(&page, &mut record)?;
        extractor.extract(&page, &mut record)?;

        record.detail_url = detail_url.map(str::to_string);
        record.source_id = detail_url.and_then(subject_id);
        Ok(record)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new(5)
    }
}
