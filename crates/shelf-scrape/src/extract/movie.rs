use once_cell::sync::Lazy;
use regex::Regex;
use shelf_core::MediaCategory;

use super::fields::{non_empty, parse_year, DetailPage};
use super::DetailExtractor;
use crate::error::Result;
use crate::types::DetailRecord;

static IMDB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"IMDb\s*[:：][^\w\n]*(\w+)").expect("valid regex"));

pub struct MovieExtractor {
    cast_limit: usize,
}

impl MovieExtractor {
    pub fn new(cast_limit: usize) -> Self {
        Self { cast_limit }
    }
}

impl DetailExtractor for MovieExtractor {
    fn category(&self) -> MediaCategory {
        MediaCategory::Movie
    }

    fn extract(&self, page: &DetailPage, record: &mut DetailRecord) -> Result<()> {
        record.director = match page.linked_label("导演")? {
            Some(director) => Some(director),
            None => page.joined(r#"a[rel="v:directedBy"]"#, None)?,
        };
        record.cast = page.joined("span.actor .attrs a", Some(self.cast_limit))?;
        record.year = page.first_text(".year")?.and_then(|y| parse_year(&y));
        record.summary = page.first_text(r#"span[property="v:summary"]"#)?;
        record.imdb_id = IMDB_RE
            .captures(page.info())
            .and_then(|c| c.get(1))
            .and_then(|m| non_empty(m.as_str()));
        record.country = page.labeled("制片国家/地区");
        record.genres = page.joined(r#"span[property="v:genre"]"#, None)?;
        record.duration = match page.first_text(r#"span[property="v:runtime"]"#)? {
            Some(runtime) => Some(runtime),
            None => page.labeled("片长"),
        };
        Ok(())
    }
}
