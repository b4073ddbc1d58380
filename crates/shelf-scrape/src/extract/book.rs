use shelf_core::MediaCategory;

use super::fields::{non_empty, parse_count, parse_year, DetailPage};
use super::DetailExtractor;
use crate::error::Result;
use crate::types::DetailRecord;

pub struct BookExtractor;

impl DetailExtractor for BookExtractor {
    fn category(&self) -> MediaCategory {
        MediaCategory::Book
    }

    fn extract(&self, page: &DetailPage, record: &mut DetailRecord) -> Result<()> {
        record.author = match page.linked_label("作者")? {
            Some(author) => Some(author),
            None => page.labeled("作者"),
        };
        record.translator = match page.linked_label("译者")? {
            Some(translator) => Some(translator),
            None => page.labeled("译者"),
        };
        record.isbn = page.labeled("ISBN");
        record.publisher = match page.labeled("出版社") {
            Some(publisher) => Some(publisher),
            None => page.linked_label("出版社")?,
        };
        record.pages = page.labeled("页数").and_then(|p| parse_count(&p));
        record.pub_date = page.labeled("出版年");
        record.year = record.pub_date.as_deref().and_then(parse_year);
        // Long intros come twice: a folded copy and the full text. The first
        // block is the one shown by default.
        record.summary = non_empty(page.texts_within(".intro", "p")?.join("\n"));
        Ok(())
    }
}
