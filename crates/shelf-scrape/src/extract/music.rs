use shelf_core::MediaCategory;

use super::fields::{parse_year, DetailPage};
use super::DetailExtractor;
use crate::error::Result;
use crate::types::DetailRecord;

pub struct MusicExtractor;

impl DetailExtractor for MusicExtractor {
    fn category(&self) -> MediaCategory {
        MediaCategory::Music
    }

    fn extract(&self, page: &DetailPage, record: &mut DetailRecord) -> Result<()> {
        record.performer = match page.linked_label("表演者")? {
            Some(performer) => Some(performer),
            None => page.labeled("表演者"),
        };
        record.genre = page.labeled("流派");
        record.media_format = page.labeled("介质");
        record.release_date = page.labeled("发行时间");
        record.year = record.release_date.as_deref().and_then(parse_year);
        record.summary = page.first_text(r#"span[property="v:summary"]"#)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../fixtures/music_detail.html");

    #[test]
    fn parses_saved_detail_fixture() {
        let page = DetailPage::parse(FIXTURE).unwrap();
        let mut record = DetailRecord::empty(MediaCategory::Music);
        MusicExtractor.extract(&page, &mut record).unwrap();

        assert_eq!(record.performer.as_deref(), Some("周杰伦"));
        assert_eq!(record.genre.as_deref(), Some("流行"));
        assert_eq!(record.media_format.as_deref(), Some("CD"));
        assert_eq!(record.release_date.as_deref(), Some("2001-09-20"));
        assert_eq!(record.year, Some(2001));
        assert!(record.summary.is_some());
        assert!(record.imdb_id.is_none());
    }
}
