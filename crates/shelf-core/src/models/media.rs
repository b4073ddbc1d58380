use serde::{Deserialize, Serialize};

/// The kind of work a catalogue entry describes.
///
/// This is the only dispatch key for detail extraction: every category owns
/// exactly one extractor and one search code on the catalogue site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Movie,
    Book,
    Music,
}

impl MediaCategory {
    pub const ALL: [MediaCategory; 3] = [Self::Movie, Self::Book, Self::Music];

    /// Numeric `cat` parameter understood by the catalogue's search page.
    pub fn search_code(self) -> u32 {
        match self {
            Self::Book => 1001,
            Self::Movie => 1002,
            Self::Music => 1003,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Book => "book",
            Self::Music => "music",
        }
    }
}

impl std::fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for MediaCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "film" => Ok(Self::Movie),
            "book" => Ok(Self::Book),
            "music" | "album" => Ok(Self::Music),
            _ => Err(format!("Invalid MediaCategory: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_codes() {
        assert_eq!(MediaCategory::Book.search_code(), 1001);
        assert_eq!(MediaCategory::Movie.search_code(), 1002);
        assert_eq!(MediaCategory::Music.search_code(), 1003);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("movie".parse::<MediaCategory>().unwrap(), MediaCategory::Movie);
        assert_eq!(" Book ".parse::<MediaCategory>().unwrap(), MediaCategory::Book);
        assert!("podcast".parse::<MediaCategory>().is_err());
    }

    #[test]
    fn test_category_display_roundtrip() {
        for category in MediaCategory::ALL {
            assert_eq!(category.to_string().parse::<MediaCategory>().unwrap(), category);
        }
    }
}
