use serde::{Deserialize, Serialize};

use super::MediaCategory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    #[default]
    Wish,
    Doing,
    Done,
}

impl CollectionStatus {
    pub const ALL: [CollectionStatus; 3] = [Self::Wish, Self::Doing, Self::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wish => "wish",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    /// Catalogue-style label for a status, worded for the item's category.
    pub fn label(self, category: MediaCategory) -> &'static str {
        match (self, category) {
            (Self::Wish, MediaCategory::Movie) => "想看",
            (Self::Wish, MediaCategory::Book) => "想读",
            (Self::Wish, MediaCategory::Music) => "想听",
            (Self::Doing, MediaCategory::Movie) => "在看",
            (Self::Doing, MediaCategory::Book) => "在读",
            (Self::Doing, MediaCategory::Music) => "在听",
            (Self::Done, MediaCategory::Movie) => "看过",
            (Self::Done, MediaCategory::Book) => "读过",
            (Self::Done, MediaCategory::Music) => "听过",
        }
    }
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for CollectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wish" => Ok(Self::Wish),
            "doing" => Ok(Self::Doing),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid CollectionStatus: {s}")),
        }
    }
}
