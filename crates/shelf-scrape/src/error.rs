use shelf_core::ShelfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// A detail reference whose host matches no category route.
    #[error("unrecognised detail reference: {0}")]
    MalformedReference(String),

    #[error("empty response body from {0}")]
    EmptyBody(String),

    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("detail page has no title")]
    MissingTitle,

    #[error(transparent)]
    Storage(#[from] ShelfError),
}

impl ScrapeError {
    /// Network-side failures a caller may retry later, as opposed to pages
    /// that simply carry no usable data.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Status { .. } | Self::EmptyBody(_))
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let status = ScrapeError::Status {
            url: "https://movie.douban.com/subject/1/".into(),
            status: 503,
        };
        assert!(status.is_transient());
        assert!(!ScrapeError::MissingTitle.is_transient());
        assert!(!ScrapeError::MalformedReference("ftp://x".into()).is_transient());
    }
}
