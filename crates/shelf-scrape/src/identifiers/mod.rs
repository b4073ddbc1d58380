pub mod isbn;
pub mod subject;

pub use isbn::Isbn;
pub use subject::{onclick_subject_id, subject_id, unwrap_redirect};
