use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

static SUBJECT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:sid/|/subject/)(\d+)").expect("valid regex"));
static ONCLICK_SID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sid\s*:\s*'?(\d+)").expect("valid regex"));

/// Numeric catalogue id carried by a detail or search link.
pub fn subject_id(reference: &str) -> Option<String> {
    SUBJECT_ID_RE
        .captures(reference)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Numeric id from a search entry's `onclick` tracking payload.
pub fn onclick_subject_id(onclick: &str) -> Option<String> {
    ONCLICK_SID_RE
        .captures(onclick)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Search listings wrap detail links as `/link2/?url=<encoded>`. Returns the
/// wrapped URL, or the input unchanged when it is not a redirect.
pub fn unwrap_redirect(href: &str) -> String {
    let Ok(url) = Url::parse(href) else {
        return href.to_string();
    };
    if !url.path().starts_with("/link2") {
        return href.to_string();
    }
    url.query_pairs()
        .find(|(k, _)| k == "url")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| href.to_string())
}
