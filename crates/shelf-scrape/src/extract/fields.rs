//! Field-level helpers shared by the category extractors.
//!
//! Every helper is absence-tolerant: a missing node or label yields `None`
//! (or an empty list), never an error. Errors are reserved for malformed
//! selectors.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{Result, ScrapeError};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid regex"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));

pub(crate) fn parse_selector(input: &str) -> Result<Selector> {
    Selector::parse(input).map_err(|e| ScrapeError::Parse(format!("invalid selector {input}: {e}")))
}

pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn non_empty(value: impl AsRef<str>) -> Option<String> {
    let value = value.as_ref().trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// First run of four digits, e.g. `"(1994年)"` → 1994.
pub fn parse_year(text: &str) -> Option<i32> {
    YEAR_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

pub fn parse_rating(text: &str) -> Option<f32> {
    NUMBER_RE
        .find(text.trim())
        .and_then(|m| m.as_str().parse().ok())
}

pub fn parse_count(text: &str) -> Option<u32> {
    text.trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}

/// Value of the first `label: value` line in `info`. Both ASCII and
/// full-width colons are accepted; the value runs to the end of the line.
pub fn labeled_value(info: &str, label: &str) -> Option<String> {
    info.lines().find_map(|line| {
        let rest = line.trim().strip_prefix(label)?.trim_start();
        let value = rest.strip_prefix(':').or_else(|| rest.strip_prefix('：'))?;
        non_empty(value)
    })
}

/// Text of an element with `<br>` rendered as line breaks.
fn block_text(element: &ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn is_label_for(pl: &ElementRef<'_>, label: &str) -> bool {
    let text = element_text(pl);
    let Some(rest) = text.strip_prefix(label) else {
        return false;
    };
    let rest = rest.trim_start();
    rest.is_empty() || rest.starts_with(':') || rest.starts_with('：')
}

/// A parsed detail page plus its `#info` block as plain lines.
pub struct DetailPage {
    document: Html,
    info: String,
}

impl DetailPage {
    pub fn parse(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let info_selector = parse_selector("#info")?;
        let info = document
            .select(&info_selector)
            .next()
            .map(|el| block_text(&el))
            .unwrap_or_default();
        Ok(Self { document, info })
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn labeled(&self, label: &str) -> Option<String> {
        labeled_value(&self.info, label)
    }

    pub fn first_text(&self, css: &str) -> Result<Option<String>> {
        let selector = parse_selector(css)?;
        Ok(self
            .document
            .select(&selector)
            .next()
            .and_then(|el| non_empty(element_text(&el))))
    }

    pub fn first_attr(&self, css: &str, attr: &str) -> Result<Option<String>> {
        let selector = parse_selector(css)?;
        Ok(self
            .document
            .select(&selector)
            .find_map(|el| el.value().attr(attr).and_then(non_empty)))
    }

    /// Non-empty texts of all matches, in document order.
    pub fn all_texts(&self, css: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let selector = parse_selector(css)?;
        let texts = self
            .document
            .select(&selector)
            .map(|el| element_text(&el))
            .filter(|t| !t.is_empty())
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Ok(texts)
    }

    /// Texts of `item_css` matches inside the first `container_css` match.
    pub fn texts_within(&self, container_css: &str, item_css: &str) -> Result<Vec<String>> {
        let container_selector = parse_selector(container_css)?;
        let item_selector = parse_selector(item_css)?;
        let Some(container) = self.document.select(&container_selector).next() else {
            return Ok(Vec::new());
        };
        Ok(container
            .select(&item_selector)
            .map(|el| element_text(&el))
            .filter(|t| !t.is_empty())
            .collect())
    }

    pub fn joined(&self, css: &str, limit: Option<usize>) -> Result<Option<String>> {
        Ok(non_empty(self.all_texts(css, limit)?.join(" / ")))
    }

    /// Value attached to a `span.pl` label in `#info` as markup rather than
    /// plain text: links inside the label, an `.attrs` span in the same
    /// wrapper, or the links that follow the label up to the next `<br>`.
    pub fn linked_label(&self, label: &str) -> Result<Option<String>> {
        let pl_selector = parse_selector("#info span.pl")?;
        let link_selector = parse_selector("a")?;
        let attrs_selector = parse_selector(".attrs")?;

        let Some(pl) = self
            .document
            .select(&pl_selector)
            .find(|pl| is_label_for(pl, label))
        else {
            return Ok(None);
        };

        let link_texts = |scope: &ElementRef<'_>| {
            scope
                .select(&link_selector)
                .map(|a| element_text(&a))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
        };

        let inside = link_texts(&pl);
        if !inside.is_empty() {
            return Ok(non_empty(inside.join(" / ")));
        }

        if let Some(wrapper) = pl.parent().and_then(ElementRef::wrap)
            && wrapper.value().name() == "span"
        {
            if let Some(attrs) = wrapper.select(&attrs_selector).next() {
                return Ok(non_empty(element_text(&attrs)));
            }
            return Ok(non_empty(link_texts(&wrapper).join(" / ")));
        }

        let mut following = Vec::new();
        for sibling in pl.next_siblings().filter_map(ElementRef::wrap) {
            match sibling.value().name() {
                "br" => break,
                "a" => following.push(element_text(&sibling)),
                _ => {}
            }
        }
        Ok(non_empty(following.join(" / ")))
    }
}
