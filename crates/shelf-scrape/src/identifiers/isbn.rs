use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

/// A checksum-validated ISBN, always available in its 13-digit form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Isbn {
    pub isbn13: String,
    pub isbn10: Option<String>,
}

fn strip_isbn(input: &str) -> String {
    input
        .trim()
        .trim_start_matches("ISBN")
        .trim_start_matches("isbn")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

fn isbn13_check_digit(first12: &[u32]) -> u32 {
    let sum: u32 = first12
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10
}

fn isbn10_check_char(first9: &[u32]) -> char {
    let sum: u32 = first9
        .iter()
        .enumerate()
        .map(|(i, d)| (10 - i as u32) * d)
        .sum();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

fn digits_to_string(digits: &[u32]) -> String {
    digits
        .iter()
        .filter_map(|d| char::from_digit(*d, 10))
        .collect()
}

impl Isbn {
    pub fn parse(input: &str) -> Result<Self> {
        let stripped = strip_isbn(input);
        let invalid = || ScrapeError::InvalidIsbn(input.trim().to_string());

        match stripped.len() {
            13 => {
                let digits = stripped
                    .chars()
                    .map(|c| c.to_digit(10))
                    .collect::<Option<Vec<u32>>>()
                    .ok_or_else(invalid)?;
                if isbn13_check_digit(&digits[..12]) != digits[12] {
                    return Err(invalid());
                }
                // Only the 978 prefix has a 10-digit equivalent.
                let isbn10 = stripped.starts_with("978").then(|| {
                    let body = &digits[3..12];
                    let mut s = digits_to_string(body);
                    s.push(isbn10_check_char(body));
                    s
                });
                Ok(Self {
                    isbn13: stripped,
                    isbn10,
                })
            }
            10 => {
                let body = stripped[..9]
                    .chars()
                    .map(|c| c.to_digit(10))
                    .collect::<Option<Vec<u32>>>()
                    .ok_or_else(invalid)?;
                let check = stripped.chars().last().ok_or_else(invalid)?;
                if isbn10_check_char(&body) != check {
                    return Err(invalid());
                }
                let mut first12 = vec![9, 7, 8];
                first12.extend_from_slice(&body);
                let check13 = isbn13_check_digit(&first12);
                let mut isbn13 = digits_to_string(&first12);
                isbn13.push(char::from_digit(check13, 10).unwrap_or('0'));
                Ok(Self {
                    isbn13,
                    isbn10: Some(stripped),
                })
            }
            _ => Err(invalid()),
        }
    }

    /// ISBN-13 form when `raw` validates, otherwise the trimmed input.
    pub fn normalize(raw: &str) -> String {
        Self::parse(raw)
            .map(|isbn| isbn.isbn13)
            .unwrap_or_else(|_| raw.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_isbn13() {
        let isbn = Isbn::parse("9787506365437").unwrap();
        assert_eq!(isbn.isbn13, "9787506365437");
        assert_eq!(isbn.isbn10.as_deref(), Some("750636543X"));
    }

    #[test]
    fn isbn13_with_hyphens() {
        let isbn = Isbn::parse("978-0-306-40615-7").unwrap();
        assert_eq!(isbn.isbn13, "9780306406157");
    }

    #[test]
    fn isbn10_converts_to_isbn13() {
        let isbn = Isbn::parse("0306406152").unwrap();
        assert_eq!(isbn.isbn13, "9780306406157");
        assert_eq!(isbn.isbn10.as_deref(), Some("0306406152"));
    }

    #[test]
    fn isbn10_with_x_check() {
        let isbn = Isbn::parse("080442957X").unwrap();
        assert_eq!(isbn.isbn10.as_deref(), Some("080442957X"));
        assert_eq!(isbn.isbn13, "9780804429573");
    }

    #[test]
    fn invalid_check_digit() {
        assert!(Isbn::parse("9780306406158").is_err());
        assert!(Isbn::parse("12345").is_err());
    }

    #[test]
    fn normalize_keeps_unparseable_input() {
        assert_eq!(Isbn::normalize("ISBN 0-306-40615-2"), "9780306406157");
        assert_eq!(Isbn::normalize(" 统一书号 10019 "), "统一书号 10019");
    }
}
