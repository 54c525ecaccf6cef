//! Field extractors for search-result snippets.
//!
//! Pure functions: each maps a piece of text or one markup fragment to a
//! single typed field, and yields `None` when the field is not there.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Selector};

lazy_static! {
    static ref YEAR_REGEX: Regex = Regex::new(r"\b[0-9]{4}\b").expect("year regex");
    // English ("Cited by X") and Chinese ("被引用 X 次") interfaces
    static ref CITED_BY_REGEX: Regex =
        Regex::new(r"(?:Cited by\s*|被引用\s*)([0-9]+)").expect("citation regex");
    static ref DOI_REGEX: Regex =
        Regex::new(r"(?i)10\.[0-9]{4,9}/[-._;()/:A-Z0-9]+").expect("doi regex");
    static ref CITES_LINK: Selector = Selector::parse(r#"a[href*="cites="]"#).expect("cites selector");
}

/// First standalone run of four digits, read left to right.
///
/// No calendar validation: a page number like `1234` is returned as is.
pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_REGEX
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// Citation count from the stats fragment under a result.
///
/// Only links pointing at a citing-documents listing (`cites=`) are
/// considered; their text must read `Cited by N`.
pub fn extract_citations(fragment: Option<ElementRef<'_>>) -> Option<u32> {
    let fragment = fragment?;

    fragment.select(&CITES_LINK).find_map(|link| {
        let text = link.text().collect::<String>();
        CITED_BY_REGEX
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|count| count.as_str().parse().ok())
    })
}

/// First DOI-shaped substring of a URL or free text.
pub fn extract_doi(text: &str) -> Option<String> {
    DOI_REGEX.find(text).map(|m| m.as_str().to_string())
}
