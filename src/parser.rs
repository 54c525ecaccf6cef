//! Search-result page parsing.
//!
//! Turns one rendered results page into the new [`Record`]s it contains.
//! Records whose `scholar_link` is already known are skipped here; the
//! caller owns the identity set and commits new identities after merging.

use crate::extract::{extract_citations, extract_doi, extract_year};
use crate::record::Record;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info};

lazy_static! {
    static ref CONTAINER: Selector = Selector::parse("div#gs_res_ccl_mid").expect("container selector");
    static ref RESULT: Selector = Selector::parse("div.gs_ri").expect("result selector");
    static ref ANCHOR: Selector = Selector::parse("a").expect("anchor selector");
    static ref BYLINE: Selector = Selector::parse("div.gs_a").expect("byline selector");
    static ref SNIPPET: Selector = Selector::parse("div.gs_rs").expect("snippet selector");
    static ref DOCUMENT_LINK: Selector = Selector::parse("div.gs_or_ggsm a").expect("document link selector");
    static ref STATS: Selector = Selector::parse("div.gs_fl").expect("stats selector");
}

/// Byline separator between authors, venue and publisher
const BYLINE_SEPARATOR: &str = " - ";

/// What a results page yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// No results container: the engine served something other than results.
    NoContainer,
    /// Container present but empty: past the last page.
    NoResults,
    /// Result blocks were found; `records` holds the ones not already known.
    Results {
        /// Number of result blocks on the page, including skipped ones
        fragments: usize,
        records: Vec<Record>,
    },
}

impl PageOutcome {
    /// Whether pagination should stop here.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PageOutcome::Results { .. })
    }

    /// New records, in page order.
    pub fn into_records(self) -> Vec<Record> {
        match self {
            PageOutcome::Results { records, .. } => records,
            _ => Vec::new(),
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn href(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("href")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}

/// Direct document link (PDF/HTML badge) offered next to a result.
///
/// The badge sits in a sibling column of the text block on live pages, so
/// the enclosing result block is searched when the fragment has none.
fn document_link(fragment: ElementRef<'_>) -> Option<String> {
    fragment
        .select(&DOCUMENT_LINK)
        .next()
        .or_else(|| {
            fragment
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|block| block.select(&DOCUMENT_LINK).next())
        })
        .and_then(href)
}

/// Split a byline into the authors segment and everything after it.
fn split_byline(byline: &str) -> (String, String) {
    match byline.split_once(BYLINE_SEPARATOR) {
        Some((authors, rest)) => (authors.trim().to_string(), rest.trim().to_string()),
        None => (byline.trim().to_string(), String::new()),
    }
}

/// Parse one result fragment (`div.gs_ri`) into a candidate record.
///
/// Returns `None` for a fragment without a usable link, and for one whose
/// link is already in `known`.
pub fn parse_search_result(
    fragment: ElementRef<'_>,
    page_index: u32,
    order_in_page: u32,
    known: &HashSet<String>,
) -> Option<Record> {
    let anchor = fragment.select(&ANCHOR).next()?;
    let scholar_link = match href(anchor) {
        Some(link) => link,
        None => {
            debug!(page = page_index, order = order_in_page, "Result without link, skipping");
            return None;
        }
    };

    if known.contains(&scholar_link) {
        debug!(link = %scholar_link, "Skipping already scraped link");
        return None;
    }

    let title = element_text(anchor).trim().to_string();

    // Live pages put non-breaking spaces around the separator
    let byline = fragment
        .select(&BYLINE)
        .next()
        .map(element_text)
        .unwrap_or_default()
        .replace('\u{a0}', " ");
    let (authors, publication_info) = split_byline(&byline);
    let year = extract_year(&byline);

    let abstract_text = fragment
        .select(&SNIPPET)
        .next()
        .map(|s| element_text(s).trim().to_string())
        .filter(|s| !s.is_empty());

    let link = document_link(fragment).unwrap_or_else(|| scholar_link.clone());
    let doi = extract_doi(&link);
    let citations = extract_citations(fragment.select(&STATS).next());

    Some(Record {
        page_index,
        order_in_page,
        title,
        year,
        authors,
        publication_info,
        abstract_text,
        link,
        doi,
        citations,
        scholar_link,
        author_keywords: None,
    })
}

/// Parse a rendered results page.
///
/// `order_in_page` is the 1-based position among all result blocks on the
/// page, so skipped duplicates still consume their slot. A link repeated
/// within the page is kept only at its first position.
pub fn parse_page(html: &str, page_index: u32, known: &HashSet<String>) -> PageOutcome {
    let document = Html::parse_document(html);

    let container = match document.select(&CONTAINER).next() {
        Some(container) => container,
        None => {
            info!(page = page_index, "Could not find results container");
            return PageOutcome::NoContainer;
        }
    };

    let fragments: Vec<ElementRef<'_>> = container.select(&RESULT).collect();
    if fragments.is_empty() {
        info!(page = page_index, "No results found on page");
        return PageOutcome::NoResults;
    }

    let mut taken: HashSet<String> = HashSet::new();
    let records: Vec<Record> = fragments
        .iter()
        .zip(1u32..)
        .filter_map(|(fragment, order)| parse_search_result(*fragment, page_index, order, known))
        .filter(|record| {
            let first = taken.insert(record.scholar_link.clone());
            if !first {
                debug!(link = %record.scholar_link, "Link repeated on page, skipping");
            }
            first
        })
        .collect();

    info!(
        page = page_index,
        fragments = fragments.len(),
        new = records.len(),
        "Parsed page"
    );

    PageOutcome::Results {
        fragments: fragments.len(),
        records,
    }
}
