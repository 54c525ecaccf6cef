//! Detail-page enrichment.
//!
//! The search snippet only carries a truncated abstract and rarely a DOI.
//! When enabled, each new record's `link` is fetched and probed for a full
//! abstract, author keywords and a DOI. Every step here is best effort.

use crate::extract::extract_doi;
use crate::fetch::Fetcher;
use crate::record::Record;
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// What a probe reads off the matched element.
#[derive(Debug, Clone, Copy)]
enum Capture {
    Text,
    Attr(&'static str),
    /// Attribute value, kept only if it contains a DOI
    DoiIn(&'static str),
    DoiInText,
}

struct Probe {
    selector: Selector,
    capture: Capture,
}

impl Probe {
    fn new(css: &str, capture: Capture) -> Self {
        Self {
            selector: Selector::parse(css).expect("probe selector"),
            capture,
        }
    }

    fn run(&self, document: &Html) -> Option<String> {
        let element = document.select(&self.selector).next()?;
        let value = match self.capture {
            Capture::Text => Some(squash_whitespace(&element)),
            Capture::Attr(name) => element.value().attr(name).map(|v| v.trim().to_string()),
            Capture::DoiIn(name) => element.value().attr(name).and_then(extract_doi),
            Capture::DoiInText => extract_doi(&squash_whitespace(&element)),
        };
        value.filter(|v| !v.is_empty())
    }
}

lazy_static! {
    static ref ABSTRACT_PROBES: Vec<Probe> = vec![
        Probe::new("div.abstract", Capture::Text),
        Probe::new("div#abstract", Capture::Text),
        Probe::new("section.abstract", Capture::Text),
        Probe::new(r#"meta[name="citation_abstract"]"#, Capture::Attr("content")),
    ];
    static ref KEYWORD_PROBES: Vec<Probe> = vec![
        Probe::new("div.keywords", Capture::Text),
        Probe::new("div#keywords", Capture::Text),
        Probe::new(r#"meta[name="keywords"]"#, Capture::Attr("content")),
        Probe::new(r#"meta[name="citation_keywords"]"#, Capture::Attr("content")),
    ];
    static ref DOI_PROBES: Vec<Probe> = vec![
        Probe::new(r#"a[href*="doi.org"]"#, Capture::DoiIn("href")),
        Probe::new(r#"meta[name="citation_doi"]"#, Capture::DoiIn("content")),
        Probe::new(r#"meta[name="dc.identifier"]"#, Capture::DoiIn("content")),
        Probe::new("span.doi", Capture::DoiInText),
    ];
}

/// Fields recovered from a document's own page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub abstract_text: Option<String>,
    pub author_keywords: Option<String>,
    pub doi: Option<String>,
}

impl DetailFields {
    /// Overlay the fields that were found; absent ones leave the record as is.
    pub fn apply_to(self, record: &mut Record) {
        if let Some(abstract_text) = self.abstract_text {
            record.abstract_text = Some(abstract_text);
        }
        if let Some(keywords) = self.author_keywords {
            record.author_keywords = Some(keywords);
        }
        if let Some(doi) = self.doi {
            record.doi = Some(doi);
        }
    }
}

/// First non-empty value across an ordered probe list.
fn first_match(document: &Html, probes: &[Probe]) -> Option<String> {
    probes.iter().find_map(|probe| probe.run(document))
}

fn squash_whitespace(element: &ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Probe a fetched document page.
pub fn extract_detail_fields(html: &str) -> DetailFields {
    let document = Html::parse_document(html);
    DetailFields {
        abstract_text: first_match(&document, &ABSTRACT_PROBES),
        author_keywords: first_match(&document, &KEYWORD_PROBES),
        doi: first_match(&document, &DOI_PROBES),
    }
}

/// Fetch `record.link` and merge whatever the page offers.
///
/// Fetch failures are logged and the record is returned unchanged.
pub async fn enrich(fetcher: &dyn Fetcher, mut record: Record) -> Record {
    if record.link.is_empty() {
        return record;
    }

    debug!(link = %record.link, "Fetching details");
    match fetcher.fetch(&record.link).await {
        Ok(html) => {
            let details = extract_detail_fields(&html);
            debug!(
                link = %record.link,
                abstract_found = details.abstract_text.is_some(),
                keywords_found = details.author_keywords.is_some(),
                doi_found = details.doi.is_some(),
                "Detail page probed"
            );
            details.apply_to(&mut record);
        }
        Err(e) => {
            warn!(link = %record.link, error = %e, "Could not fetch details");
        }
    }
    record
}
