//! The scraped bibliographic record and its persisted column set.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Persisted column names, in file order.
pub const COLUMNS: [&str; 12] = [
    "Page_Index",
    "Order_in_Page",
    "Title",
    "Year",
    "Authors",
    "Publication_Info",
    "Abstract",
    "Link",
    "DOI",
    "Citations",
    "Scholar_Link",
    "Author_Keywords",
];

/// One search result, as scraped.
///
/// `scholar_link` is the identity key across the whole dataset. Columns that
/// are missing from an older dataset file load as their default (empty text,
/// zero provenance, or `None`).
///
/// An absent optional text value is `None`, never `Some("")`: the file cannot
/// tell the two apart, so [`Record::normalized`] folds empty text to `None`
/// before a record enters the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Record {
    /// 1-based page number (group of 10 results)
    #[serde(rename = "Page_Index", deserialize_with = "whole_number_or_zero")]
    pub page_index: u32,
    /// 1-based rank within the page
    #[serde(rename = "Order_in_Page", deserialize_with = "whole_number_or_zero")]
    pub order_in_page: u32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year", deserialize_with = "whole_number")]
    pub year: Option<i32>,
    /// Raw byline author segment, not split into names
    #[serde(rename = "Authors")]
    pub authors: String,
    #[serde(rename = "Publication_Info")]
    pub publication_info: String,
    #[serde(rename = "Abstract")]
    pub abstract_text: Option<String>,
    /// Direct document link when one was offered, else the result link
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "DOI")]
    pub doi: Option<String>,
    #[serde(rename = "Citations", deserialize_with = "whole_number")]
    pub citations: Option<u32>,
    #[serde(rename = "Scholar_Link")]
    pub scholar_link: String,
    #[serde(rename = "Author_Keywords")]
    pub author_keywords: Option<String>,
}

impl Record {
    /// The same record with empty optional text fields set to `None`.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.abstract_text,
            &mut self.doi,
            &mut self.author_keywords,
        ] {
            if field.as_deref().is_some_and(str::is_empty) {
                *field = None;
            }
        }
        self
    }
}

/// Files written by the original tool carry integer columns as floats
/// (`2023.0`) whenever the column had a gap, so accept whole-valued floats.
fn parse_whole_number(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 {
        Some(f as i64)
    } else {
        None
    }
}

fn whole_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let raw = match raw.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(s) => s,
    };

    let value = parse_whole_number(raw).and_then(|n| T::try_from(n).ok());
    if value.is_none() {
        warn!(value = raw, "Ignoring malformed numeric value in dataset");
    }
    Ok(value)
}

fn whole_number_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    whole_number(deserializer).map(Option::unwrap_or_default)
}
