//! BibTeX export of the dataset.

use crate::error::Result;
use crate::record::Record;
use std::path::Path;
use tracing::info;

/// Stands in for the year in keys of undated entries
const NO_YEAR: &str = "NoYear";

/// `<last name of first author><year><first title word>`, e.g.
/// `Doe2023Analysis`. Falls back to `entry<row>` when authors or title are
/// missing; `row` is the record's 1-based position in the export, which
/// keeps fallback keys distinct within one file.
pub fn citation_key(record: &Record, row: usize) -> String {
    derived_key(record).unwrap_or_else(|| format!("entry{}", row))
}

fn derived_key(record: &Record) -> Option<String> {
    let last_name = record
        .authors
        .split(',')
        .next()?
        .split_whitespace()
        .last()?;
    let first_word = record.title.split_whitespace().next()?;
    let year = record
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| NO_YEAR.to_string());

    let key: String = format!("{}{}{}", last_name, year, first_word)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    Some(key)
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// One `@article` block holding only the fields the record has.
pub fn render_entry(record: &Record, row: usize) -> String {
    let year = record.year.map(|y| y.to_string());
    let fields: [(&str, Option<&str>); 6] = [
        ("title", non_empty(&record.title)),
        ("author", non_empty(&record.authors)),
        ("journal", non_empty(&record.publication_info)),
        ("year", year.as_deref()),
        ("doi", record.doi.as_deref().and_then(non_empty)),
        ("abstract", record.abstract_text.as_deref().and_then(non_empty)),
    ];

    let mut lines = vec![format!("@article{{{},", citation_key(record, row))];
    for (name, value) in fields {
        if let Some(value) = value {
            lines.push(format!("  {}={{{}}},", name, value));
        }
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// All records, one block each, separated by a blank line.
pub fn render_bibliography(records: &[Record]) -> String {
    records
        .iter()
        .zip(1..)
        .map(|(record, row)| render_entry(record, row))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Overwrite `path` with the rendered bibliography.
///
/// Returns the number of entries written; nothing is written for an empty
/// dataset.
pub fn write_bibliography(path: &Path, records: &[Record]) -> Result<usize> {
    if records.is_empty() {
        info!(path = ?path, "No records, bibliography not written");
        return Ok(0);
    }

    std::fs::write(path, render_bibliography(records))?;
    info!(path = ?path, entries = records.len(), "Generated bibliography");
    Ok(records.len())
}
