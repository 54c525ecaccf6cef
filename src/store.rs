//! The persisted dataset of scraped records.
//!
//! One fully-quoted CSV file with a header row. Rows are only ever appended;
//! the set of known `scholar_link` identities is derived from them.

use crate::error::{Result, ScrapeError};
use crate::record::{Record, COLUMNS};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Results per page on the search engine.
pub const PAGE_STEP: u32 = 10;

/// Accumulated records plus their identity set.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    path: PathBuf,
    records: Vec<Record>,
    seen: HashSet<String>,
}

impl DatasetStore {
    /// Empty store that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Load the dataset at `path`, or start empty if there is none.
    ///
    /// Columns missing from older files load as empty values.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(path);
        if !store.path.exists() {
            debug!(path = ?store.path, "No existing dataset");
            return Ok(store);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&store.path)?;

        let headers = reader.headers()?.clone();
        let missing: Vec<&str> = COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            info!(columns = ?missing, "Dataset lacks columns, filling with empty values");
        }

        let mut records = Vec::new();
        for row in reader.deserialize::<Record>() {
            records.push(row?);
        }
        store.merge(records);

        info!(
            path = ?store.path,
            records = store.records.len(),
            "Found existing data, resuming"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every non-empty `scholar_link` in the store.
    pub fn seen_identities(&self) -> &HashSet<String> {
        &self.seen
    }

    /// Append `new_records` in order. No deduplication happens here.
    ///
    /// Records are stored [`normalized`](Record::normalized), so what is held
    /// in memory matches what a later `load` reads back.
    pub fn merge(&mut self, new_records: Vec<Record>) {
        for record in new_records {
            if !record.scholar_link.is_empty() {
                self.seen.insert(record.scholar_link.clone());
            }
            self.records.push(record.normalized());
        }
    }

    /// Offset of the first page not yet scraped.
    ///
    /// Falls back to `url_offset` (floored to a page boundary) when no stored
    /// row carries a page index. A stored page index too large to address
    /// is a `Parse` error.
    pub fn resume_offset(&self, url_offset: u32) -> Result<u32> {
        match self.records.iter().map(|r| r.page_index).max() {
            Some(last_page) if last_page > 0 => last_page.checked_mul(PAGE_STEP).ok_or_else(|| {
                ScrapeError::Parse(format!(
                    "Page_Index {} in {} is out of range",
                    last_page,
                    self.path.display()
                ))
            }),
            _ => Ok(url_offset / PAGE_STEP * PAGE_STEP),
        }
    }

    /// Write every record, in append order, with all fields quoted.
    ///
    /// The file is written beside the target and renamed over it, so an
    /// interrupted write leaves the previous contents in place.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .quote_style(csv::QuoteStyle::Always)
                .from_path(&tmp_path)?;
            writer.write_record(COLUMNS)?;
            for record in &self.records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        debug!(path = ?self.path, records = self.records.len(), "Dataset persisted");
        Ok(())
    }
}

/// Drop records that are already known or repeat an earlier record of the
/// same batch. Keeps the first occurrence, in batch order.
///
/// Pages scraped concurrently share one identity snapshot, so two of them
/// can both emit the same item.
pub fn reconcile(batch: Vec<Record>, known: &HashSet<String>) -> Vec<Record> {
    let mut taken: HashSet<String> = HashSet::new();
    let before = batch.len();

    let unique: Vec<Record> = batch
        .into_iter()
        .filter(|record| {
            !known.contains(&record.scholar_link) && taken.insert(record.scholar_link.clone())
        })
        .collect();

    if unique.len() < before {
        info!(dropped = before - unique.len(), "Dropped duplicate records across pages");
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(page: u32, order: u32, link: &str) -> Record {
        Record {
            page_index: page,
            order_in_page: order,
            title: format!("Paper {}", order),
            link: link.to_string(),
            scholar_link: link.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let store = DatasetStore::load(dir.path().join("none.csv"))?;
        assert!(store.is_empty());
        assert!(store.seen_identities().is_empty());
        assert_eq!(store.resume_offset(0)?, 0);
        Ok(())
    }

    #[test]
    fn test_persist_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("data.csv");

        let mut store = DatasetStore::new(&path);
        store.merge(vec![
            Record {
                page_index: 1,
                order_in_page: 1,
                title: "Commas, \"quotes\" and\nnewlines".to_string(),
                year: Some(2021),
                authors: "Doe, John".to_string(),
                publication_info: "Journal - Publisher".to_string(),
                abstract_text: Some("Line one\nLine \"two\", done".to_string()),
                link: "http://a.example/paper.pdf".to_string(),
                doi: Some("10.1234/abcd".to_string()),
                citations: Some(0),
                scholar_link: "http://a.example".to_string(),
                author_keywords: Some("x; y".to_string()),
            },
            record(2, 3, "http://b.example"),
        ]);
        store.persist()?;

        let loaded = DatasetStore::load(&path)?;
        assert_eq!(loaded.records(), store.records());
        assert_eq!(loaded.seen_identities(), store.seen_identities());

        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("\"Page_Index\",\"Order_in_Page\",\"Title\""));
        Ok(())
    }

    #[test]
    fn test_empty_optional_text_round_trips() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("data.csv");

        let mut store = DatasetStore::new(&path);
        store.merge(vec![Record {
            abstract_text: Some(String::new()),
            doi: Some(String::new()),
            author_keywords: Some(String::new()),
            ..record(1, 1, "http://blank.example")
        }]);
        assert_eq!(store.records()[0].abstract_text, None);
        store.persist()?;

        let loaded = DatasetStore::load(&path)?;
        assert_eq!(loaded.records(), store.records());
        Ok(())
    }

    #[test]
    fn test_persist_empty_store_writes_header() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("data.csv");
        DatasetStore::new(&path).persist()?;

        let text = fs::read_to_string(&path)?;
        assert_eq!(text.lines().count(), 1);
        assert!(DatasetStore::load(&path)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_load_legacy_columns() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("legacy.csv");
        fs::write(
            &path,
            "Title,Page_Index,Year,Scholar_Link\n\
             Test Paper,1.0,2020.0,http://old.example\n\
             Second,2,,http://older.example\n",
        )?;

        let store = DatasetStore::load(&path)?;
        assert_eq!(store.len(), 2);
        let first = &store.records()[0];
        assert_eq!(first.title, "Test Paper");
        assert_eq!(first.page_index, 1);
        assert_eq!(first.year, Some(2020));
        assert!(store.records().iter().all(|r| r.author_keywords.is_none()));
        assert!(store.records().iter().all(|r| r.doi.is_none()));
        assert_eq!(store.records()[1].year, None);
        assert!(store.seen_identities().contains("http://older.example"));

        // Rewriting upgrades the file to the full column set.
        store.persist()?;
        let text = fs::read_to_string(&path)?;
        let header = text.lines().next().unwrap_or_default();
        assert_eq!(header.split(',').count(), COLUMNS.len());
        assert!(header.contains("\"Author_Keywords\""));
        Ok(())
    }

    #[test]
    fn test_merge_appends_without_dedup() {
        let mut store = DatasetStore::new("unused.csv");
        store.merge(vec![record(1, 1, "http://a.example")]);
        store.merge(vec![record(1, 1, "http://a.example"), record(1, 2, "")]);

        assert_eq!(store.len(), 3);
        assert_eq!(store.seen_identities().len(), 1);
    }

    #[test]
    fn test_resume_offset() -> Result<()> {
        let mut store = DatasetStore::new("unused.csv");
        assert_eq!(store.resume_offset(25)?, 20);
        assert_eq!(store.resume_offset(u32::MAX)?, u32::MAX / 10 * 10);

        store.merge(vec![record(3, 1, "http://c.example"), record(1, 1, "http://a.example")]);
        assert_eq!(store.resume_offset(0)?, 30);
        assert_eq!(store.resume_offset(90)?, 30);
        Ok(())
    }

    #[test]
    fn test_resume_offset_ignores_unknown_provenance() -> Result<()> {
        let mut store = DatasetStore::new("unused.csv");
        store.merge(vec![record(0, 0, "http://legacy.example")]);
        assert_eq!(store.resume_offset(40)?, 40);
        Ok(())
    }

    #[test]
    fn test_resume_offset_out_of_range_page_index() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("edited.csv");
        fs::write(
            &path,
            "Page_Index,Title,Scholar_Link\n500000000,Edited by hand,http://edited.example\n",
        )?;

        let store = DatasetStore::load(&path)?;
        assert!(matches!(store.resume_offset(0), Err(ScrapeError::Parse(_))));
        Ok(())
    }

    #[test]
    fn test_reconcile() {
        let known: HashSet<String> = ["http://known.example".to_string()].into();
        let batch = vec![
            record(2, 1, "http://shared.example"),
            record(2, 2, "http://known.example"),
            record(3, 1, "http://other.example"),
            record(3, 2, "http://shared.example"),
        ];

        let unique = reconcile(batch, &known);
        let provenance: Vec<(u32, u32)> =
            unique.iter().map(|r| (r.page_index, r.order_in_page)).collect();
        assert_eq!(provenance, vec![(2, 1), (3, 1)]);
    }
}
