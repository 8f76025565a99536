//! Read-only analysis of a loaded corpus: statistics and quality checks.

use std::collections::{BTreeMap, HashSet};

use csv::StringRecord;
use serde::Serialize;

pub const DEFAULT_SHORT_TEXT_THRESHOLD: usize = 100;

/// How two `text` cells are compared when counting duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Byte-for-byte, case-sensitive.
    #[default]
    Exact,
    /// Trimmed, inner whitespace collapsed, lower-cased.
    Normalized,
}

impl DuplicatePolicy {
    fn key(self, text: &str) -> String {
        match self {
            DuplicatePolicy::Exact => text.to_string(),
            DuplicatePolicy::Normalized => text
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        }
    }
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(DuplicatePolicy::Exact),
            "normalized" => Ok(DuplicatePolicy::Normalized),
            other => Err(format!(
                "unknown duplicate policy '{other}' (expected exact or normalized)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ValidationPolicy {
    pub short_text_threshold: usize,
    pub duplicates: DuplicatePolicy,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            short_text_threshold: DEFAULT_SHORT_TEXT_THRESHOLD,
            duplicates: DuplicatePolicy::default(),
        }
    }
}

/// A corpus file loaded in full: its header and every data row.
#[derive(Debug)]
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of a column; `None` for rows too short to have one.
    fn cells<'a>(&'a self, idx: usize) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.rows.iter().map(move |row| row.get(idx))
    }

    fn present(&self, name: &str) -> Vec<&str> {
        match self.column(name) {
            Some(idx) => self.cells(idx).flatten().filter(|s| !s.is_empty()).collect(),
            None => Vec::new(),
        }
    }

    fn counts(&self, name: &str) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for value in self.present(name) {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total_records: usize,
    pub total_text_length: usize,
    pub avg_text_length: f64,
    pub domain_counts: BTreeMap<String, usize>,
    pub language_counts: BTreeMap<String, usize>,
    pub date_counts: BTreeMap<String, usize>,
}

pub(crate) fn compute_stats(table: &Table) -> DatasetStats {
    let texts = table.present("text");
    let total_text_length: usize = texts.iter().map(|t| char_len(t)).sum();
    let avg_text_length = if texts.is_empty() {
        0.0
    } else {
        total_text_length as f64 / texts.len() as f64
    };

    DatasetStats {
        total_records: table.rows.len(),
        total_text_length,
        avg_text_length,
        domain_counts: table.counts("domain"),
        language_counts: table.counts("language"),
        date_counts: table.counts("date_extracted"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues_found: bool,
    pub missing_values: BTreeMap<String, usize>,
    pub empty_text_count: usize,
    pub short_text_count: usize,
    pub duplicate_text_count: usize,
    pub missing_url_count: usize,
}

pub(crate) fn validate_table(table: &Table, policy: ValidationPolicy) -> ValidationReport {
    let missing_values: BTreeMap<String, usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let missing = table
                .cells(idx)
                .filter(|cell| cell.is_none_or(str::is_empty))
                .count();
            (name.clone(), missing)
        })
        .collect();

    let mut empty_text_count = 0;
    let mut short_text_count = 0;
    let mut duplicate_text_count = 0;
    if let Some(idx) = table.column("text") {
        let mut seen = HashSet::new();
        for text in table.cells(idx).map(Option::unwrap_or_default) {
            let len = char_len(text);
            if len == 0 {
                empty_text_count += 1;
            }
            if len < policy.short_text_threshold {
                short_text_count += 1;
            }
            if !seen.insert(policy.duplicates.key(text)) {
                duplicate_text_count += 1;
            }
        }
    }

    let missing_url_count = table
        .column("source_url")
        .map(|idx| table.cells(idx).filter(|c| c.is_none_or(str::is_empty)).count())
        .unwrap_or(0);

    let issues_found = missing_values.values().any(|&n| n > 0)
        || empty_text_count > 0
        || short_text_count > 0
        || duplicate_text_count > 0
        || missing_url_count > 0;

    ValidationReport {
        issues_found,
        missing_values,
        empty_text_count,
        short_text_count,
        duplicate_text_count,
        missing_url_count,
    }
}
