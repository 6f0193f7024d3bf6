
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{AdvisorError, Result};

/// One college/branch/category observation for a given exam and year.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    #[serde(rename = "College")]
    pub college: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Cutoff_rank")]
    pub cutoff_rank: f64,
    #[serde(rename = "Exam")]
    pub exam: String,
    #[serde(rename = "Year")]
    pub year: u16,
    #[serde(rename = "Avg_Package_LPA")]
    pub avg_package: Option<f64>,
    #[serde(rename = "content", default)]
    pub content: Option<String>,
}

impl Record {
    /// Canonical textual summary of a record. This is the unit that gets
    /// embedded and the unit that goes into the LLM context, so the format
    /// must stay reproducible.
    #[inline]
    pub fn content_string(&self) -> String {
        format!(
            "{} | {} | {} | Cutoff: {} | Exam: {} | Year: {} | Avg Package: {}",
            self.college,
            self.branch,
            self.category,
            self.cutoff_rank,
            self.exam,
            self.year,
            self.avg_package.unwrap_or(0.0)
        )
    }
}

/// In-memory table of admission records, loaded once at startup and
/// read-only afterwards. Row positions are the identifier space shared
/// with the vector index.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Load the record table from a CSV file.
    ///
    /// Rows of a newer year that lack an average package figure inherit
    /// the value from the most recent prior year for the same
    /// (college, branch), matching how the published dataset is prepared.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading record table from {}", path.display());

        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            AdvisorError::Dataset(format!(
                "Failed to open record table {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut records = Vec::new();
        for (line, row) in reader.deserialize::<Record>().enumerate() {
            let record = row.map_err(|e| {
                AdvisorError::Dataset(format!(
                    "Failed to parse record table {} at data row {}: {}",
                    path.display(),
                    line + 1,
                    e
                ))
            })?;
            records.push(record);
        }

        let mut store = Self { records };
        store.backfill_packages();

        info!(
            "Loaded {} records from {}",
            store.records.len(),
            path.display()
        );
        Ok(store)
    }

    /// Build a store from rows already in memory. Used by tests and by
    /// callers that prepare the table themselves.
    #[inline]
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut store = Self { records };
        store.backfill_packages();
        store
    }

    // Carry a missing package figure forward from the latest prior year
    // observed for the same (college, branch).
    fn backfill_packages(&mut self) {
        let mut known: HashMap<(String, String), BTreeMap<u16, f64>> = HashMap::new();
        for record in &self.records {
            if let Some(package) = record.avg_package {
                known
                    .entry((record.college.clone(), record.branch.clone()))
                    .or_default()
                    .insert(record.year, package);
            }
        }

        let mut unresolved = 0usize;
        for record in &mut self.records {
            if record.avg_package.is_some() {
                continue;
            }
            let key = (record.college.clone(), record.branch.clone());
            let carried = known
                .get(&key)
                .and_then(|by_year| by_year.range(..record.year).next_back())
                .map(|(_, package)| *package);
            if carried.is_none() {
                unresolved += 1;
            }
            record.avg_package = carried;
        }

        if unresolved > 0 {
            warn!(
                "{} records have no average package figure for any year",
                unresolved
            );
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, row_id: usize) -> Option<&Record> {
        self.records.get(row_id)
    }

    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Project a list of row identifiers onto the table. Identifiers
    /// outside the table are skipped rather than failing the whole slice.
    #[inline]
    pub fn slice(&self, row_ids: &[usize]) -> Vec<(usize, &Record)> {
        row_ids
            .iter()
            .filter_map(|&id| {
                let row = self.records.get(id).map(|record| (id, record));
                if row.is_none() {
                    warn!("Row identifier {} is outside the record table", id);
                }
                row
            })
            .collect()
    }

    /// Distinct college names, sorted.
    #[inline]
    pub fn colleges(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.records.iter().map(|r| r.college.as_str()).collect();
        names.into_iter().map(str::to_owned).collect()
    }
}
