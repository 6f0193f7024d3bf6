
use std::collections::BTreeMap;
use tracing::debug;

use crate::records::RecordStore;

/// Year × exam grid of aggregated values for one branch. Rows and
/// columns come out sorted; absent combinations are simply missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotTable {
    cells: BTreeMap<(u16, String), f64>,
}

impl PivotTable {
    #[inline]
    pub fn get(&self, year: u16, exam: &str) -> Option<f64> {
        self.cells.get(&(year, exam.to_string())).copied()
    }

    #[inline]
    pub fn years(&self) -> Vec<u16> {
        let mut years: Vec<u16> = self.cells.keys().map(|(year, _)| *year).collect();
        years.dedup();
        years
    }

    #[inline]
    pub fn exams(&self) -> Vec<String> {
        let mut exams: Vec<String> = self.cells.keys().map(|(_, exam)| exam.clone()).collect();
        exams.sort();
        exams.dedup();
        exams
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Per-branch pivot pair: best (lowest) cutoff rank and mean average
/// package for every year/exam combination observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchSummary {
    pub cutoff: PivotTable,
    pub package: PivotTable,
}

pub type DrillDownSummary = BTreeMap<String, BranchSummary>;

/// Branch-aware drill-down for a single college.
///
/// Cutoff ranks are rounded to whole numbers and packages to two
/// decimals before aggregation so the tables are presentation-stable.
/// Duplicate year/exam rows take the minimum cutoff (lower rank is
/// better) and the mean package. An unknown college yields an empty
/// summary, not an error.
#[inline]
pub fn drill_down_college(college_name: &str, store: &RecordStore) -> DrillDownSummary {
    let mut cutoff_min: BTreeMap<(String, u16, String), f64> = BTreeMap::new();
    let mut package_sums: BTreeMap<(String, u16, String), (f64, u32)> = BTreeMap::new();

    let mut matched = 0usize;
    for record in store.records() {
        if record.college != college_name {
            continue;
        }
        matched += 1;

        let key = (record.branch.clone(), record.year, record.exam.clone());

        let rank = record.cutoff_rank.round();
        cutoff_min
            .entry(key.clone())
            .and_modify(|current| *current = current.min(rank))
            .or_insert(rank);

        if let Some(package) = record.avg_package {
            let package = (package * 100.0).round() / 100.0;
            let (sum, count) = package_sums.entry(key).or_insert((0.0, 0));
            *sum += package;
            *count += 1;
        }
    }

    debug!("Drill-down for {}: {} matching rows", college_name, matched);

    let mut summary = DrillDownSummary::new();

    for ((branch, year, exam), rank) in cutoff_min {
        summary
            .entry(branch)
            .or_default()
            .cutoff
            .cells
            .insert((year, exam), rank);
    }

    for ((branch, year, exam), (sum, count)) in package_sums {
        summary
            .entry(branch)
            .or_default()
            .package
            .cells
            .insert((year, exam), sum / f64::from(count));
    }

    summary
}
