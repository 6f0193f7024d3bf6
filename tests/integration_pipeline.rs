#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end retrieval over on-disk fixtures: CSV record table plus
// JSON vector index, loaded the same way the CLI loads them.

use cet_advisor::Result;
use cet_advisor::drilldown::drill_down_college;
use cet_advisor::embeddings::TextEmbedder;
use cet_advisor::index::FlatIndex;
use cet_advisor::records::RecordStore;
use cet_advisor::retriever::{Retriever, build_context};
use std::fs;
use tempfile::TempDir;

/// Embeds every query to [1, 0], so a stored vector [x, 0] sits at
/// distance 1 - x from any query.
struct FixedEmbedder;

impl TextEmbedder for FixedEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn model_id(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        2
    }
}

fn write_fixtures(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
    let records_path = dir.path().join("final_rag.csv");
    let index_path = dir.path().join("final_rag_index.json");

    fs::write(
        &records_path,
        "College,Branch,Category,Cutoff_rank,Exam,Year,Avg_Package_LPA\n\
         Acme Tech,CSE,GM,4500,KCET,2024,6.5\n\
         Acme Tech,CSE,GM,4800,KCET,2025,\n\
         Beta Inst,CSE,GM,8000,KCET,2025,5.0\n\
         Gamma Univ,ECE,GM,5500,COMEDK,2025,7.0\n",
    )
    .expect("write records fixture");

    // Distances from a [1, 0] query: 0.2, 0.05, 0.1, 0.3.
    fs::write(
        &index_path,
        r#"{"model":"fixed","dimension":2,"vectors":[[0.8,0.0],[0.95,0.0],[0.9,0.0],[0.7,0.0]]}"#,
    )
    .expect("write index fixture");

    (records_path, index_path)
}

#[test]
fn search_over_on_disk_dataset() {
    let dir = TempDir::new().expect("temp dir");
    let (records_path, index_path) = write_fixtures(&dir);

    let store = RecordStore::load(&records_path).expect("load records");
    let index = FlatIndex::load(&index_path).expect("load index");
    index.validate_alignment(store.len()).expect("aligned dataset");

    let retriever = Retriever::new(FixedEmbedder, index, store).expect("build retriever");

    let results = retriever
        .search_colleges("best CSE colleges", 10, None, None)
        .expect("search");

    // Four rows collapse to three (college, branch) pairs, ascending by
    // distance: Acme CSE (0.05, the 2025 row), Beta CSE (0.1), Gamma ECE (0.3).
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].record.college, "Acme Tech");
    assert_eq!(results[0].record.year, 2025);
    assert_eq!(results[1].record.college, "Beta Inst");
    assert_eq!(results[2].record.college, "Gamma Univ");
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));

    // The 2025 Acme row had no package in the CSV; the 2024 figure was
    // carried forward at load time.
    assert_eq!(results[0].record.avg_package, Some(6.5));
}

#[test]
fn filters_and_context_assembly() {
    let dir = TempDir::new().expect("temp dir");
    let (records_path, index_path) = write_fixtures(&dir);

    let store = RecordStore::load(&records_path).expect("load records");
    let index = FlatIndex::load(&index_path).expect("load index");
    let retriever = Retriever::new(FixedEmbedder, index, store).expect("build retriever");

    let results = retriever
        .search_colleges("good colleges", 10, Some(6000.0), Some(6.0))
        .expect("search");

    // Beta (rank 8000, package 5.0) fails both filters; Acme's two rows
    // dedup to one; Gamma passes both.
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.record.cutoff_rank <= 6000.0));
    assert!(
        results
            .iter()
            .all(|r| r.record.avg_package.expect("package present") >= 6.0)
    );

    let context = build_context(&results);
    assert_eq!(context.lines().count(), 2);
    assert!(context.contains("Acme Tech | CSE"));
}

#[test]
fn drill_down_over_loaded_store() {
    let dir = TempDir::new().expect("temp dir");
    let (records_path, _) = write_fixtures(&dir);

    let store = RecordStore::load(&records_path).expect("load records");
    let summary = drill_down_college("Acme Tech", &store);

    assert_eq!(summary.len(), 1);
    let cse = summary.get("CSE").expect("CSE branch");
    assert_eq!(cse.cutoff.get(2024, "KCET"), Some(4500.0));
    assert_eq!(cse.cutoff.get(2025, "KCET"), Some(4800.0));
    // Backfilled package shows up in both years.
    assert_eq!(cse.package.get(2025, "KCET"), Some(6.5));
}

#[test]
fn misaligned_dataset_is_rejected_at_load() {
    let dir = TempDir::new().expect("temp dir");
    let (records_path, index_path) = write_fixtures(&dir);

    fs::write(
        &index_path,
        r#"{"model":"fixed","dimension":2,"vectors":[[1.0,0.0]]}"#,
    )
    .expect("overwrite index fixture");

    let store = RecordStore::load(&records_path).expect("load records");
    let index = FlatIndex::load(&index_path).expect("load index");

    assert!(index.validate_alignment(store.len()).is_err());
    assert!(Retriever::new(FixedEmbedder, index, store).is_err());
}
