use anyhow::{Context, Result};
use console::style;
use tracing::{info, warn};

use crate::answer::{AnswerGenerator, GenerationOptions};
use crate::config::Config;
use crate::drilldown::{PivotTable, drill_down_college};
use crate::embeddings::{CachedEmbedder, EmbeddingClient};
use crate::index::{FlatIndex, NearestNeighbors};
use crate::records::RecordStore;
use crate::retriever::{Retriever, RetrievedRecord, build_context};

type AdvisorRetriever = Retriever<CachedEmbedder<EmbeddingClient>, FlatIndex>;

/// Load the record table and vector index named by the config and wire
/// them into a retriever. Everything here is loaded exactly once and
/// shared read-only; a missing or misaligned dataset is fatal at boot.
fn load_retriever(config: &Config) -> Result<AdvisorRetriever> {
    let records_path = config.records_path().context("Failed to resolve records path")?;
    let index_path = config.index_path().context("Failed to resolve index path")?;

    let store = RecordStore::load(&records_path)
        .with_context(|| format!("Failed to load record table: {}", records_path.display()))?;
    let index = FlatIndex::load(&index_path)
        .with_context(|| format!("Failed to load vector index: {}", index_path.display()))?;

    if index.model() != config.embedding.model {
        warn!(
            "Index was built with model {} but the configured embedding model is {}",
            index.model(),
            config.embedding.model
        );
    }

    let embedder = CachedEmbedder::new(
        EmbeddingClient::new(&config.embedding).context("Failed to create embedding client")?,
    );

    let retriever = Retriever::new(embedder, index, store)
        .context("Failed to assemble retrieval pipeline")?;
    info!("Retrieval pipeline ready");
    Ok(retriever)
}

fn load_store(config: &Config) -> Result<RecordStore> {
    let records_path = config.records_path().context("Failed to resolve records path")?;
    RecordStore::load(&records_path)
        .with_context(|| format!("Failed to load record table: {}", records_path.display()))
}

/// Run a semantic search and print the ranked results.
#[inline]
pub fn run_search(
    query: &str,
    top_k: usize,
    max_rank: Option<f64>,
    min_package: Option<f64>,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let retriever = load_retriever(&config)?;

    let results = retriever.search_colleges(query, top_k, max_rank, min_package)?;

    if results.is_empty() {
        println!("No colleges matched the query and filters.");
        return Ok(());
    }

    print_results(&results);
    Ok(())
}

fn print_results(results: &[RetrievedRecord]) {
    for (position, result) in results.iter().enumerate() {
        println!();
        println!(
            "🏫 [{}] {} | {}",
            position + 1,
            style(&result.record.college).bold(),
            result.record.branch
        );
        println!("📄 {}", result.content);
        println!("📏 Distance: {:.4}", result.distance);
    }
}

/// Print per-branch cutoff and package pivot tables for one college.
#[inline]
pub fn run_drill_down(college: &str) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let store = load_store(&config)?;

    let summary = drill_down_college(college, &store);
    if summary.is_empty() {
        println!("No records found for college: {}", college);
        return Ok(());
    }

    for (branch, tables) in &summary {
        println!();
        println!("📊 {} | {}", style(college).bold(), style(branch).cyan());
        println!("🔹 Cutoff rank (best per year/exam):");
        print_pivot(&tables.cutoff, 0);
        println!("🔹 Avg package LPA (mean per year/exam):");
        print_pivot(&tables.package, 2);
    }
    Ok(())
}

fn print_pivot(pivot: &PivotTable, decimals: usize) {
    let exams = pivot.exams();
    if exams.is_empty() {
        println!("  (no data)");
        return;
    }

    print!("  {:<8}", "Year");
    for exam in &exams {
        print!("{:>12}", exam);
    }
    println!();

    for year in pivot.years() {
        print!("  {:<8}", year);
        for exam in &exams {
            match pivot.get(year, exam) {
                Some(value) => print!("{:>12.*}", decimals, value),
                None => print!("{:>12}", "-"),
            }
        }
        println!();
    }
}

/// Retrieval-augmented question answering: search, assemble context,
/// generate an answer.
#[inline]
pub fn run_ask(
    query: &str,
    top_k: usize,
    max_rank: Option<f64>,
    min_package: Option<f64>,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let retriever = load_retriever(&config)?;

    let results = retriever.search_colleges(query, top_k, max_rank, min_package)?;
    let context = build_context(&results);
    info!(
        "Assembled context from {} records ({} bytes)",
        results.len(),
        context.len()
    );

    let generator = AnswerGenerator::new(&config.llm);
    let options = GenerationOptions::from_config(&config.llm);
    let answer = generator.generate_answer(query, &context, &options);

    println!("🔎 {}", style(query).bold());
    if !results.is_empty() {
        println!("📄 Context: {} matching records", results.len());
    }
    println!();
    println!("💡 {}", answer);
    Ok(())
}

/// Show dataset and pipeline health.
#[inline]
pub fn show_status() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let records_path = config.records_path().context("Failed to resolve records path")?;
    let index_path = config.index_path().context("Failed to resolve index path")?;

    println!("{}", style("📋 Dataset Status").bold().cyan());
    println!();

    let store = match RecordStore::load(&records_path) {
        Ok(store) => store,
        Err(e) => {
            println!("Records: {} ({})", style("unavailable").red(), e);
            return Ok(());
        }
    };
    println!(
        "Records: {} rows, {} colleges ({})",
        style(store.len()).green(),
        store.colleges().len(),
        records_path.display()
    );

    let index = match FlatIndex::load(&index_path) {
        Ok(index) => index,
        Err(e) => {
            println!("Index: {} ({})", style("unavailable").red(), e);
            return Ok(());
        }
    };
    println!(
        "Index: {} vectors, dimension {}, model {} ({})",
        style(index.len()).green(),
        index.dimension(),
        index.model(),
        index_path.display()
    );

    match index.validate_alignment(store.len()) {
        Ok(()) => println!("Alignment: {}", style("index and table are in sync").green()),
        Err(e) => println!("Alignment: {} ({})", style("OUT OF SYNC").red(), e),
    }

    let credential = if config.llm.api_key().is_some() {
        style("set").green()
    } else {
        style("not set").red()
    };
    println!("LLM credential ({}): {}", config.llm.api_key_var, credential);

    Ok(())
}
