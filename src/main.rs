mod db;
mod extract;
mod pages;
mod segmenter;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};

use segmenter::catalog::Catalog;
use segmenter::SegmenterConfig;

#[derive(Parser)]
#[command(name = "msds_extract", about = "MSDS section segmentation and field extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment and extract a directory (or single file) of page-text documents
    Process {
        /// Document file (.txt with form-feed pages, .json page array) or directory
        path: PathBuf,
        /// Max documents to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Section catalog JSON overriding the built-in one
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Print the stored sections of one processed document
    Show {
        /// Document name (file stem)
        name: String,
    },
    /// Segment one document and print per-section candidates and boundaries
    Inspect {
        file: PathBuf,
        /// Restrict to specific section keys
        #[arg(short, long)]
        sections: Vec<String>,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Show processing statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            path,
            limit,
            catalog,
        } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let catalog = load_catalog(catalog.as_deref())?;
            let files = collect_documents(&path, limit)?;
            if files.is_empty() {
                println!("No .txt/.json documents found under {}", path.display());
                return Ok(());
            }
            println!("Processing {} documents...", files.len());
            let counts = process_documents(&conn, &files, &catalog)?;
            counts.print();
            Ok(())
        }
        Commands::Show { name } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            show_document(&conn, &name)
        }
        Commands::Inspect {
            file,
            sections,
            catalog,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            inspect_document(&file, &sections, &catalog)
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Documents:        {}", s.documents);
            println!("  ok:             {}", s.ok);
            println!("  errors:         {}", s.errors);
            println!("Sections:         {}", s.sections);
            println!("Composition rows: {}", s.composition_rows);
            println!("Regulatory items: {}", s.regulatory_items);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    match path {
        Some(p) => Catalog::from_json_file(p),
        None => Ok(Catalog::builtin()),
    }
}

fn collect_documents(path: &Path, limit: Option<usize>) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else {
        for entry in std::fs::read_dir(path)? {
            let p = entry?.path();
            let ext = p.extension().and_then(|e| e.to_str());
            if p.is_file() && matches!(ext, Some("txt") | Some("json")) {
                files.push(p);
            }
        }
        files.sort();
    }
    if let Some(n) = limit {
        files.truncate(n);
    }
    Ok(files)
}

struct ProcessCounts {
    documents: usize,
    errors: usize,
    sections: usize,
    composition_rows: usize,
    regulatory_items: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} documents ({} errors), {} sections, {} composition rows, {} regulatory items.",
            self.documents, self.errors, self.sections, self.composition_rows, self.regulatory_items,
        );
    }
}

fn doc_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string()
}

/// One document, fully isolated: a failure becomes an error record on that
/// document and never stops the batch.
fn process_one(
    path: &Path,
    catalog: &Catalog,
    cfg: &SegmenterConfig,
) -> (db::DocumentRow, Option<extract::ExtractedData>) {
    let name = doc_name(path);
    let processed_at = chrono::Utc::now().to_rfc3339();
    match pages::load_document(path) {
        Ok(page_texts) => {
            let seg = segmenter::segment(&page_texts, catalog, cfg);
            let data = extract::extract_all(&name, &seg);
            (
                db::DocumentRow {
                    name,
                    path: path.display().to_string(),
                    page_count: page_texts.len(),
                    status: "ok".to_string(),
                    error: None,
                    processed_at,
                },
                Some(data),
            )
        }
        Err(e) => (
            db::DocumentRow {
                name,
                path: path.display().to_string(),
                page_count: 0,
                status: "error".to_string(),
                error: Some(format!("{e:#}")),
                processed_at,
            },
            None,
        ),
    }
}

fn process_documents(
    conn: &rusqlite::Connection,
    files: &[PathBuf],
    catalog: &Catalog,
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let cfg = SegmenterConfig::from_env();
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        documents: 0,
        errors: 0,
        sections: 0,
        composition_rows: 0,
        regulatory_items: 0,
    };

    for chunk in files.chunks(100) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|p| process_one(p, catalog, &cfg))
            .collect();

        let mut documents = Vec::new();
        let mut sections = Vec::new();
        let mut products = Vec::new();
        let mut hazards = Vec::new();
        let mut composition = Vec::new();
        let mut regulatory = Vec::new();

        for (doc, data) in results {
            if doc.status == "error" {
                counts.errors += 1;
            }
            documents.push(doc);
            if let Some(data) = data {
                counts.sections += data.sections.len();
                counts.composition_rows += data.composition.len();
                counts.regulatory_items += data.regulatory.len();
                sections.extend(data.sections);
                products.extend(data.product);
                hazards.extend(data.hazard);
                composition.extend(data.composition);
                regulatory.extend(data.regulatory);
            }
        }

        counts.documents += documents.len();
        db::save_documents(conn, &documents)?;
        db::save_sections(conn, &sections)?;
        db::save_products(conn, &products)?;
        db::save_hazards(conn, &hazards)?;
        db::save_composition(conn, &composition)?;
        db::save_regulatory(conn, &regulatory)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn show_document(conn: &rusqlite::Connection, name: &str) -> anyhow::Result<()> {
    let Some(doc) = db::fetch_document(conn, name)? else {
        println!("No document named '{name}'. Run 'process' first.");
        return Ok(());
    };
    println!(
        "{} ({} pages, {}, processed {})",
        doc.name, doc.page_count, doc.status, doc.processed_at
    );
    if let Some(err) = &doc.error {
        println!("error: {err}");
        return Ok(());
    }

    let stored = db::fetch_sections(conn, name)?;
    let catalog = Catalog::builtin();

    let found: Vec<&str> = stored.iter().map(|s| s.section_key.as_str()).collect();
    let missing: Vec<&str> = catalog
        .sections()
        .iter()
        .map(|s| s.spec.key.as_str())
        .filter(|k| !found.contains(k))
        .collect();

    println!("\nFound {} / {} sections", found.len(), catalog.sections().len());
    if !missing.is_empty() {
        println!("Missing: {}", missing.join(", "));
    }

    for row in &stored {
        let title = catalog
            .section_by_key(&row.section_key)
            .map(|s| format!("{}. {}", s.spec.number, s.spec.title))
            .unwrap_or_else(|| row.section_key.clone());
        println!("\n=== {title} [{}] ===", row.strategy);
        println!("{}", truncate(&row.body, 1200));
    }
    Ok(())
}

fn inspect_document(file: &Path, keys: &[String], catalog: &Catalog) -> anyhow::Result<()> {
    let page_texts = pages::load_document(file)?;
    let cfg = SegmenterConfig::from_env();
    let seg = segmenter::segment(&page_texts, catalog, &cfg);

    println!("{}: {} pages", file.display(), page_texts.len());
    for section in catalog.sections() {
        let key = &section.spec.key;
        if !keys.is_empty() && !keys.contains(key) {
            continue;
        }
        match seg.trace.iter().find(|t| &t.key == key) {
            Some(t) => {
                println!(
                    "\n[{}. {}] start={} end={} via {}",
                    t.number,
                    key,
                    t.start,
                    t.end,
                    t.strategy.as_str()
                );
                println!("  candidates: {:?}", t.candidates);
                let body = &seg.sections[key];
                for line in body.lines().take(3) {
                    println!("  | {}", truncate(line, 120));
                }
                let total = body.lines().count();
                if total > 3 {
                    println!("  | ... ({total} body lines)");
                }
            }
            None => println!("\n[{}. {}] not found", section.spec.number, key),
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
