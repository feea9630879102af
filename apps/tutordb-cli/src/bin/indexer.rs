use std::env;
use std::path::PathBuf;

use tutordb_cli::{build_embedder, init_tracing, load_settings, BarProgress};
use tutordb_core::chunking::ChunkingConfig;
use tutordb_core::corpus::CorpusBuilder;
use tutordb_core::layout::CorpusPaths;
use tutordb_core::progress::{ProgressFile, ProgressSink, ProgressState};
use tutordb_hybrid::rebuild_corpus;

// Build the global corpus from a directory of PDFs.
// Usage: tutordb-indexer [PDF_DIR] [--out INDEX_DIR]

fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = load_settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let mut pdf_dir = None;
    let mut index_dir = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--out" | "-o" => {
                let Some(dir) = args.get(i + 1) else {
                    eprintln!("Error: --out requires a directory");
                    std::process::exit(1);
                };
                index_dir = Some(PathBuf::from(dir));
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: tutordb-indexer [PDF_DIR] [--out INDEX_DIR]");
                return Ok(());
            }
            a if !a.starts_with('-') => pdf_dir = Some(PathBuf::from(a)),
            other => eprintln!("Ignoring unknown flag {other}"),
        }
        i += 1;
    }
    let paths = CorpusPaths::new(
        pdf_dir.unwrap_or_else(|| settings.pdf_dir()),
        index_dir.unwrap_or_else(|| settings.index_dir()),
    );
    println!("Global corpus indexer\n=====================");
    println!("Documents: {}", paths.docs_dir.display());
    println!("Index:     {}", paths.index_dir.display());

    let chunking = ChunkingConfig::new(settings.chunking.chunk_size, settings.chunking.overlap)?;
    let builder = CorpusBuilder::pdf(chunking);
    let embedder = build_embedder(&settings)?;
    let progress = BarProgress::new(ProgressFile::new(paths.progress()));

    match rebuild_corpus(&paths, &builder, embedder.as_ref(), settings.embedding.batch_size, &progress) {
        Ok(summary) => {
            progress.finish("done");
            println!("\n✅ Indexed {} documents into {} chunks", summary.documents, summary.chunks);
            if let Some(dim) = summary.dim {
                println!("📐 Embedding dimension: {dim}");
            }
            Ok(())
        }
        Err(e) => {
            progress.finish("failed");
            ProgressFile::new(paths.progress()).report(ProgressState::failed(e.to_string(), 0));
            Err(e.into())
        }
    }
}
