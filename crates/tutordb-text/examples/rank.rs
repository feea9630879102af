use std::env;
use std::path::PathBuf;

use tutordb_core::config::Config;
use tutordb_text::{load, tokenize};

// Rank a query against a persisted token file and print the best rows.
// Usage:
//   cargo run -p tutordb-text --example rank -- "your query" [--index DIR] [--limit N]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: cargo run -p tutordb-text --example rank -- <query> [--index DIR] [--limit N]");
        std::process::exit(1);
    }
    let mut query = String::new();
    let mut index_dir: Option<PathBuf> = None;
    let mut limit: usize = 10;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--index" if i + 1 < args.len() => { index_dir = Some(PathBuf::from(&args[i + 1])); i += 2; }
            "--limit" if i + 1 < args.len() => { limit = args[i + 1].parse().unwrap_or(limit); i += 2; }
            other => { if !query.is_empty() { query.push(' '); } query.push_str(other); i += 1; }
        }
    }
    let index_dir = match index_dir { Some(d) => d, None => Config::load()?.settings()?.index_dir() };
    let path = index_dir.join(tutordb_core::layout::LEXICAL_FILE);
    let index = load(&path)?;
    println!("{} documents in {}", index.len(), path.display());
    for (score, row) in index.top_k(&tokenize(&query), limit) {
        let preview: String = index.tokens()[row].concat().chars().take(60).collect();
        println!("{score:>8.3}  #{row:<6} {preview}");
    }
    Ok(())
}
