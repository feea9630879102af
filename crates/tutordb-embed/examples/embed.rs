use std::time::Duration;

use tutordb_core::config::Config;
use tutordb_embed::get_default_embedder;

// Embed the given texts with the configured provider and print their shapes.
// Usage:
//   cargo run -p tutordb-embed --example embed -- "text one" "text two"

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let mut texts: Vec<String> = std::env::args().skip(1).collect();
    if texts.is_empty() { texts = vec!["死锁是什么".to_string(), "页面置换算法".to_string()]; }
    let embedder = get_default_embedder(&settings.embedding, Duration::from_secs(settings.embedding.query_timeout_secs))?;
    let embs = embedder.embed_batch(&texts)?;
    for (t, e) in texts.iter().zip(&embs) { println!("dim={} {}", e.len(), t); }
    Ok(())
}
