use std::path::PathBuf;

use tutordb_core::config::Config;

// Print the shape of a persisted vector index.
// Usage:
//   cargo run -p tutordb-vector --example inspect -- [path/to/vectors.bin]

fn main() -> anyhow::Result<()> {
    let path = match std::env::args().nth(1) {
        Some(p) => PathBuf::from(p),
        None => Config::load()?.settings()?.index_dir().join(tutordb_core::layout::VECTOR_FILE),
    };
    let index = tutordb_vector::load(&path)?;
    println!("{}: rows={} dim={}", path.display(), index.len(), index.dim());
    if let Some(row) = index.row(0) {
        let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        println!("row 0 norm={norm:.4}");
    }
    Ok(())
}
