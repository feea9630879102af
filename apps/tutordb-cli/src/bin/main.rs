use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tutordb_cli::{build_embedder, index_manager, init_tracing, load_settings, query_embedder};
use tutordb_core::config::Settings;
use tutordb_core::traits::Embedder;
use tutordb_core::types::Owner;
use tutordb_hybrid::{RetrieverCache, Scheduled};

const USAGE: &str = "Usage: tutordb <command> [args...]

Commands:
  query <text...> [--user ID] [--json]   search the global corpus (plus the user's)
  status [--user ID]                     show the latest rebuild progress
  list [--user ID]                       list global and user documents
  add <USER_ID> <FILE.pdf>               upload a document and rebuild that user's index
  remove <USER_ID> <NAME.pdf>            delete a user document and rebuild
  rebuild [--user ID]                    rebuild one corpus in the foreground";

struct Args {
    cmd: String,
    positional: Vec<String>,
    user: Option<u64>,
    json: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("{USAGE}");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    let mut positional = Vec::new();
    let mut user = None;
    let mut json = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--user" | "-u" => {
                let id = args.get(i + 1).ok_or_else(|| anyhow::anyhow!("--user requires an id"))?;
                user = Some(id.parse()?);
                i += 1;
            }
            "--json" => json = true,
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }
    Ok(Args { cmd, positional, user, json })
}

fn owner_of(user: Option<u64>) -> Owner {
    user.map_or(Owner::Global, Owner::User)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = Arc::new(load_settings()?);
    let args = parse_args()?;

    match args.cmd.as_str() {
        "query" => {
            let query = args.positional.join(" ");
            if query.trim().is_empty() {
                anyhow::bail!("query text is required");
            }
            let cache = RetrieverCache::new(Arc::clone(&settings), query_embedder(&settings)?);
            let hits = cache.search(args.user, &query)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
                return Ok(());
            }
            if hits.is_empty() {
                println!("No results. Build the index first with tutordb-indexer.");
            }
            for (i, hit) in hits.iter().enumerate() {
                let preview: String = hit.text.chars().take(80).collect();
                println!("{:>2}. [{:?} {:.3}] {} p.{}", i + 1, hit.kind, hit.score, hit.source, hit.page);
                println!("    {}", preview.replace('\n', " "));
            }
        }
        "status" => {
            let manager = index_manager(&settings, None);
            let owner = owner_of(args.user);
            match manager.status(&owner)? {
                Some(state) => println!("{owner}: {}", serde_json::to_string(&state)?),
                None => println!("{owner}: no rebuild recorded"),
            }
            println!("built: {}", manager.paths(&owner).is_built());
        }
        "list" => {
            let manager = index_manager(&settings, None);
            for doc in manager.list_documents(args.user)? {
                println!("{:<7} {}  {}", format!("{:?}", doc.scope).to_lowercase(), doc.modified, doc.name);
            }
        }
        "rebuild" => {
            let owner = owner_of(args.user);
            let manager = index_manager(&settings, Some(embedders(&settings)?));
            let summary = manager.rebuild(&owner)?;
            println!("✅ {owner}: {} documents, {} chunks", summary.documents, summary.chunks);
        }
        "add" | "remove" => {
            let [user, name] = args.positional.as_slice() else {
                anyhow::bail!("{USAGE}");
            };
            let user: u64 = user.parse()?;
            let manager = index_manager(&settings, Some(embedders(&settings)?));
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(async {
                let scheduled = if args.cmd == "add" {
                    let path = PathBuf::from(name);
                    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or(name.as_str()).to_string();
                    let bytes = std::fs::read(&path)?;
                    manager.add_document(user, &file_name, &bytes)?
                } else {
                    manager.remove_document(user, name)?
                };
                if scheduled == Scheduled::Coalesced {
                    println!("A rebuild is already running; queued another one after it.");
                }
                manager.wait_idle(&Owner::User(user)).await;
                anyhow::Ok(())
            })?;
            drop(rt);
            match manager.status(&Owner::User(user))? {
                Some(state) => println!("user:{user}: {}", serde_json::to_string(&state)?),
                None => println!("user:{user}: no rebuild recorded"),
            }
        }
        other => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            std::process::exit(1);
        }
    }
    Ok(())
}

/// Build-timeout embedder for rebuilds, query-timeout embedder for the cache.
fn embedders(settings: &Settings) -> anyhow::Result<(Arc<dyn Embedder>, Arc<dyn Embedder>)> {
    Ok((build_embedder(settings)?, query_embedder(settings)?))
}
