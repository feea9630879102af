use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tutordb_core::config::Settings;
use tutordb_core::corpus::PageExtractor;
use tutordb_core::metadata::read_metadata;
use tutordb_core::progress::ProgressStep;
use tutordb_core::traits::{Embedder, SearchEngine};
use tutordb_core::types::{DocumentScope, Owner, SourceKind};
use tutordb_core::Error;
use tutordb_embed::FakeEmbedder;
use tutordb_hybrid::{IndexManager, RetrieverCache, Scheduled};
use tutordb_text::tokenize;

/// `.pdf` fixtures are plain text with form-feed page breaks; a `%CORRUPT`
/// prefix simulates an unreadable file.
struct FormFeedPages {
    delay: Duration,
}

impl PageExtractor for FormFeedPages {
    fn extension(&self) -> &str { "pdf" }
    fn pages(&self, path: &Path) -> tutordb_core::Result<Vec<String>> {
        std::thread::sleep(self.delay);
        let raw = fs::read_to_string(path)?;
        if raw.starts_with("%CORRUPT") {
            return Err(Error::Document { path: path.to_path_buf(), reason: "bad xref".into() });
        }
        Ok(raw.split('\u{c}').map(str::to_string).collect())
    }
}

struct Fixture {
    _tmp: TempDir,
    settings: Arc<Settings>,
    embedder: Arc<FakeEmbedder>,
    manager: Arc<IndexManager>,
}

fn fixture(delay: Duration) -> Fixture {
    let tmp = tempfile::tempdir().expect("tmp");
    let root = tmp.path();
    let mut settings = Settings::default();
    settings.data.data_dir = root.join("users").to_string_lossy().into_owned();
    settings.data.pdf_dir = root.join("pdfs").to_string_lossy().into_owned();
    settings.data.index_dir = root.join("index").to_string_lossy().into_owned();
    settings.chunking.chunk_size = 24;
    settings.chunking.overlap = 4;
    settings.retrieval.top_k = 4;
    settings.embedding.batch_size = 3;
    let settings = Arc::new(settings);
    let embedder = Arc::new(FakeEmbedder::new(64));
    let cache = Arc::new(RetrieverCache::new(Arc::clone(&settings), embedder.clone()));
    let manager = IndexManager::new(Arc::clone(&settings), embedder.clone(), cache)
        .with_extractor(Arc::new(FormFeedPages { delay }));
    Fixture { _tmp: tmp, settings, embedder, manager: Arc::new(manager) }
}

fn write_global(f: &Fixture, name: &str, body: &str) {
    let dir = f.settings.pdf_dir();
    fs::create_dir_all(&dir).expect("mkdir");
    fs::write(dir.join(name), body).expect("write");
}

const OS_NOTES: &str = "死锁是指两个或多个进程在执行过程中因争夺资源而造成的互相等待的现象\u{c}银行家算法通过安全性检查来避免系统进入不安全状态";
const MEMORY_NOTES: &str = "页面置换算法包括先进先出、最近最久未使用和最佳置换\u{c}虚拟内存让进程看到连续的地址空间";

#[test]
fn rebuild_keeps_ids_aligned_across_all_three_files() {
    let f = fixture(Duration::ZERO);
    write_global(&f, "a-os.pdf", OS_NOTES);
    write_global(&f, "b-memory.pdf", MEMORY_NOTES);

    let summary = f.manager.rebuild(&Owner::Global).expect("rebuild");
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.dim, Some(64));

    let paths = f.manager.paths(&Owner::Global);
    let records = read_metadata(&paths.meta()).expect("meta");
    let vectors = tutordb_vector::load(&paths.vectors()).expect("vectors");
    let lexical = tutordb_text::load(&paths.lexical()).expect("lexical");
    assert_eq!(records.len(), summary.chunks);
    assert_eq!(vectors.len(), records.len());
    assert_eq!(lexical.len(), records.len());
    for r in &records {
        assert_eq!(vectors.row(r.id), Some(f.embedder.embed(&r.text).expect("embed").as_slice()));
        assert_eq!(lexical.tokens()[r.id], tokenize(&r.text));
    }
    assert!(!paths.staging_dir().exists());

    let status = f.manager.status(&Owner::Global).expect("status").expect("state");
    assert_eq!((status.step, status.percent), (ProgressStep::Done, 100));
}

#[test]
fn composite_search_orders_vector_before_lexical() {
    let f = fixture(Duration::ZERO);
    write_global(&f, "a-os.pdf", OS_NOTES);
    write_global(&f, "b-memory.pdf", MEMORY_NOTES);
    f.manager.rebuild(&Owner::Global).expect("rebuild");

    let hits = f.manager.cache().search(None, "死锁 资源").expect("search");
    assert!(!hits.is_empty() && hits.len() <= 4);
    let first_lexical = hits.iter().position(|h| h.kind == SourceKind::Lexical).unwrap_or(hits.len());
    assert!(hits[first_lexical..].iter().all(|h| h.kind == SourceKind::Lexical));
    for pair in hits[..first_lexical].windows(2).chain(hits[first_lexical..].windows(2)) {
        assert!(pair[0].score >= pair[1].score);
    }
    let mut texts: Vec<&str> = hits.iter().map(|h| h.text.trim()).collect();
    texts.sort_unstable();
    texts.dedup();
    assert_eq!(texts.len(), hits.len());
}

#[test]
fn owner_without_documents_searches_empty() {
    let f = fixture(Duration::ZERO);
    assert!(f.manager.cache().search(Some(9), "死锁").expect("search").is_empty());
    assert!(matches!(f.manager.cache().get(&Owner::User(9)), Err(Error::CorpusNotBuilt(_))));
}

#[test]
fn stale_cache_entry_reloads_after_rebuild_elsewhere() {
    let f = fixture(Duration::ZERO);
    write_global(&f, "a-os.pdf", OS_NOTES);
    f.manager.rebuild(&Owner::Global).expect("rebuild");

    let reader = RetrieverCache::new(Arc::clone(&f.settings), f.embedder.clone());
    let before = reader.get(&Owner::Global).expect("get").len();
    write_global(&f, "b-memory.pdf", MEMORY_NOTES);
    f.manager.rebuild(&Owner::Global).expect("rebuild");
    let after = reader.get(&Owner::Global).expect("get").len();
    assert!(after > before, "{after} > {before}");
}

#[tokio::test]
async fn upload_and_delete_rebuild_the_user_corpus() {
    let f = fixture(Duration::ZERO);
    write_global(&f, "a-os.pdf", OS_NOTES);
    f.manager.rebuild(&Owner::Global).expect("rebuild");
    let user = Owner::User(7);

    assert_eq!(f.manager.add_document(7, "memory.pdf", MEMORY_NOTES.as_bytes()).expect("add"), Scheduled::Started);
    f.manager.wait_idle(&user).await;
    let status = f.manager.status(&user).expect("status").expect("state");
    assert_eq!(status.step, ProgressStep::Done);

    let hits = f.manager.cache().search(Some(7), "页面置换").expect("search");
    assert!(hits.iter().any(|h| h.source == "memory.pdf"));

    let listed = f.manager.list_documents(Some(7)).expect("list");
    let names: Vec<(&str, DocumentScope)> = listed.iter().map(|d| (d.name.as_str(), d.scope)).collect();
    assert_eq!(names, vec![("a-os.pdf", DocumentScope::Global), ("memory.pdf", DocumentScope::User)]);
    assert!(chrono::DateTime::parse_from_rfc3339(&listed[1].modified).is_ok());

    f.manager.remove_document(7, "memory.pdf").expect("remove");
    f.manager.wait_idle(&user).await;
    assert!(!f.manager.paths(&user).is_built());
    let hits = f.manager.cache().search(Some(7), "页面置换").expect("search");
    assert!(hits.iter().all(|h| h.source == "a-os.pdf"));
}

#[tokio::test]
async fn removing_unknown_or_global_documents_is_not_found() {
    let f = fixture(Duration::ZERO);
    write_global(&f, "a-os.pdf", OS_NOTES);
    assert!(matches!(f.manager.remove_document(7, "a-os.pdf"), Err(Error::NotFound(_))));
    assert!(matches!(f.manager.remove_document(7, "../a-os.pdf"), Err(Error::InvalidInput(_))));
    assert!(matches!(f.manager.add_document(7, "notes.txt", b"x"), Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn failed_rebuild_keeps_last_good_index() {
    let f = fixture(Duration::ZERO);
    let user = Owner::User(3);
    f.manager.add_document(3, "good.pdf", OS_NOTES.as_bytes()).expect("add");
    f.manager.wait_idle(&user).await;
    let good = f.manager.cache().get(&user).expect("built").len();

    f.manager.add_document(3, "broken.pdf", b"%CORRUPT").expect("add");
    f.manager.wait_idle(&user).await;
    let status = f.manager.status(&user).expect("status").expect("state");
    assert_eq!(status.step, ProgressStep::Failed);
    assert!(status.error.is_some());
    assert_eq!(f.manager.cache().get(&user).expect("still built").len(), good);
    assert!(!f.manager.paths(&user).staging_dir().exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_triggers_coalesce_into_one_follow_up() {
    let f = fixture(Duration::from_millis(200));
    let user = Owner::User(5);
    assert_eq!(f.manager.add_document(5, "one.pdf", OS_NOTES.as_bytes()).expect("add"), Scheduled::Started);
    assert_eq!(f.manager.add_document(5, "two.pdf", MEMORY_NOTES.as_bytes()).expect("add"), Scheduled::Coalesced);
    assert_eq!(f.manager.add_document(5, "three.pdf", OS_NOTES.as_bytes()).expect("add"), Scheduled::Coalesced);
    assert!(f.manager.is_rebuilding(&user));
    f.manager.wait_idle(&user).await;

    let records = read_metadata(&f.manager.paths(&user).meta()).expect("meta");
    let mut sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
    sources.dedup();
    assert_eq!(sources, vec!["one.pdf", "three.pdf", "two.pdf"]);
}

#[test]
fn interrupted_publish_never_pairs_scores_with_other_text() {
    let f = fixture(Duration::ZERO);
    let paths = f.manager.paths(&Owner::Global);
    write_global(&f, "a.pdf", "死锁死锁死锁");
    f.manager.rebuild(&Owner::Global).expect("rebuild");
    assert_eq!(f.manager.cache().get(&Owner::Global).expect("loaded").len(), 1);

    // A directory in place of the token file makes its rename fail mid-publish.
    fs::remove_file(paths.lexical()).expect("rm");
    fs::create_dir(paths.lexical()).expect("mkdir");
    write_global(&f, "a.pdf", "页面置换算法");
    assert!(f.manager.rebuild(&Owner::Global).is_err());
    let status = f.manager.status(&Owner::Global).expect("status").expect("state");
    assert_eq!(status.step, ProgressStep::Failed);

    // Already-moved files were put back.
    let records = read_metadata(&paths.meta()).expect("meta");
    assert_eq!(records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(), vec!["死锁死锁死锁"]);
    assert!(!paths.staging_dir().exists());

    // The serving cache keeps the last good corpus.
    let hits = f.manager.cache().search(None, "死锁").expect("search");
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.text == "死锁死锁死锁"));

    // A fresh reader never sees the new text behind the old vectors.
    let reader = RetrieverCache::new(Arc::clone(&f.settings), f.embedder.clone());
    if let Ok(retriever) = reader.get(&Owner::Global) {
        let hits = retriever.search("死锁").expect("search");
        assert!(hits.iter().all(|h| h.text == "死锁死锁死锁"));
    }
    assert!(reader.search(None, "页面").expect("search").iter().all(|h| h.text != "页面置换算法"));

    fs::remove_dir(paths.lexical()).expect("rmdir");
    f.manager.rebuild(&Owner::Global).expect("rebuild");
    let hits = f.manager.cache().search(None, "页面").expect("search");
    assert!(hits.iter().any(|h| h.text == "页面置换算法"));
    assert!(hits.iter().all(|h| h.text != "死锁死锁死锁"));
}

#[test]
fn missing_document_directory_leaves_the_index_alone() {
    let f = fixture(Duration::ZERO);
    write_global(&f, "a-os.pdf", OS_NOTES);
    let built = f.manager.rebuild(&Owner::Global).expect("rebuild");
    let paths = f.manager.paths(&Owner::Global);

    fs::remove_dir_all(&paths.docs_dir).expect("rm docs");
    let err = f.manager.rebuild(&Owner::Global).expect_err("missing dir");
    assert!(matches!(err, Error::NotFound(_)), "{err}");
    assert!(paths.is_built());
    assert_eq!(read_metadata(&paths.meta()).expect("meta").len(), built.chunks);
    assert!(!f.manager.cache().search(None, "死锁").expect("search").is_empty());

    // An existing but empty directory still clears the index.
    fs::create_dir_all(&paths.docs_dir).expect("mkdir");
    let summary = f.manager.rebuild(&Owner::Global).expect("rebuild");
    assert_eq!((summary.documents, summary.chunks, summary.dim), (0, 0, None));
    assert!(!paths.is_built());
    assert!(!paths.manifest().exists());
}

#[test]
fn scheduling_outside_a_runtime_is_refused() {
    let f = fixture(Duration::ZERO);
    assert!(matches!(f.manager.add_document(1, "x.pdf", b"text"), Err(Error::Configuration(_))));
}
