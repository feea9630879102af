use tutordb_core::Error;
use tutordb_text::{load, persist, tokenize, Bm25Index};

fn texts() -> Vec<&'static str> {
    vec![
        "死锁是指两个或多个进程因争夺资源而互相等待",
        "页面置换算法包括 FIFO、LRU 和 OPT",
        "银行家算法用于避免死锁",
        "文件系统负责管理磁盘上的文件",
    ]
}

#[test]
fn reloaded_index_scores_identically() -> anyhow::Result<()> {
    let built = Bm25Index::build(texts().iter().map(|t| tokenize(t)).collect());
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bm25.json");
    persist(&built, &path)?;
    let loaded = load(&path)?;
    assert_eq!(loaded.len(), 4);
    for q in ["死锁", "LRU 算法", "磁盘文件", "无关查询"] {
        let q = tokenize(q);
        assert_eq!(built.score(&q), loaded.score(&q));
        assert_eq!(built.top_k(&q, 3), loaded.top_k(&q, 3));
    }
    Ok(())
}

#[test]
fn token_file_is_plain_json() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bm25.json");
    persist(&Bm25Index::build(vec![tokenize("进程"), tokenize("线程")]), &path)?;
    let value: serde_json::Value = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(value, serde_json::json!({ "tokens": [["进", "程"], ["线", "程"]] }));
    Ok(())
}

#[test]
fn deadlock_query_prefers_deadlock_chunks() {
    let idx = Bm25Index::build(texts().iter().map(|t| tokenize(t)).collect());
    let rows: Vec<usize> = idx.top_k(&tokenize("死锁"), 2).into_iter().map(|(_, r)| r).collect();
    let mut sorted = rows.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 2]);
}

#[test]
fn malformed_token_file_is_corrupt() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bm25.json");
    std::fs::write(&path, b"\x00\x01 not json")?;
    assert!(matches!(load(&path), Err(Error::CorruptIndex { .. })));
    Ok(())
}
