use std::str::FromStr;
use std::sync::Arc;

use keel_core::storage::memory::MemoryCollection;
use keel_core::{Document, ExecState, PlanExecutor, RecordId, ScanResult};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Collection holding records 1..=n, each with `n` set to ten times its id
#[allow(unused)]
pub fn numbered_collection(name: &str, n: u64) -> Arc<MemoryCollection> {
    let coll = MemoryCollection::new(name);
    for i in 1..=n {
        coll.insert_with_id(RecordId::new(i), Document::new().with("n", (i * 10) as i64)).unwrap();
    }
    Arc::new(coll)
}

/// Drive an executor to EOF, collecting advanced results
#[allow(unused)]
pub fn drain(exec: &mut PlanExecutor) -> Vec<ScanResult> {
    let mut out = Vec::new();
    loop {
        match exec.get_next().unwrap() {
            ExecState::Advanced(result) => out.push(result),
            ExecState::RecordMissing { record_id, .. } => panic!("unexpected missing record {record_id}"),
            ExecState::Eof => return out,
        }
    }
}

#[allow(unused)]
pub fn record_ids(results: &[ScanResult]) -> Vec<u64> { results.iter().map(|r| r.record_id.as_u64()).collect() }

#[allow(unused)]
pub fn int_keys(results: &[ScanResult]) -> Vec<i64> {
    results
        .iter()
        .map(|r| match r.key.as_ref().map(|k| &k.values()[0]) {
            Some(keel_core::Value::I64(i)) => *i,
            other => panic!("expected an integer key, got {other:?}"),
        })
        .collect()
}
