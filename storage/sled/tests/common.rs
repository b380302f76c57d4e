use std::str::FromStr;
use std::sync::Arc;

use keel_core::{Document, ExecState, PlanExecutor, RecordId, ScanResult};
use keel_storage_sled::{SledCollection, SledStorageEngine};
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

/// Albums 1..=n in a temporary engine, each released in `1990 + (id * 7) % 13`
#[allow(unused)]
pub fn setup_albums(n: u64) -> Result<(SledStorageEngine, Arc<SledCollection>), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    let albums = engine.collection("albums")?;
    for i in 1..=n {
        albums.insert_with_id(RecordId::new(i), album(i))?;
    }
    Ok((engine, albums))
}

#[allow(unused)]
pub fn album(i: u64) -> Document { Document::new().with("name", format!("album {i}")).with("year", 1990 + ((i * 7) % 13) as i64) }

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
pub fn years(results: &[ScanResult]) -> Vec<i64> {
    results
        .iter()
        .map(|r| match r.key.as_ref().map(|k| &k.values()[0]) {
            Some(keel_core::Value::I64(i)) => *i,
            other => panic!("expected an integer key, got {other:?}"),
        })
        .collect()
}
