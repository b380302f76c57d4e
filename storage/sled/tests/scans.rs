mod common;
use common::*;

use keel_core::{
    Direction, Document, ExecState, IndexKey, IndexScanOptions, InternalPlanner, KeyPart, KeyPattern, PlanKind, RecordId, Value,
};
use keel_storage_sled::{SledError, SledStorageEngine};

#[test]
fn test_collection_scan_both_directions() -> Result<(), anyhow::Error> {
    let (_engine, albums) = setup_albums(6)?;

    let mut exec = InternalPlanner::collection_scan(albums.clone(), Direction::Forward, None)?;
    assert_eq!(exec.kind(), PlanKind::CollectionScan);
    let results = drain(&mut exec);
    assert_eq!(record_ids(&results), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(results[2].document, Some(album(3)));

    let mut exec = InternalPlanner::collection_scan(albums, Direction::Backward, None)?;
    assert_eq!(record_ids(&drain(&mut exec)), vec![6, 5, 4, 3, 2, 1]);
    Ok(())
}

#[test]
fn test_collection_scan_resume() -> Result<(), anyhow::Error> {
    let (_engine, albums) = setup_albums(6)?;
    let mut exec = InternalPlanner::collection_scan(albums.clone(), Direction::Forward, Some(RecordId::new(4)))?;
    assert_eq!(record_ids(&drain(&mut exec)), vec![5, 6]);
    let mut exec = InternalPlanner::collection_scan(albums, Direction::Backward, Some(RecordId::new(4)))?;
    assert_eq!(record_ids(&drain(&mut exec)), vec![3, 2, 1]);
    Ok(())
}

#[test]
fn test_record_ids_above_one_byte_stay_ordered() -> Result<(), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    let albums = engine.collection("albums")?;
    for id in [300u64, 2, 256, 1 << 40, 255] {
        albums.insert_with_id(RecordId::new(id), album(id))?;
    }
    let mut exec = InternalPlanner::collection_scan(albums.clone(), Direction::Forward, None)?;
    assert_eq!(record_ids(&drain(&mut exec)), vec![2, 255, 256, 300, 1 << 40]);

    // Plain inserts continue after the highest id
    assert_eq!(albums.insert(album(1))?, RecordId::new((1 << 40) + 1));
    Ok(())
}

#[test]
fn test_insert_after_largest_record_id() -> Result<(), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    let albums = engine.collection("albums")?;
    assert_eq!(albums.insert(album(1))?, RecordId::new(1));
    albums.insert_with_id(RecordId::new(u64::MAX), album(2))?;

    assert!(matches!(albums.insert(album(3)), Err(SledError::RecordIdsExhausted(name)) if name == "albums"));
    let mut exec = InternalPlanner::collection_scan(albums, Direction::Forward, None)?;
    assert_eq!(record_ids(&drain(&mut exec)), vec![1, u64::MAX]);
    Ok(())
}

#[test]
fn test_index_scan_bounds() -> Result<(), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    let albums = engine.collection("albums")?;
    let descriptor = albums.create_index(KeyPattern::new(vec![KeyPart::asc("year")]))?;
    for (i, year) in [10, 20, 30, 40].into_iter().enumerate() {
        albums.insert_with_id(RecordId::new(i as u64 + 1), Document::new().with("year", year))?;
    }

    let scan = |inclusive, direction| -> Result<Vec<i64>, anyhow::Error> {
        let mut exec = InternalPlanner::index_scan(
            albums.clone(),
            &descriptor,
            IndexKey::single(20),
            IndexKey::single(40),
            inclusive,
            direction,
            IndexScanOptions::Default,
        )?;
        Ok(years(&drain(&mut exec)))
    };
    assert_eq!(scan(false, Direction::Forward)?, vec![20, 30]);
    assert_eq!(scan(false, Direction::Backward)?, vec![30, 20]);
    assert_eq!(scan(true, Direction::Forward)?, vec![20, 30, 40]);
    assert_eq!(scan(true, Direction::Backward)?, vec![40, 30, 20]);
    Ok(())
}

#[test]
fn test_index_backfill_and_maintenance() -> Result<(), anyhow::Error> {
    let (_engine, albums) = setup_albums(13)?;
    // Created after the records exist
    let descriptor = albums.create_index(KeyPattern::new(vec![KeyPart::desc("year")]))?;
    assert_eq!(descriptor.name, "year_desc");

    let full = |direction| -> Result<Vec<i64>, anyhow::Error> {
        let mut exec = InternalPlanner::index_scan(
            albums.clone(),
            &descriptor,
            IndexKey::single(Value::MaxKey),
            IndexKey::single(Value::MinKey),
            true,
            direction,
            IndexScanOptions::Default,
        )?;
        Ok(years(&drain(&mut exec)))
    };
    let expected: Vec<i64> = (1990..=2002).rev().collect();
    assert_eq!(full(Direction::Forward)?, expected);

    // Moving a record's key and removing another are reflected in the index
    albums.insert_with_id(RecordId::new(1), Document::new().with("year", 2050))?;
    albums.remove(RecordId::new(2))?;
    let after = full(Direction::Backward)?;
    assert_eq!(after.first(), Some(&1990));
    assert_eq!(after.last(), Some(&2050));
    assert!(!after.contains(&1991));
    assert!(!after.contains(&1997));
    assert_eq!(after.len(), 13 - 1);
    Ok(())
}

#[test]
fn test_fetch_joins_documents() -> Result<(), anyhow::Error> {
    let (_engine, albums) = setup_albums(13)?;
    let descriptor = albums.create_index(KeyPattern::new(vec![KeyPart::asc("year")]))?;
    let mut exec = InternalPlanner::index_scan(
        albums.clone(),
        &descriptor,
        IndexKey::single(1995),
        IndexKey::single(1998),
        false,
        Direction::Backward,
        IndexScanOptions::Fetch,
    )?;
    assert_eq!(exec.kind(), PlanKind::IndexScanFetch);
    let results = drain(&mut exec);
    assert_eq!(years(&results), vec![1997, 1996, 1995]);
    for result in &results {
        assert_eq!(result.document, Some(album(result.record_id.as_u64())));
    }
    Ok(())
}

#[test]
fn test_compound_index_orders_within_prefix() -> Result<(), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    let albums = engine.collection("albums")?;
    let descriptor = albums.create_index(KeyPattern::new(vec![KeyPart::asc("year"), KeyPart::desc("name")]))?;
    for (year, name) in [(2001, "b"), (2000, "a"), (2001, "a"), (2000, "c"), (2002, "z")] {
        albums.insert(Document::new().with("year", year).with("name", name))?;
    }

    let mut exec = InternalPlanner::index_scan(
        albums,
        &descriptor,
        IndexKey::new(vec![Value::I64(2001), Value::MaxKey]),
        IndexKey::new(vec![Value::I64(2001), Value::MinKey]),
        true,
        Direction::Forward,
        IndexScanOptions::Default,
    )?;
    let keys: Vec<IndexKey> = drain(&mut exec).into_iter().filter_map(|r| r.key).collect();
    assert_eq!(keys, vec![IndexKey::new(vec![Value::I64(2001), Value::from("b")]), IndexKey::new(vec![Value::I64(2001), Value::from("a")])]);
    Ok(())
}

#[test]
fn test_missing_collection_is_an_eof_plan() -> Result<(), anyhow::Error> {
    let engine = SledStorageEngine::new_test()?;
    assert!(engine.list_collections().is_empty());
    let mut exec = InternalPlanner::eof("nowhere");
    assert_eq!(exec.get_next()?, ExecState::Eof);
    Ok(())
}
