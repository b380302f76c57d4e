//! Off-the-shelf plans for internal callers that need a plain collection or index traversal
//! without going through query planning.

use std::sync::Arc;

use tracing::debug;

use crate::bounds::ScanBounds;
use crate::error::PlanError;
use crate::executor::PlanExecutor;
use crate::indexing::IndexDescriptor;
use crate::stage::{CollectionScanStage, FetchStage, IndexScanStage, StageChain};
use crate::storage::Collection;
use crate::types::{Direction, IndexScanOptions, RecordId};
use crate::value::IndexKey;

pub struct InternalPlanner;

impl InternalPlanner {
    /// Scan every record of `collection` in record id order.
    ///
    /// With `start`, the scan resumes strictly after (or, backward, strictly before) that record,
    /// which must exist.
    pub fn collection_scan(
        collection: Arc<dyn Collection>,
        direction: Direction,
        start: Option<RecordId>,
    ) -> Result<PlanExecutor, PlanError> {
        check_collection(collection.as_ref())?;
        if let Some(start) = start {
            if !collection.contains(start)? {
                return Err(PlanError::StartRecordNotFound(start));
            }
        }

        let cursor = collection.record_cursor(direction, start)?;
        let namespace = collection.name().to_owned();
        debug!(ns = %namespace, ?direction, start = ?start, "built collection scan");

        let root = StageChain::CollectionScan(CollectionScanStage::new(cursor));
        Ok(PlanExecutor::new(namespace, Some(collection), None, direction, root))
    }

    /// Scan the entries of `descriptor` between `start_key` (inclusive) and `end_key`.
    ///
    /// Bounds are given in index key order whatever the direction; a backward scan begins at
    /// `end_key`. With [`IndexScanOptions::Fetch`] every entry is joined to its document.
    pub fn index_scan(
        collection: Arc<dyn Collection>,
        descriptor: &IndexDescriptor,
        start_key: IndexKey,
        end_key: IndexKey,
        end_key_inclusive: bool,
        direction: Direction,
        options: IndexScanOptions,
    ) -> Result<PlanExecutor, PlanError> {
        check_collection(collection.as_ref())?;
        if !collection.has_index(descriptor)? {
            return Err(PlanError::IndexNotFound { collection: collection.name().to_owned(), index: descriptor.name.clone() });
        }

        let range = ScanBounds::new(start_key, end_key, end_key_inclusive).normalize(&descriptor.pattern, direction)?;
        let cursor = collection.index_cursor(descriptor, range.seek.clone(), direction)?;
        let namespace = collection.name().to_owned();
        debug!(ns = %namespace, index = %descriptor.name, ?direction, ?options, "built index scan");

        let scan = IndexScanStage::new(cursor, range);
        let root = match options {
            IndexScanOptions::Default => StageChain::IndexScan(scan),
            IndexScanOptions::Fetch => StageChain::IndexScanFetch(FetchStage::new(scan, collection.clone())),
        };
        Ok(PlanExecutor::new(namespace, Some(collection), Some(descriptor.clone()), direction, root))
    }

    /// A plan that yields nothing, for a namespace whose collection does not exist.
    pub fn eof<S: Into<String>>(namespace: S) -> PlanExecutor {
        PlanExecutor::new(namespace.into(), None, None, Direction::Forward, StageChain::Eof)
    }
}

fn check_collection(collection: &dyn Collection) -> Result<(), PlanError> {
    if collection.is_valid() {
        Ok(())
    } else {
        Err(PlanError::InvalidCollection(collection.name().to_owned()))
    }
}
