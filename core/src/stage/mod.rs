//! Pull-based execution stages.
//!
//! Each call to [`PlanStage::work`] advances a stage by at most one result. Stages own their
//! children and cursors, so dropping the root of a chain releases everything beneath it.

pub mod fetch;
pub mod scan_collection;
pub mod scan_index;

pub use fetch::FetchStage;
pub use scan_collection::CollectionScanStage;
pub use scan_index::IndexScanStage;

use crate::error::StorageError;
use crate::types::RecordId;
use crate::value::{Document, IndexKey};

/// One result flowing through a stage chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub record_id: RecordId,
    /// Present for index scans
    pub key: Option<IndexKey>,
    /// Present for collection scans and fetched index scans
    pub document: Option<Document>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageState {
    Advanced(ScanResult),
    /// The record an index entry points at was not there when fetched
    RecordMissing(ScanResult),
    IsEof,
}

pub trait PlanStage: Send {
    fn work(&mut self) -> Result<StageState, StorageError>;
    fn is_eof(&self) -> bool;
}

/// The shapes of plan the internal planner builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanKind {
    CollectionScan,
    IndexScan,
    IndexScanFetch,
    Eof,
}

/// Root of an executor's stage chain.
pub enum StageChain {
    Eof,
    CollectionScan(CollectionScanStage),
    IndexScan(IndexScanStage),
    IndexScanFetch(FetchStage<IndexScanStage>),
}

impl StageChain {
    pub fn kind(&self) -> PlanKind {
        match self {
            StageChain::Eof => PlanKind::Eof,
            StageChain::CollectionScan(_) => PlanKind::CollectionScan,
            StageChain::IndexScan(_) => PlanKind::IndexScan,
            StageChain::IndexScanFetch(_) => PlanKind::IndexScanFetch,
        }
    }
}

impl PlanStage for StageChain {
    fn work(&mut self) -> Result<StageState, StorageError> {
        match self {
            StageChain::Eof => Ok(StageState::IsEof),
            StageChain::CollectionScan(stage) => stage.work(),
            StageChain::IndexScan(stage) => stage.work(),
            StageChain::IndexScanFetch(stage) => stage.work(),
        }
    }

    fn is_eof(&self) -> bool {
        match self {
            StageChain::Eof => true,
            StageChain::CollectionScan(stage) => stage.is_eof(),
            StageChain::IndexScan(stage) => stage.is_eof(),
            StageChain::IndexScanFetch(stage) => stage.is_eof(),
        }
    }
}
