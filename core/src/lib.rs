pub mod bounds;
pub mod error;
pub mod executor;
pub mod indexing;
pub mod planner;
pub mod stage;
pub mod storage;
pub mod types;
pub mod value;

pub use bounds::{KeyRange, ScanBounds};
pub use error::{BoundsError, PlanError, StorageError};
pub use executor::{ExecState, ExecutorState, PlanExecutor, PlanKind};
pub use indexing::{IndexDescriptor, IndexDirection, KeyPart, KeyPattern};
pub use planner::InternalPlanner;
pub use stage::ScanResult;
pub use storage::Collection;
pub use types::{Direction, IndexScanOptions, RecordId};
pub use value::{Document, IndexKey, Value};
