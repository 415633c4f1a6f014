pub mod collection;
pub mod item;
pub mod requests;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use collection::{Collection, CollectionKind, Principal, User};
pub use item::{NewItem, OrderedItem, PositionUpdate, SequenceKey, SequenceKind};
pub use requests::*;

/// Validation policy for bulk reorder requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkReorderMode {
    /// Positions are written verbatim; rows that do not belong to the
    /// sequence are reported while the rest are committed.
    #[default]
    Lenient,
    /// Positions are written verbatim, but a single foreign id rejects
    /// the whole batch.
    Atomic,
    /// Like `Atomic`, and the batch must assign every item a distinct
    /// position from `1..=N`.
    Strict,
}

/// Row writes computed for a bulk reorder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkPlan {
    pub updates: Vec<PositionUpdate>,
    pub failed_ids: Vec<Uuid>,
}

/// Result of a committed single-item move
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub item: OrderedItem,
    /// Number of rows whose position changed
    pub updated: usize,
    pub version: i64,
}

/// An item together with the sequence revision it was read at
#[derive(Debug, Clone)]
pub struct ItemRevision {
    pub item: OrderedItem,
    pub version: i64,
}

/// Result of a committed bulk reorder
#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub updated: usize,
    /// Entries that did not belong to the sequence and were skipped
    pub failed_ids: Vec<Uuid>,
    pub version: i64,
}

/// Ordered contents of one sequence together with its revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSnapshot {
    pub items: Vec<OrderedItem>,
    pub version: i64,
}
