//! Persistence for collections and their ordered items
//!
//! Each sequence (`SequenceKey`) carries a revision counter. Every mutation
//! runs as one serialized unit per sequence: read the current ordering,
//! plan with `services::reorder`, write only the changed rows, bump the
//! revision. Callers may pass the revision they last observed to detect
//! concurrent edits.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        BulkOutcome, BulkReorderMode, Collection, CollectionKind, ItemRevision, MoveOutcome, NewItem,
        OrderedItem, PositionUpdate, SequenceKey, SequenceSnapshot, User,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// Resolves an identity-provider subject to an internal user
    async fn find_user_by_external_id(&self, external_id: &str) -> AppResult<Option<User>>;

    async fn create_collection(
        &self,
        owner_id: Uuid,
        kind: CollectionKind,
        name: String,
    ) -> AppResult<Collection>;

    async fn find_collection(&self, id: Uuid) -> AppResult<Option<Collection>>;

    /// Items of one sequence, ascending by position
    async fn list_items(&self, key: SequenceKey) -> AppResult<SequenceSnapshot>;

    /// Current revision of a sequence, 0 if it was never mutated
    async fn sequence_version(&self, key: SequenceKey) -> AppResult<i64>;

    /// Appends at `max(position) + 1`
    async fn append_item(&self, key: SequenceKey, item: NewItem) -> AppResult<OrderedItem>;

    async fn update_note(
        &self,
        key: SequenceKey,
        item_id: Uuid,
        note: Option<String>,
        expected_version: Option<i64>,
    ) -> AppResult<ItemRevision>;

    /// Removes an item. Remaining positions are left as they are.
    async fn delete_item(&self, key: SequenceKey, item_id: Uuid) -> AppResult<()>;

    /// Moves one item and renumbers the sequence to `1..=N`
    async fn move_item(
        &self,
        key: SequenceKey,
        item_id: Uuid,
        new_position: i32,
        expected_version: Option<i64>,
    ) -> AppResult<MoveOutcome>;

    /// Applies a client-supplied ordering under the given mode
    async fn bulk_reorder(
        &self,
        key: SequenceKey,
        entries: Vec<PositionUpdate>,
        mode: BulkReorderMode,
        expected_version: Option<i64>,
    ) -> AppResult<BulkOutcome>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Rejects a mutation planned against a stale revision
pub(crate) fn check_version(current: i64, expected: Option<i64>) -> AppResult<()> {
    match expected {
        Some(expected) if expected != current => Err(AppError::Conflict(format!(
            "Collection was modified concurrently (expected version {}, found {})",
            expected, current
        ))),
        _ => Ok(()),
    }
}

fn item_not_found(item_id: Uuid) -> AppError {
    AppError::NotFound(format!("Item {} not found", item_id))
}
