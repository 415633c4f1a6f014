//! Collection and item operations behind the HTTP handlers.
//!
//! Every function that touches a sequence runs the ownership guard first
//! and then delegates to the `OrderStore`, which owns atomicity.

use uuid::Uuid;

use crate::{
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        BulkReorderMode, Collection, CollectionKind, ItemRevision, MoveOutcome, NewItem, OrderedItem,
        PositionUpdate, Principal, ReorderEntry, SequenceKey, SequenceSnapshot,
    },
    services::{ownership::assert_ownership, reorder},
    store::OrderStore,
};

const LISTING_CACHE_TTL: u64 = 300; // 5 minutes

pub async fn create_collection(
    store: &dyn OrderStore,
    principal: &Principal,
    kind: CollectionKind,
    name: &str,
) -> AppResult<Collection> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Name is required".to_string()));
    }

    let collection = store
        .create_collection(principal.user_id(), kind, name.to_string())
        .await?;

    tracing::info!(
        user_id = %principal.user_id(),
        collection_id = %collection.id,
        kind = %kind,
        "Created collection"
    );

    Ok(collection)
}

/// Reads a sequence, going through the listing cache when one is configured
pub async fn list_items(
    store: &dyn OrderStore,
    cache: Option<&Cache>,
    principal: &Principal,
    key: SequenceKey,
) -> AppResult<SequenceSnapshot> {
    assert_ownership(store, principal, key).await?;

    let Some(cache) = cache else {
        return store.list_items(key).await;
    };

    let version = store.sequence_version(key).await?;
    let cache_key = CacheKey::Sequence { key, version };

    match cache.get_from_cache::<SequenceSnapshot>(&cache_key).await {
        Ok(Some(snapshot)) => {
            tracing::debug!(sequence = %key, version, "Cache hit");
            return Ok(snapshot);
        }
        Ok(None) => tracing::debug!(sequence = %key, version, "Cache miss"),
        Err(e) => tracing::warn!(error = %e, sequence = %key, "Cache read failed"),
    }

    let snapshot = store.list_items(key).await?;
    let cache_key = CacheKey::Sequence {
        key,
        version: snapshot.version,
    };
    cache.set_in_background(&cache_key, &snapshot, LISTING_CACHE_TTL);

    Ok(snapshot)
}

pub async fn append_item(
    store: &dyn OrderStore,
    principal: &Principal,
    key: SequenceKey,
    item: NewItem,
) -> AppResult<OrderedItem> {
    assert_ownership(store, principal, key).await?;

    if item.title.trim().is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }

    let created = store.append_item(key, item).await?;

    tracing::info!(
        sequence = %key,
        item_id = %created.id,
        position = created.position,
        "Appended item"
    );

    Ok(created)
}

pub async fn delete_item(
    store: &dyn OrderStore,
    principal: &Principal,
    key: SequenceKey,
    item_id: Uuid,
) -> AppResult<()> {
    assert_ownership(store, principal, key).await?;
    store.delete_item(key, item_id).await?;

    tracing::info!(sequence = %key, item_id = %item_id, "Deleted item");
    Ok(())
}

/// Moves one item to a 1-based position
pub async fn move_item(
    store: &dyn OrderStore,
    principal: &Principal,
    key: SequenceKey,
    item_id: Uuid,
    position: i64,
    expected_version: Option<i64>,
) -> AppResult<MoveOutcome> {
    assert_ownership(store, principal, key).await?;

    let new_position = reorder::move_target(position);
    let outcome = store
        .move_item(key, item_id, new_position, expected_version)
        .await?;

    tracing::info!(
        sequence = %key,
        item_id = %item_id,
        position = new_position,
        updated = outcome.updated,
        version = outcome.version,
        "Moved item"
    );

    Ok(outcome)
}

/// Applies an optional move followed by an optional note edit.
///
/// The move runs first so an out-of-range position leaves the note untouched.
/// `expected_version` is checked once, by whichever write runs first.
pub async fn update_item(
    store: &dyn OrderStore,
    principal: &Principal,
    key: SequenceKey,
    item_id: Uuid,
    position: Option<i64>,
    note: Option<String>,
    mut expected_version: Option<i64>,
) -> AppResult<ItemRevision> {
    if position.is_none() && note.is_none() {
        return Err(AppError::InvalidInput("Nothing to update".to_string()));
    }

    let mut updated = None;
    if let Some(position) = position {
        let outcome =
            move_item(store, principal, key, item_id, position, expected_version.take()).await?;
        updated = Some(ItemRevision {
            item: outcome.item,
            version: outcome.version,
        });
    } else {
        assert_ownership(store, principal, key).await?;
    }

    if let Some(note) = note {
        let revision = store
            .update_note(key, item_id, Some(note), expected_version)
            .await?;
        tracing::info!(
            sequence = %key,
            item_id = %item_id,
            version = revision.version,
            "Updated item note"
        );
        updated = Some(revision);
    }

    updated.ok_or_else(|| AppError::Internal("Item update produced no result".to_string()))
}

/// Applies a client-supplied ordering and returns the new revision.
///
/// In lenient mode the valid rows stay committed even when some entries
/// are rejected; the rejected ids are reported through
/// `AppError::PartialReorder`.
pub async fn bulk_reorder(
    store: &dyn OrderStore,
    principal: &Principal,
    key: SequenceKey,
    entries: Vec<ReorderEntry>,
    mode: BulkReorderMode,
    expected_version: Option<i64>,
) -> AppResult<i64> {
    assert_ownership(store, principal, key).await?;

    if entries.is_empty() {
        return Err(AppError::InvalidInput("Items array is required".to_string()));
    }

    let updates = entries
        .iter()
        .map(|entry| {
            reorder::parse_position(entry.position).map(|position| PositionUpdate::new(entry.id, position))
        })
        .collect::<AppResult<Vec<_>>>()?;

    let outcome = store
        .bulk_reorder(key, updates, mode, expected_version)
        .await?;

    tracing::info!(
        sequence = %key,
        requested = entries.len(),
        updated = outcome.updated,
        failed = outcome.failed_ids.len(),
        version = outcome.version,
        "Bulk reorder applied"
    );

    if !outcome.failed_ids.is_empty() {
        tracing::warn!(
            sequence = %key,
            failed_ids = ?outcome.failed_ids,
            "Bulk reorder partially failed"
        );
        return Err(AppError::PartialReorder {
            message: "Failed to reorder some items".to_string(),
            failed_ids: outcome.failed_ids,
        });
    }

    Ok(outcome.version)
}
