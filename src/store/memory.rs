use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        BulkOutcome, BulkReorderMode, Collection, CollectionKind, ItemRevision, MoveOutcome, NewItem,
        OrderedItem, PositionUpdate, SequenceKey, SequenceSnapshot, User,
    },
    services::reorder,
};

use super::{check_version, item_not_found, OrderStore};

/// In-process `OrderStore`
///
/// A single write lock covers every mutation, so read-plan-write cycles
/// never interleave.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: HashMap<Uuid, User>,
    collections: HashMap<Uuid, Collection>,
    /// Each vector is kept sorted by position
    items: HashMap<SequenceKey, Vec<OrderedItem>>,
    versions: HashMap<SequenceKey, i64>,
}

impl MemoryStoreInner {
    fn version(&self, key: &SequenceKey) -> i64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: SequenceKey) -> i64 {
        let version = self.versions.entry(key).or_insert(0);
        *version += 1;
        *version
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user; user provisioning belongs to the identity provider
    pub async fn insert_user(&self, external_id: &str, display_name: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            external_id: external_id.to_string(),
            display_name: display_name.map(str::to_string),
        };

        let mut inner = self.inner.write().await;
        inner.users.insert(user.id, user.clone());
        user
    }
}

#[async_trait::async_trait]
impl OrderStore for MemoryStore {
    async fn find_user_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|user| user.external_id == external_id)
            .cloned())
    }

    async fn create_collection(
        &self,
        owner_id: Uuid,
        kind: CollectionKind,
        name: String,
    ) -> AppResult<Collection> {
        let collection = Collection {
            id: Uuid::new_v4(),
            owner_id,
            kind,
            name,
            created_at: Utc::now(),
        };

        let mut inner = self.inner.write().await;
        inner.collections.insert(collection.id, collection.clone());
        Ok(collection)
    }

    async fn find_collection(&self, id: Uuid) -> AppResult<Option<Collection>> {
        let inner = self.inner.read().await;
        Ok(inner.collections.get(&id).cloned())
    }

    async fn list_items(&self, key: SequenceKey) -> AppResult<SequenceSnapshot> {
        let inner = self.inner.read().await;
        Ok(SequenceSnapshot {
            items: inner.items.get(&key).cloned().unwrap_or_default(),
            version: inner.version(&key),
        })
    }

    async fn sequence_version(&self, key: SequenceKey) -> AppResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner.version(&key))
    }

    async fn append_item(&self, key: SequenceKey, item: NewItem) -> AppResult<OrderedItem> {
        let mut inner = self.inner.write().await;
        let items = inner.items.entry(key).or_default();

        let created = OrderedItem {
            id: Uuid::new_v4(),
            parent_id: key.parent_id,
            kind: key.kind,
            position: reorder::next_position(items),
            title: item.title,
            media_ref: item.media_ref,
            thumbnail_path: item.thumbnail_path,
            note: item.note,
            created_at: Utc::now(),
        };
        items.push(created.clone());
        inner.bump(key);

        Ok(created)
    }

    async fn update_note(
        &self,
        key: SequenceKey,
        item_id: Uuid,
        note: Option<String>,
        expected_version: Option<i64>,
    ) -> AppResult<ItemRevision> {
        let mut inner = self.inner.write().await;
        check_version(inner.version(&key), expected_version)?;

        let item = inner
            .items
            .get_mut(&key)
            .and_then(|items| items.iter_mut().find(|item| item.id == item_id))
            .ok_or_else(|| item_not_found(item_id))?;

        item.note = note;
        let item = item.clone();
        let version = inner.bump(key);

        Ok(ItemRevision { item, version })
    }

    async fn delete_item(&self, key: SequenceKey, item_id: Uuid) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let items = inner.items.entry(key).or_default();

        let index = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| item_not_found(item_id))?;
        items.remove(index);
        inner.bump(key);

        Ok(())
    }

    async fn move_item(
        &self,
        key: SequenceKey,
        item_id: Uuid,
        new_position: i32,
        expected_version: Option<i64>,
    ) -> AppResult<MoveOutcome> {
        let mut inner = self.inner.write().await;
        let current = inner.version(&key);
        check_version(current, expected_version)?;

        let items = inner.items.entry(key).or_default();
        let updates = reorder::plan_move(items, item_id, new_position)?;
        reorder::apply_updates(items, &updates);

        let item = items
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or_else(|| item_not_found(item_id))?;

        let version = if updates.is_empty() {
            current
        } else {
            inner.bump(key)
        };

        Ok(MoveOutcome {
            item,
            updated: updates.len(),
            version,
        })
    }

    async fn bulk_reorder(
        &self,
        key: SequenceKey,
        entries: Vec<PositionUpdate>,
        mode: BulkReorderMode,
        expected_version: Option<i64>,
    ) -> AppResult<BulkOutcome> {
        let mut inner = self.inner.write().await;
        let current = inner.version(&key);
        check_version(current, expected_version)?;

        let items = inner.items.entry(key).or_default();
        let plan = reorder::plan_bulk(items, &entries, mode)?;
        reorder::apply_updates(items, &plan.updates);

        let version = if plan.updates.is_empty() {
            current
        } else {
            inner.bump(key)
        };

        Ok(BulkOutcome {
            updated: plan.updates.len(),
            failed_ids: plan.failed_ids,
            version,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
