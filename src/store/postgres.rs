use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        BulkOutcome, BulkReorderMode, Collection, CollectionKind, ItemRevision, MoveOutcome, NewItem,
        OrderedItem, PositionUpdate, SequenceKey, SequenceSnapshot, User,
    },
    services::reorder,
};

use super::{check_version, item_not_found, OrderStore};

/// PostgreSQL-backed `OrderStore`
///
/// Mutations run in a transaction that first locks the sequence's row in
/// `sequence_versions`, so concurrent reorders of one sequence queue up
/// behind each other instead of interleaving their writes.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
    display_name: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            external_id: row.external_id,
            display_name: row.display_name,
        }
    }
}

#[derive(Debug, FromRow)]
struct CollectionRow {
    id: Uuid,
    owner_id: Uuid,
    kind: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CollectionRow> for Collection {
    type Error = AppError;

    fn try_from(row: CollectionRow) -> Result<Self, Self::Error> {
        Ok(Collection {
            id: row.id,
            owner_id: row.owner_id,
            kind: row.kind.parse().map_err(AppError::Internal)?,
            name: row.name,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    kind: String,
    parent_id: Uuid,
    position: i32,
    title: String,
    media_ref: Option<String>,
    thumbnail_path: Option<String>,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for OrderedItem {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(OrderedItem {
            id: row.id,
            parent_id: row.parent_id,
            kind: row.kind.parse().map_err(AppError::Internal)?,
            position: row.position,
            title: row.title,
            media_ref: row.media_ref,
            thumbnail_path: row.thumbnail_path,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

/// Creates the revision row if needed and locks it for the transaction
async fn lock_sequence(conn: &mut PgConnection, key: SequenceKey) -> AppResult<i64> {
    sqlx::query(
        r#"
        INSERT INTO sequence_versions (kind, parent_id)
        VALUES ($1, $2)
        ON CONFLICT (kind, parent_id) DO NOTHING
        "#,
    )
    .bind(key.kind.as_str())
    .bind(key.parent_id)
    .execute(&mut *conn)
    .await?;

    let version: i64 = sqlx::query_scalar(
        r#"
        SELECT version FROM sequence_versions
        WHERE kind = $1 AND parent_id = $2
        FOR UPDATE
        "#,
    )
    .bind(key.kind.as_str())
    .bind(key.parent_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(version)
}

async fn bump_version(conn: &mut PgConnection, key: SequenceKey) -> AppResult<i64> {
    let version: i64 = sqlx::query_scalar(
        r#"
        UPDATE sequence_versions SET version = version + 1
        WHERE kind = $1 AND parent_id = $2
        RETURNING version
        "#,
    )
    .bind(key.kind.as_str())
    .bind(key.parent_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(version)
}

async fn load_items(conn: &mut PgConnection, key: SequenceKey) -> AppResult<Vec<OrderedItem>> {
    let rows: Vec<ItemRow> = sqlx::query_as(
        r#"
        SELECT id, kind, parent_id, position, title, media_ref, thumbnail_path, note, created_at
        FROM ordered_items
        WHERE kind = $1 AND parent_id = $2
        ORDER BY position, created_at, id
        "#,
    )
    .bind(key.kind.as_str())
    .bind(key.parent_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(OrderedItem::try_from).collect()
}

/// Writes planned positions in a single statement
async fn write_positions(
    conn: &mut PgConnection,
    key: SequenceKey,
    updates: &[PositionUpdate],
) -> AppResult<()> {
    if updates.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = updates.iter().map(|u| u.id).collect();
    let positions: Vec<i32> = updates.iter().map(|u| u.position).collect();

    sqlx::query(
        r#"
        UPDATE ordered_items AS o
        SET position = u.position
        FROM UNNEST($1::uuid[], $2::int4[]) AS u(id, position)
        WHERE o.id = u.id AND o.kind = $3 AND o.parent_id = $4
        "#,
    )
    .bind(ids)
    .bind(positions)
    .bind(key.kind.as_str())
    .bind(key.parent_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait::async_trait]
impl OrderStore for PgStore {
    async fn find_user_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, external_id, display_name FROM users WHERE external_id = $1",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn create_collection(
        &self,
        owner_id: Uuid,
        kind: CollectionKind,
        name: String,
    ) -> AppResult<Collection> {
        let row: CollectionRow = sqlx::query_as(
            r#"
            INSERT INTO collections (id, owner_id, kind, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, kind, name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(kind.as_str())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_collection(&self, id: Uuid) -> AppResult<Option<Collection>> {
        let row: Option<CollectionRow> = sqlx::query_as(
            "SELECT id, owner_id, kind, name, created_at FROM collections WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Collection::try_from).transpose()
    }

    async fn list_items(&self, key: SequenceKey) -> AppResult<SequenceSnapshot> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM sequence_versions WHERE kind = $1 AND parent_id = $2",
        )
        .bind(key.kind.as_str())
        .bind(key.parent_id)
        .fetch_optional(&mut *tx)
        .await?;
        let items = load_items(&mut tx, key).await?;
        tx.commit().await?;

        Ok(SequenceSnapshot {
            items,
            version: version.unwrap_or(0),
        })
    }

    async fn sequence_version(&self, key: SequenceKey) -> AppResult<i64> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM sequence_versions WHERE kind = $1 AND parent_id = $2",
        )
        .bind(key.kind.as_str())
        .bind(key.parent_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(version.unwrap_or(0))
    }

    async fn append_item(&self, key: SequenceKey, item: NewItem) -> AppResult<OrderedItem> {
        let mut tx = self.pool.begin().await?;
        lock_sequence(&mut tx, key).await?;

        let position: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(position), 0) + 1
            FROM ordered_items
            WHERE kind = $1 AND parent_id = $2
            "#,
        )
        .bind(key.kind.as_str())
        .bind(key.parent_id)
        .fetch_one(&mut *tx)
        .await?;

        let row: ItemRow = sqlx::query_as(
            r#"
            INSERT INTO ordered_items
                (id, kind, parent_id, position, title, media_ref, thumbnail_path, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, kind, parent_id, position, title, media_ref, thumbnail_path, note, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(key.kind.as_str())
        .bind(key.parent_id)
        .bind(position)
        .bind(item.title)
        .bind(item.media_ref)
        .bind(item.thumbnail_path)
        .bind(item.note)
        .fetch_one(&mut *tx)
        .await?;

        bump_version(&mut tx, key).await?;
        tx.commit().await?;

        row.try_into()
    }

    async fn update_note(
        &self,
        key: SequenceKey,
        item_id: Uuid,
        note: Option<String>,
        expected_version: Option<i64>,
    ) -> AppResult<ItemRevision> {
        let mut tx = self.pool.begin().await?;
        let current = lock_sequence(&mut tx, key).await?;
        check_version(current, expected_version)?;

        let row: Option<ItemRow> = sqlx::query_as(
            r#"
            UPDATE ordered_items SET note = $1
            WHERE id = $2 AND kind = $3 AND parent_id = $4
            RETURNING id, kind, parent_id, position, title, media_ref, thumbnail_path, note, created_at
            "#,
        )
        .bind(note)
        .bind(item_id)
        .bind(key.kind.as_str())
        .bind(key.parent_id)
        .fetch_optional(&mut *tx)
        .await?;

        let row = row.ok_or_else(|| item_not_found(item_id))?;
        let version = bump_version(&mut tx, key).await?;
        tx.commit().await?;

        Ok(ItemRevision {
            item: row.try_into()?,
            version,
        })
    }

    async fn delete_item(&self, key: SequenceKey, item_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_sequence(&mut tx, key).await?;

        let result = sqlx::query(
            "DELETE FROM ordered_items WHERE id = $1 AND kind = $2 AND parent_id = $3",
        )
        .bind(item_id)
        .bind(key.kind.as_str())
        .bind(key.parent_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(item_not_found(item_id));
        }

        bump_version(&mut tx, key).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn move_item(
        &self,
        key: SequenceKey,
        item_id: Uuid,
        new_position: i32,
        expected_version: Option<i64>,
    ) -> AppResult<MoveOutcome> {
        let mut tx = self.pool.begin().await?;
        let current = lock_sequence(&mut tx, key).await?;
        check_version(current, expected_version)?;

        let mut items = load_items(&mut tx, key).await?;
        let updates = reorder::plan_move(&items, item_id, new_position)?;
        write_positions(&mut tx, key, &updates).await?;

        let version = if updates.is_empty() {
            current
        } else {
            bump_version(&mut tx, key).await?
        };
        tx.commit().await?;

        reorder::apply_updates(&mut items, &updates);
        let item = items
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| item_not_found(item_id))?;

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
        let mut tx = self.pool.begin().await?;
        let current = lock_sequence(&mut tx, key).await?;
        check_version(current, expected_version)?;

        let items = load_items(&mut tx, key).await?;
        let plan = reorder::plan_bulk(&items, &entries, mode)?;
        write_positions(&mut tx, key, &plan.updates).await?;

        let version = if plan.updates.is_empty() {
            current
        } else {
            bump_version(&mut tx, key).await?
        };
        tx.commit().await?;

        Ok(BulkOutcome {
            updated: plan.updates.len(),
            failed_ids: plan.failed_ids,
            version,
        })
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
