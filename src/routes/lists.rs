use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        BulkReorderRequest, Collection, CollectionKind, CreateCollectionRequest, NewItem,
        Principal, SequenceKey, SequenceKind, SequenceSnapshot, SuccessResponse,
        UpdateListItemRequest,
    },
    services::collections,
    state::AppState,
};

use super::{item_response, reorder_response, AppJson, AppPath};

fn list_key(list_id: Uuid) -> SequenceKey {
    SequenceKey::new(SequenceKind::List, list_id)
}

/// POST /lists
pub async fn create_list(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppJson(request): AppJson<CreateCollectionRequest>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    let list = collections::create_collection(
        state.store.as_ref(),
        &principal,
        CollectionKind::List,
        &request.name,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(list)))
}

/// GET /lists/:list_id/items
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(list_id): AppPath<Uuid>,
) -> AppResult<Json<SequenceSnapshot>> {
    let snapshot = collections::list_items(
        state.store.as_ref(),
        state.cache.as_ref(),
        &principal,
        list_key(list_id),
    )
    .await?;

    Ok(Json(snapshot))
}

/// POST /lists/:list_id/items
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(list_id): AppPath<Uuid>,
    AppJson(request): AppJson<NewItem>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let item =
        collections::append_item(state.store.as_ref(), &principal, list_key(list_id), request)
            .await?;

    Ok((StatusCode::CREATED, item_response(item, None)?))
}

/// PATCH /lists/:list_id/items/:item_id
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath((list_id, item_id)): AppPath<(Uuid, Uuid)>,
    AppJson(request): AppJson<UpdateListItemRequest>,
) -> AppResult<Json<Value>> {
    let revision = collections::update_item(
        state.store.as_ref(),
        &principal,
        list_key(list_id),
        item_id,
        request.position,
        request.note,
        request.expected_version,
    )
    .await?;

    item_response(revision.item, Some(revision.version))
}

/// DELETE /lists/:list_id/items/:item_id
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath((list_id, item_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<SuccessResponse>> {
    collections::delete_item(state.store.as_ref(), &principal, list_key(list_id), item_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// PATCH /lists/:list_id/reorder
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(list_id): AppPath<Uuid>,
    AppJson(request): AppJson<BulkReorderRequest>,
) -> AppResult<Json<Value>> {
    let version = collections::bulk_reorder(
        state.store.as_ref(),
        &principal,
        list_key(list_id),
        request.items,
        state.bulk_reorder_mode,
        request.expected_version,
    )
    .await?;

    Ok(reorder_response(version))
}
