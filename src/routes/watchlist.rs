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
        BulkReorderRequest, NewItem, Principal, SequenceKey, SequenceKind, SequenceSnapshot,
        SuccessResponse,
    },
    services::collections,
    state::AppState,
};

use super::{item_response, reorder_response, AppJson, AppPath};

/// A watchlist is parented by the user who owns it
fn watchlist_key(principal: &Principal) -> SequenceKey {
    SequenceKey::new(SequenceKind::Watchlist, principal.user_id())
}

/// GET /watchlist
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> AppResult<Json<SequenceSnapshot>> {
    let snapshot = collections::list_items(
        state.store.as_ref(),
        state.cache.as_ref(),
        &principal,
        watchlist_key(&principal),
    )
    .await?;

    Ok(Json(snapshot))
}

/// POST /watchlist
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppJson(request): AppJson<NewItem>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let key = watchlist_key(&principal);
    let item = collections::append_item(state.store.as_ref(), &principal, key, request).await?;

    Ok((StatusCode::CREATED, item_response(item, None)?))
}

/// DELETE /watchlist/:item_id
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(item_id): AppPath<Uuid>,
) -> AppResult<Json<SuccessResponse>> {
    let key = watchlist_key(&principal);
    collections::delete_item(state.store.as_ref(), &principal, key, item_id).await?;

    Ok(Json(SuccessResponse::ok()))
}

/// PATCH /watchlist/reorder
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppJson(request): AppJson<BulkReorderRequest>,
) -> AppResult<Json<Value>> {
    let version = collections::bulk_reorder(
        state.store.as_ref(),
        &principal,
        watchlist_key(&principal),
        request.items,
        state.bulk_reorder_mode,
        request.expected_version,
    )
    .await?;

    Ok(reorder_response(version))
}
