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
        Collection, CollectionKind, CreateCollectionRequest, MoveYoutubeItemRequest, NewItem,
        PlaylistItemType, PlaylistReorderRequest, Principal, SequenceKey, SequenceKind,
        SequenceSnapshot, SuccessResponse, UpdatePlaylistItemRequest,
    },
    services::collections,
    state::AppState,
};

use super::{item_response, reorder_response, AppJson, AppPath};

fn tmdb_key(playlist_id: Uuid) -> SequenceKey {
    SequenceKey::new(SequenceKind::Playlist, playlist_id)
}

fn youtube_key(playlist_id: Uuid) -> SequenceKey {
    SequenceKey::new(SequenceKind::YoutubePlaylist, playlist_id)
}

/// POST /playlists
pub async fn create_playlist(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppJson(request): AppJson<CreateCollectionRequest>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    let playlist = collections::create_collection(
        state.store.as_ref(),
        &principal,
        CollectionKind::Playlist,
        &request.name,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /playlists/:playlist_id/items
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(playlist_id): AppPath<Uuid>,
) -> AppResult<Json<SequenceSnapshot>> {
    let snapshot = collections::list_items(
        state.store.as_ref(),
        state.cache.as_ref(),
        &principal,
        tmdb_key(playlist_id),
    )
    .await?;

    Ok(Json(snapshot))
}

/// POST /playlists/:playlist_id/items
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(playlist_id): AppPath<Uuid>,
    AppJson(request): AppJson<NewItem>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let item = collections::append_item(
        state.store.as_ref(),
        &principal,
        tmdb_key(playlist_id),
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, item_response(item, None)?))
}

/// PATCH /playlists/:playlist_id/items/:item_id
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath((playlist_id, item_id)): AppPath<(Uuid, Uuid)>,
    AppJson(request): AppJson<UpdatePlaylistItemRequest>,
) -> AppResult<Json<Value>> {
    let revision = collections::update_item(
        state.store.as_ref(),
        &principal,
        tmdb_key(playlist_id),
        item_id,
        request.order,
        request.note,
        request.expected_version,
    )
    .await?;

    item_response(revision.item, Some(revision.version))
}

/// DELETE /playlists/:playlist_id/items/:item_id
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath((playlist_id, item_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<SuccessResponse>> {
    collections::delete_item(
        state.store.as_ref(),
        &principal,
        tmdb_key(playlist_id),
        item_id,
    )
    .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// GET /playlists/:playlist_id/youtube-items
pub async fn list_youtube_items(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(playlist_id): AppPath<Uuid>,
) -> AppResult<Json<SequenceSnapshot>> {
    let snapshot = collections::list_items(
        state.store.as_ref(),
        state.cache.as_ref(),
        &principal,
        youtube_key(playlist_id),
    )
    .await?;

    Ok(Json(snapshot))
}

/// POST /playlists/:playlist_id/youtube-items
pub async fn add_youtube_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(playlist_id): AppPath<Uuid>,
    AppJson(request): AppJson<NewItem>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let item = collections::append_item(
        state.store.as_ref(),
        &principal,
        youtube_key(playlist_id),
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, item_response(item, None)?))
}

/// PATCH /playlists/:playlist_id/youtube-items/:item_id
pub async fn move_youtube_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath((playlist_id, item_id)): AppPath<(Uuid, Uuid)>,
    AppJson(request): AppJson<MoveYoutubeItemRequest>,
) -> AppResult<Json<Value>> {
    let outcome = collections::move_item(
        state.store.as_ref(),
        &principal,
        youtube_key(playlist_id),
        item_id,
        request.order,
        request.expected_version,
    )
    .await?;

    item_response(outcome.item, Some(outcome.version))
}

/// DELETE /playlists/:playlist_id/youtube-items/:item_id
pub async fn delete_youtube_item(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath((playlist_id, item_id)): AppPath<(Uuid, Uuid)>,
) -> AppResult<Json<SuccessResponse>> {
    collections::delete_item(
        state.store.as_ref(),
        &principal,
        youtube_key(playlist_id),
        item_id,
    )
    .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// PATCH /playlists/:playlist_id/reorder
///
/// `itemType` selects which of the playlist's two sequences is reordered.
pub async fn reorder(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppPath(playlist_id): AppPath<Uuid>,
    AppJson(request): AppJson<PlaylistReorderRequest>,
) -> AppResult<Json<Value>> {
    let key = match request.item_type {
        PlaylistItemType::Tmdb => tmdb_key(playlist_id),
        PlaylistItemType::Youtube => youtube_key(playlist_id),
    };

    let version = collections::bulk_reorder(
        state.store.as_ref(),
        &principal,
        key,
        request.items,
        state.bulk_reorder_mode,
        request.expected_version,
    )
    .await?;

    Ok(reorder_response(version))
}
