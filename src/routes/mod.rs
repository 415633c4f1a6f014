use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    models::{OrderedItem, SequenceKind},
    state::AppState,
};

pub mod lists;
pub mod playlists;
pub mod watchlist;

/// JSON body extractor whose rejections become `400 {error}` responses
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor with the same `400 {error}` rejection
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Lists
        .route("/lists", post(lists::create_list))
        .route(
            "/lists/:list_id/items",
            get(lists::list_items).post(lists::add_item),
        )
        .route(
            "/lists/:list_id/items/:item_id",
            patch(lists::update_item).delete(lists::delete_item),
        )
        .route("/lists/:list_id/reorder", patch(lists::reorder))
        // Playlists
        .route("/playlists", post(playlists::create_playlist))
        .route(
            "/playlists/:playlist_id/items",
            get(playlists::list_items).post(playlists::add_item),
        )
        .route(
            "/playlists/:playlist_id/items/:item_id",
            patch(playlists::update_item).delete(playlists::delete_item),
        )
        .route(
            "/playlists/:playlist_id/youtube-items",
            get(playlists::list_youtube_items).post(playlists::add_youtube_item),
        )
        .route(
            "/playlists/:playlist_id/youtube-items/:item_id",
            patch(playlists::move_youtube_item).delete(playlists::delete_youtube_item),
        )
        .route("/playlists/:playlist_id/reorder", patch(playlists::reorder))
        // Watchlist
        .route(
            "/watchlist",
            get(watchlist::list_items).post(watchlist::add_item),
        )
        .route("/watchlist/reorder", patch(watchlist::reorder))
        .route("/watchlist/:item_id", delete(watchlist::delete_item))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `{ success: true, <kind>Item: item }`, plus the sequence revision when known
fn item_response(item: OrderedItem, version: Option<i64>) -> AppResult<Json<Value>> {
    let field = match item.kind {
        SequenceKind::List => "listItem",
        SequenceKind::Playlist => "playlistItem",
        SequenceKind::YoutubePlaylist => "youtubePlaylistItem",
        SequenceKind::Watchlist => "watchlistItem",
    };

    let item = serde_json::to_value(item)
        .map_err(|e| AppError::Internal(format!("Response serialization error: {}", e)))?;

    let mut body = Map::new();
    body.insert("success".to_string(), Value::Bool(true));
    body.insert(field.to_string(), item);
    if let Some(version) = version {
        body.insert("version".to_string(), Value::from(version));
    }

    Ok(Json(Value::Object(body)))
}

/// `{ success: true, version }` for a committed reorder
fn reorder_response(version: i64) -> Json<Value> {
    Json(json!({ "success": true, "version": version }))
}
