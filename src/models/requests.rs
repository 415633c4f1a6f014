use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
}

/// Body of `PATCH /lists/:list_id/items/:item_id`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListItemRequest {
    pub position: Option<i64>,
    pub note: Option<String>,
    pub expected_version: Option<i64>,
}

/// Body of `PATCH /playlists/:playlist_id/items/:item_id`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlaylistItemRequest {
    pub order: Option<i64>,
    pub note: Option<String>,
    pub expected_version: Option<i64>,
}

/// Body of `PATCH /playlists/:playlist_id/youtube-items/:item_id`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveYoutubeItemRequest {
    pub order: i64,
    pub expected_version: Option<i64>,
}

/// One client-supplied assignment in a bulk reorder.
///
/// Lists send `position`, playlists and watchlists send `order`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReorderEntry {
    pub id: Uuid,
    #[serde(alias = "order")]
    pub position: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReorderRequest {
    #[serde(default)]
    pub items: Vec<ReorderEntry>,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistItemType {
    #[default]
    Tmdb,
    Youtube,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistReorderRequest {
    #[serde(default)]
    pub items: Vec<ReorderEntry>,
    #[serde(default)]
    pub item_type: PlaylistItemType,
    pub expected_version: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}
