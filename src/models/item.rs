use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use super::CollectionKind;

/// Which ordered sequence an item belongs to
///
/// A playlist carries two independent sequences: catalogue items and
/// YouTube items. A watchlist sequence is parented by its user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    List,
    Playlist,
    #[serde(rename = "youtube")]
    YoutubePlaylist,
    Watchlist,
}

impl SequenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::List => "list",
            SequenceKind::Playlist => "playlist",
            SequenceKind::YoutubePlaylist => "youtube",
            SequenceKind::Watchlist => "watchlist",
        }
    }

    /// The collection kind that parents this sequence, if any
    pub fn parent_collection(&self) -> Option<CollectionKind> {
        match self {
            SequenceKind::List => Some(CollectionKind::List),
            SequenceKind::Playlist | SequenceKind::YoutubePlaylist => Some(CollectionKind::Playlist),
            SequenceKind::Watchlist => None,
        }
    }
}

impl Display for SequenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SequenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(SequenceKind::List),
            "playlist" => Ok(SequenceKind::Playlist),
            "youtube" => Ok(SequenceKind::YoutubePlaylist),
            "watchlist" => Ok(SequenceKind::Watchlist),
            other => Err(format!("unknown sequence kind '{}'", other)),
        }
    }
}

/// Identifies one ordered sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceKey {
    pub kind: SequenceKind,
    pub parent_id: Uuid,
}

impl SequenceKey {
    pub fn new(kind: SequenceKind, parent_id: Uuid) -> Self {
        Self { kind, parent_id }
    }
}

impl Display for SequenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.parent_id)
    }
}

/// An item inside a list, playlist or watchlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedItem {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub kind: SequenceKind,
    pub position: i32,
    pub title: String,
    /// TMDB id, YouTube video id or similar external reference
    pub media_ref: Option<String>,
    pub thumbnail_path: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending an item to a sequence
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub title: String,
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A single position assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub position: i32,
}

impl PositionUpdate {
    pub fn new(id: Uuid, position: i32) -> Self {
        Self { id, position }
    }
}
