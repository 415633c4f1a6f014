use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

/// Internal user row a principal resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Subject issued by the external identity provider
    pub external_id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    List,
    Playlist,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::List => "list",
            CollectionKind::Playlist => "playlist",
        }
    }
}

impl Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(CollectionKind::List),
            "playlist" => Ok(CollectionKind::Playlist),
            other => Err(format!("unknown collection kind '{}'", other)),
        }
    }
}

/// A user-owned list or playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: CollectionKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated actor of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: User,
}

impl Principal {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}
