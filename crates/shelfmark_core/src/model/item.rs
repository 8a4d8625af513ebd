//! Saved-item domain model.
//!
//! # Responsibility
//! - Define the canonical item record and its creation draft.
//! - Name the scope an item lives in (`ItemHome`) as a typed variant.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another item.
//! - An item belongs to exactly one scope at a time.
//! - `position` is dense and zero-based within the item's scope; it is only
//!   ever written by reindexing, never by a general field update.

use crate::model::lifecycle::Lifecycle;
use crate::model::shelf::CollectionId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a saved item.
pub type ItemId = Uuid;

/// Media category of a saved item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Album,
    Article,
    Book,
    Movie,
    People,
    Podcast,
    Repository,
    Video,
    Website,
}

/// The scope an item is ordered within: one collection, or one user's inbox.
///
/// This is the single connect-style intent used everywhere an item is placed
/// or re-parented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemHome {
    Collection(CollectionId),
    Inbox(UserId),
}

impl Display for ItemHome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection(uuid) => write!(f, "collection {uuid}"),
            Self::Inbox(uuid) => write!(f, "inbox of user {uuid}"),
        }
    }
}

/// Canonical saved-item record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable global ID used for linking and reorder bookkeeping.
    pub uuid: ItemId,
    pub kind: ItemKind,
    pub title: String,
    pub author: Option<String>,
    /// Owner-written remark shown alongside the item.
    pub comment: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    /// Metadata source the item was imported from, e.g. a catalog name.
    pub provider: Option<String>,
    /// Free-form provider payload, persisted as a JSON document.
    pub meta: Option<serde_json::Value>,
    /// Scope the item is ordered within.
    pub home: ItemHome,
    /// Dense zero-based rank within `home`. Written only by reindexing.
    pub position: i64,
    pub state: Lifecycle,
    /// Epoch ms; immutable, the stable tie-break for ordering rebuilds.
    pub created_at: i64,
    /// Epoch ms; maintained by the storage layer.
    pub updated_at: i64,
}

/// Creation draft for a new item.
///
/// Carries the fields an import (catalog search, URL scrape) produces; the
/// scope, position, and timestamps are assigned at persistence time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    #[serde(default = "default_kind")]
    pub kind: ItemKind,
    pub author: Option<String>,
    pub comment: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub provider: Option<String>,
    pub meta: Option<serde_json::Value>,
}

fn default_kind() -> ItemKind {
    ItemKind::Website
}

impl Default for ItemKind {
    fn default() -> Self {
        default_kind()
    }
}

impl NewItem {
    /// Creates a draft with only the required fields set.
    pub fn new(kind: ItemKind, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind,
            ..Self::default()
        }
    }

    /// Validates draft fields before persistence.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank after trimming.
    /// - `InvalidUrl` when a URL field does not carry an http(s) scheme.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        validate_fields(&self.title, &[&self.product_url, &self.image_url])
    }
}

impl Item {
    /// Validates editable fields before an update is persisted.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        validate_fields(&self.title, &[&self.product_url, &self.image_url])
    }
}

fn validate_fields(title: &str, urls: &[&Option<String>]) -> Result<(), ItemValidationError> {
    if title.trim().is_empty() {
        return Err(ItemValidationError::EmptyTitle);
    }
    for candidate in urls.iter().filter_map(|url| url.as_deref()) {
        if !candidate.starts_with("http://") && !candidate.starts_with("https://") {
            return Err(ItemValidationError::InvalidUrl(candidate.to_string()));
        }
    }
    Ok(())
}

/// Draft-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    EmptyTitle,
    InvalidUrl(String),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "item title must not be blank"),
            Self::InvalidUrl(url) => write!(f, "item url must use http(s): `{url}`"),
        }
    }
}

impl Error for ItemValidationError {}

#[cfg(test)]
mod tests {
    use super::{ItemKind, ItemValidationError, NewItem};

    #[test]
    fn validate_rejects_blank_title() {
        let draft = NewItem::new(ItemKind::Book, "   ");
        assert_eq!(draft.validate(), Err(ItemValidationError::EmptyTitle));
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let mut draft = NewItem::new(ItemKind::Website, "home page");
        draft.product_url = Some("ftp://example.org".to_string());
        assert!(matches!(
            draft.validate(),
            Err(ItemValidationError::InvalidUrl(url)) if url == "ftp://example.org"
        ));
    }

    #[test]
    fn validate_accepts_complete_draft() {
        let mut draft = NewItem::new(ItemKind::Movie, "Stalker");
        draft.author = Some("Andrei Tarkovsky".to_string());
        draft.image_url = Some("https://img.example.org/stalker.jpg".to_string());
        assert_eq!(draft.validate(), Ok(()));
    }

    #[test]
    fn kind_serializes_as_snake_case() {
        let encoded = serde_json::to_string(&ItemKind::Repository).unwrap();
        assert_eq!(encoded, "\"repository\"");
    }
}
