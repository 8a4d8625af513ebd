//! Section and collection read models.
//!
//! # Responsibility
//! - Define the grouping hierarchy items are shelved under.
//!
//! # Invariants
//! - A collection belongs to exactly one section; a section to one owner.
//! - `sort_index` on sections is append-assigned at creation.
//! - Collection deletion is a tombstone; contained items keep their rows.

use crate::model::lifecycle::Lifecycle;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a section.
pub type SectionId = Uuid;

/// Stable identifier for a collection.
pub type CollectionId = Uuid;

/// A named group of collections on a user's page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub uuid: SectionId,
    pub owner_uuid: UserId,
    /// URL fragment; defaults to `new-space-<uuid>` at creation.
    pub slug: String,
    pub name: Option<String>,
    /// Rank among the owner's sections, append-assigned.
    pub sort_index: i64,
    /// Whether the section is unfolded on the owner's page.
    pub is_expanded: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Creation draft for a section. The id is caller-assigned so the default
/// slug can embed it; `sort_index` is append-assigned at persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub uuid: SectionId,
    pub owner_uuid: UserId,
    pub slug: String,
    pub name: Option<String>,
}

/// An ordered shelf of saved items inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub uuid: CollectionId,
    pub section_uuid: SectionId,
    pub owner_uuid: UserId,
    /// URL fragment; defaults to `new-collection-<uuid>` at creation.
    pub slug: String,
    pub name: Option<String>,
    /// Long-form description shown on the collection page.
    pub detail: Option<String>,
    pub state: Lifecycle,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Creation draft for a collection; the owner is inherited from the section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub uuid: CollectionId,
    pub section_uuid: SectionId,
    pub slug: String,
    pub name: Option<String>,
}
