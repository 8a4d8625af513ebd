//! Section/collection use-case service.
//!
//! # Responsibility
//! - Provide create/rename/archive operations for the shelf hierarchy.
//! - Normalize display names and URL slugs above the repository layer.
//!
//! # Invariants
//! - Fresh sections and collections get `new-space-<id>` /
//!   `new-collection-<id>` slugs until the owner picks one.
//! - Custom slugs are normalized to lowercase `a-z0-9` runs joined by `-`.

use crate::model::shelf::{
    Collection, CollectionId, NewCollection, NewSection, Section, SectionId,
};
use crate::model::user::UserId;
use crate::repo::shelf_repo::{ShelfRepoError, ShelfRepository};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static SLUG_SQUASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Normalizes arbitrary text into a URL slug.
///
/// Lowercases, squashes every non-alphanumeric run into a single dash, and
/// strips leading/trailing dashes. Returns an empty string when nothing
/// usable remains.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_ascii_lowercase();
    SLUG_SQUASH_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Errors from shelf use-case operations.
#[derive(Debug)]
pub enum ShelfServiceError {
    /// Display name is blank after trim.
    InvalidName,
    /// Requested slug normalizes to nothing.
    InvalidSlug(String),
    SectionNotFound(SectionId),
    CollectionNotFound(CollectionId),
    OwnerNotFound(UserId),
    /// Persistence-layer failure.
    Repo(ShelfRepoError),
}

impl Display for ShelfServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "display name must not be blank"),
            Self::InvalidSlug(value) => write!(f, "slug has no usable characters: `{value}`"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::CollectionNotFound(id) => write!(f, "collection not found: {id}"),
            Self::OwnerNotFound(id) => write!(f, "owner not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ShelfServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShelfRepoError> for ShelfServiceError {
    fn from(value: ShelfRepoError) -> Self {
        match value {
            ShelfRepoError::SectionNotFound(id) => Self::SectionNotFound(id),
            ShelfRepoError::CollectionNotFound(id) => Self::CollectionNotFound(id),
            ShelfRepoError::OwnerNotFound(id) => Self::OwnerNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Use-case service for the section/collection hierarchy.
pub struct ShelfService<R: ShelfRepository> {
    repo: R,
}

impl<R: ShelfRepository> ShelfService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an unnamed section at the end of the owner's page.
    pub fn create_empty_section(&self, owner: UserId) -> Result<Section, ShelfServiceError> {
        let uuid = Uuid::new_v4();
        let section = self.repo.create_section(&NewSection {
            uuid,
            owner_uuid: owner,
            slug: format!("new-space-{uuid}"),
            name: None,
        })?;
        info!(
            "event=section_create module=shelf status=ok section={uuid} sort_index={}",
            section.sort_index
        );
        Ok(section)
    }

    /// Creates a named section at the end of the owner's page.
    pub fn create_section(
        &self,
        owner: UserId,
        name: impl Into<String>,
    ) -> Result<Section, ShelfServiceError> {
        let normalized = normalize_name(name.into())?;
        let slug = require_slug(&normalized)?;
        let uuid = Uuid::new_v4();
        self.repo
            .create_section(&NewSection {
                uuid,
                owner_uuid: owner,
                slug,
                name: Some(normalized),
            })
            .map_err(Into::into)
    }

    /// Creates an unnamed collection under a section.
    pub fn create_empty_collection(
        &self,
        section: SectionId,
    ) -> Result<Collection, ShelfServiceError> {
        let uuid = Uuid::new_v4();
        let collection = self.repo.create_collection(&NewCollection {
            uuid,
            section_uuid: section,
            slug: format!("new-collection-{uuid}"),
            name: None,
        })?;
        info!("event=collection_create module=shelf status=ok collection={uuid}");
        Ok(collection)
    }

    /// Loads one section by id.
    pub fn get_section(&self, id: SectionId) -> Result<Option<Section>, ShelfServiceError> {
        self.repo.get_section(id).map_err(Into::into)
    }

    /// Lists one owner's sections in page order.
    pub fn list_sections(&self, owner: UserId) -> Result<Vec<Section>, ShelfServiceError> {
        self.repo.list_sections(owner).map_err(Into::into)
    }

    /// Renames one section.
    pub fn rename_section(
        &self,
        id: SectionId,
        name: impl Into<String>,
    ) -> Result<(), ShelfServiceError> {
        let normalized = normalize_name(name.into())?;
        self.repo
            .rename_section(id, normalized.as_str())
            .map_err(Into::into)
    }

    /// Folds or unfolds one section on the owner's page.
    pub fn set_section_expanded(
        &self,
        id: SectionId,
        expanded: bool,
    ) -> Result<(), ShelfServiceError> {
        self.repo
            .set_section_expanded(id, expanded)
            .map_err(Into::into)
    }

    /// Loads one active collection by id.
    pub fn get_collection(&self, id: CollectionId) -> Result<Option<Collection>, ShelfServiceError> {
        self.repo.get_collection(id, false).map_err(Into::into)
    }

    /// Lists active collections under one section.
    pub fn list_collections(
        &self,
        section: SectionId,
    ) -> Result<Vec<Collection>, ShelfServiceError> {
        self.repo.list_collections(section, false).map_err(Into::into)
    }

    /// Renames one collection.
    pub fn rename_collection(
        &self,
        id: CollectionId,
        name: impl Into<String>,
    ) -> Result<Collection, ShelfServiceError> {
        let normalized = normalize_name(name.into())?;
        let mut collection = self.require_collection(id)?;
        collection.name = Some(normalized);
        self.repo.update_collection(&collection)?;
        self.require_collection(id)
    }

    /// Replaces one collection's long-form description.
    pub fn set_collection_detail(
        &self,
        id: CollectionId,
        detail: Option<String>,
    ) -> Result<Collection, ShelfServiceError> {
        let mut collection = self.require_collection(id)?;
        collection.detail = detail;
        self.repo.update_collection(&collection)?;
        self.require_collection(id)
    }

    /// Replaces one collection's URL slug with a normalized form of the
    /// requested text.
    pub fn set_collection_slug(
        &self,
        id: CollectionId,
        requested: &str,
    ) -> Result<Collection, ShelfServiceError> {
        let slug = require_slug(requested)?;
        let mut collection = self.require_collection(id)?;
        collection.slug = slug;
        self.repo.update_collection(&collection)?;
        self.require_collection(id)
    }

    /// Tombstones one collection. Its items keep their rows but disappear
    /// with the collection page.
    pub fn archive_collection(&self, id: CollectionId) -> Result<(), ShelfServiceError> {
        self.repo.archive_collection(id)?;
        info!("event=collection_archive module=shelf status=ok collection={id}");
        Ok(())
    }

    fn require_collection(&self, id: CollectionId) -> Result<Collection, ShelfServiceError> {
        self.repo
            .get_collection(id, false)?
            .ok_or(ShelfServiceError::CollectionNotFound(id))
    }
}

fn normalize_name(value: String) -> Result<String, ShelfServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ShelfServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}

fn require_slug(requested: &str) -> Result<String, ShelfServiceError> {
    let slug = slugify(requested);
    if slug.is_empty() {
        return Err(ShelfServiceError::InvalidSlug(requested.to_string()));
    }
    Ok(slug)
}
