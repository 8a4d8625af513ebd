//! Item use-case service.
//!
//! # Responsibility
//! - Provide stable entry points for item CRUD, reordering, and re-homing.
//! - Emit metadata-only diagnostic events for mutating operations.
//!
//! # Invariants
//! - Indices passed to reordering are zero-based positions in the visible
//!   list, not persisted position values.
//! - Service APIs never bypass repository position bookkeeping.

use crate::model::item::{Item, ItemHome, ItemId, ItemValidationError, NewItem};
use crate::model::position::OutOfRange;
use crate::model::user::UserId;
use crate::repo::item_repo::{ItemRepoError, ItemRepository};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from item use-case operations.
#[derive(Debug)]
pub enum ItemServiceError {
    /// Draft or update fields failed validation.
    Invalid(ItemValidationError),
    /// Target item does not exist or is tombstoned.
    ItemNotFound(ItemId),
    /// Target scope does not exist or is tombstoned.
    HomeNotFound(ItemHome),
    /// A move index fell outside the scope's active range.
    OutOfRange(OutOfRange),
    /// Persistence-layer failure.
    Repo(ItemRepoError),
}

impl Display for ItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::HomeNotFound(home) => write!(f, "item scope not found: {home}"),
            Self::OutOfRange(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::OutOfRange(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemRepoError> for ItemServiceError {
    fn from(value: ItemRepoError) -> Self {
        match value {
            ItemRepoError::Validation(err) => Self::Invalid(err),
            ItemRepoError::NotFound(id) => Self::ItemNotFound(id),
            ItemRepoError::HomeNotFound(home) => Self::HomeNotFound(home),
            ItemRepoError::OutOfRange(err) => Self::OutOfRange(err),
            other => Self::Repo(other),
        }
    }
}

/// Use-case service for saved items.
pub struct ItemService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> ItemService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Saves a new item at the end of `home`'s list.
    pub fn create_item(&self, draft: &NewItem, home: ItemHome) -> Result<Item, ItemServiceError> {
        let item = self.repo.create_item(draft, home)?;
        info!(
            "event=item_create module=items status=ok item={} position={}",
            item.uuid, item.position
        );
        Ok(item)
    }

    /// Loads one item by id.
    pub fn get_item(
        &self,
        id: ItemId,
        include_deleted: bool,
    ) -> Result<Option<Item>, ItemServiceError> {
        self.repo.get_item(id, include_deleted).map_err(Into::into)
    }

    /// Lists one scope's items in display order.
    pub fn list_items(&self, home: ItemHome) -> Result<Vec<Item>, ItemServiceError> {
        self.repo.list_items(home, false).map_err(Into::into)
    }

    /// Counts active items in one user's inbox.
    pub fn inbox_count(&self, owner: UserId) -> Result<i64, ItemServiceError> {
        self.repo
            .count_active_items(ItemHome::Inbox(owner))
            .map_err(Into::into)
    }

    /// Updates editable scalar fields of one item.
    pub fn update_item(&self, item: &Item) -> Result<(), ItemServiceError> {
        self.repo.update_item(item).map_err(Into::into)
    }

    /// Tombstones one item; survivors of its scope are renumbered densely.
    pub fn soft_delete_item(&self, id: ItemId) -> Result<(), ItemServiceError> {
        let changes = self.repo.soft_delete_item(id)?;
        info!(
            "event=item_delete module=items status=ok item={id} compacted={}",
            changes.len()
        );
        Ok(())
    }

    /// Moves one item to another scope, appended at the destination's end;
    /// the vacated scope is renumbered densely.
    pub fn move_item(&self, id: ItemId, new_home: ItemHome) -> Result<Item, ItemServiceError> {
        let item = self.repo.move_item(id, new_home)?;
        info!(
            "event=item_move module=items status=ok item={id} position={}",
            item.position
        );
        Ok(item)
    }

    /// Moves the item at `source_index` to `destination_index` within one
    /// scope's visible list.
    ///
    /// Returns every item whose position changed, including the moved one;
    /// an empty list means the move was a no-op. Out-of-range indices fail
    /// and are never clamped, since clamping would silently move the wrong
    /// item.
    pub fn change_item_position(
        &self,
        home: ItemHome,
        source_index: usize,
        destination_index: usize,
    ) -> Result<Vec<Item>, ItemServiceError> {
        let changed = self
            .repo
            .change_position(home, source_index, destination_index)?;
        info!(
            "event=item_reorder module=items status=ok source={source_index} destination={destination_index} changed={}",
            changed.len()
        );
        Ok(changed)
    }
}
