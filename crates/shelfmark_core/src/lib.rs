//! Core domain logic for shelfmark.
//! This crate is the single source of truth for ordering invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Item, ItemHome, ItemId, ItemKind, ItemValidationError, NewItem};
pub use model::lifecycle::Lifecycle;
pub use model::position::{
    compact_positions, reassign_positions, MoveEnd, OutOfRange, PositionChange, PositionedRef,
};
pub use model::shelf::{Collection, CollectionId, NewCollection, NewSection, Section, SectionId};
pub use model::user::{NewUser, User, UserId};
pub use repo::item_repo::{ItemRepoError, ItemRepoResult, ItemRepository, SqliteItemRepository};
pub use repo::shelf_repo::{
    ShelfRepoError, ShelfRepoResult, ShelfRepository, SqliteShelfRepository,
};
pub use repo::user_repo::{SqliteUserRepository, UserRepoError, UserRepoResult, UserRepository};
pub use service::item_service::{ItemService, ItemServiceError};
pub use service::shelf_service::{slugify, ShelfService, ShelfServiceError};
pub use service::user_service::{UserService, UserServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
