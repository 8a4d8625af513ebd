//! User registration and profile use-case service.
//!
//! # Responsibility
//! - Register users with a normalized handle and starter sections.
//! - Provide profile read/update entry points.
//!
//! # Invariants
//! - Caller identity arrives as an explicit `UserId`; there is no ambient
//!   session state anywhere in core.

use crate::model::shelf::NewSection;
use crate::model::user::{NewUser, User, UserId};
use crate::repo::shelf_repo::{ShelfRepoError, ShelfRepository};
use crate::repo::user_repo::{UserRepoError, UserRepository};
use crate::service::shelf_service::slugify;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Sections every fresh account starts with.
const STARTER_SECTIONS: &[&str] = &["Reading", "Watching"];

/// Errors from user use-case operations.
#[derive(Debug)]
pub enum UserServiceError {
    /// First name is blank after trim.
    InvalidFirstname,
    /// Requested handle normalizes to nothing.
    InvalidSlug(String),
    /// Requested handle is already registered.
    SlugTaken(String),
    UserNotFound(UserId),
    /// No user registered under this handle.
    UnknownHandle(String),
    /// User persistence failure.
    Users(UserRepoError),
    /// Starter-section persistence failure.
    Shelves(ShelfRepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFirstname => write!(f, "firstname must not be blank"),
            Self::InvalidSlug(value) => write!(f, "handle has no usable characters: `{value}`"),
            Self::SlugTaken(slug) => write!(f, "handle already taken: `{slug}`"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::UnknownHandle(slug) => write!(f, "no user registered as `{slug}`"),
            Self::Users(err) => write!(f, "{err}"),
            Self::Shelves(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Users(err) => Some(err),
            Self::Shelves(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserRepoError> for UserServiceError {
    fn from(value: UserRepoError) -> Self {
        match value {
            UserRepoError::SlugTaken(slug) => Self::SlugTaken(slug),
            UserRepoError::NotFound(id) => Self::UserNotFound(id),
            other => Self::Users(other),
        }
    }
}

impl From<ShelfRepoError> for UserServiceError {
    fn from(value: ShelfRepoError) -> Self {
        Self::Shelves(value)
    }
}

/// Use-case service for registration and profiles.
pub struct UserService<U: UserRepository, S: ShelfRepository> {
    users: U,
    shelves: S,
}

impl<U: UserRepository, S: ShelfRepository> UserService<U, S> {
    /// Creates a service from repository implementations.
    pub fn new(users: U, shelves: S) -> Self {
        Self { users, shelves }
    }

    /// Registers a user and seeds the starter sections.
    ///
    /// The requested handle is normalized to a slug before persistence.
    pub fn register_user(&self, draft: &NewUser) -> Result<User, UserServiceError> {
        if draft.firstname.trim().is_empty() {
            return Err(UserServiceError::InvalidFirstname);
        }
        let slug = slugify(&draft.slug);
        if slug.is_empty() {
            return Err(UserServiceError::InvalidSlug(draft.slug.clone()));
        }

        let user = self.users.create_user(&NewUser {
            slug,
            firstname: draft.firstname.trim().to_string(),
            picture_url: draft.picture_url.clone(),
        })?;

        for name in STARTER_SECTIONS {
            let uuid = Uuid::new_v4();
            self.shelves.create_section(&NewSection {
                uuid,
                owner_uuid: user.uuid,
                slug: slugify(name),
                name: Some((*name).to_string()),
            })?;
        }

        info!(
            "event=user_register module=users status=ok user={} sections={}",
            user.uuid,
            STARTER_SECTIONS.len()
        );
        Ok(user)
    }

    /// Loads one profile by handle.
    pub fn get_profile(&self, slug: &str) -> Result<User, UserServiceError> {
        self.users
            .get_user_by_slug(slug)?
            .ok_or_else(|| UserServiceError::UnknownHandle(slug.to_string()))
    }

    /// Updates profile fields of an existing user.
    pub fn update_profile(&self, user: &User) -> Result<(), UserServiceError> {
        if user.firstname.trim().is_empty() {
            return Err(UserServiceError::InvalidFirstname);
        }
        self.users.update_user(user).map_err(Into::into)
    }
}
