//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for user profiles.
//!
//! # Invariants
//! - `slug` is unique across users and immutable after registration.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::user::{NewUser, User, UserId};
use crate::repo::{table_exists, table_has_column};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    slug,
    firstname,
    picture_url,
    biography,
    website,
    created_at,
    updated_at
FROM users";

pub type UserRepoResult<T> = Result<T, UserRepoError>;

/// Errors from user persistence operations.
#[derive(Debug)]
pub enum UserRepoError {
    Db(DbError),
    NotFound(UserId),
    /// Requested handle is already registered.
    SlugTaken(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for UserRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::SlugTaken(slug) => write!(f, "user slug already taken: `{slug}`"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "user repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "user repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "user repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid user data: {message}"),
        }
    }
}

impl Error for UserRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for UserRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for UserRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for user profile operations.
pub trait UserRepository {
    /// Creates one user. The slug must already be normalized.
    fn create_user(&self, draft: &NewUser) -> UserRepoResult<User>;
    /// Loads one user by id.
    fn get_user(&self, id: UserId) -> UserRepoResult<Option<User>>;
    /// Loads one user by handle.
    fn get_user_by_slug(&self, slug: &str) -> UserRepoResult<Option<User>>;
    /// Updates profile fields. The slug is not updatable.
    fn update_user(&self, user: &User) -> UserRepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> UserRepoResult<Self> {
        ensure_user_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, draft: &NewUser) -> UserRepoResult<User> {
        let uuid = Uuid::new_v4();
        let inserted = self.conn.execute(
            "INSERT INTO users (uuid, slug, firstname, picture_url)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                uuid.to_string(),
                draft.slug.as_str(),
                draft.firstname.as_str(),
                draft.picture_url.as_deref(),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(UserRepoError::SlugTaken(draft.slug.clone()));
            }
            Err(other) => return Err(other.into()),
        }

        self.get_user(uuid)?.ok_or(UserRepoError::NotFound(uuid))
    }

    fn get_user(&self, id: UserId) -> UserRepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn get_user_by_slug(&self, slug: &str) -> UserRepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn update_user(&self, user: &User) -> UserRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET firstname = ?2,
                 picture_url = ?3,
                 biography = ?4,
                 website = ?5,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                user.uuid.to_string(),
                user.firstname.as_str(),
                user.picture_url.as_deref(),
                user.biography.as_deref(),
                user.website.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(UserRepoError::NotFound(user.uuid));
        }
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> UserRepoResult<User> {
    let uuid_text: String = row.get("uuid")?;
    Ok(User {
        uuid: Uuid::parse_str(&uuid_text).map_err(|_| {
            UserRepoError::InvalidData(format!("invalid uuid `{uuid_text}` in users.uuid"))
        })?,
        slug: row.get("slug")?,
        firstname: row.get("firstname")?,
        picture_url: row.get("picture_url")?,
        biography: row.get("biography")?,
        website: row.get("website")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn ensure_user_connection_ready(conn: &Connection) -> UserRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(UserRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "users")? {
        return Err(UserRepoError::MissingRequiredTable("users"));
    }

    for column in ["uuid", "slug", "firstname", "picture_url"] {
        if !table_has_column(conn, "users", column)? {
            return Err(UserRepoError::MissingRequiredColumn {
                table: "users",
                column,
            });
        }
    }

    Ok(())
}
