//! Section/collection repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide persistence APIs for the section/collection hierarchy.
//! - Keep SQL details and section ordering behavior inside the repository
//!   boundary.
//!
//! # Invariants
//! - Section listing is deterministic: `sort_index ASC, uuid ASC`.
//! - `sort_index` is append-assigned from the owner's section count.
//! - Archived collections are excluded from listings by default.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::lifecycle::Lifecycle;
use crate::model::shelf::{
    Collection, CollectionId, NewCollection, NewSection, Section, SectionId,
};
use crate::model::user::UserId;
use crate::repo::{bool_to_int, table_exists, table_has_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const SECTION_SELECT_SQL: &str = "SELECT
    uuid,
    owner_uuid,
    slug,
    name,
    sort_index,
    is_expanded,
    created_at,
    updated_at
FROM sections";

const COLLECTION_SELECT_SQL: &str = "SELECT
    uuid,
    section_uuid,
    owner_uuid,
    slug,
    name,
    detail,
    is_deleted,
    deleted_at,
    created_at,
    updated_at
FROM collections";

pub type ShelfRepoResult<T> = Result<T, ShelfRepoError>;

/// Errors from section/collection persistence operations.
#[derive(Debug)]
pub enum ShelfRepoError {
    Db(DbError),
    SectionNotFound(SectionId),
    CollectionNotFound(CollectionId),
    OwnerNotFound(UserId),
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

impl Display for ShelfRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::CollectionNotFound(id) => write!(f, "collection not found: {id}"),
            Self::OwnerNotFound(id) => write!(f, "owner not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "shelf repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "shelf repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "shelf repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid shelf data: {message}"),
        }
    }
}

impl Error for ShelfRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ShelfRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ShelfRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for section/collection operations.
pub trait ShelfRepository {
    /// Creates one section appended after the owner's existing sections.
    fn create_section(&self, draft: &NewSection) -> ShelfRepoResult<Section>;
    /// Loads one section by id.
    fn get_section(&self, id: SectionId) -> ShelfRepoResult<Option<Section>>;
    /// Lists one owner's sections in page order.
    fn list_sections(&self, owner: UserId) -> ShelfRepoResult<Vec<Section>>;
    /// Renames one section.
    fn rename_section(&self, id: SectionId, name: &str) -> ShelfRepoResult<()>;
    /// Folds or unfolds one section on the owner's page.
    fn set_section_expanded(&self, id: SectionId, expanded: bool) -> ShelfRepoResult<()>;
    /// Creates one collection under a section, owner inherited.
    fn create_collection(&self, draft: &NewCollection) -> ShelfRepoResult<Collection>;
    /// Loads one collection by id.
    fn get_collection(
        &self,
        id: CollectionId,
        include_deleted: bool,
    ) -> ShelfRepoResult<Option<Collection>>;
    /// Lists collections under one section.
    fn list_collections(
        &self,
        section: SectionId,
        include_deleted: bool,
    ) -> ShelfRepoResult<Vec<Collection>>;
    /// Updates slug/name/detail of one active collection.
    fn update_collection(&self, collection: &Collection) -> ShelfRepoResult<()>;
    /// Tombstones one collection. Archiving twice is a no-op.
    fn archive_collection(&self, id: CollectionId) -> ShelfRepoResult<()>;
}

/// SQLite-backed shelf repository.
pub struct SqliteShelfRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteShelfRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ShelfRepoResult<Self> {
        ensure_shelf_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ShelfRepository for SqliteShelfRepository<'_> {
    fn create_section(&self, draft: &NewSection) -> ShelfRepoResult<Section> {
        ensure_owner_exists(self.conn, draft.owner_uuid)?;

        let sort_index: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(sort_index), -1) + 1
             FROM sections
             WHERE owner_uuid = ?1;",
            [draft.owner_uuid.to_string()],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO sections (uuid, owner_uuid, slug, name, sort_index)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                draft.uuid.to_string(),
                draft.owner_uuid.to_string(),
                draft.slug.as_str(),
                draft.name.as_deref(),
                sort_index,
            ],
        )?;

        self.get_section(draft.uuid)?
            .ok_or(ShelfRepoError::SectionNotFound(draft.uuid))
    }

    fn get_section(&self, id: SectionId) -> ShelfRepoResult<Option<Section>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SECTION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_section_row(row)?));
        }
        Ok(None)
    }

    fn list_sections(&self, owner: UserId) -> ShelfRepoResult<Vec<Section>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SECTION_SELECT_SQL}
             WHERE owner_uuid = ?1
             ORDER BY sort_index ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(parse_section_row(row)?);
        }
        Ok(sections)
    }

    fn rename_section(&self, id: SectionId, name: &str) -> ShelfRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE sections
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), name],
        )?;
        if changed == 0 {
            return Err(ShelfRepoError::SectionNotFound(id));
        }
        Ok(())
    }

    fn set_section_expanded(&self, id: SectionId, expanded: bool) -> ShelfRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE sections
             SET is_expanded = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(expanded)],
        )?;
        if changed == 0 {
            return Err(ShelfRepoError::SectionNotFound(id));
        }
        Ok(())
    }

    fn create_collection(&self, draft: &NewCollection) -> ShelfRepoResult<Collection> {
        let owner_uuid: Option<String> = self
            .conn
            .query_row(
                "SELECT owner_uuid FROM sections WHERE uuid = ?1;",
                [draft.section_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let owner_uuid = owner_uuid.ok_or(ShelfRepoError::SectionNotFound(draft.section_uuid))?;

        self.conn.execute(
            "INSERT INTO collections (uuid, section_uuid, owner_uuid, slug, name)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                draft.uuid.to_string(),
                draft.section_uuid.to_string(),
                owner_uuid,
                draft.slug.as_str(),
                draft.name.as_deref(),
            ],
        )?;

        self.get_collection(draft.uuid, false)?
            .ok_or(ShelfRepoError::CollectionNotFound(draft.uuid))
    }

    fn get_collection(
        &self,
        id: CollectionId,
        include_deleted: bool,
    ) -> ShelfRepoResult<Option<Collection>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COLLECTION_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_collection_row(row)?));
        }
        Ok(None)
    }

    fn list_collections(
        &self,
        section: SectionId,
        include_deleted: bool,
    ) -> ShelfRepoResult<Vec<Collection>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COLLECTION_SELECT_SQL}
             WHERE section_uuid = ?1
               AND (?2 = 1 OR is_deleted = 0)
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![section.to_string(), bool_to_int(include_deleted)])?;
        let mut collections = Vec::new();
        while let Some(row) = rows.next()? {
            collections.push(parse_collection_row(row)?);
        }
        Ok(collections)
    }

    fn update_collection(&self, collection: &Collection) -> ShelfRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE collections
             SET slug = ?2,
                 name = ?3,
                 detail = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![
                collection.uuid.to_string(),
                collection.slug.as_str(),
                collection.name.as_deref(),
                collection.detail.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(ShelfRepoError::CollectionNotFound(collection.uuid));
        }
        Ok(())
    }

    fn archive_collection(&self, id: CollectionId) -> ShelfRepoResult<()> {
        let existing = self
            .get_collection(id, true)?
            .ok_or(ShelfRepoError::CollectionNotFound(id))?;
        if !existing.state.is_active() {
            return Ok(());
        }

        self.conn.execute(
            "UPDATE collections
             SET is_deleted = 1,
                 deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            [id.to_string()],
        )?;
        Ok(())
    }
}

fn ensure_owner_exists(conn: &Connection, owner: UserId) -> ShelfRepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE uuid = ?1);",
        [owner.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(ShelfRepoError::OwnerNotFound(owner));
    }
    Ok(())
}

fn parse_section_row(row: &Row<'_>) -> ShelfRepoResult<Section> {
    let uuid_text: String = row.get("uuid")?;
    let owner_text: String = row.get("owner_uuid")?;

    Ok(Section {
        uuid: parse_uuid(&uuid_text, "sections.uuid")?,
        owner_uuid: parse_uuid(&owner_text, "sections.owner_uuid")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        sort_index: row.get("sort_index")?,
        is_expanded: parse_flag(row.get("is_expanded")?, "sections.is_expanded")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_collection_row(row: &Row<'_>) -> ShelfRepoResult<Collection> {
    let uuid_text: String = row.get("uuid")?;
    let section_text: String = row.get("section_uuid")?;
    let owner_text: String = row.get("owner_uuid")?;

    let state = match (
        row.get::<_, i64>("is_deleted")?,
        row.get::<_, Option<i64>>("deleted_at")?,
    ) {
        (0, _) => Lifecycle::Active,
        (1, Some(at)) => Lifecycle::Deleted { at },
        (1, None) => {
            return Err(ShelfRepoError::InvalidData(format!(
                "collection {uuid_text} is tombstoned without a deleted_at value"
            )));
        }
        (other, _) => {
            return Err(ShelfRepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in collections.is_deleted"
            )));
        }
    };

    Ok(Collection {
        uuid: parse_uuid(&uuid_text, "collections.uuid")?,
        section_uuid: parse_uuid(&section_text, "collections.section_uuid")?,
        owner_uuid: parse_uuid(&owner_text, "collections.owner_uuid")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        detail: row.get("detail")?,
        state,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_flag(value: i64, column: &'static str) -> ShelfRepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ShelfRepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn parse_uuid(value: &str, column: &'static str) -> ShelfRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ShelfRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_shelf_connection_ready(conn: &Connection) -> ShelfRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ShelfRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["sections", "collections", "users"] {
        if !table_exists(conn, table)? {
            return Err(ShelfRepoError::MissingRequiredTable(table));
        }
    }

    for column in ["uuid", "owner_uuid", "slug", "sort_index", "is_expanded"] {
        if !table_has_column(conn, "sections", column)? {
            return Err(ShelfRepoError::MissingRequiredColumn {
                table: "sections",
                column,
            });
        }
    }

    for column in ["uuid", "section_uuid", "owner_uuid", "slug", "is_deleted"] {
        if !table_has_column(conn, "collections", column)? {
            return Err(ShelfRepoError::MissingRequiredColumn {
                table: "collections",
                column,
            });
        }
    }

    Ok(())
}
