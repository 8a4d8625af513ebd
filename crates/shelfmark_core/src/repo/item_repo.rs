//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and reorder APIs over canonical `items` storage.
//! - Keep SQL details and position bookkeeping inside the repository
//!   boundary.
//!
//! # Invariants
//! - Active positions within one scope stay dense after every write path.
//! - Reorder, delete, and re-home run inside immediate transactions, so
//!   concurrent movers serialize and partial position writes roll back.
//! - One canonical ordering (`position, created_at, uuid`) is used by both
//!   the read path and every reindex/compaction path.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::item::{Item, ItemHome, ItemId, ItemKind, ItemValidationError, NewItem};
use crate::model::lifecycle::Lifecycle;
use crate::model::position::{
    compact_positions, reassign_positions, OutOfRange, PositionChange, PositionedRef,
};
use crate::repo::{bool_to_int, table_exists, table_has_column};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    collection_uuid,
    inbox_owner_uuid,
    kind,
    title,
    author,
    comment,
    description,
    image_url,
    product_url,
    provider,
    meta,
    position,
    is_deleted,
    deleted_at,
    created_at,
    updated_at
FROM items";

// Single source of truth for scope order: display, reindex, and compaction
// all read the same sequence.
const CANONICAL_ORDER_SQL: &str = "ORDER BY position ASC, created_at ASC, uuid ASC";

pub type ItemRepoResult<T> = Result<T, ItemRepoError>;

/// Errors from item persistence, reorder, and query operations.
#[derive(Debug)]
pub enum ItemRepoError {
    Validation(ItemValidationError),
    Db(DbError),
    NotFound(ItemId),
    /// Destination scope does not exist or is tombstoned.
    HomeNotFound(ItemHome),
    /// A move index fell outside the scope's active range.
    OutOfRange(OutOfRange),
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

impl Display for ItemRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::HomeNotFound(home) => write!(f, "item scope not found: {home}"),
            Self::OutOfRange(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "item repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "item repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
        }
    }
}

impl Error for ItemRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::OutOfRange(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for ItemRepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for ItemRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ItemRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<OutOfRange> for ItemRepoError {
    fn from(value: OutOfRange) -> Self {
        Self::OutOfRange(value)
    }
}

/// Repository interface for item CRUD and position maintenance.
pub trait ItemRepository {
    /// Creates one item appended at the end of `home`'s active list.
    fn create_item(&self, draft: &NewItem, home: ItemHome) -> ItemRepoResult<Item>;
    /// Loads one item by id.
    fn get_item(&self, id: ItemId, include_deleted: bool) -> ItemRepoResult<Option<Item>>;
    /// Lists items of one scope in canonical order.
    fn list_items(&self, home: ItemHome, include_deleted: bool) -> ItemRepoResult<Vec<Item>>;
    /// Counts active items of one scope.
    fn count_active_items(&self, home: ItemHome) -> ItemRepoResult<i64>;
    /// Updates editable scalar fields. Cannot touch position or scope.
    fn update_item(&self, item: &Item) -> ItemRepoResult<()>;
    /// Tombstones one item and compacts the survivors of its scope.
    ///
    /// Returns the compaction rewrites that were applied. Deleting an
    /// already-tombstoned item is a no-op.
    fn soft_delete_item(&self, id: ItemId) -> ItemRepoResult<Vec<PositionChange>>;
    /// Re-homes one item: appended at the end of `new_home`, old scope
    /// compacted. Moving to the current scope is a no-op.
    fn move_item(&self, id: ItemId, new_home: ItemHome) -> ItemRepoResult<Item>;
    /// Moves the element at `source_index` to `destination_index` within
    /// `home`'s active list and returns every item whose position changed.
    fn change_position(
        &self,
        home: ItemHome,
        source_index: usize,
        destination_index: usize,
    ) -> ItemRepoResult<Vec<Item>>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ItemRepoResult<Self> {
        ensure_item_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, draft: &NewItem, home: ItemHome) -> ItemRepoResult<Item> {
        draft.validate()?;
        ensure_home_active(self.conn, home)?;

        let uuid = Uuid::new_v4();
        let position = next_position(self.conn, home)?;
        let (collection_uuid, inbox_owner_uuid) = home_columns(home);
        self.conn.execute(
            "INSERT INTO items (
                uuid,
                collection_uuid,
                inbox_owner_uuid,
                kind,
                title,
                author,
                comment,
                description,
                image_url,
                product_url,
                provider,
                meta,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                uuid.to_string(),
                collection_uuid,
                inbox_owner_uuid,
                kind_to_db(draft.kind),
                draft.title.as_str(),
                draft.author.as_deref(),
                draft.comment.as_deref(),
                draft.description.as_deref(),
                draft.image_url.as_deref(),
                draft.product_url.as_deref(),
                draft.provider.as_deref(),
                meta_to_db(draft.meta.as_ref())?,
                position,
            ],
        )?;

        load_required_item(self.conn, uuid)
    }

    fn get_item(&self, id: ItemId, include_deleted: bool) -> ItemRepoResult<Option<Item>> {
        load_item(self.conn, id, include_deleted)
    }

    fn list_items(&self, home: ItemHome, include_deleted: bool) -> ItemRepoResult<Vec<Item>> {
        let sql = format!(
            "{ITEM_SELECT_SQL}
             WHERE {column} = ?1
               AND (?2 = 1 OR is_deleted = 0)
             {CANONICAL_ORDER_SQL};",
            column = home_column(home),
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![home_key(home), bool_to_int(include_deleted)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn count_active_items(&self, home: ItemHome) -> ItemRepoResult<i64> {
        let sql = format!(
            "SELECT COUNT(*)
             FROM items
             WHERE {column} = ?1
               AND is_deleted = 0;",
            column = home_column(home),
        );
        let count = self
            .conn
            .query_row(&sql, [home_key(home)], |row| row.get(0))?;
        Ok(count)
    }

    fn update_item(&self, item: &Item) -> ItemRepoResult<()> {
        item.validate()?;

        // Deliberately excludes position and both scope columns: those move
        // only through change_position/move_item so scopes stay dense.
        let changed = self.conn.execute(
            "UPDATE items
             SET
                kind = ?1,
                title = ?2,
                author = ?3,
                comment = ?4,
                description = ?5,
                image_url = ?6,
                product_url = ?7,
                provider = ?8,
                meta = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?10
               AND is_deleted = 0;",
            params![
                kind_to_db(item.kind),
                item.title.as_str(),
                item.author.as_deref(),
                item.comment.as_deref(),
                item.description.as_deref(),
                item.image_url.as_deref(),
                item.product_url.as_deref(),
                item.provider.as_deref(),
                meta_to_db(item.meta.as_ref())?,
                item.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(ItemRepoError::NotFound(item.uuid));
        }

        Ok(())
    }

    fn soft_delete_item(&self, id: ItemId) -> ItemRepoResult<Vec<PositionChange>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let item = load_item(&tx, id, true)?.ok_or(ItemRepoError::NotFound(id))?;
        if !item.state.is_active() {
            return Ok(Vec::new());
        }

        tx.execute(
            "UPDATE items
             SET is_deleted = 1,
                 deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            [id.to_string()],
        )?;

        let survivors = list_active_refs(&tx, item.home)?;
        let changes = compact_positions(&survivors);
        apply_position_changes(&tx, &changes)?;

        tx.commit()?;
        Ok(changes)
    }

    fn move_item(&self, id: ItemId, new_home: ItemHome) -> ItemRepoResult<Item> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let item = load_item(&tx, id, false)?.ok_or(ItemRepoError::NotFound(id))?;
        if item.home == new_home {
            return Ok(item);
        }

        ensure_home_active(&tx, new_home)?;
        let position = next_position(&tx, new_home)?;
        let (collection_uuid, inbox_owner_uuid) = home_columns(new_home);
        tx.execute(
            "UPDATE items
             SET collection_uuid = ?2,
                 inbox_owner_uuid = ?3,
                 position = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![id.to_string(), collection_uuid, inbox_owner_uuid, position],
        )?;

        let vacated = list_active_refs(&tx, item.home)?;
        apply_position_changes(&tx, &compact_positions(&vacated))?;

        let moved = load_required_item(&tx, id)?;
        tx.commit()?;
        Ok(moved)
    }

    fn change_position(
        &self,
        home: ItemHome,
        source_index: usize,
        destination_index: usize,
    ) -> ItemRepoResult<Vec<Item>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        ensure_home_active(&tx, home)?;
        let refs = list_active_refs(&tx, home)?;
        let changes = reassign_positions(&refs, source_index, destination_index)?;
        apply_position_changes(&tx, &changes)?;

        let changed_ids: Vec<ItemId> = changes.iter().map(|change| change.uuid).collect();
        let items = load_items_by_ids(&tx, &changed_ids)?;
        tx.commit()?;
        Ok(items)
    }
}

fn ensure_home_active(conn: &Connection, home: ItemHome) -> ItemRepoResult<()> {
    let sql = match home {
        ItemHome::Collection(_) => {
            "SELECT EXISTS(
                SELECT 1
                FROM collections
                WHERE uuid = ?1
                  AND is_deleted = 0
            );"
        }
        ItemHome::Inbox(_) => {
            "SELECT EXISTS(
                SELECT 1
                FROM users
                WHERE uuid = ?1
            );"
        }
    };
    let exists: i64 = conn.query_row(sql, [home_key(home)], |row| row.get(0))?;
    if exists == 0 {
        return Err(ItemRepoError::HomeNotFound(home));
    }
    Ok(())
}

fn next_position(conn: &Connection, home: ItemHome) -> ItemRepoResult<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX(position), -1) + 1
         FROM items
         WHERE {column} = ?1
           AND is_deleted = 0;",
        column = home_column(home),
    );
    let next = conn.query_row(&sql, [home_key(home)], |row| row.get(0))?;
    Ok(next)
}

fn list_active_refs(conn: &Connection, home: ItemHome) -> ItemRepoResult<Vec<PositionedRef>> {
    let sql = format!(
        "SELECT uuid, position
         FROM items
         WHERE {column} = ?1
           AND is_deleted = 0
         {CANONICAL_ORDER_SQL};",
        column = home_column(home),
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([home_key(home)])?;
    let mut refs = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        refs.push(PositionedRef {
            uuid: parse_uuid(&uuid_text, "items.uuid")?,
            position: row.get(1)?,
        });
    }
    Ok(refs)
}

fn apply_position_changes(conn: &Connection, changes: &[PositionChange]) -> ItemRepoResult<()> {
    for change in changes {
        conn.execute(
            "UPDATE items
             SET position = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            params![change.uuid.to_string(), change.position],
        )?;
    }
    Ok(())
}

fn load_item(
    conn: &Connection,
    id: ItemId,
    include_deleted: bool,
) -> ItemRepoResult<Option<Item>> {
    let mut stmt = conn.prepare(&format!(
        "{ITEM_SELECT_SQL}
         WHERE uuid = ?1
           AND (?2 = 1 OR is_deleted = 0);"
    ))?;

    let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(row)?));
    }
    Ok(None)
}

fn load_required_item(conn: &Connection, id: ItemId) -> ItemRepoResult<Item> {
    load_item(conn, id, false)?.ok_or(ItemRepoError::NotFound(id))
}

fn load_items_by_ids(conn: &Connection, ids: &[ItemId]) -> ItemRepoResult<Vec<Item>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "{ITEM_SELECT_SQL}
         WHERE uuid IN ({placeholders})
         {CANONICAL_ORDER_SQL};"
    );
    let bind_values: Vec<Value> = ids.iter().map(|id| Value::Text(id.to_string())).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_item_row(row)?);
    }
    Ok(items)
}

fn parse_item_row(row: &Row<'_>) -> ItemRepoResult<Item> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "items.uuid")?;

    let collection_uuid = row
        .get::<_, Option<String>>("collection_uuid")?
        .map(|value| parse_uuid(&value, "items.collection_uuid"))
        .transpose()?;
    let inbox_owner_uuid = row
        .get::<_, Option<String>>("inbox_owner_uuid")?
        .map(|value| parse_uuid(&value, "items.inbox_owner_uuid"))
        .transpose()?;
    let home = match (collection_uuid, inbox_owner_uuid) {
        (Some(collection), None) => ItemHome::Collection(collection),
        (None, Some(owner)) => ItemHome::Inbox(owner),
        _ => {
            return Err(ItemRepoError::InvalidData(format!(
                "item {uuid} must reference exactly one of collection/inbox"
            )));
        }
    };

    let kind_text: String = row.get("kind")?;
    let kind = parse_kind(&kind_text).ok_or_else(|| {
        ItemRepoError::InvalidData(format!("invalid item kind `{kind_text}` in items.kind"))
    })?;

    let state = match (
        row.get::<_, i64>("is_deleted")?,
        row.get::<_, Option<i64>>("deleted_at")?,
    ) {
        (0, _) => Lifecycle::Active,
        (1, Some(at)) => Lifecycle::Deleted { at },
        (1, None) => {
            return Err(ItemRepoError::InvalidData(format!(
                "item {uuid} is tombstoned without a deleted_at value"
            )));
        }
        (other, _) => {
            return Err(ItemRepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in items.is_deleted"
            )));
        }
    };

    let meta = match row.get::<_, Option<String>>("meta")? {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|err| {
            ItemRepoError::InvalidData(format!("invalid meta json for item {uuid}: {err}"))
        })?),
        None => None,
    };

    Ok(Item {
        uuid,
        kind,
        title: row.get("title")?,
        author: row.get("author")?,
        comment: row.get("comment")?,
        description: row.get("description")?,
        image_url: row.get("image_url")?,
        product_url: row.get("product_url")?,
        provider: row.get("provider")?,
        meta,
        home,
        position: row.get("position")?,
        state,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn home_column(home: ItemHome) -> &'static str {
    match home {
        ItemHome::Collection(_) => "collection_uuid",
        ItemHome::Inbox(_) => "inbox_owner_uuid",
    }
}

fn home_key(home: ItemHome) -> String {
    match home {
        ItemHome::Collection(uuid) => uuid.to_string(),
        ItemHome::Inbox(uuid) => uuid.to_string(),
    }
}

fn home_columns(home: ItemHome) -> (Option<String>, Option<String>) {
    match home {
        ItemHome::Collection(uuid) => (Some(uuid.to_string()), None),
        ItemHome::Inbox(uuid) => (None, Some(uuid.to_string())),
    }
}

fn kind_to_db(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Album => "album",
        ItemKind::Article => "article",
        ItemKind::Book => "book",
        ItemKind::Movie => "movie",
        ItemKind::People => "people",
        ItemKind::Podcast => "podcast",
        ItemKind::Repository => "repository",
        ItemKind::Video => "video",
        ItemKind::Website => "website",
    }
}

fn parse_kind(value: &str) -> Option<ItemKind> {
    match value {
        "album" => Some(ItemKind::Album),
        "article" => Some(ItemKind::Article),
        "book" => Some(ItemKind::Book),
        "movie" => Some(ItemKind::Movie),
        "people" => Some(ItemKind::People),
        "podcast" => Some(ItemKind::Podcast),
        "repository" => Some(ItemKind::Repository),
        "video" => Some(ItemKind::Video),
        "website" => Some(ItemKind::Website),
        _ => None,
    }
}

fn meta_to_db(meta: Option<&serde_json::Value>) -> ItemRepoResult<Option<String>> {
    match meta {
        Some(value) => serde_json::to_string(value)
            .map(Some)
            .map_err(|err| ItemRepoError::InvalidData(format!("unserializable meta json: {err}"))),
        None => Ok(None),
    }
}

fn parse_uuid(value: &str, column: &'static str) -> ItemRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| ItemRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_item_connection_ready(conn: &Connection) -> ItemRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(ItemRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["items", "collections", "users"] {
        if !table_exists(conn, table)? {
            return Err(ItemRepoError::MissingRequiredTable(table));
        }
    }

    for column in [
        "uuid",
        "collection_uuid",
        "inbox_owner_uuid",
        "kind",
        "title",
        "author",
        "comment",
        "description",
        "image_url",
        "product_url",
        "provider",
        "meta",
        "position",
        "is_deleted",
        "deleted_at",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "items", column)? {
            return Err(ItemRepoError::MissingRequiredColumn {
                table: "items",
                column,
            });
        }
    }

    Ok(())
}
