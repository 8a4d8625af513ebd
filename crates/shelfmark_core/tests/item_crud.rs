use rusqlite::Connection;
use shelfmark_core::db::migrations::latest_version;
use shelfmark_core::db::open_db_in_memory;
use shelfmark_core::{
    Collection, Item, ItemHome, ItemKind, ItemRepoError, ItemRepository, ItemService,
    ItemServiceError, ItemValidationError, Lifecycle, NewItem, NewUser, ShelfService,
    SqliteItemRepository, SqliteShelfRepository, SqliteUserRepository, User, UserService,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn register(conn: &Connection, handle: &str) -> User {
    let service = UserService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteShelfRepository::try_new(conn).unwrap(),
    );
    service
        .register_user(&NewUser {
            slug: handle.to_string(),
            firstname: "Ada".to_string(),
            picture_url: None,
        })
        .unwrap()
}

fn seed_collection(conn: &Connection, owner: &User) -> Collection {
    let shelf = ShelfService::new(SqliteShelfRepository::try_new(conn).unwrap());
    let section = shelf.create_empty_section(owner.uuid).unwrap();
    shelf.create_empty_collection(section.uuid).unwrap()
}

#[test]
fn create_and_get_roundtrip_preserves_import_fields() {
    let conn = setup();
    let user = register(&conn, "ada");
    let collection = seed_collection(&conn, &user);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let mut draft = NewItem::new(ItemKind::Book, "The Dispossessed");
    draft.author = Some("Ursula K. Le Guin".to_string());
    draft.provider = Some("openlibrary".to_string());
    draft.product_url = Some("https://openlibrary.org/works/OL46624W".to_string());
    draft.meta = Some(serde_json::json!({
        "isbn": "9780060512750",
        "pages": 387,
    }));

    let created = repo
        .create_item(&draft, ItemHome::Collection(collection.uuid))
        .unwrap();

    let loaded = repo.get_item(created.uuid, false).unwrap().unwrap();
    assert_eq!(loaded.title, "The Dispossessed");
    assert_eq!(loaded.author.as_deref(), Some("Ursula K. Le Guin"));
    assert_eq!(loaded.kind, ItemKind::Book);
    assert_eq!(loaded.home, ItemHome::Collection(collection.uuid));
    assert_eq!(loaded.position, 0);
    assert_eq!(loaded.state, Lifecycle::Active);
    assert_eq!(
        loaded.meta.as_ref().and_then(|meta| meta.get("pages")),
        Some(&serde_json::json!(387))
    );
}

#[test]
fn create_rejects_blank_title() {
    let conn = setup();
    let user = register(&conn, "ada");
    let collection = seed_collection(&conn, &user);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let err = repo
        .create_item(
            &NewItem::new(ItemKind::Article, "   "),
            ItemHome::Collection(collection.uuid),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ItemRepoError::Validation(ItemValidationError::EmptyTitle)
    ));
}

#[test]
fn create_rejects_non_http_product_url() {
    let conn = setup();
    let user = register(&conn, "ada");
    let collection = seed_collection(&conn, &user);
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let mut draft = NewItem::new(ItemKind::Website, "weird link");
    draft.product_url = Some("javascript:alert(1)".to_string());

    let err = repo
        .create_item(&draft, ItemHome::Collection(collection.uuid))
        .unwrap_err();
    assert!(matches!(
        err,
        ItemRepoError::Validation(ItemValidationError::InvalidUrl(_))
    ));
}

#[test]
fn create_into_unknown_collection_reports_missing_scope() {
    let conn = setup();
    register(&conn, "ada");
    let repo = SqliteItemRepository::try_new(&conn).unwrap();

    let missing = ItemHome::Collection(Uuid::new_v4());
    let err = repo
        .create_item(&NewItem::new(ItemKind::Movie, "Stalker"), missing)
        .unwrap_err();
    assert!(matches!(
        err,
        ItemRepoError::HomeNotFound(home) if home == missing
    ));
}

#[test]
fn update_rewrites_scalars_but_never_position_or_scope() {
    let conn = setup();
    let user = register(&conn, "ada");
    let collection = seed_collection(&conn, &user);
    let home = ItemHome::Collection(collection.uuid);
    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());

    service
        .create_item(&NewItem::new(ItemKind::Book, "first"), home)
        .unwrap();
    let second = service
        .create_item(&NewItem::new(ItemKind::Book, "second"), home)
        .unwrap();

    let mut edited: Item = second.clone();
    edited.title = "second, annotated".to_string();
    edited.comment = Some("re-read every winter".to_string());
    // A stale or hostile position value on the model must not leak into
    // storage; ordering only moves through reordering entry points.
    edited.position = 40;
    service.update_item(&edited).unwrap();

    let loaded = service.get_item(second.uuid, false).unwrap().unwrap();
    assert_eq!(loaded.title, "second, annotated");
    assert_eq!(loaded.comment.as_deref(), Some("re-read every winter"));
    assert_eq!(loaded.position, 1);
    assert_eq!(loaded.home, home);
}

#[test]
fn update_missing_item_reports_not_found() {
    let conn = setup();
    let user = register(&conn, "ada");
    let collection = seed_collection(&conn, &user);
    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());

    let phantom = Item {
        uuid: Uuid::new_v4(),
        kind: ItemKind::Book,
        title: "never saved".to_string(),
        author: None,
        comment: None,
        description: None,
        image_url: None,
        product_url: None,
        provider: None,
        meta: None,
        home: ItemHome::Collection(collection.uuid),
        position: 0,
        state: Lifecycle::Active,
        created_at: 0,
        updated_at: 0,
    };

    let err = service.update_item(&phantom).unwrap_err();
    assert!(matches!(
        err,
        ItemServiceError::ItemNotFound(id) if id == phantom.uuid
    ));
}

#[test]
fn deleted_items_are_hidden_unless_requested() {
    let conn = setup();
    let user = register(&conn, "ada");
    let collection = seed_collection(&conn, &user);
    let home = ItemHome::Collection(collection.uuid);
    let service = ItemService::new(SqliteItemRepository::try_new(&conn).unwrap());

    let item = service
        .create_item(&NewItem::new(ItemKind::Podcast, "episode 12"), home)
        .unwrap();
    service.soft_delete_item(item.uuid).unwrap();

    assert!(service.get_item(item.uuid, false).unwrap().is_none());
    let tombstone = service.get_item(item.uuid, true).unwrap().unwrap();
    assert!(matches!(tombstone.state, Lifecycle::Deleted { at } if at > 0));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    match result {
        Err(ItemRepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_items_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(ItemRepoError::MissingRequiredTable("items"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_items_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE items (
            uuid TEXT PRIMARY KEY NOT NULL,
            collection_uuid TEXT,
            inbox_owner_uuid TEXT,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT,
            comment TEXT,
            description TEXT,
            image_url TEXT,
            product_url TEXT,
            provider TEXT,
            position INTEGER NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            deleted_at INTEGER,
            created_at INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE collections (uuid TEXT PRIMARY KEY NOT NULL);
        CREATE TABLE users (uuid TEXT PRIMARY KEY NOT NULL);",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteItemRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(ItemRepoError::MissingRequiredColumn {
            table: "items",
            column: "meta"
        })
    ));
}
