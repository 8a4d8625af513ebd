use rusqlite::Connection;
use shelfmark_core::db::open_db_in_memory;
use shelfmark_core::{
    NewUser, ShelfService, SqliteShelfRepository, SqliteUserRepository, UserService,
    UserServiceError,
};

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn user_service(
    conn: &Connection,
) -> UserService<SqliteUserRepository<'_>, SqliteShelfRepository<'_>> {
    UserService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteShelfRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn registration_normalizes_handle_and_seeds_starter_sections() {
    let conn = setup();
    let service = user_service(&conn);

    let user = service
        .register_user(&NewUser {
            slug: "Ada Lovelace".to_string(),
            firstname: "Ada".to_string(),
            picture_url: Some("https://img.example.org/ada.png".to_string()),
        })
        .unwrap();

    assert_eq!(user.slug, "ada-lovelace");
    assert_eq!(user.firstname, "Ada");

    let shelf = ShelfService::new(SqliteShelfRepository::try_new(&conn).unwrap());
    let sections = shelf.list_sections(user.uuid).unwrap();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].name.as_deref(), Some("Reading"));
    assert_eq!(sections[1].name.as_deref(), Some("Watching"));
    assert_eq!(sections[0].sort_index, 0);
    assert_eq!(sections[1].sort_index, 1);
}

#[test]
fn duplicate_handle_is_rejected() {
    let conn = setup();
    let service = user_service(&conn);

    let draft = NewUser {
        slug: "ada".to_string(),
        firstname: "Ada".to_string(),
        picture_url: None,
    };
    service.register_user(&draft).unwrap();

    let err = service.register_user(&draft).unwrap_err();
    assert!(matches!(
        err,
        UserServiceError::SlugTaken(slug) if slug == "ada"
    ));
}

#[test]
fn unusable_handle_is_rejected_before_persistence() {
    let conn = setup();
    let service = user_service(&conn);

    let err = service
        .register_user(&NewUser {
            slug: "!!!".to_string(),
            firstname: "Ada".to_string(),
            picture_url: None,
        })
        .unwrap_err();
    assert!(matches!(err, UserServiceError::InvalidSlug(_)));
}

#[test]
fn blank_firstname_is_rejected() {
    let conn = setup();
    let service = user_service(&conn);

    let err = service
        .register_user(&NewUser {
            slug: "ada".to_string(),
            firstname: "  ".to_string(),
            picture_url: None,
        })
        .unwrap_err();
    assert!(matches!(err, UserServiceError::InvalidFirstname));
}

#[test]
fn profile_lookup_and_update_roundtrip() {
    let conn = setup();
    let service = user_service(&conn);

    let registered = service
        .register_user(&NewUser {
            slug: "ada".to_string(),
            firstname: "Ada".to_string(),
            picture_url: None,
        })
        .unwrap();

    let mut profile = service.get_profile("ada").unwrap();
    assert_eq!(profile.uuid, registered.uuid);

    profile.biography = Some("Wrote the first program.".to_string());
    profile.website = Some("https://ada.example.org".to_string());
    service.update_profile(&profile).unwrap();

    let reloaded = service.get_profile("ada").unwrap();
    assert_eq!(
        reloaded.biography.as_deref(),
        Some("Wrote the first program.")
    );
    assert_eq!(reloaded.website.as_deref(), Some("https://ada.example.org"));
}

#[test]
fn unknown_handle_lookup_reports_unknown_handle() {
    let conn = setup();
    let service = user_service(&conn);

    let err = service.get_profile("nobody").unwrap_err();
    assert!(matches!(
        err,
        UserServiceError::UnknownHandle(slug) if slug == "nobody"
    ));
}
