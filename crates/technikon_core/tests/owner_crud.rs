use rusqlite::Connection;
use technikon_core::db::migrations::latest_version;
use technikon_core::db::open_db_in_memory;
use technikon_core::{Owner, OwnerRepository, RepoError, SqliteOwnerRepository};

fn sample_owner(vat_number: i64, email: &str) -> Owner {
    Owner::new(vat_number, email, "12 Ermou St, Athens", "s3cret")
}

#[test]
fn save_assigns_id_and_roundtrips_all_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let owner = sample_owner(12345, "a@x.com");
    let saved = repo.save(&owner).unwrap();
    let owner_id = saved.owner_id.unwrap();

    let loaded = repo.find_by_owner_id(owner_id).unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(loaded.vat_number, 12345);
    assert_eq!(loaded.email, "a@x.com");
    assert_eq!(loaded.address, "12 Ermou St, Athens");
    assert_eq!(loaded.password, "s3cret");
    assert!(!loaded.deleted_owner);
}

#[test]
fn find_by_owner_id_returns_none_for_unknown_ids() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    assert!(repo.find_by_owner_id(1).is_none());
    assert!(repo.find_by_owner_id(-42).is_none());
}

#[test]
fn save_rejects_owner_that_already_has_an_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let saved = repo.save(&sample_owner(1, "one@x.com")).unwrap();
    assert!(repo.save(&saved).is_none());
    assert_eq!(repo.find_all().len(), 1);
}

#[test]
fn save_rejects_invalid_owner() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    assert!(repo.save(&sample_owner(0, "zero@x.com")).is_none());
    assert!(repo.save(&sample_owner(10, "   ")).is_none());
    assert!(repo.find_all().is_empty());
}

#[test]
fn lookups_by_vat_and_email_find_active_owner() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let saved = repo.save(&sample_owner(777, "seven@x.com")).unwrap();
    repo.save(&sample_owner(888, "eight@x.com")).unwrap();

    assert_eq!(repo.find_by_vat_number(777), Some(saved.clone()));
    assert_eq!(repo.find_by_email("seven@x.com"), Some(saved));
    assert!(repo.find_by_vat_number(999).is_none());
    assert!(repo.find_by_email("nobody@x.com").is_none());
}

#[test]
fn soft_deleted_owner_is_hidden_from_filtered_lookups_but_not_from_id_lookup() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let saved = repo.save(&sample_owner(12345, "a@x.com")).unwrap();
    let owner_id = saved.owner_id.unwrap();
    assert!(repo.safe_delete_by_id(owner_id));

    assert!(repo.find_by_email("a@x.com").is_none());
    assert!(repo.find_by_vat_number(12345).is_none());
    assert!(repo.find_all().is_empty());

    // Keyed lookup does not filter the tombstone.
    let by_id = repo.find_by_owner_id(owner_id).unwrap();
    assert!(by_id.deleted_owner);
    assert!(!by_id.is_active());
}

#[test]
fn safe_delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let owner_id = repo
        .save(&sample_owner(55, "twice@x.com"))
        .unwrap()
        .owner_id
        .unwrap();

    assert!(repo.safe_delete_by_id(owner_id));
    assert!(repo.safe_delete_by_id(owner_id));
    assert!(repo.find_by_owner_id(owner_id).unwrap().deleted_owner);
}

#[test]
fn safe_delete_of_unknown_id_returns_false() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    assert!(!repo.safe_delete_by_id(404));
}

#[test]
fn delete_by_id_removes_active_and_soft_deleted_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let active = repo.save(&sample_owner(1, "active@x.com")).unwrap();
    let tombstoned = repo.save(&sample_owner(2, "gone@x.com")).unwrap();
    let active_id = active.owner_id.unwrap();
    let tombstoned_id = tombstoned.owner_id.unwrap();
    assert!(repo.safe_delete_by_id(tombstoned_id));

    assert!(repo.delete_by_id(active_id));
    assert!(repo.delete_by_id(tombstoned_id));

    assert!(repo.find_by_owner_id(active_id).is_none());
    assert!(repo.find_by_owner_id(tombstoned_id).is_none());
    assert!(!repo.delete_by_id(active_id));
}

#[test]
fn owner_ids_are_not_reused_after_hard_delete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let first_id = repo
        .save(&sample_owner(1, "first@x.com"))
        .unwrap()
        .owner_id
        .unwrap();
    assert!(repo.delete_by_id(first_id));

    let second_id = repo
        .save(&sample_owner(2, "second@x.com"))
        .unwrap()
        .owner_id
        .unwrap();
    assert!(second_id > first_id);
}

#[test]
fn update_changes_only_address_email_and_password() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let saved = repo.save(&sample_owner(4242, "old@x.com")).unwrap();
    let owner_id = saved.owner_id.unwrap();

    let mut changes = saved.clone();
    changes.address = "1 New Road".to_string();
    changes.email = "new@x.com".to_string();
    changes.password = "rotated".to_string();
    changes.vat_number = 9999;
    changes.deleted_owner = true;

    let updated = repo.update(&changes).unwrap();
    assert_eq!(updated.owner_id, Some(owner_id));
    assert_eq!(updated.address, "1 New Road");
    assert_eq!(updated.email, "new@x.com");
    assert_eq!(updated.password, "rotated");
    assert_eq!(updated.vat_number, 4242);
    assert!(!updated.deleted_owner);

    assert_eq!(repo.find_by_owner_id(owner_id), Some(updated));
    assert!(repo.find_by_email("old@x.com").is_none());
    assert!(repo.find_by_email("new@x.com").is_some());
}

#[test]
fn update_keeps_soft_delete_flag_of_tombstoned_owner() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let saved = repo.save(&sample_owner(31, "ts@x.com")).unwrap();
    let owner_id = saved.owner_id.unwrap();
    assert!(repo.safe_delete_by_id(owner_id));

    let mut changes = saved;
    changes.address = "moved".to_string();
    let updated = repo.update(&changes).unwrap();
    assert_eq!(updated.address, "moved");
    assert!(updated.deleted_owner);
}

#[test]
fn update_of_unknown_or_unsaved_owner_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let unsaved = sample_owner(1, "unsaved@x.com");
    assert!(repo.update(&unsaved).is_none());

    let mut unknown = sample_owner(1, "unknown@x.com");
    unknown.owner_id = Some(999);
    assert!(repo.update(&unknown).is_none());
    assert!(repo.find_by_owner_id(999).is_none());
}

#[test]
fn failed_update_rolls_back_and_leaves_row_untouched() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let saved = repo.save(&sample_owner(64, "keep@x.com")).unwrap();
    let mut invalid = saved.clone();
    invalid.address = "should not stick".to_string();
    invalid.email = String::new();

    assert!(repo.update(&invalid).is_none());
    assert_eq!(repo.find_by_owner_id(saved.owner_id.unwrap()), Some(saved));
}

#[test]
fn duplicate_active_matches_make_filtered_lookup_return_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    repo.save(&sample_owner(100, "dup@x.com")).unwrap();
    repo.save(&sample_owner(100, "dup@x.com")).unwrap();

    assert!(repo.find_by_vat_number(100).is_none());
    assert!(repo.find_by_email("dup@x.com").is_none());
}

#[test]
fn soft_deleted_duplicate_does_not_make_lookup_ambiguous() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let old = repo.save(&sample_owner(200, "reuse@x.com")).unwrap();
    assert!(repo.safe_delete_by_id(old.owner_id.unwrap()));
    let current = repo.save(&sample_owner(200, "reuse@x.com")).unwrap();

    assert_eq!(repo.find_by_vat_number(200), Some(current.clone()));
    assert_eq!(repo.find_by_email("reuse@x.com"), Some(current));
}

#[test]
fn find_all_returns_active_owners_ordered_by_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let a = repo.save(&sample_owner(1, "a@x.com")).unwrap();
    let b = repo.save(&sample_owner(2, "b@x.com")).unwrap();
    let c = repo.save(&sample_owner(3, "c@x.com")).unwrap();
    assert!(repo.safe_delete_by_id(b.owner_id.unwrap()));

    let all = repo.find_all();
    assert_eq!(all, vec![a, c]);
    assert!(all.iter().all(Owner::is_active));
}

#[test]
fn operations_fail_soft_while_caller_holds_an_open_transaction() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();
    let saved = repo.save(&sample_owner(5, "busy@x.com")).unwrap();
    let owner_id = saved.owner_id.unwrap();

    conn.execute_batch("BEGIN;").unwrap();
    assert!(repo.save(&sample_owner(6, "other@x.com")).is_none());
    assert!(!repo.safe_delete_by_id(owner_id));
    assert!(repo.find_by_email("busy@x.com").is_none());
    conn.execute_batch("ROLLBACK;").unwrap();

    assert_eq!(repo.find_by_email("busy@x.com"), Some(saved));
}

#[test]
fn store_rejects_owner_id_mutation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();
    let owner_id = repo
        .save(&sample_owner(8, "fixed@x.com"))
        .unwrap()
        .owner_id
        .unwrap();

    let result = conn.execute(
        "UPDATE owners SET owner_id = ?1 WHERE owner_id = ?2;",
        [owner_id + 100, owner_id],
    );
    assert!(result.is_err());
    assert!(repo.find_by_owner_id(owner_id).is_some());
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteOwnerRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_owners_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteOwnerRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("owners"))
    ));
}

#[test]
fn repository_rejects_owners_table_missing_a_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE owners (
            owner_id INTEGER PRIMARY KEY AUTOINCREMENT,
            vat_number INTEGER NOT NULL,
            email TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT ''
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteOwnerRepository::try_new(&conn),
        Err(RepoError::MissingRequiredColumn {
            table: "owners",
            column: "deleted_owner"
        })
    ));
}

#[test]
fn store_rejects_raw_rows_that_bypass_owner_validation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();
    let good = repo.save(&sample_owner(1, "good@x.com")).unwrap();

    let zero_vat = conn.execute(
        "INSERT INTO owners (vat_number, email) VALUES (0, 'legacy@x.com');",
        [],
    );
    assert!(zero_vat.is_err());
    let blank_email = conn.execute(
        "INSERT INTO owners (vat_number, email) VALUES (5, ' \t');",
        [],
    );
    assert!(blank_email.is_err());

    assert_eq!(repo.find_all(), vec![good]);
}

#[test]
fn reads_return_stored_rows_that_fail_owner_validation() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE owners (
            owner_id INTEGER PRIMARY KEY AUTOINCREMENT,
            vat_number INTEGER NOT NULL,
            email TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            password TEXT NOT NULL DEFAULT '',
            deleted_owner INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();
    let repo = SqliteOwnerRepository::try_new(&conn).unwrap();

    let good = repo.save(&sample_owner(1, "good@x.com")).unwrap();
    conn.execute(
        "INSERT INTO owners (vat_number, email) VALUES (0, 'legacy@x.com');",
        [],
    )
    .unwrap();
    let legacy_id = conn.last_insert_rowid();

    let legacy = repo.find_by_owner_id(legacy_id).unwrap();
    assert_eq!(legacy.vat_number, 0);
    assert_eq!(legacy.email, "legacy@x.com");
    assert_eq!(repo.find_by_email("legacy@x.com"), Some(legacy.clone()));

    assert_eq!(repo.find_all(), vec![good, legacy]);
}
