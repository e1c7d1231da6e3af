//! Owner repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the owner CRUD contract over the `owners` table.
//! - Scope every write or consistent read to one transaction per call.
//! - Absorb persistence faults at the method boundary.
//!
//! # Invariants
//! - VAT/email lookups and `find_all` never return soft-deleted owners.
//! - Keyed lookups (`find_by_owner_id`, `update`, `delete_by_id`,
//!   `safe_delete_by_id`) ignore the soft-delete flag.
//! - Write paths call `Owner::validate()` before SQL mutations; read paths
//!   return stored rows without re-validating them.
//! - Only `try_new` returns an error to callers; every contract method maps
//!   failures to `None`, `false` or an empty list and logs them at debug.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::owner::{Owner, OwnerId, OwnerValidationError};
use log::debug;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const OWNER_SELECT_SQL: &str = "SELECT
    owner_id,
    vat_number,
    email,
    address,
    password,
    deleted_owner
FROM owners";

const OWNER_COLUMNS: [&str; 8] = [
    "owner_id",
    "vat_number",
    "email",
    "address",
    "password",
    "deleted_owner",
    "created_at",
    "updated_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Internal error taxonomy for owner persistence.
///
/// Contract methods never surface these; they are logged and collapsed.
#[derive(Debug)]
pub enum RepoError {
    Validation(OwnerValidationError),
    Db(DbError),
    /// Keyed write target does not exist.
    NotFound(OwnerId),
    /// Filtered lookup matched no active owner.
    NoMatch { field: &'static str },
    /// Filtered lookup matched more than one active owner.
    AmbiguousMatch { field: &'static str, matches: usize },
    /// `update` was given an owner that was never saved.
    MissingOwnerId,
    /// `save` was given an owner that already has a store id.
    AlreadyPersisted(OwnerId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Whether this is an expected absence rather than a fault.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NoMatch { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "owner not found: {id}"),
            Self::NoMatch { field } => write!(f, "no active owner matches {field}"),
            Self::AmbiguousMatch { field, matches } => {
                write!(f, "{matches} active owners match {field}; expected one")
            }
            Self::MissingOwnerId => write!(f, "owner has no owner_id"),
            Self::AlreadyPersisted(id) => write!(f, "owner already persisted with id {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted owner data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "owner repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "owner repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "owner repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OwnerValidationError> for RepoError {
    fn from(value: OwnerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Owner CRUD contract.
///
/// Callers cannot tell "no such owner" from a store failure; both surface
/// as `None`/`false`/empty and are only distinguishable in the logs.
pub trait OwnerRepository {
    /// Loads one owner by id, soft-deleted or not.
    fn find_by_owner_id(&self, owner_id: OwnerId) -> Option<Owner>;
    /// Loads the single active owner with this VAT number.
    fn find_by_vat_number(&self, vat_number: i64) -> Option<Owner>;
    /// Loads the single active owner with this email.
    fn find_by_email(&self, email: &str) -> Option<Owner>;
    /// Inserts a new owner and returns it with its assigned id.
    fn save(&self, owner: &Owner) -> Option<Owner>;
    /// Overwrites `address`, `email` and `password` of an existing owner.
    fn update(&self, owner: &Owner) -> Option<Owner>;
    /// Removes the row regardless of its soft-delete state.
    fn delete_by_id(&self, owner_id: OwnerId) -> bool;
    /// Sets `deleted_owner`; repeated calls keep returning `true`.
    fn safe_delete_by_id(&self, owner_id: OwnerId) -> bool;
    /// Snapshot of all active owners ordered by id.
    fn find_all(&self) -> Vec<Owner>;
}

/// SQLite-backed owner repository.
///
/// Borrows one connection for its lifetime. `Connection` is not `Sync`, so
/// callers that share a store across threads must hold one connection each.
pub struct SqliteOwnerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOwnerRepository<'conn> {
    /// Creates a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` is not the latest.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` for a partial schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_owner_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn try_find_by_owner_id(&self, owner_id: OwnerId) -> RepoResult<Option<Owner>> {
        load_owner(self.conn, owner_id)
    }

    fn try_find_single_active(
        &self,
        field: &'static str,
        sql: &str,
        value: &dyn ToSql,
    ) -> RepoResult<Owner> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let mut matches = {
            let mut stmt = tx.prepare(sql)?;
            let mut rows = stmt.query([value])?;
            let mut matches = Vec::new();
            while let Some(row) = rows.next()? {
                matches.push(parse_owner_row(row)?);
            }
            matches
        };
        tx.commit()?;

        match matches.len() {
            0 => Err(RepoError::NoMatch { field }),
            1 => Ok(matches.remove(0)),
            count => Err(RepoError::AmbiguousMatch {
                field,
                matches: count,
            }),
        }
    }

    fn try_save(&self, owner: &Owner) -> RepoResult<Owner> {
        if let Some(owner_id) = owner.owner_id {
            return Err(RepoError::AlreadyPersisted(owner_id));
        }
        owner.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO owners (
                vat_number,
                email,
                address,
                password,
                deleted_owner
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                owner.vat_number,
                owner.email.as_str(),
                owner.address.as_str(),
                owner.password.as_str(),
                bool_to_int(owner.deleted_owner),
            ],
        )?;
        let owner_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Owner {
            owner_id: Some(owner_id),
            ..owner.clone()
        })
    }

    fn try_update(&self, owner: &Owner) -> RepoResult<Owner> {
        let owner_id = owner.owner_id.ok_or(RepoError::MissingOwnerId)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut current = load_owner(&tx, owner_id)?.ok_or(RepoError::NotFound(owner_id))?;
        current.address.clone_from(&owner.address);
        current.email.clone_from(&owner.email);
        current.password.clone_from(&owner.password);
        current.validate()?;

        tx.execute(
            "UPDATE owners
             SET
                address = ?2,
                email = ?3,
                password = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE owner_id = ?1;",
            params![
                owner_id,
                current.address.as_str(),
                current.email.as_str(),
                current.password.as_str(),
            ],
        )?;
        let updated = load_owner(&tx, owner_id)?.ok_or(RepoError::NotFound(owner_id))?;
        tx.commit()?;

        Ok(updated)
    }

    fn try_delete_by_id(&self, owner_id: OwnerId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM owners WHERE owner_id = ?1;", [owner_id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(owner_id));
        }
        tx.commit()?;
        Ok(())
    }

    fn try_safe_delete_by_id(&self, owner_id: OwnerId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE owners
             SET
                deleted_owner = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE owner_id = ?1;",
            [owner_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(owner_id));
        }
        tx.commit()?;
        Ok(())
    }

    fn try_find_all(&self) -> RepoResult<Vec<Owner>> {
        let mut stmt = self.conn.prepare(&format!(
            "{OWNER_SELECT_SQL}
             WHERE deleted_owner = 0
             ORDER BY owner_id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut owners = Vec::new();
        while let Some(row) = rows.next()? {
            owners.push(parse_owner_row(row)?);
        }
        Ok(owners)
    }
}

impl OwnerRepository for SqliteOwnerRepository<'_> {
    fn find_by_owner_id(&self, owner_id: OwnerId) -> Option<Owner> {
        absorb("find_by_owner_id", self.try_find_by_owner_id(owner_id)).flatten()
    }

    fn find_by_vat_number(&self, vat_number: i64) -> Option<Owner> {
        let result = self.try_find_single_active(
            "vat_number",
            &format!("{OWNER_SELECT_SQL} WHERE vat_number = ?1 AND deleted_owner = 0;"),
            &vat_number,
        );
        absorb("find_by_vat_number", result)
    }

    fn find_by_email(&self, email: &str) -> Option<Owner> {
        let result = self.try_find_single_active(
            "email",
            &format!("{OWNER_SELECT_SQL} WHERE email = ?1 AND deleted_owner = 0;"),
            &email,
        );
        absorb("find_by_email", result)
    }

    fn save(&self, owner: &Owner) -> Option<Owner> {
        absorb("save", self.try_save(owner))
    }

    fn update(&self, owner: &Owner) -> Option<Owner> {
        absorb("update", self.try_update(owner))
    }

    fn delete_by_id(&self, owner_id: OwnerId) -> bool {
        absorb("delete_by_id", self.try_delete_by_id(owner_id)).is_some()
    }

    fn safe_delete_by_id(&self, owner_id: OwnerId) -> bool {
        absorb("safe_delete_by_id", self.try_safe_delete_by_id(owner_id)).is_some()
    }

    fn find_all(&self) -> Vec<Owner> {
        absorb("find_all", self.try_find_all()).unwrap_or_default()
    }
}

/// Collapses a fallible repository result at the contract boundary.
fn absorb<T>(operation: &'static str, result: RepoResult<T>) -> Option<T> {
    match result {
        Ok(value) => {
            debug!("event=owner_repo module=repo op={operation} status=ok");
            Some(value)
        }
        Err(err) if err.is_miss() => {
            debug!("event=owner_repo module=repo op={operation} status=miss reason={err}");
            None
        }
        Err(err) => {
            debug!("event=owner_repo module=repo op={operation} status=error error={err}");
            None
        }
    }
}

fn load_owner(conn: &Connection, owner_id: OwnerId) -> RepoResult<Option<Owner>> {
    let mut stmt = conn.prepare(&format!("{OWNER_SELECT_SQL} WHERE owner_id = ?1;"))?;
    let mut rows = stmt.query([owner_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_owner_row(row)?));
    }
    Ok(None)
}

// Rows are returned as stored; field validation guards writes only.
fn parse_owner_row(row: &Row<'_>) -> RepoResult<Owner> {
    let owner = Owner {
        owner_id: Some(row.get("owner_id")?),
        vat_number: row.get("vat_number")?,
        email: row.get("email")?,
        address: row.get("address")?,
        password: row.get("password")?,
        deleted_owner: int_to_bool(row.get("deleted_owner")?, "owners.deleted_owner")?,
    };
    Ok(owner)
}

fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

fn ensure_owner_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "owners")? {
        return Err(RepoError::MissingRequiredTable("owners"));
    }
    for column in OWNER_COLUMNS {
        if !table_has_column(conn, "owners", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "owners",
                column,
            });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get("name")?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
