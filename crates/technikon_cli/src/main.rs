//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `technikon_core` linkage and store bootstrap end to end.
//! - Walk one owner through save, lookup, soft delete and hard delete.
//!
//! Usage: `technikon_cli [DB_PATH] [ABSOLUTE_LOG_DIR]`. Without a path the
//! store is in memory.

use std::error::Error;
use std::process::ExitCode;
use technikon_core::db::{open_db, open_db_in_memory};
use technikon_core::{
    core_version, default_log_level, init_logging, Owner, OwnerRepository, SqliteOwnerRepository,
};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("technikon_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    if let Some(log_dir) = args.next() {
        init_logging(default_log_level(), &log_dir)?;
    }

    println!("technikon_core version={}", core_version());

    let conn = match db_path.as_deref() {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let repo = SqliteOwnerRepository::try_new(&conn)?;

    let saved = repo
        .save(&Owner::new(12345, "a@x.com", "12 Ermou St, Athens", "changeme"))
        .ok_or("save failed")?;
    let owner_id = saved.owner_id.ok_or("saved owner has no id")?;
    println!("save owner_id={owner_id}");

    println!("safe_delete_by_id ok={}", repo.safe_delete_by_id(owner_id));
    println!(
        "find_by_email found={}",
        repo.find_by_email(&saved.email).is_some()
    );
    let by_id = repo.find_by_owner_id(owner_id);
    println!(
        "find_by_owner_id found={} deleted_owner={}",
        by_id.is_some(),
        by_id.is_some_and(|owner| owner.deleted_owner)
    );
    println!("active_owners count={}", repo.find_all().len());
    println!("delete_by_id ok={}", repo.delete_by_id(owner_id));
    Ok(())
}
