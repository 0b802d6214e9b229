use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::error::ApiError;
use crate::models::UserRole;

pub type Database = Pool<Sqlite>;

pub async fn create_database_pool(database_url: &str) -> Result<Database, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Two tables, mirroring the two sheets of the system this replaced: a user
/// roster and a requisition table whose row keeps the scan columns (id, date,
/// client, number) alongside the full JSON document.
async fn init_schema(pool: &Database) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            username      TEXT PRIMARY KEY COLLATE NOCASE,
            password_hash TEXT NOT NULL,
            name          TEXT NOT NULL,
            role          TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS requisitions (
            id                 TEXT PRIMARY KEY,
            date               TEXT NOT NULL DEFAULT '',
            client_name        TEXT NOT NULL DEFAULT '',
            requisition_number TEXT NOT NULL DEFAULT '',
            payload            TEXT NOT NULL,
            created_at         TEXT NOT NULL DEFAULT ''
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seeds the protected admin account on first boot, like the old system's
/// one-time setup routine did.
pub async fn seed_admin(pool: &Database, password: &str) -> Result<(), ApiError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|err| ApiError::Internal(format!("failed to hash admin password: {}", err)))?;

    sqlx::query("INSERT INTO users (username, password_hash, name, role) VALUES (?1, ?2, ?3, ?4)")
        .bind("admin")
        .bind(&hash)
        .bind("Administrator")
        .bind(UserRole::Manager)
        .execute(pool)
        .await?;

    log::info!("seeded default admin user");
    Ok(())
}
