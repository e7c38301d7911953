//! SQLite schema migrations.
//!
//! Migrations are listed in [`MIGRATIONS`] in version order and applied in a
//! single transaction. Every applied step is recorded in `schema_migrations`
//! with its name, so a database can be inspected with plain `sqlite3`.

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::{Result, StoreError};

/// One schema step.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

/// All migrations, oldest first. Versions are contiguous from 1.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "rbac_catalog",
    sql: V1_RBAC_CATALOG,
}];

/// Schema version this build writes.
pub const CURRENT_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at INTEGER NOT NULL
        )",
    )?;

    let applied = schema_version(conn)?;
    if applied > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database is at schema version {}, this build only knows up to {}",
            applied, CURRENT_VERSION
        )));
    }

    let pending = MIGRATIONS.iter().filter(|m| m.version > applied);
    let tx = conn.transaction()?;
    for migration in pending {
        run(&tx, migration)?;
    }
    tx.commit()?;
    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<u32>>(0)
        })
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

fn run(tx: &Transaction<'_>, migration: &Migration) -> Result<()> {
    tx.execute_batch(migration.sql).map_err(|e| {
        StoreError::Migration(format!("v{} {}: {}", migration.version, migration.name, e))
    })?;
    tx.execute(
        "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![migration.version, migration.name, crate::now_millis()],
    )?;
    tracing::debug!(version = migration.version, name = migration.name, "applied migration");
    Ok(())
}

const V1_RBAC_CATALOG: &str = r#"
    CREATE TABLE permissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT
    );

    CREATE TABLE roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE role_permissions (
        role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        permission_id INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
        PRIMARY KEY (role_id, permission_id)
    );

    CREATE TABLE principals (
        id TEXT PRIMARY KEY,              -- hyphenated UUID
        tenant_id TEXT,                   -- society UUID, nullable
        status TEXT,                      -- PENDING | APPROVED | REJECTED
        created_at INTEGER NOT NULL
    );

    CREATE TABLE principal_roles (
        principal_id TEXT NOT NULL REFERENCES principals(id) ON DELETE CASCADE,
        role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        PRIMARY KEY (principal_id, role_id)
    );

    -- single row, bumped by every effective mutation
    CREATE TABLE store_meta (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        revision INTEGER NOT NULL
    );
    INSERT INTO store_meta (id, revision) VALUES (1, 0);

    CREATE INDEX idx_role_permissions_permission ON role_permissions(permission_id);
    CREATE INDEX idx_principal_roles_role ON principal_roles(role_id);
"#;
