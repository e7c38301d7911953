//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Every mutation runs
//! in one transaction that also bumps the store revision.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Params, Transaction};

use gatehouse_core::{
    MembershipStatus, NewPermission, NewPrincipal, NewRole, Permission, PermissionId,
    PrincipalId, PrincipalRecord, Role, RoleId, RoleUpdate, TenantId,
};

use crate::error::{EntityRef, Result, StoreError};
use crate::migration;
use crate::traits::{AssignResult, LoadedRoles, RemoveResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Run a closure inside a transaction that bumps the revision on success.
    ///
    /// The closure reports whether it changed anything; unchanged calls
    /// leave the revision alone.
    async fn mutate<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<(T, bool)> + Send + 'static,
        T: Send + 'static,
    {
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let (out, changed) = f(&tx)?;
            if changed {
                tx.execute("UPDATE store_meta SET revision = revision + 1 WHERE id = 1", [])?;
            }
            tx.commit()?;
            Ok(out)
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<Permission> {
    Ok(Permission {
        id: PermissionId(row.get("id")?),
        name: row.get("name")?,
        description: row.get("description")?,
    })
}

fn read_permission(conn: &Connection, id: PermissionId) -> Result<Option<Permission>> {
    conn.query_row(
        "SELECT id, name, description FROM permissions WHERE id = ?1",
        params![id.0],
        row_to_permission,
    )
    .optional()
    .map_err(StoreError::from)
}

fn permission_exists(conn: &Connection, id: PermissionId) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM permissions WHERE id = ?1", params![id.0], |_| Ok(()))
        .optional()?
        .is_some())
}

fn role_exists(conn: &Connection, id: RoleId) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM roles WHERE id = ?1", params![id.0], |_| Ok(()))
        .optional()?
        .is_some())
}

fn principal_exists(conn: &Connection, id: PrincipalId) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM principals WHERE id = ?1",
            params![id.to_string()],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn check_permissions_exist(conn: &Connection, ids: &[PermissionId]) -> Result<()> {
    for id in ids {
        if !permission_exists(conn, *id)? {
            return Err(StoreError::NotFound(EntityRef::Permission(*id)));
        }
    }
    Ok(())
}

fn role_name_taken(conn: &Connection, name: &str, except: Option<RoleId>) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM roles WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(matches!(found, Some(id) if Some(RoleId(id)) != except))
}

/// One joined row: role id, role name, then the permission columns (null
/// when the role holds no permissions).
type RoleRow = (i64, String, Option<i64>, Option<String>, Option<String>);

const ROLE_ROWS: &str = "SELECT r.id, r.name, p.id, p.name, p.description
     FROM roles r
     LEFT JOIN role_permissions rp ON rp.role_id = r.id
     LEFT JOIN permissions p ON p.id = rp.permission_id";

/// Read roles with their permissions; `filter` is a `WHERE` clause or empty.
fn read_roles<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Role>> {
    let sql = format!("{} {} ORDER BY r.id, p.id", ROLE_ROWS, filter);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<rusqlite::Result<Vec<RoleRow>>>()?;
    Ok(group_roles(rows))
}

fn group_roles(rows: Vec<RoleRow>) -> Vec<Role> {
    let mut roles: Vec<Role> = Vec::new();
    for (role_id, role_name, perm_id, perm_name, description) in rows {
        if roles.last().map(|r| r.id) != Some(RoleId(role_id)) {
            roles.push(Role::new(RoleId(role_id), role_name, Vec::new()));
        }
        if let (Some(id), Some(name), Some(role)) = (perm_id, perm_name, roles.last_mut()) {
            role.permissions.push(Permission {
                id: PermissionId(id),
                name,
                description,
            });
        }
    }
    roles
}

fn read_role(conn: &Connection, id: RoleId) -> Result<Option<Role>> {
    Ok(read_roles(conn, "WHERE r.id = ?1", params![id.0])?.pop())
}

fn read_principal(conn: &Connection, id: PrincipalId) -> Result<Option<PrincipalRecord>> {
    let row: Option<(String, Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT id, tenant_id, status FROM principals WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    row.map(|(id, tenant, status)| parse_principal(&id, tenant.as_deref(), status.as_deref()))
        .transpose()
}

fn parse_principal(
    id: &str,
    tenant: Option<&str>,
    status: Option<&str>,
) -> Result<PrincipalRecord> {
    let id: PrincipalId = id
        .parse()
        .map_err(|e| StoreError::InvalidData(format!("principal id {:?}: {}", id, e)))?;
    let tenant = tenant
        .map(|t| {
            t.parse::<TenantId>()
                .map_err(|e| StoreError::InvalidData(format!("tenant id {:?}: {}", t, e)))
        })
        .transpose()?;
    let status = status
        .map(|s| {
            MembershipStatus::parse(s)
                .ok_or_else(|| StoreError::InvalidData(format!("membership status {:?}", s)))
        })
        .transpose()?;
    Ok(PrincipalRecord { id, tenant, status })
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_permission(&self, new: &NewPermission) -> Result<Permission> {
        let new = new.clone();
        self.mutate(move |tx| {
            let taken = tx
                .query_row(
                    "SELECT 1 FROM permissions WHERE name = ?1",
                    params![new.name],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if taken {
                return Err(StoreError::Conflict {
                    entity: "permission",
                    name: new.name,
                });
            }

            tx.execute(
                "INSERT INTO permissions (name, description) VALUES (?1, ?2)",
                params![new.name, new.description],
            )?;
            let permission = Permission {
                id: PermissionId(tx.last_insert_rowid()),
                name: new.name,
                description: new.description,
            };
            Ok((permission, true))
        })
        .await
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        self.blocking(move |conn| read_permission(conn, id)).await
    }

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>> {
        let name = name.to_string();
        self.blocking(move |conn| {
            conn.query_row(
                "SELECT id, name, description FROM permissions WHERE name = ?1",
                params![name],
                row_to_permission,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.blocking(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, description FROM permissions ORDER BY id")?;
            let permissions = stmt
                .query_map([], row_to_permission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(permissions)
        })
        .await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        self.mutate(move |tx| {
            // role_permissions rows go with it through ON DELETE CASCADE.
            let deleted = tx.execute("DELETE FROM permissions WHERE id = ?1", params![id.0])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(EntityRef::Permission(id)));
            }
            Ok(((), true))
        })
        .await
    }

    async fn insert_role(&self, new: &NewRole) -> Result<Role> {
        let new = new.clone();
        self.mutate(move |tx| {
            check_permissions_exist(tx, &new.permission_ids)?;
            if role_name_taken(tx, &new.name, None)? {
                return Err(StoreError::Conflict {
                    entity: "role",
                    name: new.name,
                });
            }

            tx.execute("INSERT INTO roles (name) VALUES (?1)", params![new.name])?;
            let id = RoleId(tx.last_insert_rowid());
            for permission in &new.permission_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
                    params![id.0, permission.0],
                )?;
            }

            let role = read_role(tx, id)?.ok_or(StoreError::NotFound(EntityRef::Role(id)))?;
            Ok((role, true))
        })
        .await
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        self.blocking(move |conn| read_role(conn, id)).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let name = name.to_string();
        self.blocking(move |conn| Ok(read_roles(conn, "WHERE r.name = ?1", params![name])?.pop()))
            .await
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.blocking(|conn| read_roles(conn, "", [])).await
    }

    async fn update_role(&self, id: RoleId, update: &RoleUpdate) -> Result<Role> {
        let update = update.clone();
        self.mutate(move |tx| {
            if !role_exists(tx, id)? {
                return Err(StoreError::NotFound(EntityRef::Role(id)));
            }
            if let Some(name) = &update.name {
                if role_name_taken(tx, name, Some(id))? {
                    return Err(StoreError::Conflict {
                        entity: "role",
                        name: name.clone(),
                    });
                }
            }
            if let Some(ids) = &update.permission_ids {
                check_permissions_exist(tx, ids)?;
            }

            if let Some(name) = &update.name {
                tx.execute("UPDATE roles SET name = ?1 WHERE id = ?2", params![name, id.0])?;
            }
            if let Some(ids) = &update.permission_ids {
                tx.execute("DELETE FROM role_permissions WHERE role_id = ?1", params![id.0])?;
                for permission in ids {
                    tx.execute(
                        "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
                        params![id.0, permission.0],
                    )?;
                }
            }

            let role = read_role(tx, id)?.ok_or(StoreError::NotFound(EntityRef::Role(id)))?;
            Ok((role, !update.is_empty()))
        })
        .await
    }

    async fn add_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<AssignResult> {
        self.mutate(move |tx| {
            if !role_exists(tx, role)? {
                return Err(StoreError::NotFound(EntityRef::Role(role)));
            }
            if !permission_exists(tx, permission)? {
                return Err(StoreError::NotFound(EntityRef::Permission(permission)));
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)",
                params![role.0, permission.0],
            )?;
            if inserted == 0 {
                Ok((AssignResult::AlreadyAssigned, false))
            } else {
                Ok((AssignResult::Assigned, true))
            }
        })
        .await
    }

    async fn remove_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<RemoveResult> {
        self.mutate(move |tx| {
            if !role_exists(tx, role)? {
                return Err(StoreError::NotFound(EntityRef::Role(role)));
            }

            let deleted = tx.execute(
                "DELETE FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2",
                params![role.0, permission.0],
            )?;
            if deleted == 0 {
                Ok((RemoveResult::NotAssigned, false))
            } else {
                Ok((RemoveResult::Removed, true))
            }
        })
        .await
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        self.mutate(move |tx| {
            let deleted = tx.execute("DELETE FROM roles WHERE id = ?1", params![id.0])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(EntityRef::Role(id)));
            }
            Ok(((), true))
        })
        .await
    }

    async fn delete_roles(&self, ids: &[RoleId]) -> Result<usize> {
        let ids = ids.to_vec();
        self.mutate(move |tx| {
            let mut deleted = 0;
            for id in &ids {
                deleted += tx.execute("DELETE FROM roles WHERE id = ?1", params![id.0])?;
            }
            if deleted == 0 {
                return Err(StoreError::NotFound(EntityRef::Roles(ids)));
            }
            Ok((deleted, true))
        })
        .await
    }

    async fn insert_principal(&self, new: &NewPrincipal) -> Result<PrincipalRecord> {
        self.insert_principal_with_roles(new, &[]).await
    }

    async fn insert_principal_with_roles(
        &self,
        new: &NewPrincipal,
        roles: &[RoleId],
    ) -> Result<PrincipalRecord> {
        let new = new.clone();
        let roles = roles.to_vec();
        self.mutate(move |tx| {
            if principal_exists(tx, new.id)? {
                return Err(StoreError::DuplicatePrincipal(new.id));
            }
            for role in &roles {
                if !role_exists(tx, *role)? {
                    return Err(StoreError::NotFound(EntityRef::Role(*role)));
                }
            }

            tx.execute(
                "INSERT INTO principals (id, tenant_id, status, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    new.id.to_string(),
                    new.tenant.map(|t| t.to_string()),
                    new.status.map(|s| s.as_str()),
                    crate::now_millis(),
                ],
            )?;
            for role in &roles {
                tx.execute(
                    "INSERT OR IGNORE INTO principal_roles (principal_id, role_id) VALUES (?1, ?2)",
                    params![new.id.to_string(), role.0],
                )?;
            }

            let record = PrincipalRecord {
                id: new.id,
                tenant: new.tenant,
                status: new.status,
            };
            Ok((record, true))
        })
        .await
    }

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>> {
        self.blocking(move |conn| read_principal(conn, id)).await
    }

    async fn load_roles(&self, id: PrincipalId) -> Result<Option<LoadedRoles>> {
        self.blocking(move |conn| {
            let Some(record) = read_principal(conn, id)? else {
                return Ok(None);
            };
            let roles = read_roles(
                conn,
                "WHERE r.id IN (SELECT role_id FROM principal_roles WHERE principal_id = ?1)",
                params![id.to_string()],
            )?;
            Ok(Some(LoadedRoles { record, roles }))
        })
        .await
    }

    async fn add_principal_role(
        &self,
        principal: PrincipalId,
        role: RoleId,
    ) -> Result<AssignResult> {
        self.mutate(move |tx| {
            if !principal_exists(tx, principal)? {
                return Err(StoreError::NotFound(EntityRef::Principal(principal)));
            }
            if !role_exists(tx, role)? {
                return Err(StoreError::NotFound(EntityRef::Role(role)));
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO principal_roles (principal_id, role_id) VALUES (?1, ?2)",
                params![principal.to_string(), role.0],
            )?;
            if inserted == 0 {
                Ok((AssignResult::AlreadyAssigned, false))
            } else {
                Ok((AssignResult::Assigned, true))
            }
        })
        .await
    }

    async fn remove_principal_role(
        &self,
        principal: PrincipalId,
        role: RoleId,
    ) -> Result<RemoveResult> {
        self.mutate(move |tx| {
            if !principal_exists(tx, principal)? {
                return Err(StoreError::NotFound(EntityRef::Principal(principal)));
            }

            let deleted = tx.execute(
                "DELETE FROM principal_roles WHERE principal_id = ?1 AND role_id = ?2",
                params![principal.to_string(), role.0],
            )?;
            if deleted == 0 {
                Ok((RemoveResult::NotAssigned, false))
            } else {
                Ok((RemoveResult::Removed, true))
            }
        })
        .await
    }

    async fn revision(&self) -> Result<u64> {
        self.blocking(|conn| {
            let revision: i64 =
                conn.query_row("SELECT revision FROM store_meta WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            u64::try_from(revision)
                .map_err(|_| StoreError::InvalidData(format!("negative revision {}", revision)))
        })
        .await
    }
}
