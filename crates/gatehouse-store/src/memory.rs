//! `MemoryStore`: the catalog, roles and principals in process memory.
//!
//! Behaves like [`SqliteStore`](crate::SqliteStore), including cascades,
//! name uniqueness and the revision counter, so tests and embedded callers
//! can swap one for the other.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use gatehouse_core::{
    NewPermission, NewPrincipal, NewRole, Permission, PermissionId, PrincipalId, PrincipalRecord,
    Role, RoleId, RoleUpdate,
};

use crate::error::{EntityRef, Result, StoreError};
use crate::traits::{AssignResult, LoadedRoles, RemoveResult, Store};

/// Store backed by maps under one `RwLock`.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; each
/// mutation validates and applies under a single write guard.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Last assigned ids. Ids are never reused.
    last_permission_id: i64,
    last_role_id: i64,

    permissions: BTreeMap<PermissionId, Permission>,

    roles: BTreeMap<RoleId, StoredRole>,

    principals: HashMap<PrincipalId, PrincipalRecord>,

    /// Principal -> held role ids.
    principal_roles: HashMap<PrincipalId, BTreeSet<RoleId>>,

    revision: u64,
}

struct StoredRole {
    name: String,
    permissions: BTreeSet<PermissionId>,
}

impl MemoryStoreInner {
    fn materialize(&self, id: RoleId, stored: &StoredRole) -> Role {
        let permissions = stored
            .permissions
            .iter()
            .filter_map(|pid| self.permissions.get(pid).cloned())
            .collect();
        Role::new(id, stored.name.clone(), permissions)
    }

    fn role(&self, id: RoleId) -> Option<Role> {
        self.roles.get(&id).map(|stored| self.materialize(id, stored))
    }

    fn role_name_taken(&self, name: &str, except: Option<RoleId>) -> bool {
        self.roles
            .iter()
            .any(|(id, r)| r.name == name && Some(*id) != except)
    }

    fn check_permissions_exist(&self, ids: &[PermissionId]) -> Result<()> {
        match ids.iter().find(|id| !self.permissions.contains_key(id)) {
            Some(missing) => Err(StoreError::NotFound(EntityRef::Permission(*missing))),
            None => Ok(()),
        }
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_permission(&self, new: &NewPermission) -> Result<Permission> {
        let mut inner = self.write()?;

        if inner.permissions.values().any(|p| p.name == new.name) {
            return Err(StoreError::Conflict {
                entity: "permission",
                name: new.name.clone(),
            });
        }

        inner.last_permission_id += 1;
        let permission = Permission {
            id: PermissionId(inner.last_permission_id),
            name: new.name.clone(),
            description: new.description.clone(),
        };
        inner.permissions.insert(permission.id, permission.clone());
        inner.bump();

        Ok(permission)
    }

    async fn get_permission(&self, id: PermissionId) -> Result<Option<Permission>> {
        Ok(self.read()?.permissions.get(&id).cloned())
    }

    async fn find_permission_by_name(&self, name: &str) -> Result<Option<Permission>> {
        let inner = self.read()?;
        Ok(inner.permissions.values().find(|p| p.name == name).cloned())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        Ok(self.read()?.permissions.values().cloned().collect())
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        let mut inner = self.write()?;

        if inner.permissions.remove(&id).is_none() {
            return Err(StoreError::NotFound(EntityRef::Permission(id)));
        }
        for role in inner.roles.values_mut() {
            role.permissions.remove(&id);
        }
        inner.bump();

        Ok(())
    }

    async fn insert_role(&self, new: &NewRole) -> Result<Role> {
        let mut inner = self.write()?;

        inner.check_permissions_exist(&new.permission_ids)?;
        if inner.role_name_taken(&new.name, None) {
            return Err(StoreError::Conflict {
                entity: "role",
                name: new.name.clone(),
            });
        }

        inner.last_role_id += 1;
        let id = RoleId(inner.last_role_id);
        inner.roles.insert(
            id,
            StoredRole {
                name: new.name.clone(),
                permissions: new.permission_ids.iter().copied().collect(),
            },
        );
        inner.bump();

        inner
            .role(id)
            .ok_or(StoreError::NotFound(EntityRef::Role(id)))
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.read()?.role(id))
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let inner = self.read()?;
        Ok(inner
            .roles
            .iter()
            .find(|(_, r)| r.name == name)
            .map(|(id, stored)| inner.materialize(*id, stored)))
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let inner = self.read()?;
        Ok(inner
            .roles
            .iter()
            .map(|(id, stored)| inner.materialize(*id, stored))
            .collect())
    }

    async fn update_role(&self, id: RoleId, update: &RoleUpdate) -> Result<Role> {
        let mut inner = self.write()?;

        if !inner.roles.contains_key(&id) {
            return Err(StoreError::NotFound(EntityRef::Role(id)));
        }
        if let Some(name) = &update.name {
            if inner.role_name_taken(name, Some(id)) {
                return Err(StoreError::Conflict {
                    entity: "role",
                    name: name.clone(),
                });
            }
        }
        if let Some(ids) = &update.permission_ids {
            inner.check_permissions_exist(ids)?;
        }

        if !update.is_empty() {
            if let Some(stored) = inner.roles.get_mut(&id) {
                if let Some(name) = &update.name {
                    stored.name = name.clone();
                }
                if let Some(ids) = &update.permission_ids {
                    stored.permissions = ids.iter().copied().collect();
                }
            }
            inner.bump();
        }

        inner
            .role(id)
            .ok_or(StoreError::NotFound(EntityRef::Role(id)))
    }

    async fn add_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<AssignResult> {
        let mut inner = self.write()?;

        if !inner.permissions.contains_key(&permission) {
            return Err(StoreError::NotFound(EntityRef::Permission(permission)));
        }
        let stored = inner
            .roles
            .get_mut(&role)
            .ok_or(StoreError::NotFound(EntityRef::Role(role)))?;

        if !stored.permissions.insert(permission) {
            return Ok(AssignResult::AlreadyAssigned);
        }
        inner.bump();
        Ok(AssignResult::Assigned)
    }

    async fn remove_role_permission(
        &self,
        role: RoleId,
        permission: PermissionId,
    ) -> Result<RemoveResult> {
        let mut inner = self.write()?;

        let stored = inner
            .roles
            .get_mut(&role)
            .ok_or(StoreError::NotFound(EntityRef::Role(role)))?;

        if !stored.permissions.remove(&permission) {
            return Ok(RemoveResult::NotAssigned);
        }
        inner.bump();
        Ok(RemoveResult::Removed)
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        let mut inner = self.write()?;

        if inner.roles.remove(&id).is_none() {
            return Err(StoreError::NotFound(EntityRef::Role(id)));
        }
        for held in inner.principal_roles.values_mut() {
            held.remove(&id);
        }
        inner.bump();

        Ok(())
    }

    async fn delete_roles(&self, ids: &[RoleId]) -> Result<usize> {
        let mut inner = self.write()?;

        let mut deleted = 0;
        for id in ids {
            if inner.roles.remove(id).is_some() {
                deleted += 1;
                for held in inner.principal_roles.values_mut() {
                    held.remove(id);
                }
            }
        }

        if deleted == 0 {
            return Err(StoreError::NotFound(EntityRef::Roles(ids.to_vec())));
        }
        inner.bump();
        Ok(deleted)
    }

    async fn insert_principal(&self, new: &NewPrincipal) -> Result<PrincipalRecord> {
        self.insert_principal_with_roles(new, &[]).await
    }

    async fn insert_principal_with_roles(
        &self,
        new: &NewPrincipal,
        roles: &[RoleId],
    ) -> Result<PrincipalRecord> {
        let mut inner = self.write()?;

        if inner.principals.contains_key(&new.id) {
            return Err(StoreError::DuplicatePrincipal(new.id));
        }
        if let Some(missing) = roles.iter().find(|id| !inner.roles.contains_key(*id)) {
            return Err(StoreError::NotFound(EntityRef::Role(*missing)));
        }

        let record = PrincipalRecord {
            id: new.id,
            tenant: new.tenant,
            status: new.status,
        };
        inner.principals.insert(new.id, record.clone());
        inner
            .principal_roles
            .insert(new.id, roles.iter().copied().collect());
        inner.bump();

        Ok(record)
    }

    async fn get_principal(&self, id: PrincipalId) -> Result<Option<PrincipalRecord>> {
        Ok(self.read()?.principals.get(&id).cloned())
    }

    async fn load_roles(&self, id: PrincipalId) -> Result<Option<LoadedRoles>> {
        let inner = self.read()?;

        let Some(record) = inner.principals.get(&id) else {
            return Ok(None);
        };
        let roles = inner
            .principal_roles
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|role_id| inner.role(*role_id))
            .collect();

        Ok(Some(LoadedRoles {
            record: record.clone(),
            roles,
        }))
    }

    async fn add_principal_role(
        &self,
        principal: PrincipalId,
        role: RoleId,
    ) -> Result<AssignResult> {
        let mut inner = self.write()?;

        if !inner.principals.contains_key(&principal) {
            return Err(StoreError::NotFound(EntityRef::Principal(principal)));
        }
        if !inner.roles.contains_key(&role) {
            return Err(StoreError::NotFound(EntityRef::Role(role)));
        }

        if !inner.principal_roles.entry(principal).or_default().insert(role) {
            return Ok(AssignResult::AlreadyAssigned);
        }
        inner.bump();
        Ok(AssignResult::Assigned)
    }

    async fn remove_principal_role(
        &self,
        principal: PrincipalId,
        role: RoleId,
    ) -> Result<RemoveResult> {
        let mut inner = self.write()?;

        if !inner.principals.contains_key(&principal) {
            return Err(StoreError::NotFound(EntityRef::Principal(principal)));
        }

        let removed = inner
            .principal_roles
            .get_mut(&principal)
            .map_or(false, |held| held.remove(&role));
        if !removed {
            return Ok(RemoveResult::NotAssigned);
        }
        inner.bump();
        Ok(RemoveResult::Removed)
    }

    async fn revision(&self) -> Result<u64> {
        Ok(self.read()?.revision)
    }
}
