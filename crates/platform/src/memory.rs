//! In-process implementation of the platform store.
//!
//! Committed rows live behind one `RwLock`. A transaction buffers its writes
//! in its [`TxContext`]; reads through a bound repository overlay those
//! writes on the committed rows (read committed, plus read-your-writes).
//! Commit re-checks constraints against the latest committed state and
//! applies everything under the write lock, or nothing.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::models::{Membership, Organization, User};
use crate::repository::{MembershipRepository, OrganizationRepository, UserRepository};
use crate::store::{Database, IsolationLevel, StagedWrite, TxContext};

#[derive(Debug, Clone, Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    memberships: HashMap<Uuid, Membership>,
}

impl Tables {
    /// Upsert one row, enforcing uniqueness and membership references.
    fn apply(&mut self, write: StagedWrite) -> Result<(), PlatformError> {
        match write {
            StagedWrite::Organization(org) => {
                self.organizations.insert(org.identifier, org);
            }
            StagedWrite::User(user) => {
                let taken = !user.zitadel_id.is_empty()
                    && self.users.values().any(|existing| {
                        existing.zitadel_id == user.zitadel_id
                            && existing.identifier != user.identifier
                    });
                if taken {
                    return Err(PlatformError::Conflict {
                        entity: "user",
                        detail: format!("zitadel id {} is already linked", user.zitadel_id),
                    });
                }
                self.users.insert(user.identifier, user);
            }
            StagedWrite::Membership(membership) => {
                let org_live = self
                    .organizations
                    .get(&membership.org_identifier)
                    .is_some_and(|org| !org.deleted);
                if !org_live {
                    return Err(PlatformError::not_found(
                        "organization",
                        membership.org_identifier,
                    ));
                }
                if !self.users.contains_key(&membership.user_identifier) {
                    return Err(PlatformError::not_found("user", membership.user_identifier));
                }
                let duplicate = self.memberships.values().any(|existing| {
                    existing.org_identifier == membership.org_identifier
                        && existing.user_identifier == membership.user_identifier
                        && existing.identifier != membership.identifier
                });
                if duplicate {
                    return Err(PlatformError::Conflict {
                        entity: "membership",
                        detail: format!(
                            "user {} already belongs to organization {}",
                            membership.user_identifier, membership.org_identifier
                        ),
                    });
                }
                self.memberships.insert(membership.identifier, membership);
            }
        }
        Ok(())
    }
}

/// Shared access path for the memory repositories, optionally bound to a transaction.
#[derive(Clone)]
struct MemoryHandle {
    tables: Arc<RwLock<Tables>>,
    tx: Option<TxContext>,
}

impl MemoryHandle {
    fn bind(&self, tx: &TxContext) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            tx: Some(tx.clone()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, PlatformError> {
        let committed = self.tables.read().map_err(|_| PlatformError::Poisoned)?;
        let Some(tx) = &self.tx else {
            return Ok(f(&committed));
        };

        let staged = tx.staged()?;
        if staged.is_empty() {
            return Ok(f(&committed));
        }
        let mut view = committed.clone();
        drop(committed);
        for write in staged {
            view.apply(write)?;
        }
        Ok(f(&view))
    }

    /// Run `check` against the visible rows, then write or stage.
    fn write(
        &self,
        write: StagedWrite,
        check: impl FnOnce(&Tables) -> Result<(), PlatformError>,
    ) -> Result<(), PlatformError> {
        match &self.tx {
            None => {
                let mut tables = self.tables.write().map_err(|_| PlatformError::Poisoned)?;
                check(&tables)?;
                tables.apply(write)
            }
            Some(tx) => {
                let mut view = self.read(Tables::clone)?;
                check(&view)?;
                view.apply(write.clone())?;
                tx.stage(write)
            }
        }
    }
}

/// In-memory [`Database`] and factory for its repositories.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            tables: Arc::clone(&self.tables),
            tx: None,
        }
    }

    pub fn organizations(&self) -> MemoryOrganizationRepository {
        MemoryOrganizationRepository {
            handle: self.handle(),
        }
    }

    pub fn users(&self) -> MemoryUserRepository {
        MemoryUserRepository {
            handle: self.handle(),
        }
    }

    pub fn memberships(&self) -> MemoryMembershipRepository {
        MemoryMembershipRepository {
            handle: self.handle(),
        }
    }

    /// Committed organizations, soft-deleted ones included.
    pub fn organization_count(&self) -> usize {
        self.tables
            .read()
            .map(|t| t.organizations.len())
            .unwrap_or(0)
    }

    pub fn user_count(&self) -> usize {
        self.tables.read().map(|t| t.users.len()).unwrap_or(0)
    }

    pub fn membership_count(&self) -> usize {
        self.tables.read().map(|t| t.memberships.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn begin(&self, isolation: IsolationLevel) -> Result<TxContext, PlatformError> {
        let tx = TxContext::new(isolation);
        debug!(tx_id = %tx.id(), ?isolation, "platform_tx_begin");
        Ok(tx)
    }

    async fn commit(&self, tx: &TxContext) -> Result<(), PlatformError> {
        let writes = tx.finish()?;
        let count = writes.len();

        let mut tables = self.tables.write().map_err(|_| PlatformError::Poisoned)?;
        let mut next = tables.clone();
        for write in writes {
            next.apply(write)?;
        }
        *tables = next;

        debug!(tx_id = %tx.id(), writes = count, "platform_tx_commit");
        Ok(())
    }

    async fn rollback(&self, tx: &TxContext) -> Result<(), PlatformError> {
        let discarded = tx.finish()?.len();
        debug!(tx_id = %tx.id(), discarded, "platform_tx_rollback");
        Ok(())
    }
}

#[derive(Clone)]
pub struct MemoryOrganizationRepository {
    handle: MemoryHandle,
}

#[async_trait]
impl OrganizationRepository for MemoryOrganizationRepository {
    fn with_tx(&self, tx: &TxContext) -> Arc<dyn OrganizationRepository> {
        Arc::new(Self {
            handle: self.handle.bind(tx),
        })
    }

    async fn create(&self, org: &Organization) -> Result<(), PlatformError> {
        let id = org.identifier;
        self.handle
            .write(StagedWrite::Organization(org.clone()), |t| {
                if t.organizations.contains_key(&id) {
                    return Err(PlatformError::Conflict {
                        entity: "organization",
                        detail: id.to_string(),
                    });
                }
                Ok(())
            })
    }

    async fn find_one_by_id(&self, identifier: Uuid) -> Result<Organization, PlatformError> {
        self.handle
            .read(|t| {
                t.organizations
                    .get(&identifier)
                    .filter(|org| !org.deleted)
                    .cloned()
            })?
            .ok_or_else(|| PlatformError::not_found("organization", identifier))
    }

    async fn find_all(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Organization>, PlatformError> {
        self.handle.read(|t| {
            let mut live: Vec<&Organization> =
                t.organizations.values().filter(|org| !org.deleted).collect();
            live.sort_by_key(|org| (org.created_at, org.identifier));
            live.into_iter().skip(offset).take(limit).cloned().collect()
        })
    }

    async fn update(&self, org: &Organization) -> Result<(), PlatformError> {
        let existing = self.find_one_by_id(org.identifier).await?;
        let updated = Organization {
            created_at: existing.created_at,
            updated_at: Utc::now(),
            deleted: false,
            deleted_at: None,
            ..org.clone()
        };
        self.handle
            .write(StagedWrite::Organization(updated), |_| Ok(()))
    }

    async fn delete(&self, identifier: Uuid) -> Result<(), PlatformError> {
        let mut org = self.find_one_by_id(identifier).await?;
        let now = Utc::now();
        org.deleted = true;
        org.deleted_at = Some(now);
        org.updated_at = now;
        self.handle.write(StagedWrite::Organization(org), |_| Ok(()))
    }

    async fn exists(&self, identifier: Uuid) -> Result<bool, PlatformError> {
        self.handle.read(|t| {
            t.organizations
                .get(&identifier)
                .is_some_and(|org| !org.deleted)
        })
    }
}

#[derive(Clone)]
pub struct MemoryUserRepository {
    handle: MemoryHandle,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    fn with_tx(&self, tx: &TxContext) -> Arc<dyn UserRepository> {
        Arc::new(Self {
            handle: self.handle.bind(tx),
        })
    }

    async fn create(&self, user: &User) -> Result<(), PlatformError> {
        let id = user.identifier;
        self.handle.write(StagedWrite::User(user.clone()), |t| {
            if t.users.contains_key(&id) {
                return Err(PlatformError::Conflict {
                    entity: "user",
                    detail: id.to_string(),
                });
            }
            Ok(())
        })
    }

    async fn find_one_by_id(&self, identifier: Uuid) -> Result<User, PlatformError> {
        self.handle
            .read(|t| t.users.get(&identifier).cloned())?
            .ok_or_else(|| PlatformError::not_found("user", identifier))
    }

    async fn find_one_by_primary_email(&self, email: &str) -> Result<User, PlatformError> {
        self.handle
            .read(|t| {
                t.users
                    .values()
                    .find(|user| user.primary_email.eq_ignore_ascii_case(email))
                    .cloned()
            })?
            .ok_or_else(|| PlatformError::not_found("user", email))
    }

    async fn get_user_id_from_zitadel_id(&self, zitadel_id: &str) -> Result<Uuid, PlatformError> {
        self.handle
            .read(|t| {
                t.users
                    .values()
                    .find(|user| !zitadel_id.is_empty() && user.zitadel_id == zitadel_id)
                    .map(|user| user.identifier)
            })?
            .ok_or_else(|| PlatformError::not_found("user", zitadel_id))
    }

    async fn exists(&self, identifier: Uuid) -> Result<bool, PlatformError> {
        self.handle.read(|t| t.users.contains_key(&identifier))
    }
}

#[derive(Clone)]
pub struct MemoryMembershipRepository {
    handle: MemoryHandle,
}

#[async_trait]
impl MembershipRepository for MemoryMembershipRepository {
    fn with_tx(&self, tx: &TxContext) -> Arc<dyn MembershipRepository> {
        Arc::new(Self {
            handle: self.handle.bind(tx),
        })
    }

    async fn create(&self, membership: &Membership) -> Result<(), PlatformError> {
        let id = membership.identifier;
        self.handle
            .write(StagedWrite::Membership(membership.clone()), |t| {
                if t.memberships.contains_key(&id) {
                    return Err(PlatformError::Conflict {
                        entity: "membership",
                        detail: id.to_string(),
                    });
                }
                Ok(())
            })
    }

    async fn find_by_organization(
        &self,
        org_identifier: Uuid,
    ) -> Result<Vec<Membership>, PlatformError> {
        self.handle.read(|t| {
            let mut members: Vec<Membership> = t
                .memberships
                .values()
                .filter(|m| m.org_identifier == org_identifier)
                .cloned()
                .collect();
            members.sort_by_key(|m| (m.joined_at, m.identifier));
            members
        })
    }
}
