use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PlatformError;
use crate::memory::MemoryDatabase;
use crate::repository::{MembershipRepository, OrganizationRepository, UserRepository};
use crate::store::{Database, IsolationLevel, TxContext};

/// Builds one [`UnitOfWork`] per logical operation.
#[derive(Clone)]
pub struct UnitOfWorkFactory {
    database: Arc<dyn Database>,
    organizations: Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
    memberships: Arc<dyn MembershipRepository>,
}

impl UnitOfWorkFactory {
    pub fn new(
        database: Arc<dyn Database>,
        organizations: Arc<dyn OrganizationRepository>,
        users: Arc<dyn UserRepository>,
        memberships: Arc<dyn MembershipRepository>,
    ) -> Self {
        Self {
            database,
            organizations,
            users,
            memberships,
        }
    }

    /// Factory over a [`MemoryDatabase`] and its own repositories.
    pub fn in_memory(database: &MemoryDatabase) -> Self {
        Self::new(
            Arc::new(database.clone()),
            Arc::new(database.organizations()),
            Arc::new(database.users()),
            Arc::new(database.memberships()),
        )
    }

    /// Unbound organization repository, for reads and single-row writes.
    pub fn organizations(&self) -> Arc<dyn OrganizationRepository> {
        Arc::clone(&self.organizations)
    }

    pub fn users(&self) -> Arc<dyn UserRepository> {
        Arc::clone(&self.users)
    }

    pub fn memberships(&self) -> Arc<dyn MembershipRepository> {
        Arc::clone(&self.memberships)
    }

    /// Open a read-committed transaction and bind all three repositories to it.
    pub async fn new_unit_of_work(&self) -> Result<UnitOfWork, PlatformError> {
        let tx = self.database.begin(IsolationLevel::ReadCommitted).await?;
        debug!(tx_id = %tx.id(), "unit_of_work_started");
        Ok(UnitOfWork {
            organizations: self.organizations.with_tx(&tx),
            users: self.users.with_tx(&tx),
            memberships: self.memberships.with_tx(&tx),
            database: Arc::clone(&self.database),
            tx,
            finished: false,
        })
    }
}

/// Repositories sharing one transaction.
///
/// Ends with exactly one of [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), both of which consume it. Dropping it
/// unfinished (an early `?` return, or a panic unwinding through the owner)
/// aborts the transaction, so staged writes never outlive their scope.
pub struct UnitOfWork {
    database: Arc<dyn Database>,
    tx: TxContext,
    organizations: Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
    memberships: Arc<dyn MembershipRepository>,
    finished: bool,
}

impl UnitOfWork {
    pub fn tx(&self) -> &TxContext {
        &self.tx
    }

    pub fn organization(&self) -> Arc<dyn OrganizationRepository> {
        Arc::clone(&self.organizations)
    }

    pub fn user(&self) -> Arc<dyn UserRepository> {
        Arc::clone(&self.users)
    }

    pub fn membership(&self) -> Arc<dyn MembershipRepository> {
        Arc::clone(&self.memberships)
    }

    pub async fn commit(mut self) -> Result<(), PlatformError> {
        self.finished = true;
        self.database.commit(&self.tx).await
    }

    pub async fn rollback(mut self) -> Result<(), PlatformError> {
        self.finished = true;
        self.database.rollback(&self.tx).await
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.tx.abort() {
            warn!(
                tx_id = %self.tx.id(),
                panicking = std::thread::panicking(),
                "unit_of_work_aborted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::Organization;

    #[tokio::test]
    async fn commit_publishes_staged_rows() {
        let db = MemoryDatabase::new();
        let factory = UnitOfWorkFactory::in_memory(&db);

        let uow = factory.new_unit_of_work().await.unwrap();
        assert_eq!(uow.tx().isolation(), IsolationLevel::ReadCommitted);
        uow.organization()
            .create(&Organization::new(Uuid::new_v4(), "acme"))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(db.organization_count(), 1);
    }

    #[tokio::test]
    async fn dropping_unfinished_work_aborts() {
        let db = MemoryDatabase::new();
        let factory = UnitOfWorkFactory::in_memory(&db);

        let uow = factory.new_unit_of_work().await.unwrap();
        let tx = uow.tx().clone();
        uow.organization()
            .create(&Organization::new(Uuid::new_v4(), "acme"))
            .await
            .unwrap();
        drop(uow);

        assert!(tx.is_finished());
        assert_eq!(db.organization_count(), 0);
    }

    #[tokio::test]
    async fn panic_inside_work_rolls_back_before_propagating() {
        let db = MemoryDatabase::new();
        let factory = UnitOfWorkFactory::in_memory(&db);
        let uow = factory.new_unit_of_work().await.unwrap();
        let tx = uow.tx().clone();

        let task = tokio::spawn(async move {
            uow.organization()
                .create(&Organization::new(Uuid::new_v4(), "acme"))
                .await
                .unwrap();
            panic!("handler bug");
        });

        let err = task.await.unwrap_err();
        assert!(err.is_panic());
        assert!(tx.is_finished());
        assert_eq!(db.organization_count(), 0);
    }
}
