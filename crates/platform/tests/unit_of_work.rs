use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use platform::{
    CreateOrganization, CreateUser, Database, IsolationLevel, MemoryDatabase, Membership,
    MembershipRepository, OrganizationService, PlatformError, TxContext, UnitOfWorkFactory,
    UserService,
};
use uuid::Uuid;

/// Delegates to a [`MemoryDatabase`] and counts how transactions end.
struct CountingDatabase {
    inner: MemoryDatabase,
    begins: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl CountingDatabase {
    fn new(inner: MemoryDatabase) -> Self {
        Self {
            inner,
            begins: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Database for CountingDatabase {
    async fn begin(&self, isolation: IsolationLevel) -> Result<TxContext, PlatformError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        assert_eq!(isolation, IsolationLevel::ReadCommitted);
        self.inner.begin(isolation).await
    }

    async fn commit(&self, tx: &TxContext) -> Result<(), PlatformError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit(tx).await
    }

    async fn rollback(&self, tx: &TxContext) -> Result<(), PlatformError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback(tx).await
    }
}

/// Membership store that refuses every insert.
struct RejectingMemberships {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl MembershipRepository for RejectingMemberships {
    fn with_tx(&self, _tx: &TxContext) -> Arc<dyn MembershipRepository> {
        Arc::new(RejectingMemberships {
            attempts: Arc::clone(&self.attempts),
        })
    }

    async fn create(&self, _membership: &Membership) -> Result<(), PlatformError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PlatformError::Commit("tenant_members unavailable".into()))
    }

    async fn find_by_organization(&self, _org: Uuid) -> Result<Vec<Membership>, PlatformError> {
        Ok(Vec::new())
    }
}

async fn seed_owner(db: &MemoryDatabase) {
    UserService::new(Arc::new(db.users()))
        .create(&CreateUser {
            user_name: "ada".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            primary_email: "ada@example.com".into(),
            zitadel_id: "zit-1".into(),
            ..Default::default()
        })
        .await
        .unwrap();
}

fn acme() -> CreateOrganization {
    CreateOrganization {
        name: "acme".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn membership_failure_rolls_back_once_and_never_commits() {
    let memory = MemoryDatabase::new();
    seed_owner(&memory).await;

    let database = Arc::new(CountingDatabase::new(memory.clone()));
    let attempts = Arc::new(AtomicUsize::new(0));
    let factory = UnitOfWorkFactory::new(
        database.clone(),
        Arc::new(memory.organizations()),
        Arc::new(memory.users()),
        Arc::new(RejectingMemberships {
            attempts: Arc::clone(&attempts),
        }),
    );

    let err = OrganizationService::new(factory)
        .create(&acme(), "zit-1")
        .await
        .unwrap_err();

    assert_eq!(err, PlatformError::Commit("tenant_members unavailable".into()));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(database.begins.load(Ordering::SeqCst), 1);
    assert_eq!(database.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(database.commits.load(Ordering::SeqCst), 0);
    assert_eq!(memory.organization_count(), 0);
}

#[tokio::test]
async fn successful_create_commits_once() {
    let memory = MemoryDatabase::new();
    seed_owner(&memory).await;

    let database = Arc::new(CountingDatabase::new(memory.clone()));
    let factory = UnitOfWorkFactory::new(
        database.clone(),
        Arc::new(memory.organizations()),
        Arc::new(memory.users()),
        Arc::new(memory.memberships()),
    );

    let org = OrganizationService::new(factory)
        .create(&acme(), "zit-1")
        .await
        .unwrap();

    assert_eq!(org.name, "acme");
    assert_eq!(database.commits.load(Ordering::SeqCst), 1);
    assert_eq!(database.rollbacks.load(Ordering::SeqCst), 0);
    assert_eq!(memory.organization_count(), 1);
    assert_eq!(memory.membership_count(), 1);
}

#[tokio::test]
async fn invalid_command_never_opens_a_transaction() {
    let memory = MemoryDatabase::new();
    let database = Arc::new(CountingDatabase::new(memory.clone()));
    let factory = UnitOfWorkFactory::new(
        database.clone(),
        Arc::new(memory.organizations()),
        Arc::new(memory.users()),
        Arc::new(memory.memberships()),
    );

    let err = OrganizationService::new(factory)
        .create(&CreateOrganization::default(), "zit-1")
        .await
        .unwrap_err();

    assert_eq!(err.http_status_code(), 400);
    assert_eq!(database.begins.load(Ordering::SeqCst), 0);
}
