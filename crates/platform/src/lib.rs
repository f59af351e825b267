//! Streamly Platform Layer
//!
//! Tenancy bookkeeping: organizations, the users that belong to them, and
//! the memberships linking the two.
//!
//! Multi-row workflows run inside a [`UnitOfWork`]. It opens one
//! read-committed transaction, binds the organization, user and membership
//! repositories to it, and ends with exactly one commit or rollback. If it
//! is dropped first (an early return or a panic) the transaction is aborted.
//!
//! ```
//! use platform::{CreateOrganization, CreateUser, MemoryDatabase, OrganizationService,
//!     UnitOfWorkFactory, UserService};
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let db = MemoryDatabase::new();
//! let factory = UnitOfWorkFactory::in_memory(&db);
//!
//! UserService::new(factory.users())
//!     .create(&CreateUser {
//!         user_name: "ada".into(),
//!         first_name: "Ada".into(),
//!         last_name: "Lovelace".into(),
//!         primary_email: "ada@example.com".into(),
//!         zitadel_id: "zit-1".into(),
//!         ..Default::default()
//!     })
//!     .await
//!     .unwrap();
//!
//! let orgs = OrganizationService::new(factory);
//! let command = CreateOrganization { name: "acme".into(), ..Default::default() };
//! orgs.create(&command, "zit-1").await.unwrap();
//! assert_eq!(db.membership_count(), 1);
//! # });
//! ```

mod error;
mod memory;
mod models;
mod repository;
mod service;
mod store;
mod unit_of_work;

pub use crate::error::{parse_identifier, PlatformError};
pub use crate::memory::{
    MemoryDatabase, MemoryMembershipRepository, MemoryOrganizationRepository,
    MemoryUserRepository,
};
pub use crate::models::{
    CreateOrganization, CreateUser, Membership, Organization, PlatformRole, UpdateOrganization,
    User,
};
pub use crate::repository::{MembershipRepository, OrganizationRepository, UserRepository};
pub use crate::service::{random_ids, IdGenerator, OrganizationService, UserService};
pub use crate::store::{Database, IsolationLevel, TxContext};
pub use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
