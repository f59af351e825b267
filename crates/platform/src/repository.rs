//! Repository seams for the tenancy tables.
//!
//! Every repository can be re-bound to an open transaction with `with_tx`.
//! A bound repository stages its writes in that transaction and sees them
//! in its own reads; an unbound one writes through immediately.
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::models::{Membership, Organization, User};
use crate::store::TxContext;

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    fn with_tx(&self, tx: &TxContext) -> Arc<dyn OrganizationRepository>;

    async fn create(&self, org: &Organization) -> Result<(), PlatformError>;

    /// Soft-deleted organizations are reported as not found.
    async fn find_one_by_id(&self, identifier: Uuid) -> Result<Organization, PlatformError>;

    /// Live organizations, oldest first.
    async fn find_all(&self, limit: usize, offset: usize)
        -> Result<Vec<Organization>, PlatformError>;

    async fn update(&self, org: &Organization) -> Result<(), PlatformError>;

    async fn delete(&self, identifier: Uuid) -> Result<(), PlatformError>;

    async fn exists(&self, identifier: Uuid) -> Result<bool, PlatformError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    fn with_tx(&self, tx: &TxContext) -> Arc<dyn UserRepository>;

    async fn create(&self, user: &User) -> Result<(), PlatformError>;

    async fn find_one_by_id(&self, identifier: Uuid) -> Result<User, PlatformError>;

    async fn find_one_by_primary_email(&self, email: &str) -> Result<User, PlatformError>;

    /// Map an identity-provider subject id to the local user identifier.
    async fn get_user_id_from_zitadel_id(&self, zitadel_id: &str) -> Result<Uuid, PlatformError>;

    async fn exists(&self, identifier: Uuid) -> Result<bool, PlatformError>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    fn with_tx(&self, tx: &TxContext) -> Arc<dyn MembershipRepository>;

    async fn create(&self, membership: &Membership) -> Result<(), PlatformError>;

    async fn find_by_organization(
        &self,
        org_identifier: Uuid,
    ) -> Result<Vec<Membership>, PlatformError>;
}
