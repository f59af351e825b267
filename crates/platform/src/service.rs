use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{parse_identifier, PlatformError};
use crate::models::{
    CreateOrganization, CreateUser, Membership, Organization, UpdateOrganization, User,
};
use crate::repository::UserRepository;
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Source of fresh identifiers. Swappable so tests can pin ids.
pub type IdGenerator = Arc<dyn Fn() -> Uuid + Send + Sync>;

pub fn random_ids() -> IdGenerator {
    Arc::new(Uuid::new_v4)
}

#[derive(Clone)]
pub struct OrganizationService {
    factory: UnitOfWorkFactory,
    generator: IdGenerator,
}

impl OrganizationService {
    pub fn new(factory: UnitOfWorkFactory) -> Self {
        Self::with_generator(factory, random_ids())
    }

    pub fn with_generator(factory: UnitOfWorkFactory, generator: IdGenerator) -> Self {
        Self { factory, generator }
    }

    /// Create an organization owned by the user linked to `zitadel_user_id`.
    ///
    /// The organization row, the owner lookup and the membership row share
    /// one unit of work: any failure rolls all of it back, and commit only
    /// happens after the membership is written.
    pub async fn create(
        &self,
        command: &CreateOrganization,
        zitadel_user_id: &str,
    ) -> Result<Organization, PlatformError> {
        command.validate()?;

        let uow = self.factory.new_unit_of_work().await?;
        let created = self.create_within(&uow, command, zitadel_user_id).await;
        match created {
            Ok(org) => {
                uow.commit().await?;
                info!(org_id = %org.identifier, name = %org.name, "organization_created");
                Ok(org)
            }
            Err(err) => {
                warn!(error = %err, "organization_create_failed");
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "organization_create_rollback_failed");
                }
                Err(err)
            }
        }
    }

    async fn create_within(
        &self,
        uow: &UnitOfWork,
        command: &CreateOrganization,
        zitadel_user_id: &str,
    ) -> Result<Organization, PlatformError> {
        let org = Organization::new((self.generator)(), command.name.trim());
        uow.organization().create(&org).await?;

        let owner = uow
            .user()
            .get_user_id_from_zitadel_id(zitadel_user_id)
            .await?;

        let membership = Membership::new((self.generator)(), org.identifier, owner);
        uow.membership().create(&membership).await?;
        Ok(org)
    }

    pub async fn find_one_by_id(&self, id: &str) -> Result<Organization, PlatformError> {
        let identifier = parse_identifier(id).inspect_err(|err| {
            warn!(error = %err, "organization_lookup_rejected");
        })?;
        self.factory.organizations().find_one_by_id(identifier).await
    }

    pub async fn find_all(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Organization>, PlatformError> {
        self.factory.organizations().find_all(limit, offset).await
    }

    pub async fn update(
        &self,
        id: &str,
        command: &UpdateOrganization,
    ) -> Result<Organization, PlatformError> {
        command.validate()?;
        let identifier = parse_identifier(id)?;
        let repo = self.factory.organizations();

        let mut org = repo.find_one_by_id(identifier).await?;
        org.name = command.name.trim().to_string();
        repo.update(&org).await?;
        repo.find_one_by_id(identifier).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), PlatformError> {
        let identifier = parse_identifier(id)?;
        self.factory.organizations().delete(identifier).await?;
        info!(org_id = %identifier, "organization_deleted");
        Ok(())
    }

    /// Add an existing user to an existing organization.
    pub async fn add_user(&self, org_id: &str, user_id: &str) -> Result<Membership, PlatformError> {
        let org_identifier = parse_identifier(org_id)?;
        let user_identifier = parse_identifier(user_id)?;

        if !self.factory.organizations().exists(org_identifier).await? {
            warn!(org_id, "add_user_unknown_organization");
            return Err(PlatformError::NotFound {
                entity: "organization",
                id: org_id.to_string(),
            });
        }
        if !self.factory.users().exists(user_identifier).await? {
            return Err(PlatformError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }

        let membership = Membership::new((self.generator)(), org_identifier, user_identifier);
        self.factory.memberships().create(&membership).await?;
        info!(org_id, user_id, "organization_user_added");
        Ok(membership)
    }

    pub async fn members(&self, org_id: &str) -> Result<Vec<Membership>, PlatformError> {
        let identifier = parse_identifier(org_id)?;
        self.factory.organizations().find_one_by_id(identifier).await?;
        self.factory
            .memberships()
            .find_by_organization(identifier)
            .await
    }
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    generator: IdGenerator,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self::with_generator(users, random_ids())
    }

    pub fn with_generator(users: Arc<dyn UserRepository>, generator: IdGenerator) -> Self {
        Self { users, generator }
    }

    pub async fn create(&self, command: &CreateUser) -> Result<User, PlatformError> {
        command.validate()?;
        let now = Utc::now();
        let user = User {
            identifier: (self.generator)(),
            zitadel_id: command.zitadel_id.clone(),
            user_name: command.user_name.clone(),
            first_name: command.first_name.clone(),
            last_name: command.last_name.clone(),
            primary_email: command.primary_email.clone(),
            role: command.role,
            created_at: now,
            updated_at: now,
        };
        self.users.create(&user).await?;
        info!(user_id = %user.identifier, role = %user.role, "user_created");
        Ok(user)
    }

    pub async fn find_one_by_id(&self, id: &str) -> Result<User, PlatformError> {
        self.users.find_one_by_id(parse_identifier(id)?).await
    }

    pub async fn find_one_by_primary_email(&self, email: &str) -> Result<User, PlatformError> {
        self.users.find_one_by_primary_email(email).await
    }
}
