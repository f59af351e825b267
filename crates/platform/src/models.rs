//! Tenancy domain: organizations (tenants), users and the memberships
//! linking them.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlatformError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformRole {
    Owner,
    Admin,
    #[default]
    User,
}

impl PlatformRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformRole::Owner => "owner",
            PlatformRole::Admin => "admin",
            PlatformRole::User => "user",
        }
    }
}

impl fmt::Display for PlatformRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformRole {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(PlatformRole::Owner),
            "admin" => Ok(PlatformRole::Admin),
            "user" => Ok(PlatformRole::User),
            other => Err(PlatformError::InvalidRole(other.to_string())),
        }
    }
}

/// A tenant. Deletion is soft: the row stays with `deleted` set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub identifier: Uuid,
    pub name: String,
    #[serde(skip)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
    pub fn new(identifier: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            identifier,
            name: name.into(),
            deleted: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub identifier: Uuid,
    /// Subject id at the external identity provider.
    pub zitadel_id: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub primary_email: String,
    pub role: PlatformRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub identifier: Uuid,
    pub org_identifier: Uuid,
    pub user_identifier: Uuid,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(identifier: Uuid, org_identifier: Uuid, user_identifier: Uuid) -> Self {
        let now = Utc::now();
        Self {
            identifier,
            org_identifier,
            user_identifier,
            joined_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CreateOrganization {
    pub fn validate(&self) -> Result<(), PlatformError> {
        require("name", &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOrganization {
    pub name: String,
}

impl UpdateOrganization {
    pub fn validate(&self) -> Result<(), PlatformError> {
        require("name", &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUser {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub primary_email: String,
    #[serde(default)]
    pub role: PlatformRole,
    #[serde(default)]
    pub zitadel_id: String,
}

impl CreateUser {
    pub fn validate(&self) -> Result<(), PlatformError> {
        require("user_name", &self.user_name)?;
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        require("primary_email", &self.primary_email)?;
        if !self.primary_email.contains('@') {
            return Err(PlatformError::Validation(format!(
                "primary_email `{}` is not an email address",
                self.primary_email
            )));
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), PlatformError> {
    if value.trim().is_empty() {
        return Err(PlatformError::Validation(format!("{field} is required")));
    }
    Ok(())
}
