//! User and organization routes.
//!
//! These handlers are not scoped to the caller's tenant: any valid API key may
//! read or change any organization.

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use platform::{CreateOrganization, CreateUser, Membership, Organization, UpdateOrganization};
use serde::Deserialize;
use std::sync::Arc;

/// Header naming the identity-provider user that will own a new organization.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_page_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
}

/// POST /v1/users
pub async fn create_user(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(command) = payload?;
    let user = state.users.create(&command).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /v1/organizations
///
/// The owner is the user linked to the `X-User-Id` identity; the
/// organization and the owner's membership are written together or not at all.
pub async fn create_organization(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateOrganization>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let owner = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("X-User-Id header is required".to_string()))?
        .to_string();

    let Json(command) = payload?;
    let org = state.organizations.create(&command, &owner).await?;
    Ok((StatusCode::CREATED, Json(org)))
}

/// GET /v1/organizations?limit=&offset=
///
/// Not tenant-scoped.
pub async fn list_organizations(
    State(state): State<Arc<ServerState>>,
    Query(page): Query<Pagination>,
) -> ServerResult<Json<Vec<Organization>>> {
    let orgs = state.organizations.find_all(page.limit, page.offset).await?;
    Ok(Json(orgs))
}

/// GET /v1/organizations/{id}
///
/// Not tenant-scoped.
pub async fn get_organization(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<Organization>> {
    Ok(Json(state.organizations.find_one_by_id(&id).await?))
}

/// PUT /v1/organizations/{id}
///
/// Not tenant-scoped.
pub async fn update_organization(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateOrganization>, JsonRejection>,
) -> ServerResult<Json<Organization>> {
    let Json(command) = payload?;
    Ok(Json(state.organizations.update(&id, &command).await?))
}

/// DELETE /v1/organizations/{id}
///
/// Not tenant-scoped.
pub async fn delete_organization(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    state.organizations.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/organizations/{id}/members
pub async fn add_member(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    payload: Result<Json<AddMemberRequest>, JsonRejection>,
) -> ServerResult<impl IntoResponse> {
    let Json(body) = payload?;
    let membership = state.organizations.add_user(&id, &body.user_id).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// GET /v1/organizations/{id}/members
pub async fn list_members(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<Membership>>> {
    Ok(Json(state.organizations.members(&id).await?))
}
