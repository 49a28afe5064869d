//! Axum route handlers for organization and membership management.
//! Auth itself is external; callers identify with an explicit profile id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::org::{new_invite_code, MemberRole, OrganizationRow, ProfileRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub profile_id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinOrganizationRequest {
    pub profile_id: Uuid,
    pub invite_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileIdQuery {
    pub profile_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProfileIdBody {
    pub profile_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub profile_id: Uuid,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub organization: OrganizationRow,
    pub members: Vec<ProfileRow>,
}

async fn fetch_profile(pool: &PgPool, profile_id: Uuid) -> Result<ProfileRow, AppError> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = $1")
        .bind(profile_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {profile_id} not found")))
}

/// The caller's organization, or a validation error when they have none.
async fn fetch_own_org(
    pool: &PgPool,
    profile: &ProfileRow,
) -> Result<OrganizationRow, AppError> {
    let org_id = profile.organization_id.ok_or_else(|| {
        AppError::Validation("You do not belong to an organization".to_string())
    })?;
    sqlx::query_as::<_, OrganizationRow>("SELECT * FROM organizations WHERE id = $1")
        .bind(org_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Organization {org_id} not found")))
}

fn ensure_admin(profile: &ProfileRow) -> Result<(), AppError> {
    if MemberRole::parse(&profile.role) != Some(MemberRole::Admin) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// POST /api/v1/organizations
///
/// Creates an organization and makes the caller its admin.
pub async fn handle_create_organization(
    State(state): State<AppState>,
    Json(request): Json<CreateOrganizationRequest>,
) -> Result<Json<OrganizationRow>, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation(
            "Organization name must not be empty".to_string(),
        ));
    }

    let profile = fetch_profile(&state.db, request.profile_id).await?;
    if profile.organization_id.is_some() {
        return Err(AppError::Conflict(
            "You already belong to an organization".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let organization = sqlx::query_as::<_, OrganizationRow>(
        r#"
        INSERT INTO organizations (id, name, invite_code)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.name.trim())
    .bind(new_invite_code())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE profiles SET organization_id = $1, role = $2 WHERE id = $3")
        .bind(organization.id)
        .bind(MemberRole::Admin.as_str())
        .bind(profile.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(organization))
}

/// POST /api/v1/organizations/join
///
/// Joins an existing organization with its invite code, as a member.
pub async fn handle_join_organization(
    State(state): State<AppState>,
    Json(request): Json<JoinOrganizationRequest>,
) -> Result<Json<OrganizationRow>, AppError> {
    let profile = fetch_profile(&state.db, request.profile_id).await?;
    if profile.organization_id.is_some() {
        return Err(AppError::Conflict(
            "You already belong to an organization".to_string(),
        ));
    }

    let organization = sqlx::query_as::<_, OrganizationRow>(
        "SELECT * FROM organizations WHERE invite_code = $1",
    )
    .bind(request.invite_code.trim())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::Validation("Invalid invite code".to_string()))?;

    sqlx::query("UPDATE profiles SET organization_id = $1, role = $2 WHERE id = $3")
        .bind(organization.id)
        .bind(MemberRole::Member.as_str())
        .bind(profile.id)
        .execute(&state.db)
        .await?;

    Ok(Json(organization))
}

/// GET /api/v1/organizations/members
pub async fn handle_list_members(
    State(state): State<AppState>,
    Query(params): Query<ProfileIdQuery>,
) -> Result<Json<MembersResponse>, AppError> {
    let profile = fetch_profile(&state.db, params.profile_id).await?;
    let organization = fetch_own_org(&state.db, &profile).await?;

    let members = sqlx::query_as::<_, ProfileRow>(
        "SELECT * FROM profiles WHERE organization_id = $1 ORDER BY full_name",
    )
    .bind(organization.id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(MembersResponse {
        organization,
        members,
    }))
}

/// PATCH /api/v1/organizations/members/:id/role
pub async fn handle_update_member_role(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    let role = MemberRole::parse(&request.role)
        .ok_or_else(|| AppError::Validation(format!("Unknown role '{}'", request.role)))?;

    let caller = fetch_profile(&state.db, request.profile_id).await?;
    ensure_admin(&caller)?;
    let member = fetch_profile(&state.db, member_id).await?;
    if member.organization_id != caller.organization_id {
        return Err(AppError::Forbidden);
    }

    let updated = sqlx::query_as::<_, ProfileRow>(
        "UPDATE profiles SET role = $1 WHERE id = $2 RETURNING *",
    )
    .bind(role.as_str())
    .bind(member.id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/organizations/members/:id
///
/// Removes a member from the organization; their role resets to member.
pub async fn handle_remove_member(
    State(state): State<AppState>,
    Path(member_id): Path<Uuid>,
    Query(params): Query<ProfileIdQuery>,
) -> Result<StatusCode, AppError> {
    let caller = fetch_profile(&state.db, params.profile_id).await?;
    ensure_admin(&caller)?;
    if caller.id == member_id {
        return Err(AppError::Validation(
            "Admins cannot remove themselves".to_string(),
        ));
    }
    let member = fetch_profile(&state.db, member_id).await?;
    if member.organization_id != caller.organization_id {
        return Err(AppError::Forbidden);
    }

    sqlx::query("UPDATE profiles SET organization_id = NULL, role = $1 WHERE id = $2")
        .bind(MemberRole::Member.as_str())
        .bind(member.id)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/organizations/invite-code/regenerate
///
/// Rotates the shared invite secret. Outstanding copies of the old code
/// stop working immediately.
pub async fn handle_regenerate_invite_code(
    State(state): State<AppState>,
    Json(request): Json<ProfileIdBody>,
) -> Result<Json<OrganizationRow>, AppError> {
    let caller = fetch_profile(&state.db, request.profile_id).await?;
    ensure_admin(&caller)?;
    let organization = fetch_own_org(&state.db, &caller).await?;

    let updated = sqlx::query_as::<_, OrganizationRow>(
        "UPDATE organizations SET invite_code = $1 WHERE id = $2 RETURNING *",
    )
    .bind(new_invite_code())
    .bind(organization.id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(updated))
}
