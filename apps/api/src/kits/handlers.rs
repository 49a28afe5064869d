//! Axum route handlers for the kit library and the moderation workflow.
//! Access is scoped by organization membership; only admins review jobs.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::kits::export::{export_file_name, render_kit_pdf, ExportQuestion, ExportSection};
use crate::models::kit::{CompetencyRow, JobRow, JobStatus, QuestionRow};
use crate::models::org::{MemberRole, ProfileRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileIdQuery {
    pub profile_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProfileIdBody {
    pub profile_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub profile_id: Uuid,
    pub reason: String,
}

/// A question flattened with its competency name, the shape the kit
/// preview consumes.
#[derive(Debug, Serialize)]
pub struct KitQuestionView {
    pub id: Uuid,
    pub competency_id: Uuid,
    pub competency_name: String,
    pub text: String,
    pub category: String,
    pub explanation: String,
    pub rubric_good: String,
    pub rubric_bad: String,
}

#[derive(Debug, Serialize)]
pub struct KitDetailResponse {
    pub job: JobRow,
    pub competencies: Vec<CompetencyRow>,
    pub questions: Vec<KitQuestionView>,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared lookups
// ────────────────────────────────────────────────────────────────────────────

async fn fetch_profile(pool: &PgPool, profile_id: Uuid) -> Result<ProfileRow, AppError> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = $1")
        .bind(profile_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {profile_id} not found")))
}

async fn fetch_job(pool: &PgPool, job_id: Uuid) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
}

/// Caller must belong to the job's organization.
fn ensure_same_org(profile: &ProfileRow, job: &JobRow) -> Result<(), AppError> {
    if profile.organization_id != Some(job.org_id) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn ensure_admin(profile: &ProfileRow) -> Result<(), AppError> {
    if MemberRole::parse(&profile.role) != Some(MemberRole::Admin) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

async fn load_kit_children(
    pool: &PgPool,
    job_id: Uuid,
) -> Result<(Vec<CompetencyRow>, Vec<KitQuestionView>), AppError> {
    let competencies = sqlx::query_as::<_, CompetencyRow>(
        "SELECT * FROM competencies WHERE job_id = $1 ORDER BY position, created_at",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    let mut questions = Vec::new();
    for competency in &competencies {
        let rows = sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM questions WHERE competency_id = $1 ORDER BY created_at, id",
        )
        .bind(competency.id)
        .fetch_all(pool)
        .await?;
        for row in rows {
            questions.push(KitQuestionView {
                id: row.id,
                competency_id: competency.id,
                competency_name: competency.name.clone(),
                text: row.text,
                category: row.category,
                explanation: row.explanation,
                rubric_good: row.rubric_good,
                rubric_bad: row.rubric_bad,
            });
        }
    }

    Ok((competencies, questions))
}

// ────────────────────────────────────────────────────────────────────────────
// Library
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs
///
/// The caller's own kits, newest first.
pub async fn handle_list_my_jobs(
    State(state): State<AppState>,
    Query(params): Query<ProfileIdQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let profile = fetch_profile(&state.db, params.profile_id).await?;
    let Some(org_id) = profile.organization_id else {
        return Ok(Json(Vec::new()));
    };

    let jobs = sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE org_id = $1 AND profile_id = $2 ORDER BY created_at DESC",
    )
    .bind(org_id)
    .bind(profile.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/all
///
/// Every kit in the caller's organization, newest first.
pub async fn handle_list_org_jobs(
    State(state): State<AppState>,
    Query(params): Query<ProfileIdQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let profile = fetch_profile(&state.db, params.profile_id).await?;
    let Some(org_id) = profile.organization_id else {
        return Ok(Json(Vec::new()));
    };

    let jobs = sqlx::query_as::<_, JobRow>(
        "SELECT * FROM jobs WHERE org_id = $1 ORDER BY created_at DESC",
    )
    .bind(org_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_kit(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<ProfileIdQuery>,
) -> Result<Json<KitDetailResponse>, AppError> {
    let profile = fetch_profile(&state.db, params.profile_id).await?;
    let job = fetch_job(&state.db, job_id).await?;
    ensure_same_org(&profile, &job)?;

    let (competencies, questions) = load_kit_children(&state.db, job_id).await?;
    Ok(Json(KitDetailResponse {
        job,
        competencies,
        questions,
    }))
}

/// DELETE /api/v1/jobs/:id
///
/// The owner (or an organization admin) deletes a kit; children cascade.
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<ProfileIdQuery>,
) -> Result<StatusCode, AppError> {
    let profile = fetch_profile(&state.db, params.profile_id).await?;
    let job = fetch_job(&state.db, job_id).await?;
    ensure_same_org(&profile, &job)?;
    if job.profile_id != profile.id {
        ensure_admin(&profile)?;
    }

    sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(job_id)
        .execute(&state.db)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Moderation workflow
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:id/submit
///
/// Owner sends a draft kit for admin review.
pub async fn handle_submit_for_review(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<ProfileIdBody>,
) -> Result<Json<JobRow>, AppError> {
    let profile = fetch_profile(&state.db, request.profile_id).await?;
    let job = fetch_job(&state.db, job_id).await?;
    ensure_same_org(&profile, &job)?;
    if job.profile_id != profile.id {
        return Err(AppError::Forbidden);
    }
    if JobStatus::parse(&job.status) != Some(JobStatus::Draft) {
        return Err(AppError::Conflict(format!(
            "Only draft jobs can be submitted (current status: {})",
            job.status
        )));
    }

    let updated = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs
        SET status = $1, submitted_at = $2, updated_at = $2
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(JobStatus::Pending.as_str())
    .bind(Utc::now())
    .bind(job_id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(updated))
}

/// POST /api/v1/jobs/:id/approve
pub async fn handle_approve_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<ProfileIdBody>,
) -> Result<Json<JobRow>, AppError> {
    let profile = fetch_profile(&state.db, request.profile_id).await?;
    let job = fetch_job(&state.db, job_id).await?;
    ensure_same_org(&profile, &job)?;
    ensure_admin(&profile)?;
    if JobStatus::parse(&job.status) != Some(JobStatus::Pending) {
        return Err(AppError::Conflict(format!(
            "Only pending jobs can be approved (current status: {})",
            job.status
        )));
    }

    let updated = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs
        SET status = $1, reviewed_at = $2, reviewed_by = $3, updated_at = $2
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(JobStatus::Approved.as_str())
    .bind(Utc::now())
    .bind(profile.id)
    .bind(job_id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(updated))
}

/// POST /api/v1/jobs/:id/reject
///
/// Rejection requires a reason; it is shown back to the submitter.
pub async fn handle_reject_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<JobRow>, AppError> {
    if request.reason.trim().is_empty() {
        return Err(AppError::Validation(
            "A rejection reason is required".to_string(),
        ));
    }

    let profile = fetch_profile(&state.db, request.profile_id).await?;
    let job = fetch_job(&state.db, job_id).await?;
    ensure_same_org(&profile, &job)?;
    ensure_admin(&profile)?;
    if JobStatus::parse(&job.status) != Some(JobStatus::Pending) {
        return Err(AppError::Conflict(format!(
            "Only pending jobs can be rejected (current status: {})",
            job.status
        )));
    }

    let updated = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs
        SET status = $1, reviewed_at = $2, reviewed_by = $3,
            rejection_reason = $4, updated_at = $2
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(JobStatus::Rejected.as_str())
    .bind(Utc::now())
    .bind(profile.id)
    .bind(request.reason.trim())
    .bind(job_id)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(updated))
}

// ────────────────────────────────────────────────────────────────────────────
// Export
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs/:id/export
///
/// The finalized kit as a paginated PDF, grouped by competency.
pub async fn handle_export_kit(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<ProfileIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let profile = fetch_profile(&state.db, params.profile_id).await?;
    let job = fetch_job(&state.db, job_id).await?;
    ensure_same_org(&profile, &job)?;

    let (competencies, questions) = load_kit_children(&state.db, job_id).await?;
    let sections: Vec<ExportSection> = competencies
        .iter()
        .map(|competency| ExportSection {
            competency: competency.name.clone(),
            questions: questions
                .iter()
                .filter(|q| q.competency_id == competency.id)
                .map(|q| ExportQuestion {
                    text: q.text.clone(),
                    rubric_good: q.rubric_good.clone(),
                    rubric_bad: q.rubric_bad.clone(),
                })
                .collect(),
        })
        .collect();

    let bytes = render_kit_pdf(&job.title, &sections)?;
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(&job.title));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
