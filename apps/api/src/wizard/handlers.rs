//! Axum route handlers for the wizard API. All state lives in
//! `WizardService`; handlers validate transport concerns and delegate.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::{extract_text, is_pdf};
use crate::state::AppState;
use crate::wizard::machine::{CompetencyEdit, QuestionEdit};
use crate::wizard::service::WizardSnapshot;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub profile_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct EditCompetenciesRequest {
    pub competencies: Vec<CompetencyEdit>,
}

#[derive(Debug, Deserialize)]
pub struct EditQuestionsRequest {
    pub questions: Vec<QuestionEdit>,
}

/// POST /api/v1/wizard
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Json<WizardSnapshot> {
    Json(state.wizard.create_session(request.profile_id).await)
}

/// GET /api/v1/wizard/:id
pub async fn handle_snapshot(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>, AppError> {
    Ok(Json(state.wizard.snapshot(session_id).await?))
}

/// POST /api/v1/wizard/:id/job
///
/// Stage-1 submission with pasted text.
pub async fn handle_submit_job(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SubmitJobRequest>,
) -> Result<Json<WizardSnapshot>, AppError> {
    let snapshot = state
        .wizard
        .submit_job(session_id, request.title, request.description)
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/wizard/:id/job/document
///
/// Stage-1 submission with an uploaded PDF. Pasted text, when present,
/// wins over the file; extraction runs only when the description is empty.
pub async fn handle_submit_job_document(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<WizardSnapshot>, AppError> {
    let mut title = String::new();
    let mut description = String::new();
    let mut file: Option<(Option<String>, Option<String>, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        match field.name().unwrap_or("") {
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid title field: {e}")))?;
            }
            "description" => {
                description = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid description field: {e}")))?;
            }
            "file" => {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file field: {e}")))?;
                file = Some((content_type, file_name, data));
            }
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    if description.trim().is_empty() {
        if let Some((content_type, file_name, data)) = file {
            if !is_pdf(content_type.as_deref(), file_name.as_deref()) {
                return Err(crate::extract::ExtractionError::UnsupportedFormat.into());
            }
            description = extract_text(&data)?;
        }
    }

    if description.trim().is_empty() {
        return Err(AppError::Validation(
            "Please provide a job description".to_string(),
        ));
    }

    let snapshot = state.wizard.submit_job(session_id, title, description).await?;
    Ok(Json(snapshot))
}

/// PUT /api/v1/wizard/:id/competencies
pub async fn handle_edit_competencies(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<EditCompetenciesRequest>,
) -> Result<Json<WizardSnapshot>, AppError> {
    let snapshot = state
        .wizard
        .edit_competencies(session_id, request.competencies)
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/wizard/:id/competencies/suggest
pub async fn handle_suggest_competencies(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>, AppError> {
    Ok(Json(state.wizard.suggest_competencies(session_id).await?))
}

/// POST /api/v1/wizard/:id/competencies/confirm
pub async fn handle_confirm_competencies(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>, AppError> {
    Ok(Json(state.wizard.confirm_competencies(session_id).await?))
}

/// PUT /api/v1/wizard/:id/questions
pub async fn handle_edit_questions(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<EditQuestionsRequest>,
) -> Result<Json<WizardSnapshot>, AppError> {
    let snapshot = state
        .wizard
        .edit_questions(session_id, request.questions)
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/v1/wizard/:id/questions/more
pub async fn handle_generate_more(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>, AppError> {
    Ok(Json(state.wizard.generate_more(session_id).await?))
}

/// POST /api/v1/wizard/:id/finalize
pub async fn handle_finalize(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>, AppError> {
    Ok(Json(state.wizard.finalize(session_id).await?))
}

/// POST /api/v1/wizard/:id/back
pub async fn handle_back(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>, AppError> {
    Ok(Json(state.wizard.back(session_id).await?))
}

/// POST /api/v1/wizard/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<WizardSnapshot>, AppError> {
    Ok(Json(state.wizard.reset(session_id).await?))
}
