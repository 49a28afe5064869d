pub mod health;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::kits::handlers as kits;
use crate::orgs::handlers as orgs;
use crate::state::AppState;
use crate::wizard::handlers as wizard;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Wizard API
        .route("/api/v1/wizard", post(wizard::handle_create_session))
        .route("/api/v1/wizard/:id", get(wizard::handle_snapshot))
        .route("/api/v1/wizard/:id/job", post(wizard::handle_submit_job))
        .route(
            "/api/v1/wizard/:id/job/document",
            post(wizard::handle_submit_job_document),
        )
        .route(
            "/api/v1/wizard/:id/competencies",
            put(wizard::handle_edit_competencies),
        )
        .route(
            "/api/v1/wizard/:id/competencies/suggest",
            post(wizard::handle_suggest_competencies),
        )
        .route(
            "/api/v1/wizard/:id/competencies/confirm",
            post(wizard::handle_confirm_competencies),
        )
        .route(
            "/api/v1/wizard/:id/questions",
            put(wizard::handle_edit_questions),
        )
        .route(
            "/api/v1/wizard/:id/questions/more",
            post(wizard::handle_generate_more),
        )
        .route("/api/v1/wizard/:id/finalize", post(wizard::handle_finalize))
        .route("/api/v1/wizard/:id/back", post(wizard::handle_back))
        .route("/api/v1/wizard/:id/reset", post(wizard::handle_reset))
        // Kit library + moderation
        .route("/api/v1/jobs", get(kits::handle_list_my_jobs))
        .route("/api/v1/jobs/all", get(kits::handle_list_org_jobs))
        .route(
            "/api/v1/jobs/:id",
            get(kits::handle_get_kit).delete(kits::handle_delete_job),
        )
        .route("/api/v1/jobs/:id/export", get(kits::handle_export_kit))
        .route("/api/v1/jobs/:id/submit", post(kits::handle_submit_for_review))
        .route("/api/v1/jobs/:id/approve", post(kits::handle_approve_job))
        .route("/api/v1/jobs/:id/reject", post(kits::handle_reject_job))
        // Organizations
        .route(
            "/api/v1/organizations",
            post(orgs::handle_create_organization),
        )
        .route(
            "/api/v1/organizations/join",
            post(orgs::handle_join_organization),
        )
        .route(
            "/api/v1/organizations/members",
            get(orgs::handle_list_members),
        )
        .route(
            "/api/v1/organizations/members/:id",
            delete(orgs::handle_remove_member),
        )
        .route(
            "/api/v1/organizations/members/:id/role",
            patch(orgs::handle_update_member_role),
        )
        .route(
            "/api/v1/organizations/invite-code/regenerate",
            post(orgs::handle_regenerate_invite_code),
        )
        .with_state(state)
}
