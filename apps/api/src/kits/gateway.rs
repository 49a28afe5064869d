//! Kit persistence gateway. The wizard talks to the backend through the
//! `KitGateway` trait only, so finalize can be exercised in tests with the
//! in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::types::{KitScore, QuestionCategory};
use crate::models::kit::JobStatus;

/// A competency row to be created, still keyed by the wizard's client key.
#[derive(Debug, Clone)]
pub struct NewCompetency {
    pub key: Uuid,
    pub name: String,
    pub description: String,
}

/// A question row to be created. `competency_key` must reference one of the
/// kit's competencies; the gateway groups questions under the freshly
/// inserted competency row, which guarantees every persisted question
/// references a competency of the same job.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub competency_key: Uuid,
    pub text: String,
    pub category: QuestionCategory,
    pub explanation: String,
    pub rubric_good: String,
    pub rubric_bad: String,
}

/// A complete kit ready for its one-shot save.
#[derive(Debug, Clone)]
pub struct NewKit {
    pub profile_id: Uuid,
    pub title: String,
    pub description: String,
    pub score: KitScore,
    pub competencies: Vec<NewCompetency>,
    pub questions: Vec<NewQuestion>,
}

/// Authoritative identities returned by a successful save.
#[derive(Debug, Clone)]
pub struct SavedKit {
    pub job_id: Uuid,
    /// (client key, persisted row id) per competency, in insertion order.
    pub competency_ids: Vec<(Uuid, Uuid)>,
    pub questions_saved: usize,
}

#[async_trait]
pub trait KitGateway: Send + Sync {
    /// Resolves the organization the profile belongs to. Profiles without
    /// an organization cannot save kits.
    async fn organization_for(&self, profile_id: Uuid) -> Result<Uuid, AppError>;

    /// Persists job + competencies + questions in a single transaction.
    /// Nothing is committed if any insert fails.
    async fn save_kit(&self, org_id: Uuid, kit: NewKit) -> Result<SavedKit, AppError>;
}

/// Production gateway over Postgres.
pub struct PgKitGateway {
    pool: PgPool,
}

impl PgKitGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KitGateway for PgKitGateway {
    async fn organization_for(&self, profile_id: Uuid) -> Result<Uuid, AppError> {
        let org_id: Option<Option<Uuid>> =
            sqlx::query_scalar("SELECT organization_id FROM profiles WHERE id = $1")
                .bind(profile_id)
                .fetch_optional(&self.pool)
                .await?;

        match org_id {
            None => Err(AppError::NotFound(format!("Profile {profile_id} not found"))),
            Some(None) => Err(AppError::Validation(
                "You must belong to an organization to save a kit".to_string(),
            )),
            Some(Some(id)) => Ok(id),
        }
    }

    async fn save_kit(&self, org_id: Uuid, kit: NewKit) -> Result<SavedKit, AppError> {
        let mut tx = self.pool.begin().await?;

        let job_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO jobs
                (id, org_id, profile_id, title, description, status,
                 kit_score, kit_score_explanation)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job_id)
        .bind(org_id)
        .bind(kit.profile_id)
        .bind(&kit.title)
        .bind(&kit.description)
        .bind(JobStatus::Draft.as_str())
        .bind(kit.score.score as i32)
        .bind(&kit.score.explanation)
        .execute(&mut *tx)
        .await?;

        let mut competency_ids = Vec::with_capacity(kit.competencies.len());
        let mut questions_saved = 0usize;

        for (position, competency) in kit.competencies.iter().enumerate() {
            let competency_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO competencies (id, job_id, name, description, position)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(competency_id)
            .bind(job_id)
            .bind(&competency.name)
            .bind(&competency.description)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;

            // A competency with zero matching questions is still inserted.
            for question in kit.questions.iter().filter(|q| q.competency_key == competency.key) {
                sqlx::query(
                    r#"
                    INSERT INTO questions
                        (id, competency_id, text, category, explanation,
                         rubric_good, rubric_bad)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(competency_id)
                .bind(&question.text)
                .bind(question.category.as_str())
                .bind(&question.explanation)
                .bind(&question.rubric_good)
                .bind(&question.rubric_bad)
                .execute(&mut *tx)
                .await?;
                questions_saved += 1;
            }

            competency_ids.push((competency.key, competency_id));
        }

        tx.commit().await?;

        info!(
            "Saved kit {} ({} competencies, {} questions) for profile {}",
            job_id,
            competency_ids.len(),
            questions_saved,
            kit.profile_id
        );

        Ok(SavedKit {
            job_id,
            competency_ids,
            questions_saved,
        })
    }
}

/// In-memory gateway used by wizard tests. Records every saved kit and can
/// be scripted to fail the next save.
#[derive(Default)]
pub struct MemoryKitGateway {
    organizations: Mutex<HashMap<Uuid, Uuid>>,
    saved: Mutex<Vec<(Uuid, NewKit, SavedKit)>>,
    fail_next_save: Mutex<bool>,
}

impl MemoryKitGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(self, profile_id: Uuid, org_id: Uuid) -> Self {
        self.organizations.lock().unwrap().insert(profile_id, org_id);
        self
    }

    pub fn fail_next_save(&self) {
        *self.fail_next_save.lock().unwrap() = true;
    }

    /// Saved kits as (org id, submitted kit, save summary) tuples.
    pub fn saved(&self) -> Vec<(Uuid, NewKit, SavedKit)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl KitGateway for MemoryKitGateway {
    async fn organization_for(&self, profile_id: Uuid) -> Result<Uuid, AppError> {
        self.organizations
            .lock()
            .unwrap()
            .get(&profile_id)
            .copied()
            .ok_or_else(|| {
                AppError::Validation(
                    "You must belong to an organization to save a kit".to_string(),
                )
            })
    }

    async fn save_kit(&self, org_id: Uuid, kit: NewKit) -> Result<SavedKit, AppError> {
        if std::mem::take(&mut *self.fail_next_save.lock().unwrap()) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }

        let job_id = Uuid::new_v4();
        let competency_ids: Vec<(Uuid, Uuid)> = kit
            .competencies
            .iter()
            .map(|c| (c.key, Uuid::new_v4()))
            .collect();
        let questions_saved = kit
            .questions
            .iter()
            .filter(|q| kit.competencies.iter().any(|c| c.key == q.competency_key))
            .count();

        let summary = SavedKit {
            job_id,
            competency_ids,
            questions_saved,
        };
        self.saved
            .lock()
            .unwrap()
            .push((org_id, kit, summary.clone()));
        Ok(summary)
    }
}
