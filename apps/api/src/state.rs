use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::wizard::service::WizardService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// The wizard service owns the session map and the seams to the
    /// generative client and the kit gateway.
    pub wizard: Arc<WizardService>,
    #[allow(dead_code)]
    pub config: Config,
}
