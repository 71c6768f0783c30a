use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::entities::accounts::Role;
use crate::state::SharedState;

pub mod auth;
mod dormitories;
mod error;
mod observability;
mod profile;
mod repairs;
mod students;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{AuthService, OccupancyService, RepairService};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn occupancy_service(&self) -> &Arc<dyn OccupancyService> {
        &self.shared.occupancy_service
    }

    #[must_use]
    pub fn repair_service(&self) -> &Arc<dyn RepairService> {
        &self.shared.repair_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let config = state.config();
    let uploads_path = state.shared.uploads.root().to_path_buf();
    let cors_origins = config.server.cors_allowed_origins.clone();
    let max_image_bytes = config.repairs.max_image_bytes;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_inactivity_minutes,
        )));

    let api_router = Router::new()
        .merge(admin_router())
        .merge(student_router(max_image_bytes))
        .merge(staff_router())
        .route("/health", get(observability::health))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route("/me", get(auth::me))
        .route("/forgot_password", post(auth::forgot_password))
        .route("/reset_password/{token}", post(auth::reset_password))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .nest_service("/uploads", tower_http::services::ServeDir::new(uploads_path))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/dashboard", get(dormitories::dashboard))
        .route("/admin/dormitories", get(dormitories::list_dormitories))
        .route("/admin/dormitory", post(dormitories::add_dormitory))
        .route("/admin/dormitory/{id}", put(dormitories::edit_dormitory))
        .route("/admin/dormitory/{id}", delete(dormitories::delete_dormitory))
        .route("/admin/students", get(students::list_students))
        .route("/admin/student", post(students::add_student))
        .route("/admin/student/{id}", put(students::edit_student))
        .route("/admin/student/{id}", delete(students::delete_student))
        .route("/admin/repairs", get(repairs::admin_list))
        .route("/admin/repair/{id}", get(repairs::get_ticket))
        .route("/admin/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(
            Role::Admin,
            auth::require_role,
        ))
}

/// Submission bodies may carry an image up to `max_image_bytes` plus form fields.
fn student_router(max_image_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/student/profile", get(profile::get_profile))
        .route("/student/profile", put(profile::update_profile))
        .route("/student/repairs", get(repairs::student_list))
        .route(
            "/student/repair",
            post(repairs::submit).layer(DefaultBodyLimit::max(max_image_bytes + 64 * 1024)),
        )
        .route("/student/repair/{id}", delete(repairs::cancel))
        .route_layer(middleware::from_fn_with_state(
            Role::Student,
            auth::require_role,
        ))
}

fn staff_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/staff/repairs", get(repairs::staff_list))
        .route("/staff/repair/{id}", get(repairs::get_ticket))
        .route("/staff/repair/{id}/accept", post(repairs::accept))
        .route("/staff/repair/{id}/complete", post(repairs::complete))
        .route_layer(middleware::from_fn_with_state(
            Role::Staff,
            auth::require_role,
        ))
}
