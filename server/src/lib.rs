//! HTTP service for the care ward: patients, care tasks and notifications.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

use axum::{
    routing::{get, put},
    Router,
};
use care_core::Classifier;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use store::CareStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CareStore>,
    /// Decides what "today" means; the process's local zone.
    pub classifier: Classifier,
}

impl AppState {
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        Self {
            store,
            classifier: Classifier::local(),
        }
    }

    /// Today's date in the ward's time zone.
    pub fn today(&self) -> NaiveDate {
        self.classifier.today(Utc::now())
    }
}

pub fn app(state: AppState) -> Router {
    use handlers::{health, notifications, patients, todos};

    Router::new()
        .route("/health", get(health::health_check))
        // Patients
        .route(
            "/patients",
            get(patients::list_patients).post(patients::create_patient),
        )
        .route("/patients/statistics", get(patients::patient_statistics))
        .route(
            "/patients/:id",
            get(patients::get_patient)
                .put(patients::update_patient)
                .delete(patients::delete_patient),
        )
        // Todos
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/overdue", get(todos::overdue_todos))
        .route("/todos/today", get(todos::todays_todos))
        .route("/todos/upcoming", get(todos::upcoming_todos))
        .route(
            "/todos/:id",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
        .route(
            "/todos/:id/notification-sent",
            put(todos::mark_notification_sent),
        )
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/:id/read", put(notifications::mark_read))
        .route(
            "/notifications/:id",
            axum::routing::delete(notifications::delete_notification),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
