//! Axum handlers. Each one validates through `care_core`, calls the store and
//! maps failures to [`crate::error::ApiError`].

pub mod health;
pub mod notifications;
pub mod patients;
pub mod todos;

use axum::http::{header, HeaderName};
use uuid::Uuid;

/// `Location` header for a freshly created resource.
fn location(collection: &str, id: Uuid) -> [(HeaderName, String); 1] {
    [(header::LOCATION, format!("/{collection}/{id}"))]
}
