//! Thin axum boundary over `chatcoach-coordinator` (spec §6.1-6.2, C9's HTTP
//! face). No business logic lives here: handlers validate nothing the
//! coordinator doesn't already validate, and every status code the API
//! returns is `CoordinatorError::status_code`'s pure mapping.

pub mod metrics;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
