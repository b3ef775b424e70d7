//! Headless core of the CV builder: the draft model, the stepped editor and
//! its persistence against the CV backend.

pub mod api_client;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod draft;
pub mod editor;
pub mod errors;
pub mod models;
pub mod payment;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use api_client::{ApiError, AuthApi, CvApi, HttpApiClient};
pub use dashboard::Dashboard;
pub use editor::{Editor, EditorSession};
pub use errors::EditorError;
pub use state::StoreHandle;
