pub mod credentials;
pub mod session;

use thiserror::Error;

use crate::api_client::ApiError;

pub use credentials::{CredentialStore, Credentials, CredentialsError, FileCredentialStore};
pub use session::{AuthService, AuthSession};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("Could not encode user: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Not logged in")]
    NotLoggedIn,
}
