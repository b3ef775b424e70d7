use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::api_client::AuthApi;
use crate::auth::credentials::{CredentialStore, Credentials};
use crate::auth::AuthError;
use crate::models::{LoginRequest, RegisterRequest, User};
use crate::routes;

/// Who is signed in. Logged in means a user object is present; a bare token
/// (as left by social login) is attached to requests but is not a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSession {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl AuthSession {
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    fn credentials(&self) -> Credentials {
        Credentials {
            token: self.token.clone(),
            user: self.user.clone(),
        }
    }
}

impl From<Credentials> for AuthSession {
    fn from(credentials: Credentials) -> Self {
        Self {
            user: credentials.user,
            token: credentials.token,
        }
    }
}

/// Login, registration and logout, keeping the API client's bearer token and
/// the credentials store in step with the in-memory session.
pub struct AuthService {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn CredentialStore>,
    session: AuthSession,
}

impl AuthService {
    /// Restores the stored session. Unreadable credentials are discarded with
    /// a warning and the service starts signed out.
    pub fn restore(api: Arc<dyn AuthApi>, store: Arc<dyn CredentialStore>) -> Self {
        let session = match store.load() {
            Ok(credentials) => AuthSession::from(credentials),
            Err(e) => {
                warn!("Ignoring stored credentials: {e}");
                if let Err(e) = store.clear() {
                    warn!("Could not clear stored credentials: {e}");
                }
                AuthSession::default()
            }
        };
        api.set_token(session.token.clone());
        if let Some(user) = &session.user {
            info!("Restored session for {}", user.username);
        }
        Self {
            api,
            store,
            session,
        }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<&User, AuthError> {
        let request = LoginRequest {
            identifier: identifier.to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&request).await?;
        info!("Logged in as {}", response.user.username);
        self.establish(response.token, response.user)
    }

    pub async fn register(&mut self, request: RegisterRequest) -> Result<&User, AuthError> {
        let response = self.api.register(&request).await?;
        info!("Registered {}", response.user.username);
        self.establish(response.token, response.user)
    }

    fn establish(&mut self, token: String, user: User) -> Result<&User, AuthError> {
        let session = AuthSession {
            user: Some(user),
            token: Some(token),
        };
        self.store.save(&session.credentials())?;
        self.api.set_token(session.token.clone());
        self.session = session;
        self.session.user.as_ref().ok_or(AuthError::NotLoggedIn)
    }

    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.store.clear()?;
        self.api.set_token(None);
        self.session = AuthSession::default();
        info!("Logged out");
        Ok(())
    }

    /// Shallow-merges `fields` (wire names) into the stored user.
    pub fn update_user(&mut self, fields: Map<String, Value>) -> Result<&User, AuthError> {
        let current = self.session.user.clone().unwrap_or_default();
        let mut merged = match serde_json::to_value(current)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merged.extend(fields);
        let user: User = serde_json::from_value(Value::Object(merged))?;

        let mut session = self.session.clone();
        session.user = Some(user);
        self.store.save(&session.credentials())?;
        self.session = session;
        self.session.user.as_ref().ok_or(AuthError::NotLoggedIn)
    }

    /// Handles the social-login return query. A `token` is stored and attached
    /// to the client; returns the route to continue to.
    pub fn social_login_callback(
        &mut self,
        query: &HashMap<String, String>,
    ) -> Result<&'static str, AuthError> {
        let Some(token) = query.get("token").filter(|t| !t.trim().is_empty()) else {
            warn!("Social login returned without a token");
            return Ok(routes::HOME);
        };
        let mut session = self.session.clone();
        session.token = Some(token.clone());
        self.store.save(&session.credentials())?;
        self.api.set_token(session.token.clone());
        self.session = session;
        info!("Social login token stored");
        Ok(routes::DASHBOARD)
    }
}
