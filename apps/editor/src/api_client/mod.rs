/// API client: the only place that talks HTTP to the CV backend.
///
/// Everything above this module goes through the `CvApi` and `AuthApi`
/// traits, so the editor and dashboard run the same against the real server
/// and against in-memory fakes.
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{AuthResponse, CvDraft, CvId, LoginRequest, RegisterRequest};
use crate::payment::{CheckoutSession, PaidAction};

pub mod payload;

pub use payload::CvPayload;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Server response carried no CV id")]
    MissingId,
}

impl ApiError {
    /// One line suitable for a toast; internals go to the log instead.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            ApiError::Api { status, .. } => format!("Request failed (status {status})"),
            ApiError::Unauthorized => "Please log in again".to_string(),
            ApiError::Http(e) => {
                warn!("Transport error: {e}");
                "Network error, please try again".to_string()
            }
            ApiError::Parse(e) => {
                warn!("Unreadable server response: {e}");
                "Unexpected response from server".to_string()
            }
            ApiError::MissingId => "Save failed".to_string(),
        }
    }
}

#[async_trait]
pub trait CvApi: Send + Sync {
    async fn list_cvs(&self, page: u32) -> Result<Vec<CvDraft>, ApiError>;
    async fn get_cv(&self, id: &CvId) -> Result<CvDraft, ApiError>;
    async fn create_cv(&self, payload: CvPayload) -> Result<CvDraft, ApiError>;
    async fn update_cv(&self, id: &CvId, payload: CvPayload) -> Result<CvDraft, ApiError>;
    async fn delete_cv(&self, id: &CvId) -> Result<(), ApiError>;
    async fn share_link(&self, id: &CvId) -> Result<String, ApiError>;
    async fn download_pdf(&self, id: &CvId) -> Result<Bytes, ApiError>;
    async fn create_checkout_session(
        &self,
        id: &CvId,
        action: PaidAction,
    ) -> Result<CheckoutSession, ApiError>;
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;
    /// Installs (or clears) the bearer token used on every later call.
    fn set_token(&self, token: Option<String>);
}

#[derive(Debug, Default, Deserialize)]
struct RemoteError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CvListResponse {
    Bare(Vec<CvDraft>),
    Cvs { cvs: Vec<CvDraft> },
    Data { data: Vec<CvDraft> },
}

impl CvListResponse {
    fn into_records(self) -> Vec<CvDraft> {
        match self {
            CvListResponse::Bare(records)
            | CvListResponse::Cvs { cvs: records }
            | CvListResponse::Data { data: records } => records,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShareLinkResponse {
    link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest<'a> {
    cv_id: &'a str,
    action: PaidAction,
}

/// reqwest-backed client for the CV backend. Cheap to clone; clones share
/// the bearer token.
#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        let token = self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends the request and turns every non-success status into an `ApiError`.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("API rejected the bearer token");
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RemoteError>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            warn!("API returned {}: {}", status, message);
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(builder).await?.text().await?;
        serde_json::from_str(&body).map_err(ApiError::Parse)
    }
}

#[async_trait]
impl CvApi for HttpApiClient {
    async fn list_cvs(&self, page: u32) -> Result<Vec<CvDraft>, ApiError> {
        let request = self.request(Method::GET, "/cv").query(&[("page", page)]);
        let records = self
            .send_json::<CvListResponse>(request)
            .await?
            .into_records();
        debug!("Fetched {} CVs on page {}", records.len(), page);
        Ok(records)
    }

    async fn get_cv(&self, id: &CvId) -> Result<CvDraft, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/cv/{id}")))
            .await
    }

    async fn create_cv(&self, payload: CvPayload) -> Result<CvDraft, ApiError> {
        let request = self.request(Method::POST, "/cv").multipart(payload.into_form()?);
        self.send_json(request).await
    }

    async fn update_cv(&self, id: &CvId, payload: CvPayload) -> Result<CvDraft, ApiError> {
        let request = self
            .request(Method::PUT, &format!("/cv/{id}"))
            .multipart(payload.into_form()?);
        self.send_json(request).await
    }

    async fn delete_cv(&self, id: &CvId) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, &format!("/cv/{id}")))
            .await?;
        Ok(())
    }

    async fn share_link(&self, id: &CvId) -> Result<String, ApiError> {
        let response: ShareLinkResponse = self
            .send_json(self.request(Method::GET, &format!("/cv/{id}/share")))
            .await?;
        Ok(response.link)
    }

    async fn download_pdf(&self, id: &CvId) -> Result<Bytes, ApiError> {
        let response = self
            .send(self.request(Method::GET, &format!("/cv/{id}/download")))
            .await?;
        Ok(response.bytes().await?)
    }

    async fn create_checkout_session(
        &self,
        id: &CvId,
        action: PaidAction,
    ) -> Result<CheckoutSession, ApiError> {
        let request = self
            .request(Method::POST, "/payment/create-checkout-session")
            .json(&CheckoutRequest {
                cv_id: id.as_str(),
                action,
            });
        self.send_json(request).await
    }
}

#[async_trait]
impl AuthApi for HttpApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.send_json(self.request(Method::POST, "/auth/login").json(request))
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.send_json(self.request(Method::POST, "/auth/register").json(request))
            .await
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}
