//! Shared fixtures and in-memory fakes of the API traits.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use tokio::sync::Notify;

use crate::api_client::{ApiError, AuthApi, CvApi, CvPayload};
use crate::draft::normalize;
use crate::models::{
    AuthResponse, BasicInfo, CvDraft, CvId, Education, Experience, ImageSource, ImageUpload,
    LoginRequest, Project, RegisterRequest, Skill, SocialProfile, User,
};
use crate::payment::{CheckoutSession, PaidAction};

/// A draft that passes every step's rules.
pub fn complete_draft() -> CvDraft {
    CvDraft {
        basic: BasicInfo {
            name: "Priya Sharma".to_string(),
            email: "priya@example.com".to_string(),
            phone: "9876543210".to_string(),
            city: "Bengaluru".to_string(),
            image: ImageSource::Url("https://cdn.test/priya.png".to_string()),
            image_url: "https://cdn.test/priya.png".to_string(),
            ..Default::default()
        },
        education: vec![Education {
            degree: "B.E. Computer Science".to_string(),
            institution: "RV College".to_string(),
            percentage: "86".to_string(),
            ..Default::default()
        }],
        experience: vec![Experience {
            organization: "Acme".to_string(),
            position: "Backend Engineer".to_string(),
            joining_date: "2021-07-01".to_string(),
            technologies: "Rust, Postgres".to_string(),
            ..Default::default()
        }],
        projects: vec![Project {
            title: "Ledger".to_string(),
            team_size: "3".to_string(),
            description: "Double-entry bookkeeping service".to_string(),
            ..Default::default()
        }],
        skills: vec![Skill {
            name: "Rust".to_string(),
            percentage: "85".to_string(),
            ..Default::default()
        }],
        social: vec![SocialProfile {
            platform: "GitHub".to_string(),
            link: "https://github.com/priya".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn png_upload() -> ImageSource {
    ImageSource::Upload(ImageUpload {
        file_name: "avatar.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory CV backend. Records every call as a short string, can fail the
/// next call, and can hold create/update calls until released. Without a
/// page size the list endpoint ignores `page` and returns everything.
pub struct FakeCvApi {
    records: Mutex<Vec<CvDraft>>,
    calls: Mutex<Vec<String>>,
    next_id: Mutex<u64>,
    fail_next: Mutex<Option<String>>,
    save_gate: Mutex<Option<Arc<Notify>>>,
    page_size: Option<usize>,
}

impl FakeCvApi {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
            fail_next: Mutex::new(None),
            save_gate: Mutex::new(None),
            page_size: Some(10),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn unpaged(mut self) -> Self {
        self.page_size = None;
        self
    }

    /// Seeds a record directly, without logging a call.
    pub fn insert(&self, mut cv: CvDraft) -> CvId {
        let id = self.assign_id();
        cv.id = Some(id.clone());
        lock(&self.records).push(cv);
        id
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn fail_next(&self, message: &str) {
        *lock(&self.fail_next) = Some(message.to_string());
    }

    /// Makes every create/update wait for one `notify_one` on the returned handle.
    pub fn hold_saves(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.save_gate) = Some(gate.clone());
        gate
    }

    fn assign_id(&self) -> CvId {
        let mut next = lock(&self.next_id);
        *next += 1;
        CvId::new(format!("{:024x}", 0x65f0_0000_0000_u64 + *next)).unwrap()
    }

    fn record_call(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        match lock(&self.fail_next).take() {
            Some(message) => Err(ApiError::Api {
                status: 500,
                message,
            }),
            None => Ok(()),
        }
    }

    async fn wait_for_gate(&self) {
        let gate = lock(&self.save_gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn find(&self, id: &CvId) -> Result<CvDraft, ApiError> {
        lock(&self.records)
            .iter()
            .find(|cv| cv.id.as_ref() == Some(id))
            .cloned()
            .ok_or_else(not_found)
    }

    /// Rebuilds a record from multipart sections the way the backend does:
    /// an uploaded image becomes a stored url, otherwise `imageUrl` is kept.
    fn record_from(payload: &CvPayload, id: &CvId) -> Result<CvDraft, ApiError> {
        let mut record = Map::new();
        for (name, json) in payload.sections() {
            record.insert(name.to_string(), serde_json::from_str(json)?);
        }
        let image_url = match payload.image() {
            Some(upload) => Some(format!("https://cdn.test/{}", upload.file_name)),
            None => record
                .get("basic")
                .and_then(|basic| basic.get("imageUrl"))
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
        };
        if let (Some(url), Some(Value::Object(basic))) = (image_url, record.get_mut("basic")) {
            basic.insert("image".to_string(), Value::String(url.clone()));
            basic.insert("imageUrl".to_string(), Value::String(url));
        }
        record.insert("_id".to_string(), Value::String(id.to_string()));
        Ok(normalize(&Value::Object(record)))
    }
}

fn not_found() -> ApiError {
    ApiError::Api {
        status: 404,
        message: "CV not found".to_string(),
    }
}

#[async_trait]
impl CvApi for FakeCvApi {
    async fn list_cvs(&self, page: u32) -> Result<Vec<CvDraft>, ApiError> {
        self.record_call(format!("list {page}"));
        self.check_failure()?;
        let records = lock(&self.records);
        let Some(page_size) = self.page_size else {
            return Ok(records.clone());
        };
        let start = (page.max(1) as usize - 1) * page_size;
        Ok(records.iter().skip(start).take(page_size).cloned().collect())
    }

    async fn get_cv(&self, id: &CvId) -> Result<CvDraft, ApiError> {
        self.record_call(format!("get {id}"));
        self.check_failure()?;
        self.find(id)
    }

    async fn create_cv(&self, payload: CvPayload) -> Result<CvDraft, ApiError> {
        self.record_call("create".to_string());
        self.wait_for_gate().await;
        self.check_failure()?;
        let id = self.assign_id();
        let record = Self::record_from(&payload, &id)?;
        lock(&self.records).push(record.clone());
        Ok(record)
    }

    async fn update_cv(&self, id: &CvId, payload: CvPayload) -> Result<CvDraft, ApiError> {
        self.record_call(format!("update {id}"));
        self.wait_for_gate().await;
        self.check_failure()?;
        let record = Self::record_from(&payload, id)?;
        let mut records = lock(&self.records);
        let slot = records
            .iter_mut()
            .find(|cv| cv.id.as_ref() == Some(id))
            .ok_or_else(not_found)?;
        *slot = record.clone();
        Ok(record)
    }

    async fn delete_cv(&self, id: &CvId) -> Result<(), ApiError> {
        self.record_call(format!("delete {id}"));
        self.check_failure()?;
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|cv| cv.id.as_ref() != Some(id));
        if records.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn share_link(&self, id: &CvId) -> Result<String, ApiError> {
        self.record_call(format!("share {id}"));
        self.check_failure()?;
        self.find(id)?;
        Ok(format!("https://cv.test/share/{id}"))
    }

    async fn download_pdf(&self, id: &CvId) -> Result<Bytes, ApiError> {
        self.record_call(format!("download {id}"));
        self.check_failure()?;
        self.find(id)?;
        Ok(Bytes::from_static(b"%PDF-1.4 fake"))
    }

    async fn create_checkout_session(
        &self,
        id: &CvId,
        action: PaidAction,
    ) -> Result<CheckoutSession, ApiError> {
        self.record_call(format!("checkout {id} {action}"));
        self.check_failure()?;
        Ok(CheckoutSession {
            url: format!("https://checkout.test/{id}/{action}"),
        })
    }
}

/// In-memory auth backend: accepts one password, remembers the last token set.
pub struct FakeAuthApi {
    password: String,
    token: Mutex<Option<String>>,
    fail_next: Mutex<Option<String>>,
}

impl FakeAuthApi {
    pub fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            token: Mutex::new(None),
            fail_next: Mutex::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    pub fn fail_next(&self, message: &str) {
        *lock(&self.fail_next) = Some(message.to_string());
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        match lock(&self.fail_next).take() {
            Some(message) => Err(ApiError::Api {
                status: 400,
                message,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.check_failure()?;
        if request.password != self.password {
            return Err(ApiError::Unauthorized);
        }
        Ok(AuthResponse {
            token: format!("token-{}", request.identifier),
            user: User {
                id: Some("u1".to_string()),
                username: request.identifier.clone(),
                email: format!("{}@example.com", request.identifier),
                ..Default::default()
            },
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.check_failure()?;
        Ok(AuthResponse {
            token: format!("token-{}", request.username),
            user: User {
                id: Some("u2".to_string()),
                username: request.username.clone(),
                email: request.email.clone(),
                ..Default::default()
            },
        })
    }

    fn set_token(&self, token: Option<String>) {
        *lock(&self.token) = token;
    }
}
