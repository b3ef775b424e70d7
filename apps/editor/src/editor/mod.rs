//! The editor: one open CV, its editing session and the persistence
//! coordinator that saves it.
//!
//! Session state sits behind a short-lived mutex that is never held across
//! an `.await`, so edits and reads interleave freely with an in-flight save.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::api_client::{ApiError, CvApi, CvPayload};
use crate::draft::{Edit, FieldErrors, RuleTable, Step, StepValidation};
use crate::errors::EditorError;
use crate::models::{CvDraft, CvId};
use crate::payment::{self, PaidAction, PaidActionOutcome};
use crate::routes::EditorRoute;
use crate::state::StoreHandle;

pub mod session;

pub use session::EditorSession;

pub struct Editor {
    api: Arc<dyn CvApi>,
    store: StoreHandle,
    rules: &'static RuleTable,
    session: Mutex<EditorSession>,
    saving: AtomicBool,
}

/// Clears the in-flight flag however the save ends.
struct SaveGuard<'a>(&'a AtomicBool);

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Editor {
    /// Editor over an already-built draft.
    pub fn new(api: Arc<dyn CvApi>, store: StoreHandle, draft: CvDraft, read_only: bool) -> Self {
        Self {
            api,
            store,
            rules: RuleTable::standard(),
            session: Mutex::new(EditorSession::new(draft, read_only)),
            saving: AtomicBool::new(false),
        }
    }

    /// Opens the editor for a route.
    ///
    /// Without an id the store's current slot is reset and an empty draft is
    /// created. With an id the store's current CV is reused when it already
    /// has that id; otherwise the record is fetched and reconciled into the
    /// store. A failed fetch is an error, except in read-only mode where an
    /// empty draft is shown instead.
    pub async fn open(
        api: Arc<dyn CvApi>,
        store: StoreHandle,
        route: EditorRoute,
    ) -> Result<Self, EditorError> {
        let Some(id) = route.id else {
            info!("Opening editor for a new CV");
            store.reset_current();
            return Ok(Self::new(api, store, CvDraft::default(), route.read_only));
        };

        if let Some(current) = store.current().filter(|cv| cv.id.as_ref() == Some(&id)) {
            debug!("CV {} already loaded; skipping fetch", id);
            return Ok(Self::new(api, store, current, route.read_only));
        }

        info!("Fetching CV {} (read_only={})", id, route.read_only);
        match api.get_cv(&id).await {
            Ok(cv) => {
                store.save_cv(cv.clone());
                Ok(Self::new(api, store, cv, route.read_only))
            }
            Err(e) if route.read_only => {
                warn!("Could not load CV {} for viewing: {}", id, e);
                Ok(Self::new(api, store, CvDraft::default(), true))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EditorSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the session under the lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&EditorSession) -> R) -> R {
        f(&self.lock())
    }

    pub fn draft(&self) -> CvDraft {
        self.lock().draft().clone()
    }

    pub fn current_step(&self) -> Step {
        self.lock().current_step()
    }

    pub fn errors(&self) -> FieldErrors {
        self.lock().errors().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().is_dirty()
    }

    pub fn is_read_only(&self) -> bool {
        self.lock().is_read_only()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    pub fn should_warn_before_leave(&self) -> bool {
        self.lock().should_warn_before_leave()
    }

    /// Applies one edit; `Ok(false)` means a read-only session ignored it.
    pub fn apply(&self, edit: Edit) -> Result<bool, EditorError> {
        Ok(self.lock().apply(edit)?)
    }

    pub fn next(&self) -> Result<Step, StepValidation> {
        self.lock().next(self.rules)
    }

    pub fn prev(&self) -> Step {
        self.lock().prev()
    }

    pub fn jump_to(&self, n: u8) -> Option<Step> {
        self.lock().jump_to(n)
    }

    /// Validates every step, then creates or updates the CV on the server.
    ///
    /// A well-formed id takes the update path; anything else creates and the
    /// returned id is adopted for later saves. On success the response is
    /// reconciled into the store and, unless the draft was edited meanwhile,
    /// replaces the draft and clears the dirty flag. On failure nothing
    /// local changes.
    pub async fn save(&self) -> Result<CvDraft, EditorError> {
        if self.saving.swap(true, Ordering::AcqRel) {
            return Err(EditorError::SaveInProgress);
        }
        let _guard = SaveGuard(&self.saving);

        let (draft, revision) = {
            let mut session = self.lock();
            if session.is_read_only() {
                return Err(EditorError::ReadOnly);
            }
            if let Err(failure) = session.validate_for_save(self.rules) {
                return Err(EditorError::Validation {
                    step: failure.step,
                    errors: failure.errors,
                });
            }
            (session.draft().clone(), session.revision())
        };

        let payload = CvPayload::from_draft(&draft)?;
        let saved = match draft.id.as_ref().filter(|id| id.is_well_formed()) {
            Some(id) => {
                info!("Updating CV {}", id);
                let mut saved = self.api.update_cv(id, payload).await.map_err(|e| {
                    warn!("Update of CV {} failed: {}", id, e);
                    e
                })?;
                if saved.id.is_none() {
                    saved.id = Some(id.clone());
                }
                saved
            }
            None => {
                info!("Creating CV");
                let saved = self.api.create_cv(payload).await.map_err(|e| {
                    warn!("Create failed: {}", e);
                    e
                })?;
                if saved.id.is_none() {
                    warn!("Create response carried no id");
                    return Err(ApiError::MissingId.into());
                }
                saved
            }
        };

        self.store.save_cv(saved.clone());
        let clean = self.lock().mark_saved(saved.clone(), revision);
        if clean {
            info!("Saved CV {}", display_id(&saved.id));
        } else {
            info!("Saved CV {}; newer local edits kept", display_id(&saved.id));
        }
        Ok(saved)
    }

    /// Requests a paid action. A draft with no server identity is saved
    /// first (validation gate included); any id the server handed out is
    /// used as-is.
    pub async fn request_paid_action(
        &self,
        action: PaidAction,
    ) -> Result<PaidActionOutcome, EditorError> {
        let (id, read_only) = {
            let session = self.lock();
            (session.draft().id.clone(), session.is_read_only())
        };

        let id = match id {
            Some(id) => id,
            None if read_only => return Err(EditorError::ReadOnly),
            None => self.save().await?.id.ok_or(ApiError::MissingId)?,
        };

        Ok(payment::request_action(self.api.as_ref(), &id, action).await?)
    }
}

fn display_id(id: &Option<CvId>) -> &str {
    id.as_ref().map(CvId::as_str).unwrap_or("<none>")
}
