use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api_client::{ApiError, CvApi};
use crate::models::{CvDraft, CvId};
use crate::payment::{self, PaidAction, PaidActionOutcome};
use crate::state::StoreHandle;

/// The saved-CV listing: paged loading into the shared store, deletion and
/// paid actions on already-saved CVs.
pub struct Dashboard {
    api: Arc<dyn CvApi>,
    store: StoreHandle,
    next_page: u32,
    has_more: bool,
    // ids returned since the last restart
    seen: HashSet<CvId>,
}

impl Dashboard {
    pub fn new(api: Arc<dyn CvApi>, store: StoreHandle) -> Self {
        Self {
            api,
            store,
            next_page: 1,
            has_more: true,
            seen: HashSet::new(),
        }
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn cvs(&self) -> Vec<CvDraft> {
        self.store.saved()
    }

    /// Fetches the next page into the store. Paging ends on an empty page or
    /// on a page holding nothing but ids already fetched since the last
    /// restart, which is what a backend that ignores `page` sends back.
    /// Returns how many records were new to the store.
    pub async fn load_next_page(&mut self) -> Result<usize, ApiError> {
        if !self.has_more {
            return Ok(0);
        }
        let page = self.api.list_cvs(self.next_page).await?;
        if page.is_empty() {
            debug!("Page {} is empty; no more CVs", self.next_page);
            self.has_more = false;
            return Ok(0);
        }
        let fetched = page.len();
        let unseen = page
            .iter()
            .filter_map(|cv| cv.id.clone())
            .filter(|id| self.seen.insert(id.clone()))
            .count();
        let added = self.store.upsert_saved(page);
        if unseen == 0 {
            debug!("Page {} repeats earlier CVs; no more CVs", self.next_page);
            self.has_more = false;
            return Ok(added);
        }
        info!(
            "Loaded page {}: {} CVs ({} new)",
            self.next_page, fetched, added
        );
        self.next_page += 1;
        Ok(added)
    }

    /// Loads pages until paging ends. Returns the total added.
    pub async fn load_all(&mut self) -> Result<usize, ApiError> {
        let mut total = 0;
        while self.has_more {
            total += self.load_next_page().await?;
        }
        Ok(total)
    }

    /// Starts over from page 1; already-loaded records stay until replaced.
    pub fn restart(&mut self) {
        self.next_page = 1;
        self.has_more = true;
        self.seen.clear();
    }

    pub async fn delete_cv(&self, id: &CvId) -> Result<(), ApiError> {
        self.api.delete_cv(id).await?;
        self.store.remove(id);
        info!("Deleted CV {}", id);
        Ok(())
    }

    pub async fn paid_action(
        &self,
        id: &CvId,
        action: PaidAction,
    ) -> Result<PaidActionOutcome, ApiError> {
        payment::request_action(self.api.as_ref(), id, action).await
    }
}
