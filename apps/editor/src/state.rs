use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{CvDraft, CvId};

/// Client-side CV store shared by the editor and the dashboard.
#[derive(Debug, Default)]
pub struct CvStore {
    current: Option<CvDraft>,
    saved: Vec<CvDraft>,
}

/// Cloneable handle to the shared `CvStore`. Locks are held only for the
/// duration of a single call.
#[derive(Debug, Clone, Default)]
pub struct StoreHandle {
    inner: Arc<Mutex<CvStore>>,
}

impl StoreHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CvStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<CvDraft> {
        self.lock().current.clone()
    }

    pub fn current_id(&self) -> Option<CvId> {
        self.lock().current.as_ref().and_then(|cv| cv.id.clone())
    }

    pub fn set_current(&self, cv: CvDraft) {
        self.lock().current = Some(cv);
    }

    pub fn reset_current(&self) {
        self.lock().current = None;
    }

    pub fn saved(&self) -> Vec<CvDraft> {
        self.lock().saved.clone()
    }

    pub fn saved_len(&self) -> usize {
        self.lock().saved.len()
    }

    pub fn set_saved(&self, cvs: Vec<CvDraft>) {
        self.lock().saved = cvs;
    }

    /// Merges a page of records into the saved collection, replacing by id.
    /// Returns how many records were new.
    pub fn upsert_saved(&self, cvs: Vec<CvDraft>) -> usize {
        let mut store = self.lock();
        cvs.into_iter()
            .map(|cv| store.upsert(cv))
            .filter(|added| *added)
            .count()
    }

    /// Reconciles a server-confirmed record: it becomes the current CV and
    /// replaces its namesake in the saved collection (or is appended).
    /// Applying the same record twice leaves the store unchanged.
    pub fn save_cv(&self, cv: CvDraft) {
        let mut store = self.lock();
        store.upsert(cv.clone());
        store.current = Some(cv);
    }

    /// Drops a record from the saved collection, and from the current slot
    /// if it is there.
    pub fn remove(&self, id: &CvId) -> bool {
        let mut store = self.lock();
        let before = store.saved.len();
        store.saved.retain(|cv| cv.id.as_ref() != Some(id));
        if store.current.as_ref().and_then(|cv| cv.id.as_ref()) == Some(id) {
            store.current = None;
        }
        store.saved.len() != before
    }
}

impl CvStore {
    /// Returns true when the record was appended rather than replaced.
    /// Records without an id never enter the saved collection.
    fn upsert(&mut self, cv: CvDraft) -> bool {
        let Some(id) = cv.id.clone() else {
            return false;
        };
        match self
            .saved
            .iter_mut()
            .find(|existing| existing.id.as_ref() == Some(&id))
        {
            Some(existing) => {
                *existing = cv;
                false
            }
            None => {
                self.saved.push(cv);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::complete_draft;

    fn record(id: &str, name: &str) -> CvDraft {
        let mut cv = complete_draft();
        cv.id = CvId::new(id);
        cv.basic.name = name.to_string();
        cv
    }

    #[test]
    fn test_save_cv_is_idempotent() {
        let store = StoreHandle::new();
        let cv = record("aaaaaaaaaaaaaaaaaaaaaaaa", "First");

        store.save_cv(cv.clone());
        store.save_cv(cv.clone());

        assert_eq!(store.saved(), vec![cv.clone()]);
        assert_eq!(store.current(), Some(cv));
    }

    #[test]
    fn test_save_cv_replaces_by_id_and_keeps_order() {
        let store = StoreHandle::new();
        store.set_saved(vec![
            record("aaaaaaaaaaaaaaaaaaaaaaaa", "A"),
            record("bbbbbbbbbbbbbbbbbbbbbbbb", "B"),
        ]);

        store.save_cv(record("aaaaaaaaaaaaaaaaaaaaaaaa", "A2"));
        let names: Vec<_> = store.saved().iter().map(|cv| cv.basic.name.clone()).collect();
        assert_eq!(names, ["A2", "B"]);
    }

    #[test]
    fn test_upsert_saved_counts_only_new_records() {
        let store = StoreHandle::new();
        assert_eq!(
            store.upsert_saved(vec![
                record("aaaaaaaaaaaaaaaaaaaaaaaa", "A"),
                record("bbbbbbbbbbbbbbbbbbbbbbbb", "B"),
            ]),
            2
        );
        assert_eq!(
            store.upsert_saved(vec![
                record("bbbbbbbbbbbbbbbbbbbbbbbb", "B2"),
                record("cccccccccccccccccccccccc", "C"),
            ]),
            1
        );
        assert_eq!(store.saved_len(), 3);
        assert_eq!(store.upsert_saved(vec![CvDraft::default()]), 0);
        assert_eq!(store.saved_len(), 3);
    }

    #[test]
    fn test_remove_clears_current_slot() {
        let store = StoreHandle::new();
        let cv = record("aaaaaaaaaaaaaaaaaaaaaaaa", "A");
        store.save_cv(cv.clone());

        assert!(store.remove(cv.id.as_ref().unwrap()));
        assert!(store.saved().is_empty());
        assert!(store.current().is_none());
        assert!(!store.remove(cv.id.as_ref().unwrap()));
    }

    #[test]
    fn test_handles_share_state() {
        let store = StoreHandle::new();
        let other = store.clone();
        other.set_current(record("aaaaaaaaaaaaaaaaaaaaaaaa", "A"));
        assert_eq!(store.current_id(), CvId::new("aaaaaaaaaaaaaaaaaaaaaaaa"));
        store.reset_current();
        assert!(other.current().is_none());
    }
}
