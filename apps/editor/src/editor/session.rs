use crate::draft::{
    reduce, Edit, EditError, FieldErrors, FieldValue, RuleTable, Step, StepController,
    StepValidation,
};
use crate::models::{CvDraft, ListSection, ScalarSection, SectionItem};

/// Synchronous editing state of one open CV: the draft, the step cursor, the
/// current error map and the dirty flag.
///
/// `revision` counts applied edits so a save can tell whether the draft moved
/// on while its request was in flight.
#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    draft: CvDraft,
    steps: StepController,
    errors: FieldErrors,
    summary: Option<String>,
    dirty: bool,
    read_only: bool,
    revision: u64,
}

impl EditorSession {
    pub fn new(draft: CvDraft, read_only: bool) -> Self {
        Self {
            draft,
            read_only,
            ..Self::default()
        }
    }

    pub fn draft(&self) -> &CvDraft {
        &self.draft
    }

    pub fn current_step(&self) -> Step {
        self.steps.current()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Toast-level message from the last failed save gate.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether leaving now would lose edits.
    pub fn should_warn_before_leave(&self) -> bool {
        self.dirty && !self.read_only
    }

    /// Applies one edit. Returns `Ok(false)` when the session is read-only
    /// and the edit was ignored.
    pub fn apply(&mut self, edit: Edit) -> Result<bool, EditError> {
        if self.read_only {
            return Ok(false);
        }
        let path = edit.field_path();
        self.draft = reduce(&self.draft, edit)?;
        self.errors.remove(&path);
        self.dirty = true;
        self.revision += 1;
        Ok(true)
    }

    pub fn set_field(
        &mut self,
        section: ScalarSection,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<bool, EditError> {
        self.apply(Edit::set_field(section, field, value))
    }

    pub fn set_item_field(
        &mut self,
        section: ListSection,
        index: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Result<bool, EditError> {
        self.apply(Edit::set_item_field(section, index, field, value))
    }

    pub fn add_item(&mut self, item: SectionItem) -> Result<bool, EditError> {
        self.apply(Edit::add_item(item))
    }

    pub fn add_blank_item(&mut self, section: ListSection) -> Result<bool, EditError> {
        self.apply(Edit::add_blank_item(section))
    }

    pub fn delete_item(&mut self, section: ListSection, index: usize) -> Result<bool, EditError> {
        self.apply(Edit::delete_item(section, index))
    }

    /// Validates the current step and advances on success. The error map is
    /// replaced with this pass's result either way.
    pub fn next(&mut self, rules: &RuleTable) -> Result<Step, StepValidation> {
        let result = self.steps.next(rules, &self.draft);
        self.errors = match &result {
            Ok(_) => FieldErrors::new(),
            Err(failure) => failure.errors.clone(),
        };
        self.summary = None;
        result
    }

    pub fn prev(&mut self) -> Step {
        self.steps.prev()
    }

    pub fn jump_to(&mut self, n: u8) -> Option<Step> {
        self.steps.jump_to(n)
    }

    /// Runs the save gate over all steps. On failure the cursor moves to the
    /// first failing step and its errors and summary are surfaced.
    pub fn validate_for_save(&mut self, rules: &RuleTable) -> Result<(), StepValidation> {
        match self.steps.save_gate(rules, &self.draft) {
            Ok(()) => {
                self.errors = FieldErrors::new();
                self.summary = None;
                Ok(())
            }
            Err(failure) => {
                self.errors = failure.errors.clone();
                self.summary = Some(format!(
                    "Please complete all required fields in {}",
                    failure.step.title()
                ));
                Err(failure)
            }
        }
    }

    /// Takes in the server's view of the draft submitted at `submitted_revision`.
    ///
    /// If nothing was edited meanwhile the draft is replaced wholesale and
    /// becomes clean. Otherwise only the identity is adopted: local edits win
    /// and the draft stays dirty. Returns whether the draft is now clean.
    pub fn mark_saved(&mut self, saved: CvDraft, submitted_revision: u64) -> bool {
        if self.revision == submitted_revision {
            self.draft = saved;
            self.dirty = false;
            true
        } else {
            self.draft.id = saved.id;
            false
        }
    }
}
