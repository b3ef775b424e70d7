use std::fmt;

use crate::draft::validation::{RuleTable, StepValidation};
use crate::models::CvDraft;

/// The six wizard steps, one per CV section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    #[default]
    Basic = 1,
    Education = 2,
    Experience = 3,
    Projects = 4,
    Skills = 5,
    Social = 6,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Basic,
        Step::Education,
        Step::Experience,
        Step::Projects,
        Step::Skills,
        Step::Social,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Step> {
        let index = usize::from(n).checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    /// The following step, saturating at the last one.
    pub fn next(self) -> Step {
        Step::from_number(self.number() + 1).unwrap_or(self)
    }

    /// The preceding step, saturating at the first one.
    pub fn prev(self) -> Step {
        Step::from_number(self.number() - 1).unwrap_or(self)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Basic => "Basic Details",
            Step::Education => "Education",
            Step::Experience => "Experience",
            Step::Projects => "Projects",
            Step::Skills => "Skills",
            Step::Social => "Social Profiles",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Wizard cursor. Always within `[Step::Basic, Step::Social]`.
///
/// `next` is gated on validation of the current step; `prev` and `jump_to`
/// are not. Direct step-indicator navigation skipping validation is the
/// product's current behaviour and is kept on purpose.
#[derive(Debug, Clone, Default)]
pub struct StepController {
    current: Step,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Step {
        self.current
    }

    /// Advances when the current step validates; otherwise stays put and
    /// hands back the failing validation.
    pub fn next(&mut self, rules: &RuleTable, draft: &CvDraft) -> Result<Step, StepValidation> {
        let result = rules.validate_step(self.current, draft);
        if !result.is_valid() {
            return Err(result);
        }
        self.current = self.current.next();
        Ok(self.current)
    }

    pub fn prev(&mut self) -> Step {
        self.current = self.current.prev();
        self.current
    }

    /// Moves straight to step `n`. Out-of-range requests are ignored and
    /// return `None`.
    pub fn jump_to(&mut self, n: u8) -> Option<Step> {
        let step = Step::from_number(n)?;
        self.current = step;
        Some(step)
    }

    /// Validates all steps in order; on the first failure moves the cursor
    /// there and returns that step's errors.
    pub fn save_gate(&mut self, rules: &RuleTable, draft: &CvDraft) -> Result<(), StepValidation> {
        match rules.first_failure(draft) {
            Some(failure) => {
                self.current = failure.step;
                Err(failure)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::complete_draft;

    #[test]
    fn test_step_numbers_round_trip() {
        for step in Step::ALL {
            assert_eq!(Step::from_number(step.number()), Some(step));
        }
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::from_number(7), None);
    }

    #[test]
    fn test_cursor_never_leaves_bounds() {
        let rules = RuleTable::standard();
        let draft = complete_draft();

        // Every next/prev sequence of length 9 starting from step 1.
        for mask in 0u32..(1 << 9) {
            let mut controller = StepController::new();
            for bit in 0..9 {
                let step = if mask & (1 << bit) != 0 {
                    controller.next(rules, &draft).unwrap()
                } else {
                    controller.prev()
                };
                assert!((1..=6).contains(&step.number()));
            }
        }
    }

    #[test]
    fn test_next_is_gated_by_validation() {
        let rules = RuleTable::standard();
        let mut draft = complete_draft();
        draft.basic.email = "not-an-email".to_string();

        let mut controller = StepController::new();
        let failure = controller.next(rules, &draft).unwrap_err();
        assert_eq!(controller.current(), Step::Basic);
        assert_eq!(failure.errors.get("basic.email"), Some("Invalid email format"));
    }

    #[test]
    fn test_next_saturates_at_last_step() {
        let rules = RuleTable::standard();
        let draft = complete_draft();
        let mut controller = StepController::new();
        controller.jump_to(6);
        assert_eq!(controller.next(rules, &draft).unwrap(), Step::Social);
    }

    #[test]
    fn test_prev_is_never_gated() {
        let mut controller = StepController::new();
        controller.jump_to(3);
        assert_eq!(controller.prev(), Step::Education);
        assert_eq!(controller.prev(), Step::Basic);
        assert_eq!(controller.prev(), Step::Basic);
    }

    #[test]
    fn test_jump_skips_validation_but_respects_range() {
        let mut controller = StepController::new();
        assert_eq!(controller.jump_to(5), Some(Step::Skills));
        assert_eq!(controller.jump_to(0), None);
        assert_eq!(controller.jump_to(9), None);
        assert_eq!(controller.current(), Step::Skills);
    }

    #[test]
    fn test_save_gate_jumps_to_first_failing_step() {
        let rules = RuleTable::standard();
        let mut draft = complete_draft();
        draft.experience.clear();
        draft.social.clear();

        let mut controller = StepController::new();
        controller.jump_to(6);
        let failure = controller.save_gate(rules, &draft).unwrap_err();
        assert_eq!(failure.step, Step::Experience);
        assert_eq!(controller.current(), Step::Experience);

        draft = complete_draft();
        assert!(controller.save_gate(rules, &draft).is_ok());
        assert_eq!(controller.current(), Step::Experience);
    }
}
