//! Declarative per-step validation.
//!
//! The rule table is plain data (step → field path → rule) evaluated by one
//! generic evaluator. Only list lengths are enforced for list sections; fields
//! inside list items are never validated.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::draft::steps::Step;
use crate::models::{CvDraft, ImageSource, ListSection, ScalarSection, TextFields};

pub const DEFAULT_PATTERN_MESSAGE: &str = "Invalid format";

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const PHONE_PATTERN: &str = r"^[0-9]{10}$";

static STANDARD_RULES: LazyLock<RuleTable> = LazyLock::new(build_standard_rules);

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    /// A dot path into a record section, e.g. `basic.email`.
    Field(ScalarSection, &'static str),
    /// A whole list section, e.g. `education`.
    List(ListSection),
}

impl RuleTarget {
    pub fn path(&self) -> String {
        match self {
            RuleTarget::Field(section, field) => format!("{section}.{field}"),
            RuleTarget::List(section) => section.key().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub required: bool,
    pub min_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub message: &'static str,
    pub pattern_message: Option<&'static str>,
}

impl Rule {
    pub fn required(message: &'static str) -> Self {
        Self {
            required: true,
            min_length: None,
            pattern: None,
            message,
            pattern_message: None,
        }
    }

    pub fn min_items(min_length: usize, message: &'static str) -> Self {
        Self {
            min_length: Some(min_length),
            ..Self::required(message)
        }
    }

    pub fn with_pattern(mut self, pattern: Regex, pattern_message: &'static str) -> Self {
        self.pattern = Some(pattern);
        self.pattern_message = Some(pattern_message);
        self
    }
}

/// Field path → message. Rebuilt from scratch on every validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn insert(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.insert(path.into(), message.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.0.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Result of validating one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepValidation {
    pub step: Step,
    pub errors: FieldErrors,
}

impl StepValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    steps: BTreeMap<Step, Vec<(RuleTarget, Rule)>>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed table of the CV wizard.
    pub fn standard() -> &'static RuleTable {
        &STANDARD_RULES
    }

    pub fn with_rule(mut self, step: Step, target: RuleTarget, rule: Rule) -> Self {
        self.steps.entry(step).or_default().push((target, rule));
        self
    }

    pub fn rules_for(&self, step: Step) -> &[(RuleTarget, Rule)] {
        self.steps.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Evaluates every rule declared for `step`. Other steps' content never
    /// influences the result.
    pub fn validate_step(&self, step: Step, draft: &CvDraft) -> StepValidation {
        let mut errors = FieldErrors::new();
        for (target, rule) in self.rules_for(step) {
            evaluate(target, rule, draft, &mut errors);
        }
        StepValidation { step, errors }
    }

    /// Validates steps 1..=6 in order and stops at the first failing one.
    pub fn first_failure(&self, draft: &CvDraft) -> Option<StepValidation> {
        Step::ALL
            .into_iter()
            .map(|step| self.validate_step(step, draft))
            .find(|result| !result.is_valid())
    }
}

/// Validates `step` against the standard rule table.
pub fn validate_step(step: Step, draft: &CvDraft) -> StepValidation {
    RuleTable::standard().validate_step(step, draft)
}

enum FieldRef<'a> {
    Text(&'a str),
    Image(&'a ImageSource),
    Absent,
}

impl FieldRef<'_> {
    fn is_filled(&self) -> bool {
        match self {
            FieldRef::Text(text) => !text.trim().is_empty(),
            FieldRef::Image(image) => image.is_present(),
            FieldRef::Absent => false,
        }
    }
}

fn field_ref<'a>(draft: &'a CvDraft, section: ScalarSection, field: &str) -> FieldRef<'a> {
    let text = match (section, field) {
        (ScalarSection::Basic, "image") => return FieldRef::Image(&draft.basic.image),
        (ScalarSection::Basic, name) => draft.basic.text_field(name),
        (ScalarSection::Layout, name) => draft.layout.text_field(name),
    };
    text.map_or(FieldRef::Absent, FieldRef::Text)
}

fn evaluate(target: &RuleTarget, rule: &Rule, draft: &CvDraft, errors: &mut FieldErrors) {
    match *target {
        RuleTarget::List(section) => {
            // Patterns never apply to lists.
            if let (true, Some(min)) = (rule.required, rule.min_length) {
                if draft.list_len(section) < min {
                    errors.insert(target.path(), rule.message);
                }
            }
        }
        RuleTarget::Field(section, field) => {
            let value = field_ref(draft, section, field);
            if rule.required && !value.is_filled() {
                errors.insert(target.path(), rule.message);
            }
            if let (Some(pattern), FieldRef::Text(text)) = (&rule.pattern, &value) {
                if !text.is_empty() && !pattern.is_match(text) {
                    errors.insert(
                        target.path(),
                        rule.pattern_message.unwrap_or(DEFAULT_PATTERN_MESSAGE),
                    );
                }
            }
        }
    }
}

fn build_standard_rules() -> RuleTable {
    let email = Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex");
    let phone = Regex::new(PHONE_PATTERN).expect("phone pattern is a valid regex");

    RuleTable::new()
        .with_rule(
            Step::Basic,
            RuleTarget::Field(ScalarSection::Basic, "name"),
            Rule::required("Name is required"),
        )
        .with_rule(
            Step::Basic,
            RuleTarget::Field(ScalarSection::Basic, "email"),
            Rule::required("Email is required").with_pattern(email, "Invalid email format"),
        )
        .with_rule(
            Step::Basic,
            RuleTarget::Field(ScalarSection::Basic, "phone"),
            Rule::required("Phone is required").with_pattern(phone, "Phone must be 10 digits"),
        )
        .with_rule(
            Step::Basic,
            RuleTarget::Field(ScalarSection::Basic, "image"),
            Rule::required("Profile image is required"),
        )
        .with_rule(
            Step::Education,
            RuleTarget::List(ListSection::Education),
            Rule::min_items(1, "At least one education entry is required"),
        )
        .with_rule(
            Step::Experience,
            RuleTarget::List(ListSection::Experience),
            Rule::min_items(1, "At least one experience entry is required"),
        )
        .with_rule(
            Step::Projects,
            RuleTarget::List(ListSection::Projects),
            Rule::min_items(1, "At least one project entry is required"),
        )
        .with_rule(
            Step::Skills,
            RuleTarget::List(ListSection::Skills),
            Rule::min_items(1, "At least one skill entry is required"),
        )
        .with_rule(
            Step::Social,
            RuleTarget::List(ListSection::Social),
            Rule::min_items(1, "At least one social profile is required"),
        )
}
