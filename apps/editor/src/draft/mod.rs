// Draft core: normalization, declarative validation, the step cursor and the
// mutation reducer. Everything here is synchronous and free of I/O.

pub mod normalize;
pub mod reducer;
pub mod steps;
pub mod validation;

pub use normalize::normalize;
pub use reducer::{reduce, Edit, EditError, FieldValue};
pub use steps::{Step, StepController};
pub use validation::{validate_step, FieldErrors, Rule, RuleTable, RuleTarget, StepValidation};
