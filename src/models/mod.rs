pub mod facts;
pub mod plan;

pub use facts::{CompletionFacts, EventKey, EventKind};
pub use plan::{QuestionnaireAnswers, WeekPlanEntry};
