//! Advisory classification layer. Everything here is optional: with no
//! classifier configured, or one that fails, callers keep their heuristic
//! results.

mod error;
pub use error::AdvisorError;

pub mod advisor;
pub mod classifier;

pub use advisor::{Advisor, InputSuggestion, apply_suggestion, cache_key};
pub use classifier::{Classifier, CommandClassifier};
