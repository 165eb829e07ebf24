//! Precedent loop: query drafting, hybrid retrieval, grading and external
//! case-law search.

pub mod grading;
pub mod query;
pub mod retrieval;
pub mod web_search;

pub use grading::{
    grade, GradingOutcome, JudgeDecision, RetryBudget, EMPTY_RESULT_FEEDBACK, NO_FIT_FEEDBACK,
};
pub use query::generate_queries;
pub use retrieval::{merge_passages, retrieve, target_pattern};
pub use web_search::search_case_law;
