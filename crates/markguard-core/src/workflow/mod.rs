//! Pair analysis as a bounded state machine.
//!
//! ```text
//! scoring (visual | phonetic | conceptual) -> ensemble
//!   ensemble --safe--> end
//!   ensemble --reportable--> persist_risk -> generate_query -> retrieve_precedents
//!   grade_precedents --approved--> generate_report -> evaluate_report
//!   grade_precedents --rewrite--> generate_query
//!   grade_precedents --web_search--> web_search -> grade_precedents
//!   evaluate_report --accepted--> end
//!   evaluate_report --regenerate--> generate_report
//!   evaluate_report --requery--> generate_query
//!   evaluate_report --give_up--> end
//! ```

pub mod context;
pub mod graph;
mod nodes;
pub mod runner;

pub use context::{RetryCounters, RunContext, RunSnapshot};
pub use graph::{next, Node, Route, Step, Termination, TRANSITIONS};
pub use nodes::route_after_review;
pub use runner::{analyze_pair, Analyzer};
