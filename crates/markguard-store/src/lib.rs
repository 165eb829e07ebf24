//! MarkGuard-Store: vector search and risk persistence for MarkGuard
//!
//! This crate owns every read and write the analysis core performs against
//! its backing database. The core only sees the async traits in
//! [`storage_traits`]; concrete backends live behind them.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: similarity search over refusal decisions and case-law passages,
//! and durable recording of graded infringement risks.
//!
//! ## Key Components
//!
//! - `VectorSearch`: refusal-precedent and case-passage lookups by query vector
//! - `RiskSink`: write path for graded candidate marks
//! - `SurrealMarkStore`: SurrealDB implementation of both traits
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
mod migrations;
mod records;
pub mod storage_traits;
pub mod surreal_store;

pub use error::StorageError;
pub use records::{
    cosine_similarity, passage_score, CasePassage, InfringementRiskRecord, PassageTopic,
    RefusalMatch, RefusalRecord, ScoredPassage,
};
pub use storage_traits::{CaseQuery, RiskSink, StorageResult, VectorSearch};
pub use surreal_store::{StoreConfig, SurrealMarkStore};
