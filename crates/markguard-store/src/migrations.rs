//! SurrealDB schema initialization
//!
//! Sets up the three MarkGuard tables. Safe to call on every connection.

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage_traits::StorageResult;

/// Initialize all MarkGuard tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing MarkGuard SurrealDB schema");

    init_refusal_records(db).await?;
    init_case_passages(db).await?;
    init_infringement_risks(db).await?;

    info!("MarkGuard schema initialization complete");
    Ok(())
}

/// `refusal_records`: prior refusal decisions with their content embedding.
async fn init_refusal_records(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing refusal_records table");
    let sql = r#"
        DEFINE TABLE IF NOT EXISTS refusal_records SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_refusal_patent ON TABLE refusal_records COLUMNS patent_id;
    "#;
    run(db, sql).await
}

/// `case_passages`: chunked court decisions, split by topic pool.
///
/// `(case_id, chunk_index)` identifies a passage.
async fn init_case_passages(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing case_passages table");
    let sql = r#"
        DEFINE TABLE IF NOT EXISTS case_passages SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_passage_topic ON TABLE case_passages COLUMNS topic;
        DEFINE INDEX IF NOT EXISTS idx_passage_chunk ON TABLE case_passages COLUMNS case_id, chunk_index UNIQUE;
    "#;
    run(db, sql).await
}

/// `infringement_risks`: one row per graded (protected, candidate) pair,
/// keyed by the pair digest so re-runs overwrite instead of duplicating.
async fn init_infringement_risks(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing infringement_risks table");
    let sql = r#"
        DEFINE TABLE IF NOT EXISTS infringement_risks SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_risk_protected ON TABLE infringement_risks COLUMNS protected_registration_no;
        DEFINE INDEX IF NOT EXISTS idx_risk_level ON TABLE infringement_risks COLUMNS risk_level;
    "#;
    run(db, sql).await
}

async fn run(db: &Surreal<Any>, sql: &str) -> StorageResult<()> {
    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    Ok(())
}
