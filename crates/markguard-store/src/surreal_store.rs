//! SurrealDB-backed `VectorSearch` and `RiskSink`
//!
//! Cosine similarity is computed in SurrealQL; category boosts and the
//! citation penalty are applied with [`passage_score`] on the way out so the
//! ranking matches the in-memory fake exactly.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::StorageError;
use crate::migrations;
use crate::records::{
    passage_score, CasePassage, InfringementRiskRecord, PassageTopic, RefusalMatch,
    RefusalRecord, ScoredPassage,
};
use crate::storage_traits::{CaseQuery, RiskSink, StorageResult, VectorSearch};

/// Connection settings for [`SurrealMarkStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Engine URL (`mem://`, `surrealkv://path`, `ws://host:port`, ...)
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials, required by remote engines only.
    pub credentials: Option<(String, String)>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "mem://".to_string(),
            namespace: "markguard".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }
}

impl StoreConfig {
    /// Create from environment variables
    ///
    /// Reads:
    /// - SURREALDB_URL (optional, default: "mem://")
    /// - SURREALDB_NAMESPACE (optional, default: "markguard")
    /// - SURREALDB_DATABASE (optional, default: "main")
    /// - SURREALDB_USERNAME / SURREALDB_PASSWORD (optional, both or neither)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let credentials = match (
            std::env::var("SURREALDB_USERNAME"),
            std::env::var("SURREALDB_PASSWORD"),
        ) {
            (Ok(user), Ok(pass)) => Some((user, pass)),
            _ => None,
        };
        Self {
            endpoint: std::env::var("SURREALDB_URL").unwrap_or(defaults.endpoint),
            namespace: std::env::var("SURREALDB_NAMESPACE").unwrap_or(defaults.namespace),
            database: std::env::var("SURREALDB_DATABASE").unwrap_or(defaults.database),
            credentials,
        }
    }
}

/// Row shape of a refusal similarity query.
#[derive(Debug, Deserialize)]
struct RefusalRow {
    patent_id: String,
    content: String,
    reason_tags: String,
    product_tags: String,
    similarity: Option<f64>,
}

/// Row shape of a case-passage similarity query.
#[derive(Debug, Deserialize)]
struct PassageRow {
    precedent_no: String,
    case_id: String,
    chunk_index: u32,
    topic: PassageTopic,
    category_pattern: String,
    file_name: Option<String>,
    start_page: Option<String>,
    content: String,
    similarity: Option<f64>,
}

impl PassageRow {
    fn into_passage(self) -> (CasePassage, Option<f64>) {
        let similarity = self.similarity;
        let passage = CasePassage {
            precedent_no: self.precedent_no,
            case_id: self.case_id,
            chunk_index: self.chunk_index,
            topic: self.topic,
            category_pattern: self.category_pattern,
            file_name: self.file_name,
            start_page: self.start_page,
            content: self.content,
            embedding: Vec::new(),
        };
        (passage, similarity)
    }
}

/// SurrealDB implementation of the MarkGuard storage traits.
#[derive(Clone)]
pub struct SurrealMarkStore {
    db: Surreal<Any>,
}

impl SurrealMarkStore {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect(StoreConfig::default()).await
    }

    /// Create from environment variables, see [`StoreConfig::from_env`].
    pub async fn from_env() -> StorageResult<Self> {
        Self::connect(StoreConfig::from_env()).await
    }

    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace))]
    pub async fn connect(config: StoreConfig) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(config.endpoint.as_str())
            .await
            .map_err(|e| {
                StorageError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if let Some((username, password)) = &config.credentials {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await
            .map_err(|e| StorageError::Connection(format!("Root authentication failed: {e}")))?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealMarkStore connected");
        Ok(Self { db })
    }

    /// Index a refusal decision.
    pub async fn insert_refusal(&self, record: RefusalRecord) -> StorageResult<()> {
        let _created: Option<RefusalRecord> =
            self.db.create("refusal_records").content(record).await?;
        Ok(())
    }

    /// Index a case-law passage.
    pub async fn insert_passage(&self, passage: CasePassage) -> StorageResult<()> {
        let _created: Option<CasePassage> =
            self.db.create("case_passages").content(passage).await?;
        Ok(())
    }

    /// All persisted risk rows for one protected mark.
    pub async fn risks_for(
        &self,
        protected_registration_no: &str,
    ) -> StorageResult<Vec<InfringementRiskRecord>> {
        let mut res = self
            .db
            .query("SELECT * OMIT id FROM infringement_risks WHERE protected_registration_no = $reg ORDER BY candidate_no")
            .bind(("reg", protected_registration_no.to_string()))
            .await?;
        let rows: Vec<InfringementRiskRecord> = res.take(0)?;
        Ok(rows)
    }

    async fn passage_pool(
        &self,
        query: &CaseQuery,
        topic: PassageTopic,
        limit: usize,
    ) -> StorageResult<Vec<ScoredPassage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let sql = r#"
            SELECT precedent_no, case_id, chunk_index, topic, category_pattern,
                   file_name, start_page, content,
                   vector::similarity::cosine(embedding, $vec) AS similarity
            FROM case_passages
            WHERE topic = $topic AND array::len(embedding) = $dim
        "#;
        let mut res = self
            .db
            .query(sql)
            .bind(("vec", query.query_vector.clone()))
            .bind(("topic", topic.as_str().to_string()))
            .bind(("dim", query.query_vector.len()))
            .await?;
        let rows: Vec<PassageRow> = res.take(0)?;

        let mut pool: Vec<ScoredPassage> = rows
            .into_iter()
            .filter_map(|row| {
                let (passage, similarity) = row.into_passage();
                let similarity = similarity.filter(|s| s.is_finite())?;
                let score = passage_score(
                    similarity,
                    &passage,
                    &query.target_pattern,
                    query.pattern_boost,
                    query.citation_penalty,
                );
                Some(passage.to_scored(score))
            })
            .collect();
        pool.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        pool.truncate(limit);
        Ok(pool)
    }
}

fn check_vector(query_vector: &[f32]) -> StorageResult<()> {
    if query_vector.is_empty() {
        return Err(StorageError::InvalidVector {
            reason: "empty query vector".into(),
        });
    }
    if query_vector.iter().any(|v| !v.is_finite()) {
        return Err(StorageError::InvalidVector {
            reason: "non-finite component".into(),
        });
    }
    Ok(())
}

#[async_trait]
impl VectorSearch for SurrealMarkStore {
    #[instrument(skip(self, query_vector), fields(dim = query_vector.len()))]
    async fn refusal_precedents(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> StorageResult<Vec<RefusalMatch>> {
        check_vector(query_vector)?;
        let sql = r#"
            SELECT patent_id, content, reason_tags, product_tags,
                   vector::similarity::cosine(embedding, $vec) AS similarity
            FROM refusal_records
            WHERE array::len(embedding) = $dim
            ORDER BY similarity DESC
            LIMIT $k
        "#;
        let mut res = self
            .db
            .query(sql)
            .bind(("vec", query_vector.to_vec()))
            .bind(("dim", query_vector.len()))
            .bind(("k", top_k))
            .await?;
        let rows: Vec<RefusalRow> = res.take(0)?;
        debug!(hits = rows.len(), "refusal search complete");

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let similarity = row.similarity.filter(|s| s.is_finite())?;
                Some(RefusalMatch {
                    patent_id: row.patent_id,
                    content: row.content,
                    reason_tags: row.reason_tags,
                    product_tags: row.product_tags,
                    similarity,
                })
            })
            .collect())
    }

    #[instrument(skip(self, query), fields(pattern = %query.target_pattern))]
    async fn case_precedents(&self, query: &CaseQuery) -> StorageResult<Vec<ScoredPassage>> {
        check_vector(&query.query_vector)?;
        let mut results = self
            .passage_pool(query, PassageTopic::Doctrinal, query.doctrinal_limit)
            .await?;
        results.extend(
            self.passage_pool(query, PassageTopic::Factual, query.factual_limit)
                .await?,
        );
        debug!(hits = results.len(), "case passage search complete");
        Ok(results)
    }
}

#[async_trait]
impl RiskSink for SurrealMarkStore {
    #[instrument(skip(self, record), fields(candidate = %record.candidate_no, level = %record.risk_level))]
    async fn persist_risk(&self, record: InfringementRiskRecord) -> StorageResult<()> {
        let key = record.pair_key();
        let content = serde_json::to_value(&record)?;
        self.db
            .query("UPSERT type::thing('infringement_risks', $key) CONTENT $record")
            .bind(("key", key))
            .bind(("record", content))
            .await?
            .check()?;
        Ok(())
    }
}
