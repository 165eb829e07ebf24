//! Handles to every external collaborator, built once per process.

use std::sync::Arc;

use markguard_llm::{CaseLawSearch, Embedder, Generator, Judge};
use markguard_store::{RiskSink, VectorSearch};

/// Dependency bundle passed to the analysis pipeline.
///
/// Cloning is cheap; all handles are shared.
#[derive(Clone)]
pub struct Capabilities {
    pub generator: Arc<dyn Generator>,
    pub judge: Arc<dyn Judge>,
    pub embedder: Arc<dyn Embedder>,
    pub case_law: Arc<dyn CaseLawSearch>,
    pub vectors: Arc<dyn VectorSearch>,
    pub risk_sink: Arc<dyn RiskSink>,
}

impl Capabilities {
    pub fn new(
        generator: Arc<dyn Generator>,
        judge: Arc<dyn Judge>,
        embedder: Arc<dyn Embedder>,
        case_law: Arc<dyn CaseLawSearch>,
        vectors: Arc<dyn VectorSearch>,
        risk_sink: Arc<dyn RiskSink>,
    ) -> Self {
        Self {
            generator,
            judge,
            embedder,
            case_law,
            vectors,
            risk_sink,
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
