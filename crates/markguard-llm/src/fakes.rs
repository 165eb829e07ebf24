//! Scripted fakes for capability traits (testing only)
//!
//! Provides `ScriptedGenerator`, `ScriptedJudge`, `HashEmbedder` and
//! `StaticCaseLaw`. Responses are keyed by [`PromptTask`]; queued responses
//! are consumed first, then the task's standing response, otherwise the call
//! fails with [`LlmError::Exhausted`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::capability::*;
use crate::error::LlmError;
use crate::LlmResult;

#[derive(Debug, Clone)]
enum Scripted<T> {
    Reply(T),
    Fail(String),
}

#[derive(Debug)]
struct Script<T> {
    queued: HashMap<PromptTask, VecDeque<Scripted<T>>>,
    standing: HashMap<PromptTask, Scripted<T>>,
    delays: HashMap<PromptTask, Duration>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queued: HashMap::new(),
            standing: HashMap::new(),
            delays: HashMap::new(),
        }
    }
}

impl<T: Clone> Script<T> {
    fn next(&mut self, task: PromptTask) -> LlmResult<T> {
        let scripted = self
            .queued
            .get_mut(&task)
            .and_then(VecDeque::pop_front)
            .or_else(|| self.standing.get(&task).cloned())
            .ok_or_else(|| LlmError::Exhausted(task.to_string()))?;
        match scripted {
            Scripted::Reply(value) => Ok(value),
            Scripted::Fail(reason) => Err(LlmError::Http(reason)),
        }
    }

    fn push(&mut self, task: PromptTask, item: Scripted<T>) {
        self.queued.entry(task).or_default().push_back(item);
    }
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<Script<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one reply for `task`.
    pub fn respond(self, task: PromptTask, text: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push(task, Scripted::Reply(text.into()));
        self
    }

    /// Reply to every otherwise unscripted call for `task`.
    pub fn always(self, task: PromptTask, text: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .standing
            .insert(task, Scripted::Reply(text.into()));
        self
    }

    /// Queue one failure for `task`.
    pub fn fail(self, task: PromptTask) -> Self {
        self.script
            .lock()
            .unwrap()
            .push(task, Scripted::Fail(format!("{task} unavailable")));
        self
    }

    /// Sleep before answering `task`.
    pub fn delay(self, task: PromptTask, delay: Duration) -> Self {
        self.script.lock().unwrap().delays.insert(task, delay);
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, task: PromptTask) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.task == task)
            .count()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: GenerationRequest) -> LlmResult<String> {
        let task = request.task;
        self.requests.lock().unwrap().push(request);
        let delay = self.script.lock().unwrap().delays.get(&task).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.script.lock().unwrap().next(task)
    }
}

// ---------------------------------------------------------------------------
// ScriptedJudge
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScriptedJudge {
    script: Mutex<Script<Value>>,
    requests: Mutex<Vec<JudgmentRequest>>,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, task: PromptTask, value: Value) -> Self {
        self.script.lock().unwrap().push(task, Scripted::Reply(value));
        self
    }

    pub fn always(self, task: PromptTask, value: Value) -> Self {
        self.script
            .lock()
            .unwrap()
            .standing
            .insert(task, Scripted::Reply(value));
        self
    }

    pub fn fail(self, task: PromptTask) -> Self {
        self.script
            .lock()
            .unwrap()
            .push(task, Scripted::Fail(format!("{task} unavailable")));
        self
    }

    pub fn requests(&self) -> Vec<JudgmentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self, task: PromptTask) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.task == task)
            .count()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn judge(&self, request: JudgmentRequest) -> LlmResult<Value> {
        let task = request.task;
        self.requests.lock().unwrap().push(request);
        self.script.lock().unwrap().next(task)
    }
}

// ---------------------------------------------------------------------------
// HashEmbedder
// ---------------------------------------------------------------------------

/// Deterministic embedder: SHA-256 of the text spread over `dims` floats,
/// with optional per-text overrides.
#[derive(Debug)]
pub struct HashEmbedder {
    dims: usize,
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(8)
    }
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims: dims.max(1),
            overrides: Mutex::new(HashMap::new()),
            failing: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Return `vector` whenever `text` is embedded.
    pub fn with(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.overrides.lock().unwrap().insert(text.into(), vector);
        self
    }

    /// Fail whenever `text` is embedded.
    pub fn failing_on(self, text: impl Into<String>) -> Self {
        self.failing.lock().unwrap().push(text.into());
        self
    }

    pub fn embedded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        (0..self.dims)
            .map(|i| f32::from(digest[i % digest.len()]) / 255.0 + 0.01)
            .collect()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> LlmResult<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing.lock().unwrap().iter().any(|t| t == text) {
            return Err(LlmError::Http(format!("embedding failed for {text:?}")));
        }
        if let Some(vector) = self.overrides.lock().unwrap().get(text) {
            return Ok(vector.clone());
        }
        Ok(self.hash_vector(text))
    }
}

// ---------------------------------------------------------------------------
// StaticCaseLaw
// ---------------------------------------------------------------------------

/// Case-law service over a fixed set of records. Every search returns all
/// known serial numbers (up to `display`).
#[derive(Debug, Default)]
pub struct StaticCaseLaw {
    cases: Mutex<Vec<CaseRecord>>,
    orphan_ids: Mutex<Vec<String>>,
    searches: Mutex<Vec<Vec<String>>>,
    fail_search: Mutex<bool>,
}

impl StaticCaseLaw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case(self, record: CaseRecord) -> Self {
        self.cases.lock().unwrap().push(record);
        self
    }

    /// A serial number the search returns but the detail lookup does not know.
    pub fn with_orphan_id(self, serial_no: impl Into<String>) -> Self {
        self.orphan_ids.lock().unwrap().push(serial_no.into());
        self
    }

    pub fn fail_search(&self, fail: bool) {
        *self.fail_search.lock().unwrap() = fail;
    }

    /// Keyword lists received so far.
    pub fn searches(&self) -> Vec<Vec<String>> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaseLawSearch for StaticCaseLaw {
    async fn search_ids(&self, keywords: &[String], display: usize) -> LlmResult<Vec<String>> {
        self.searches.lock().unwrap().push(keywords.to_vec());
        if *self.fail_search.lock().unwrap() {
            return Err(LlmError::Status {
                status: 503,
                body: "maintenance".into(),
            });
        }
        let mut ids: Vec<String> = self
            .cases
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.serial_no.clone())
            .collect();
        ids.extend(self.orphan_ids.lock().unwrap().iter().cloned());
        ids.truncate(display);
        Ok(ids)
    }

    async fn fetch_case(&self, serial_no: &str) -> LlmResult<Option<CaseRecord>> {
        Ok(self
            .cases
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.serial_no == serial_no)
            .cloned())
    }
}
