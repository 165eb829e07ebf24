use serde::{Deserialize, Serialize};

/// A case-law excerpt considered as support for a report.
///
/// `is_relevant` starts false and is only ever set by grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precedent {
    pub precedent_no: String,
    pub case_id: Option<String>,
    pub file_name: Option<String>,
    pub start_page: Option<String>,
    pub content: String,
    pub is_relevant: bool,
}

impl Precedent {
    pub fn new(precedent_no: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            precedent_no: precedent_no.into(),
            case_id: None,
            file_name: None,
            start_page: None,
            content: content.into(),
            is_relevant: false,
        }
    }

    pub fn marked_relevant(mut self) -> Self {
        self.is_relevant = true;
        self
    }
}

impl From<markguard_store::ScoredPassage> for Precedent {
    fn from(p: markguard_store::ScoredPassage) -> Self {
        Self {
            precedent_no: p.precedent_no,
            case_id: Some(p.case_id),
            file_name: p.file_name,
            start_page: p.start_page,
            content: p.content,
            is_relevant: false,
        }
    }
}
