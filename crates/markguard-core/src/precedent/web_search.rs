use futures::future::join_all;
use markguard_llm::{CaseLawSearch, CaseRecord};
use tracing::{info, instrument, warn};

use crate::domain::Precedent;

fn to_precedent(record: CaseRecord) -> Option<Precedent> {
    let content = record.body()?.trim().to_string();
    Some(Precedent {
        precedent_no: record.serial_no,
        case_id: Some(record.case_number.unwrap_or_else(|| "Unknown".to_string())),
        file_name: record.case_name,
        start_page: Some("0".to_string()),
        content,
        is_relevant: false,
    })
}

/// Search the external case-law service and fetch every hit concurrently.
///
/// Empty keywords skip the call. Decisions without any body text are
/// dropped; a failed search yields nothing.
#[instrument(skip_all, fields(keywords = keywords.len()))]
pub async fn search_case_law(
    case_law: &dyn CaseLawSearch,
    keywords: &[String],
    display: usize,
) -> Vec<Precedent> {
    if keywords.is_empty() {
        warn!("no keywords for external case-law search");
        return Vec::new();
    }

    let ids = match case_law.search_ids(keywords, display).await {
        Ok(ids) => ids,
        Err(err) => {
            warn!(error = %err, "external case-law search failed");
            return Vec::new();
        }
    };
    info!(hits = ids.len(), "external case-law search returned");

    let details = join_all(ids.iter().map(|id| case_law.fetch_case(id))).await;
    let mut found = Vec::with_capacity(details.len());
    for (id, detail) in ids.iter().zip(details) {
        match detail {
            Ok(Some(record)) => match to_precedent(record) {
                Some(precedent) => found.push(precedent),
                None => warn!(serial_no = %id, "decision has no body text, dropped"),
            },
            Ok(None) => warn!(serial_no = %id, "decision detail not found"),
            Err(err) => warn!(serial_no = %id, error = %err, "decision detail fetch failed"),
        }
    }
    found
}
