//! Prompt text for every generation and judgment call.

use std::fmt::Write;

use crate::domain::{CandidateMark, Precedent, ProtectedMark, RiskResult};

/// Pair summary shared by grading, drafting and evaluation prompts.
pub fn common_context(
    protected: &ProtectedMark,
    candidate: &CandidateMark,
    risk: &RiskResult,
) -> String {
    format!(
        "[보호상표] {} ({})\n[수집상표] {} ({})\n\
         - 시각 유사도: {:.1} (가중치 {:.2})\n\
         - 호칭 유사도: {:.1} (가중치 {:.2})\n\
         - 관념 유사도: {:.1} (가중치 {:.2})\n\
         - 종합 점수: {:.1} / 위험 등급: {}",
        protected.name,
        protected.kind.label(),
        candidate.name,
        candidate.kind.label(),
        risk.scores.visual,
        risk.weights.visual,
        risk.scores.phonetic,
        risk.weights.phonetic,
        risk.scores.conceptual,
        risk.weights.conceptual,
        risk.total_score,
        risk.grade,
    )
}

pub const VISUAL_DESCRIPTION_SYSTEM: &str = "당신은 상표 심사관입니다. 주어진 상표 이미지를 \
객관적으로 관찰하여 형태, 색채, 구성 요소, 문자 배치를 묘사하십시오. 평가나 추측은 하지 마십시오.";

pub const VISUAL_DESCRIPTION_USER: &str = "이 상표 이미지의 시각적 특징을 3~5문장으로 묘사하십시오.";

pub const CONCEPTUAL_CAPTION_SYSTEM: &str = "당신은 상표의 관념(의미)을 분석하는 전문가입니다. \
이미지가 일반 수요자에게 떠올리게 하는 사물, 개념, 인상을 한 문단으로 설명하십시오.";

pub const CONCEPTUAL_CAPTION_USER: &str = "이 상표가 전달하는 관념을 설명하십시오.";

pub const REFUSAL_QUERIES_SYSTEM: &str = "당신은 상표 거절결정 데이터베이스 검색 전문가입니다. \
보호상표와 유사한 표장이 거절된 사례를 찾기 위한 검색 쿼리를 3~5개 만드십시오. \
반드시 {\"queries\": [\"...\"]} 형식의 JSON만 출력하십시오.";

pub fn refusal_queries_user(
    name: &str,
    product: &str,
    visual_description: &str,
    conceptual_description: &str,
) -> String {
    format!(
        "보호상표명: {name}\n지정상품: {product}\n시각 묘사: {visual_description}\n관념 묘사: {conceptual_description}"
    )
}

pub const IDENTIFICATION_SYSTEM: &str = "당신은 상표의 식별력을 평가하는 심사관입니다. \
시각(visual), 호칭(phonetic), 관념(semantic) 각 요소에 대해 지정상품과의 관계에서 식별력이 \
얼마나 강한지 1(매우 약함)부터 5(매우 강함)까지의 정수 grade_score와 근거(reason)를 제시하십시오. \
제공된 거절 사례를 참고하되 그대로 인용하지 마십시오.";

pub fn identification_user(
    name: &str,
    product: &str,
    visual_description: &str,
    conceptual_description: &str,
    score_summary: &str,
    refusal_context: &str,
) -> String {
    format!(
        "보호상표명: {name}\n지정상품: {product}\n시각 묘사: {visual_description}\n관념 묘사: {conceptual_description}\n\n\
         [유사도 분석 결과]\n{score_summary}\n\n[유사 거절 사례]\n{refusal_context}"
    )
}

/// Schema for the identification-strength judgment.
pub fn identification_schema() -> serde_json::Value {
    let factor = serde_json::json!({
        "type": "object",
        "properties": {
            "grade_score": { "type": "integer", "minimum": 1, "maximum": 5 },
            "reason": { "type": "string" }
        },
        "required": ["grade_score", "reason"],
        "additionalProperties": false
    });
    serde_json::json!({
        "type": "object",
        "properties": { "visual": factor, "phonetic": factor, "semantic": factor },
        "required": ["visual", "phonetic", "semantic"],
        "additionalProperties": false
    })
}

pub const TRANSLITERATION_SYSTEM: &str = "You transcribe brand names into Korean Hangul as a \
Korean consumer would pronounce them. Give every plausible reading, most common first. \
Answer only with JSON: {\"korean_a\": [\"...\"], \"korean_b\": [\"...\"]}.";

pub fn transliteration_user(a: &str, b: &str) -> String {
    format!("Brand A: {a}, Brand B: {b}")
}

pub const PRECEDENT_QUERIES_SYSTEM: &str = "당신은 상표 침해 판례 검색 전문가입니다. \
두 상표의 유사도 분석 결과를 바탕으로, 판례 데이터베이스에서 관련 법리와 사실관계를 찾기 위한 \
검색 쿼리를 2~4개 작성하십시오. 이전 검색에 대한 피드백이 있으면 반드시 반영하십시오.";

pub fn precedent_queries_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "queries": { "type": "array", "items": { "type": "string" }, "minItems": 1 }
        },
        "required": ["queries"],
        "additionalProperties": false
    })
}

fn score_lines(risk: &RiskResult) -> String {
    format!(
        "- 시각 유사도: {:.2} (가중치 {:.2})\n- 호칭 유사도: {:.2} (가중치 {:.2})\n- 관념 유사도: {:.2} (가중치 {:.2})",
        risk.scores.visual,
        risk.weights.visual,
        risk.scores.phonetic,
        risk.weights.phonetic,
        risk.scores.conceptual,
        risk.weights.conceptual,
    )
}

pub fn precedent_queries_user(
    name: &str,
    product: &str,
    risk: &RiskResult,
    feedback: Option<&str>,
) -> String {
    let mut prompt = format!(
        "보호상표명: {name}\n지정상품: {product}\n시각 묘사: {}\n{}",
        risk.visual_description,
        score_lines(risk)
    );
    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        let _ = write!(prompt, "\n\n[이전 검색 피드백]\n{feedback}");
    }
    prompt
}

pub const PRECEDENT_GRADING_SYSTEM: &str = "당신은 판례 적합성을 검토하는 변리사입니다. \
검색된 판례가 두 상표의 침해 판단 근거로 적합한지 평가하십시오. \
적합한 판례가 있으면 decision=\"approve\"와 해당 번호(approved_indices)를, \
검색어를 바꿔야 하면 decision=\"rewrite\"와 피드백(feedback)을, \
외부 판례 검색이 필요하면 decision=\"web_search\"와 검색 키워드(feedback)를 제시하십시오.";

pub fn precedent_grading_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "decision": { "type": "string", "enum": ["approve", "rewrite", "web_search"] },
            "approved_indices": { "type": "array", "items": { "type": "integer" } },
            "feedback": {
                "anyOf": [
                    { "type": "string" },
                    { "type": "array", "items": { "type": "string" } }
                ]
            }
        },
        "required": ["decision"],
        "additionalProperties": false
    })
}

fn precedent_block(precedents: &[Precedent]) -> String {
    let mut block = String::new();
    for (i, p) in precedents.iter().enumerate() {
        let _ = writeln!(
            block,
            "[{i}] 사건번호: {} / 파일: {} / 시작 페이지: {}\n{}\n",
            p.case_id.as_deref().unwrap_or("Unknown"),
            p.file_name.as_deref().unwrap_or("Unknown"),
            p.start_page.as_deref().unwrap_or("0"),
            p.content
        );
    }
    block
}

pub fn precedent_grading_user(
    common: &str,
    queries: &[String],
    precedents: &[Precedent],
) -> String {
    format!(
        "{common}\n\n[검색 쿼리]\n{}\n\n[검색된 판례]\n{}",
        queries.join("\n"),
        precedent_block(precedents)
    )
}

pub const REPORT_DRAFTING_SYSTEM: &str = "당신은 상표 침해 분석 보고서를 작성하는 변리사입니다. \
유사도 점수와 판례를 근거로 침해 가능성을 논리적으로 서술하고, 판례를 인용할 때는 사건번호를 \
명시하십시오. 결론, 근거, 권고 조치 순으로 작성하십시오.";

pub fn report_drafting_user(common: &str, precedents: &[Precedent], feedback: Option<&str>) -> String {
    let mut prompt = format!("{common}\n\n[참고 판례]\n{}", precedent_block(precedents));
    if let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) {
        let _ = write!(prompt, "\n[이전 보고서 평가 피드백]\n{feedback}");
    }
    prompt
}

pub const REPORT_EVALUATION_SYSTEM: &str = "당신은 상표 침해 보고서를 검수하는 책임 변리사입니다. \
보고서가 점수와 판례에 근거하는지, 논리가 일관적인지, 결론이 명확한지 0~100점으로 평가하고 \
개선 피드백과 함께 decision(approved 또는 regenerate)을 제시하십시오.";

pub fn report_evaluation_user(common: &str, precedents: &[Precedent], report: &str) -> String {
    format!(
        "{common}\n\n[참고 판례]\n{}\n[보고서]\n{report}",
        precedent_block(precedents)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_is_appended_only_when_present() {
        let risk = RiskResult::fail_safe();
        let without = precedent_queries_user("마크", "의류", &risk, Some("  "));
        assert!(!without.contains("피드백"));
        let with = precedent_queries_user("마크", "의류", &risk, Some("검색 결과가 0건입니다."));
        assert!(with.ends_with("검색 결과가 0건입니다."));
    }

    #[test]
    fn precedent_blocks_are_indexed_with_placeholders() {
        let block = precedent_block(&[Precedent::new("p-1", "본문")]);
        assert!(block.starts_with("[0] 사건번호: Unknown / 파일: Unknown / 시작 페이지: 0"));
    }
}
