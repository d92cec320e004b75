//! # Turn Decisions
//!
//! The decision function is an external collaborator (normally an LLM) that
//! looks at the dialogue so far and proposes what to do next. Its output is
//! untrusted text; [`TurnDecision::parse`] is the only way into the typed
//! [`Decision`], and anything it rejects is routed to the deterministic
//! fallback by the flow manager.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::context::{ConversationContext, DialogueTurn};
use crate::error::DecisionParseError;

/// Everything the decision function gets to see for one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionInput {
    pub dialogue_history: Vec<DialogueTurn>,
    pub asked_ids: Vec<String>,
    pub skipped_ids: Vec<String>,
    pub remaining_ids: Vec<String>,
    pub current_point_id: Option<String>,
    pub questions_asked: u32,
    pub last_question: String,
    pub last_answer: String,
}

impl DecisionInput {
    pub fn from_context(
        ctx: &ConversationContext,
        remaining_ids: Vec<String>,
        current_point_id: Option<String>,
    ) -> Self {
        let (last_question, last_answer) = ctx
            .last_turn()
            .map(|t| (t.question.clone(), t.answer.clone()))
            .unwrap_or_default();

        Self {
            dialogue_history: ctx.history().to_vec(),
            asked_ids: ctx.asked_ids.iter().cloned().collect(),
            skipped_ids: ctx.skipped_ids.iter().cloned().collect(),
            remaining_ids,
            current_point_id,
            questions_asked: ctx.questions_asked,
            last_question,
            last_answer,
        }
    }
}

/// Produces a raw decision for a turn.
///
/// Errors returned here are call failures (timeouts, transport, auth) and
/// abort the interview. A reply that arrives but makes no sense must be
/// returned as `Ok` so that validation can route it to the fallback.
#[async_trait]
pub trait DecisionFunction: Send + Sync {
    async fn decide(&self, input: &DecisionInput) -> anyhow::Result<String>;
}

/// The model's assessment of the last answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnAnalysis {
    /// 1..=10
    pub answer_quality: u8,
    /// 0.0..=1.0
    pub completeness: f32,
    pub missing_info: Vec<String>,
    /// Reference points the answer covered indirectly
    pub covered_questions: Vec<String>,
}

/// What to do after the last answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum Decision {
    /// Move on to a bank question; `None` means "next by priority"
    AskFromBank(Option<String>),
    /// Ask a free-form follow-up about the current point
    AskClarifying(String),
    Finalize,
}

/// A validated decision
#[derive(Debug, Clone, PartialEq)]
pub struct TurnDecision {
    pub analysis: TurnAnalysis,
    pub action: Decision,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    answer_quality: Option<f64>,
    completeness: Option<f64>,
    #[serde(default)]
    missing_info: Vec<String>,
    #[serde(default)]
    covered_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    analysis: Option<RawAnalysis>,
    next_action: Option<String>,
    next_question: Option<String>,
}

impl TurnDecision {
    /// Validate a raw decision payload
    pub fn parse(raw: &str) -> Result<Self, DecisionParseError> {
        let json = extract_json(raw)
            .ok_or_else(|| DecisionParseError::InvalidJson("no JSON object found".to_string()))?;
        let decision: RawDecision = serde_json::from_str(json)
            .map_err(|e| DecisionParseError::InvalidJson(e.to_string()))?;

        let analysis = decision
            .analysis
            .ok_or(DecisionParseError::MissingField("analysis"))?;
        let quality = analysis
            .answer_quality
            .ok_or(DecisionParseError::MissingField("analysis.answer_quality"))?;
        let quality = quality.round() as i64;
        if !(1..=10).contains(&quality) {
            return Err(DecisionParseError::QualityOutOfRange(quality));
        }
        let completeness = analysis.completeness.unwrap_or(0.0);
        if !(0.0..=1.0).contains(&completeness) {
            return Err(DecisionParseError::CompletenessOutOfRange(completeness));
        }

        let next_question = decision
            .next_question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        let action = match decision
            .next_action
            .ok_or(DecisionParseError::MissingField("next_action"))?
            .trim()
        {
            "ask_from_bank" => Decision::AskFromBank(next_question),
            "ask_clarifying" => {
                Decision::AskClarifying(next_question.ok_or(DecisionParseError::EmptyClarification)?)
            }
            "finalize" => Decision::Finalize,
            other => return Err(DecisionParseError::UnknownAction(other.to_string())),
        };

        Ok(Self {
            analysis: TurnAnalysis {
                answer_quality: quality as u8,
                completeness: completeness as f32,
                missing_info: analysis.missing_info,
                covered_questions: analysis.covered_questions,
            },
            action,
        })
    }
}

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").ok())
        .as_ref()
}

/// Locate the JSON object in a model reply (bare, fenced, or wrapped in prose)
fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    if let Some(caps) = fenced_block().and_then(|re| re.captures(trimmed)) {
        return caps.get(1).map(|m| m.as_str());
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_from_bank() {
        let raw = r#"{
            "analysis": {"answer_quality": 8, "completeness": 0.9,
                         "missing_info": [], "covered_questions": ["geography"]},
            "next_action": "ask_from_bank",
            "next_question": "budget"
        }"#;
        let decision = TurnDecision::parse(raw).unwrap();
        assert_eq!(decision.action, Decision::AskFromBank(Some("budget".into())));
        assert_eq!(decision.analysis.answer_quality, 8);
        assert_eq!(decision.analysis.covered_questions, vec!["geography"]);
    }

    #[test]
    fn test_parse_fenced_reply_with_prose() {
        let raw = "Here is my decision:\n```json\n{\"analysis\": {\"answer_quality\": 4}, \"next_action\": \"ask_clarifying\", \"next_question\": \"How many people exactly?\"}\n```";
        let decision = TurnDecision::parse(raw).unwrap();
        assert_eq!(
            decision.action,
            Decision::AskClarifying("How many people exactly?".into())
        );
        assert_eq!(decision.analysis.completeness, 0.0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            TurnDecision::parse("I think we should continue"),
            Err(DecisionParseError::InvalidJson(_))
        ));
        assert!(matches!(
            TurnDecision::parse("{not json}"),
            Err(DecisionParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let raw = r#"{"analysis": {"answer_quality": 7}, "next_action": "celebrate"}"#;
        assert_eq!(
            TurnDecision::parse(raw),
            Err(DecisionParseError::UnknownAction("celebrate".into()))
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_values() {
        let raw = r#"{"analysis": {"answer_quality": 42}, "next_action": "finalize"}"#;
        assert_eq!(
            TurnDecision::parse(raw),
            Err(DecisionParseError::QualityOutOfRange(42))
        );

        let raw = r#"{"analysis": {"answer_quality": 5, "completeness": 3.5}, "next_action": "finalize"}"#;
        assert!(matches!(
            TurnDecision::parse(raw),
            Err(DecisionParseError::CompletenessOutOfRange(_))
        ));
    }

    #[test]
    fn test_parse_requires_clarifying_text() {
        let raw = r#"{"analysis": {"answer_quality": 3}, "next_action": "ask_clarifying", "next_question": "  "}"#;
        assert_eq!(
            TurnDecision::parse(raw),
            Err(DecisionParseError::EmptyClarification)
        );
    }

    #[test]
    fn test_decision_input_from_context() {
        let mut ctx = ConversationContext::new();
        ctx.record("Name?", "Green Yard", "project_name", false);

        let input = DecisionInput::from_context(
            &ctx,
            vec!["problem".to_string()],
            Some("project_name".to_string()),
        );
        assert_eq!(input.last_answer, "Green Yard");
        assert_eq!(input.asked_ids, vec!["project_name"]);
        assert_eq!(input.questions_asked, 1);
    }
}
