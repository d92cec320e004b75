//! # Interactive Interviewer Agent
//!
//! Drives one interview session end to end: asks questions through the
//! caller's [`QuestionAsker`], consults the [`DecisionFunction`] after every
//! answer, lets the [`ConversationFlowManager`] pick the next step, and
//! assembles the [`Anketa`] once the flow finalizes.
//!
//! All session state (context, coverage, feedback) lives inside one
//! `conduct_interview` call and is dropped with it; cancelling the future
//! discards the session.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::anketa::{Anketa, AnketaStore};
use super::audit::{BlockAuditor, FeedbackItem};
use super::channel::{Notifier, QuestionAsker};
use super::context::{ConversationContext, DialogueTurn};
use super::decision::{DecisionFunction, TurnDecision};
use super::flow::{ConversationFlowManager, FlowConfig, FlowStep};
use super::reference_points::{CoverageSummary, ReferencePointManager};
use crate::error::InterviewError;

const DEFAULT_AUDIT_BLOCK_SIZE: usize = 5;
const DEFAULT_AUDIT_THRESHOLD: u8 = 6;

/// Configuration for the interviewer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub flow: FlowConfig,
    /// Answers per audit block (0 disables block audits)
    pub audit_block_size: usize,
    /// Blocks scored below this add clarification pressure
    pub audit_threshold: u8,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            flow: FlowConfig::default(),
            audit_block_size: DEFAULT_AUDIT_BLOCK_SIZE,
            audit_threshold: DEFAULT_AUDIT_THRESHOLD,
        }
    }
}

/// Who is being interviewed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserData {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }
}

/// Outcome of a completed interview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewResult {
    pub anketa: Anketa,
    /// Set when a store is attached to the agent
    pub anketa_id: Option<String>,
    pub audit_score: f32,
    /// Seconds
    pub processing_time: f64,
    pub questions_asked: u32,
    pub follow_ups_asked: u32,
    pub interactive_feedback: Vec<FeedbackItem>,
    pub coverage: CoverageSummary,
    /// Malformed decisions, cap hits and stalemates absorbed along the way
    pub recovered_faults: usize,
    pub dialogue_history: Vec<DialogueTurn>,
}

/// Runs interviews against a decision function
pub struct InteractiveInterviewerAgent {
    decider: Arc<dyn DecisionFunction>,
    auditor: Option<Arc<dyn BlockAuditor>>,
    store: Option<Arc<dyn AnketaStore>>,
    bank: ReferencePointManager,
    config: InterviewConfig,
}

impl InteractiveInterviewerAgent {
    pub fn new(decider: Arc<dyn DecisionFunction>, config: InterviewConfig) -> Self {
        Self {
            decider,
            auditor: None,
            store: None,
            bank: ReferencePointManager::with_default_bank(),
            config,
        }
    }

    /// Enable block audits
    pub fn with_auditor(mut self, auditor: Arc<dyn BlockAuditor>) -> Self {
        self.auditor = Some(auditor);
        self
    }

    /// Persist the anketa on completion
    pub fn with_store(mut self, store: Arc<dyn AnketaStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the reference point bank
    pub fn with_bank(mut self, bank: ReferencePointManager) -> Self {
        self.bank = bank;
        self
    }

    pub fn config(&self) -> &InterviewConfig {
        &self.config
    }

    /// Run a full interview.
    ///
    /// `asker` receives genuine questions only; the completion message goes
    /// to `notifier`.
    #[tracing::instrument(skip(self, asker, notifier), fields(user_id = %user.user_id))]
    pub async fn conduct_interview(
        &self,
        user: &UserData,
        asker: &dyn QuestionAsker,
        notifier: &dyn Notifier,
    ) -> Result<InterviewResult, InterviewError> {
        let started = Instant::now();
        let mut ctx = ConversationContext::new();
        let mut flow = ConversationFlowManager::new(self.bank.clone(), self.config.flow.clone());
        let mut feedback = Vec::new();
        let mut block_scores: Vec<u8> = Vec::new();
        let mut block_start = 0usize;

        tracing::info!(points = flow.points().len(), "Interview started");
        let mut question = flow.start();

        loop {
            let turn = ctx.questions_asked + 1;
            flow.begin_wait();
            let answer = asker
                .ask(&question.text)
                .await
                .map_err(|source| InterviewError::Ask { turn, source })?;
            ctx.record(
                &question.text,
                &answer,
                &question.point_id,
                question.is_clarifying(),
            );
            tracing::debug!(turn, point_id = %question.point_id, kind = ?question.kind, "Answer recorded");

            if self.block_complete(&ctx, block_start) {
                if let Some(item) = self
                    .audit_block(&mut flow, &ctx, block_start, feedback.len() + 1)
                    .await
                {
                    block_scores.push(item.score);
                    feedback.push(item);
                }
                block_start = ctx.history().len();
            }

            let input = flow.decision_input(&ctx);
            let raw = self
                .decider
                .decide(&input)
                .await
                .map_err(|source| InterviewError::DecisionCall { turn, source })?;

            match flow.apply(&mut ctx, TurnDecision::parse(&raw)) {
                FlowStep::Ask(next) => question = next,
                FlowStep::Finalize { message } => {
                    tracing::info!(
                        questions_asked = ctx.questions_asked,
                        follow_ups_asked = ctx.follow_ups_asked,
                        %message,
                        "Interview finalized"
                    );
                    notifier.notify(&message);
                    flow.finish();
                    break;
                }
            }
        }

        let anketa = Anketa::assemble(ctx.history(), flow.points());
        let anketa_id = match &self.store {
            Some(store) => Some(
                store
                    .save(&anketa, user)
                    .await
                    .map_err(InterviewError::Persistence)?,
            ),
            None => None,
        };

        let audit_score = if block_scores.is_empty() {
            flow.mean_answer_quality().unwrap_or(0.0)
        } else {
            block_scores.iter().map(|&s| s as f32).sum::<f32>() / block_scores.len() as f32
        };

        Ok(InterviewResult {
            anketa,
            anketa_id,
            audit_score,
            processing_time: started.elapsed().as_secs_f64(),
            questions_asked: ctx.questions_asked,
            follow_ups_asked: ctx.follow_ups_asked,
            interactive_feedback: feedback,
            coverage: flow.points().coverage_summary(),
            recovered_faults: flow.faults().len(),
            dialogue_history: ctx.history().to_vec(),
        })
    }

    fn block_complete(&self, ctx: &ConversationContext, block_start: usize) -> bool {
        self.auditor.is_some()
            && self.config.audit_block_size > 0
            && ctx.history().len() - block_start >= self.config.audit_block_size
    }

    /// Score the latest block; low scores queue follow-ups for its weak points.
    /// An unavailable auditor only costs the feedback item.
    async fn audit_block(
        &self,
        flow: &mut ConversationFlowManager,
        ctx: &ConversationContext,
        block_start: usize,
        block_number: usize,
    ) -> Option<FeedbackItem> {
        let auditor = self.auditor.as_ref()?;
        let block = ctx.turns_since(block_start);

        let audit = match auditor.audit_block(block).await {
            Ok(audit) => audit.normalized(),
            Err(e) => {
                tracing::warn!(block = block_number, error = %e, "Block audit failed, continuing");
                return None;
            }
        };

        let mut queued = 0;
        if audit.score < self.config.audit_threshold {
            for point_id in &audit.weak_points {
                // only points actually discussed in this block
                if !block.iter().any(|t| &t.point_id == point_id) {
                    continue;
                }
                let text = match flow.points().get(point_id) {
                    Some(point) => format!(
                        "Let's come back to one topic for a moment. {}",
                        point.alternate_question()
                    ),
                    None => continue,
                };
                if flow.queue_clarification(point_id, text) {
                    queued += 1;
                }
            }
        }

        tracing::info!(
            block = block_number,
            score = audit.score,
            clarifications_queued = queued,
            "Block audited"
        );

        Some(FeedbackItem {
            block: block_number,
            score: audit.score,
            weak_points: audit.weak_points,
            message: audit.feedback,
            clarifications_queued: queued,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::audit::BlockAudit;
    use crate::interview::decision::DecisionInput;
    use crate::interview::flow::MIN_QUESTIONS;
    use crate::interview::reference_points::PROJECT_NAME_ID;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every question and remembers what was asked
    #[derive(Default)]
    struct RecordingAsker {
        asked: Mutex<Vec<String>>,
    }

    impl RecordingAsker {
        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuestionAsker for RecordingAsker {
        async fn ask(&self, question: &str) -> anyhow::Result<String> {
            let mut asked = self.asked.lock().unwrap();
            asked.push(question.to_string());
            Ok(format!("answer #{}", asked.len()))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    struct FnDecider<F>(F);

    #[async_trait]
    impl<F> DecisionFunction for FnDecider<F>
    where
        F: Fn(&DecisionInput) -> anyhow::Result<String> + Send + Sync,
    {
        async fn decide(&self, input: &DecisionInput) -> anyhow::Result<String> {
            (self.0)(input)
        }
    }

    fn bank_move(quality: u8) -> String {
        format!(
            r#"{{"analysis": {{"answer_quality": {}, "completeness": 0.9}}, "next_action": "ask_from_bank"}}"#,
            quality
        )
    }

    fn clarifying(quality: u8, text: &str) -> String {
        format!(
            r#"{{"analysis": {{"answer_quality": {}}}, "next_action": "ask_clarifying", "next_question": "{}"}}"#,
            quality, text
        )
    }

    fn agent<F>(f: F) -> InteractiveInterviewerAgent
    where
        F: Fn(&DecisionInput) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        InteractiveInterviewerAgent::new(Arc::new(FnDecider(f)), InterviewConfig::default())
    }

    fn opening_question() -> String {
        ReferencePointManager::with_default_bank()
            .get(PROJECT_NAME_ID)
            .unwrap()
            .question()
            .to_string()
    }

    #[tokio::test]
    async fn test_adequate_answers_finish_after_ten_questions() {
        let agent = agent(|_| Ok(bank_move(8)));
        let asker = RecordingAsker::default();
        let notifier = RecordingNotifier::default();

        let result = agent
            .conduct_interview(&UserData::new("u-1"), &asker, &notifier)
            .await
            .unwrap();

        assert_eq!(result.questions_asked, 10);
        assert_eq!(result.follow_ups_asked, 0);
        assert_eq!(asker.asked().len(), 10);
        assert_eq!(asker.asked()[0], opening_question());
        assert_eq!(result.anketa.project_name(), Some("answer #1"));
        assert_eq!(result.coverage.required_uncovered, 0);
        assert!((result.audit_score - 8.0).abs() < f32::EPSILON);
        assert!(result.anketa_id.is_none());
    }

    #[tokio::test]
    async fn test_finalize_message_goes_to_notifier_not_asker() {
        let agent = agent(|input| {
            if input.questions_asked >= MIN_QUESTIONS {
                Ok(r#"{"analysis": {"answer_quality": 9}, "next_action": "finalize"}"#.to_string())
            } else {
                Ok(bank_move(9))
            }
        });
        let asker = RecordingAsker::default();
        let notifier = RecordingNotifier::default();

        let result = agent
            .conduct_interview(&UserData::new("u-2"), &asker, &notifier)
            .await
            .unwrap();

        let messages = notifier.messages.lock().unwrap().clone();
        assert_eq!(messages.len(), 1);
        assert!(!asker.asked().contains(&messages[0]));
        assert_eq!(asker.asked().len() as u32, result.questions_asked);
        assert!(result.questions_asked >= MIN_QUESTIONS);
        assert_eq!(result.coverage.required_uncovered, 0);
    }

    #[tokio::test]
    async fn test_finalize_waits_for_required_points() {
        // ten required points: finalize is requested from the eighth answer on
        let agent = agent(|input| {
            if input.questions_asked >= MIN_QUESTIONS {
                Ok(r#"{"analysis": {"answer_quality": 9}, "next_action": "finalize"}"#.to_string())
            } else {
                Ok(bank_move(9))
            }
        });
        let asker = RecordingAsker::default();
        let notifier = RecordingNotifier::default();

        let result = agent
            .conduct_interview(&UserData::new("u-2b"), &asker, &notifier)
            .await
            .unwrap();

        assert_eq!(result.questions_asked, 10);
        assert_eq!(result.recovered_faults, 2);
        assert_eq!(result.coverage.required_uncovered, 0);
        assert_eq!(result.coverage.uncovered, 6);
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_two_weak_answers_then_forced_progression() {
        let agent = agent(|input| {
            if input.current_point_id.as_deref() == Some("project_essence") {
                Ok(clarifying(3, "Can you be more specific?"))
            } else {
                Ok(bank_move(8))
            }
        });
        let asker = RecordingAsker::default();

        let result = agent
            .conduct_interview(&UserData::new("u-3"), &asker, &RecordingNotifier::default())
            .await
            .unwrap();

        let essence_turns: Vec<_> = result
            .dialogue_history
            .iter()
            .filter(|t| t.point_id == "project_essence")
            .collect();
        assert_eq!(essence_turns.len(), 3);
        assert_eq!(essence_turns.iter().filter(|t| t.is_clarifying).count(), 2);
        assert_eq!(result.follow_ups_asked, 2);
        // the turn after the second follow-up moves on
        assert_eq!(result.dialogue_history[4].point_id, "problem");
        assert_eq!(result.questions_asked, 12);
    }

    #[tokio::test]
    async fn test_unparseable_decision_does_not_abort() {
        let agent = agent(|input| {
            if input.questions_asked == 1 {
                Ok("the model had a bad day".to_string())
            } else {
                Ok(bank_move(8))
            }
        });
        let asker = RecordingAsker::default();

        let result = agent
            .conduct_interview(&UserData::new("u-4"), &asker, &RecordingNotifier::default())
            .await
            .unwrap();

        assert_eq!(result.dialogue_history[1].point_id, "project_essence");
        assert_eq!(result.recovered_faults, 1);
        assert_eq!(result.questions_asked, 10);
    }

    #[tokio::test]
    async fn test_decision_call_failure_aborts() {
        let agent = agent(|input| {
            if input.questions_asked >= 3 {
                anyhow::bail!("upstream timeout")
            }
            Ok(bank_move(8))
        });
        let asker = RecordingAsker::default();
        let notifier = RecordingNotifier::default();

        let err = agent
            .conduct_interview(&UserData::new("u-5"), &asker, &notifier)
            .await
            .unwrap_err();

        assert!(matches!(err, InterviewError::DecisionCall { turn: 3, .. }));
        assert!(notifier.messages.lock().unwrap().is_empty());
    }

    struct FailingAsker;

    #[async_trait]
    impl QuestionAsker for FailingAsker {
        async fn ask(&self, _question: &str) -> anyhow::Result<String> {
            anyhow::bail!("user left the chat")
        }
    }

    #[tokio::test]
    async fn test_ask_failure_aborts() {
        let agent = agent(|_| Ok(bank_move(8)));
        let err = agent
            .conduct_interview(&UserData::new("u-6"), &FailingAsker, &RecordingNotifier::default())
            .await
            .unwrap_err();
        assert!(matches!(err, InterviewError::Ask { turn: 1, .. }));
    }

    struct FirstBlockWeak {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl BlockAuditor for FirstBlockWeak {
        async fn audit_block(&self, block: &[DialogueTurn]) -> anyhow::Result<BlockAudit> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            assert!(!block.is_empty());
            if *calls == 1 {
                Ok(BlockAudit {
                    score: 3,
                    weak_points: vec!["problem".into(), "budget".into()],
                    feedback: "Problem statement is vague".into(),
                })
            } else {
                Ok(BlockAudit {
                    score: 9,
                    weak_points: vec![],
                    feedback: "Fine".into(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_weak_block_queues_clarification_for_points_in_block() {
        let agent = agent(|_| Ok(bank_move(8))).with_auditor(Arc::new(FirstBlockWeak {
            calls: Mutex::new(0),
        }));
        let asker = RecordingAsker::default();

        let result = agent
            .conduct_interview(&UserData::new("u-7"), &asker, &RecordingNotifier::default())
            .await
            .unwrap();

        let first = &result.interactive_feedback[0];
        assert_eq!(first.score, 3);
        // budget was not discussed in the first block
        assert_eq!(first.clarifications_queued, 1);
        assert_eq!(result.follow_ups_asked, 1);
        let follow_up = &result.dialogue_history[5];
        assert!(follow_up.is_clarifying);
        assert_eq!(follow_up.point_id, "problem");
        assert!(result.audit_score < 9.0);
    }

    struct MemoryStore;

    #[async_trait]
    impl AnketaStore for MemoryStore {
        async fn save(&self, anketa: &Anketa, user: &UserData) -> anyhow::Result<String> {
            Ok(format!("{}-{}", user.user_id, anketa.len()))
        }
    }

    #[tokio::test]
    async fn test_store_assigns_anketa_id() {
        let agent = agent(|_| Ok(bank_move(8))).with_store(Arc::new(MemoryStore));
        let result = agent
            .conduct_interview(
                &UserData::new("u-8"),
                &RecordingAsker::default(),
                &RecordingNotifier::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.anketa_id.as_deref(), Some("u-8-10"));
    }
}
