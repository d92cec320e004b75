//! # Conversation Flow
//!
//! Turn-level state machine for the interview.
//!
//! ```text
//! Init ──start──▶ Asking ──begin_wait──▶ AwaitingAnswer ──apply──┬──▶ Asking
//!                    ▲                                          ├──▶ Clarifying ──begin_wait──▶ ...
//!                    └──────────────────────────────────────────┘
//!                                                                └──▶ Finalizing ──finish──▶ Done
//! ```
//!
//! The manager never talks to the outside world. The agent feeds it validated
//! (or rejected) decisions and it answers with the next [`FlowStep`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::context::ConversationContext;
use super::decision::{Decision, DecisionInput, TurnDecision};
use super::reference_points::{
    default_bank, Coverage, ReferencePoint, ReferencePointManager, PROJECT_NAME_ID,
};
use crate::error::{DecisionParseError, FlowFault};

/// Minimum number of questions before the interview may finish
pub const MIN_QUESTIONS: u32 = 8;

const DEFAULT_MAX_QUESTIONS: u32 = 24;
const DEFAULT_CLARIFY_THRESHOLD: u8 = 6;
const FALLBACK_OPENING_QUESTION: &str = "What is the name of your project?";

/// Tunables for the flow manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Questions required before finalize is allowed
    pub min_questions: u32,
    /// Hard stop; the interview finalizes once this many questions were asked
    pub max_questions: u32,
    /// Answers scored below this are followed up even if the model moves on
    pub clarify_threshold: u8,
}

impl FlowConfig {
    /// Raise `min_questions` to [`MIN_QUESTIONS`] and `max_questions` to
    /// `min_questions`, so the hard stop can never cut the interview short
    pub fn normalized(mut self) -> Self {
        if self.min_questions < MIN_QUESTIONS {
            tracing::warn!(
                min_questions = self.min_questions,
                "min_questions below {}, raising it",
                MIN_QUESTIONS
            );
            self.min_questions = MIN_QUESTIONS;
        }
        if self.max_questions < self.min_questions {
            tracing::warn!(
                max_questions = self.max_questions,
                min_questions = self.min_questions,
                "max_questions below min_questions, raising it"
            );
            self.max_questions = self.min_questions;
        }
        self
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_questions: MIN_QUESTIONS,
            max_questions: DEFAULT_MAX_QUESTIONS,
            clarify_threshold: DEFAULT_CLARIFY_THRESHOLD,
        }
    }
}

/// State of the flow machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Init,
    Asking,
    AwaitingAnswer,
    Clarifying,
    Finalizing,
    Done,
}

/// Why a question is being asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// The fixed project-name question
    Opening,
    Bank,
    Clarifying,
    /// A previously skipped or covered point asked again to reach the minimum
    Reask,
}

/// A question to put to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub point_id: String,
    pub kind: QuestionKind,
}

impl Question {
    pub fn is_clarifying(&self) -> bool {
        self.kind == QuestionKind::Clarifying
    }
}

/// What the agent should do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStep {
    Ask(Question),
    /// Terminal. The message is a notification, not a question.
    Finalize { message: String },
}

#[derive(Debug, Clone)]
struct PendingClarification {
    point_id: String,
    text: String,
}

/// Decides, turn by turn, what to ask next and when to stop
#[derive(Debug)]
pub struct ConversationFlowManager {
    points: ReferencePointManager,
    config: FlowConfig,
    state: FlowState,
    current: Option<Question>,
    pending: VecDeque<PendingClarification>,
    faults: Vec<FlowFault>,
    quality_scores: Vec<u8>,
    should_finish: bool,
}

impl ConversationFlowManager {
    /// Create a flow over the given checklist. An empty checklist is replaced
    /// by the default bank.
    pub fn new(points: ReferencePointManager, config: FlowConfig) -> Self {
        let points = if points.is_empty() {
            tracing::warn!("Empty reference point bank, using the default bank");
            let mut manager = ReferencePointManager::new();
            manager.register(default_bank());
            manager
        } else {
            points
        };

        Self {
            points,
            config: config.normalized(),
            state: FlowState::Init,
            current: None,
            pending: VecDeque::new(),
            faults: Vec::new(),
            quality_scores: Vec::new(),
            should_finish: false,
        }
    }

    pub fn with_default_bank() -> Self {
        Self::new(ReferencePointManager::with_default_bank(), FlowConfig::default())
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn points(&self) -> &ReferencePointManager {
        &self.points
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    pub fn current_point_id(&self) -> Option<&str> {
        self.current.as_ref().map(|q| q.point_id.as_str())
    }

    pub fn should_finish(&self) -> bool {
        self.should_finish
    }

    /// Faults absorbed so far
    pub fn faults(&self) -> &[FlowFault] {
        &self.faults
    }

    /// Mean of the answer quality scores reported by valid decisions
    pub fn mean_answer_quality(&self) -> Option<f32> {
        if self.quality_scores.is_empty() {
            return None;
        }
        let sum: u32 = self.quality_scores.iter().map(|&q| q as u32).sum();
        Some(sum as f32 / self.quality_scores.len() as f32)
    }

    /// Init → Asking. Always the project-name question, whatever the model says.
    pub fn start(&mut self) -> Question {
        if self.state != FlowState::Init {
            if let Some(current) = &self.current {
                return current.clone();
            }
        }

        let text = self
            .points
            .get(PROJECT_NAME_ID)
            .map(|p| p.question().to_string())
            .unwrap_or_else(|| FALLBACK_OPENING_QUESTION.to_string());
        let question = Question {
            text,
            point_id: PROJECT_NAME_ID.to_string(),
            kind: QuestionKind::Opening,
        };
        self.current = Some(question.clone());
        self.state = FlowState::Asking;
        question
    }

    /// Asking/Clarifying → AwaitingAnswer, right before the question goes out
    pub fn begin_wait(&mut self) {
        if matches!(self.state, FlowState::Asking | FlowState::Clarifying) {
            self.state = FlowState::AwaitingAnswer;
        }
    }

    /// Build the decision function input for the answer just recorded
    pub fn decision_input(&self, ctx: &ConversationContext) -> DecisionInput {
        DecisionInput::from_context(
            ctx,
            self.points.remaining_ids(),
            self.current_point_id().map(str::to_string),
        )
    }

    /// Queue a follow-up for a point, e.g. after a weak block audit.
    /// Ignored for unknown points, points at the cap, or points already queued.
    pub fn queue_clarification(&mut self, point_id: &str, text: impl Into<String>) -> bool {
        let eligible = self
            .points
            .get(point_id)
            .map(ReferencePoint::can_clarify)
            .unwrap_or(false);
        if !eligible || self.pending.iter().any(|p| p.point_id == point_id) {
            return false;
        }
        self.pending.push_back(PendingClarification {
            point_id: point_id.to_string(),
            text: text.into(),
        });
        true
    }

    /// AwaitingAnswer → next step, given the decision for the last answer.
    ///
    /// A rejected decision is absorbed here and replaced with the
    /// deterministic priority-order fallback.
    pub fn apply(
        &mut self,
        ctx: &mut ConversationContext,
        decision: Result<TurnDecision, DecisionParseError>,
    ) -> FlowStep {
        if self.state != FlowState::AwaitingAnswer {
            tracing::warn!(state = ?self.state, "Decision applied outside AwaitingAnswer");
        }

        let decision = match decision {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed decision, falling back to priority order");
                self.faults.push(e.into());
                return self.progress(ctx, None);
            }
        };

        self.quality_scores.push(decision.analysis.answer_quality);
        self.absorb_covered(ctx, &decision.analysis.covered_questions);

        if ctx.questions_asked >= self.config.max_questions {
            self.mark_current_covered();
            return self.finalize(ctx);
        }

        match decision.action {
            Decision::Finalize => match self.check_finalize(ctx) {
                Ok(()) => {
                    self.mark_current_covered();
                    self.finalize(ctx)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Finalize rejected, falling back");
                    self.faults.push(e.into());
                    self.progress(ctx, None)
                }
            },
            Decision::AskClarifying(text) => self.clarify_current(ctx, text),
            Decision::AskFromBank(target) => {
                if decision.analysis.answer_quality < self.config.clarify_threshold {
                    let text = self.follow_up_text(&decision.analysis.missing_info);
                    self.clarify_current(ctx, text)
                } else {
                    self.progress(ctx, target)
                }
            }
        }
    }

    /// Finalizing → Done
    pub fn finish(&mut self) {
        if self.state == FlowState::Finalizing {
            self.state = FlowState::Done;
        }
    }

    fn absorb_covered(&mut self, ctx: &mut ConversationContext, covered: &[String]) {
        let current = self.current_point_id().map(str::to_string);
        for id in covered {
            if current.as_deref() == Some(id.as_str()) {
                continue;
            }
            self.points.mark_skipped(id);
            if self.points.get(id).map(|p| p.coverage) == Some(Coverage::Skipped) {
                ctx.skipped_ids.insert(id.clone());
            }
        }
    }

    fn check_finalize(&self, ctx: &ConversationContext) -> Result<(), DecisionParseError> {
        if ctx.questions_asked < self.config.min_questions {
            return Err(DecisionParseError::PrematureFinalize {
                asked: ctx.questions_asked,
                min: self.config.min_questions,
            });
        }
        // the answer just given covers the current point
        let current = self.current_point_id();
        let uncovered = self
            .points
            .remaining()
            .iter()
            .filter(|p| p.priority.is_required() && Some(p.id.as_str()) != current)
            .count();
        if uncovered > 0 {
            return Err(DecisionParseError::RequiredPointsUncovered(uncovered));
        }
        Ok(())
    }

    fn follow_up_text(&self, missing_info: &[String]) -> String {
        if !missing_info.is_empty() {
            return format!(
                "Could you add a bit more detail? In particular: {}.",
                missing_info.join("; ")
            );
        }
        match self.current.as_ref().and_then(|q| self.points.get(&q.point_id)) {
            Some(point) => format!(
                "Could you expand on that a little? {}",
                point.alternate_question()
            ),
            None => "Could you expand on that a little?".to_string(),
        }
    }

    fn clarify_current(&mut self, ctx: &mut ConversationContext, text: String) -> FlowStep {
        let Some(point_id) = self.current_point_id().map(str::to_string) else {
            return self.progress(ctx, None);
        };
        self.clarify(ctx, &point_id, text)
    }

    fn clarify(&mut self, ctx: &mut ConversationContext, point_id: &str, text: String) -> FlowStep {
        if !self.points.increment_clarification(point_id) {
            tracing::info!(point_id, "Clarification cap reached, moving on");
            self.faults.push(FlowFault::ClarificationCapExceeded {
                point_id: point_id.to_string(),
            });
            return self.progress(ctx, None);
        }

        let question = Question {
            text,
            point_id: point_id.to_string(),
            kind: QuestionKind::Clarifying,
        };
        self.current = Some(question.clone());
        self.state = FlowState::Clarifying;
        FlowStep::Ask(question)
    }

    fn mark_current_covered(&mut self) {
        if let Some(id) = self.current_point_id().map(str::to_string) {
            self.points.mark_covered(&id);
        }
    }

    /// Leave the current point and pick what comes next
    fn progress(&mut self, ctx: &mut ConversationContext, target: Option<String>) -> FlowStep {
        self.mark_current_covered();

        if ctx.questions_asked >= self.config.max_questions {
            return self.finalize(ctx);
        }

        while let Some(pending) = self.pending.pop_front() {
            if self
                .points
                .get(&pending.point_id)
                .is_some_and(ReferencePoint::can_clarify)
            {
                return self.clarify(ctx, &pending.point_id, pending.text);
            }
        }

        if ctx.questions_asked >= self.config.min_questions && !self.points.has_uncovered_required()
        {
            return self.finalize(ctx);
        }

        let requested = target.and_then(|id| {
            self.points
                .get(&id)
                .filter(|p| p.coverage == Coverage::Uncovered)
                .cloned()
        });
        if let Some(point) = requested.or_else(|| self.points.next_uncovered().cloned()) {
            return self.ask_point(&point, QuestionKind::Bank);
        }

        if ctx.questions_asked >= self.config.min_questions {
            return self.finalize(ctx);
        }
        self.recover_stalemate(ctx)
    }

    /// Everything is consumed but the minimum has not been reached
    fn recover_stalemate(&mut self, ctx: &mut ConversationContext) -> FlowStep {
        tracing::info!(
            questions_asked = ctx.questions_asked,
            "Coverage stalemate, re-asking a point"
        );
        self.faults.push(FlowFault::CoverageStalemate {
            questions_asked: ctx.questions_asked,
        });

        if let Some(point) = self.points.lowest_priority_skipped().cloned() {
            self.points.reopen(&point.id);
            ctx.skipped_ids.remove(&point.id);
            return self.ask_point(&point, QuestionKind::Reask);
        }

        let fallback = self
            .points
            .lowest_priority_covered()
            .or_else(|| self.points.all().last())
            .cloned();
        match fallback {
            Some(point) => self.ask_point(&point, QuestionKind::Reask),
            None => self.finalize(ctx),
        }
    }

    fn ask_point(&mut self, point: &ReferencePoint, kind: QuestionKind) -> FlowStep {
        let text = match kind {
            QuestionKind::Reask => point.alternate_question(),
            _ => point.question(),
        };
        let question = Question {
            text: text.to_string(),
            point_id: point.id.clone(),
            kind,
        };
        self.current = Some(question.clone());
        self.state = FlowState::Asking;
        FlowStep::Ask(question)
    }

    fn finalize(&mut self, ctx: &ConversationContext) -> FlowStep {
        let summary = self.points.coverage_summary();
        self.state = FlowState::Finalizing;
        self.should_finish = true;
        self.current = None;
        self.pending.clear();

        FlowStep::Finalize {
            message: format!(
                "Thank you! The interview is complete: {} questions answered, {} of {} topics covered. \
                 Your answers are being compiled into the application form.",
                ctx.questions_asked,
                summary.covered + summary.skipped,
                summary.total
            ),
        }
    }
}
