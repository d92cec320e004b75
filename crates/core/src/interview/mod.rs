//! # Adaptive Interview
//!
//! Collects project information through a multi-turn conversation.
//!
//! ```text
//! answer → DecisionFunction → TurnDecision::parse → ConversationFlowManager
//!        → next question (QuestionAsker) | finalize (Notifier) → Anketa
//! ```

pub mod agent;
pub mod anketa;
pub mod audit;
pub mod channel;
pub mod context;
pub mod decision;
pub mod flow;
pub mod reference_points;

pub use agent::{InteractiveInterviewerAgent, InterviewConfig, InterviewResult, UserData};
pub use anketa::{Anketa, AnketaStore};
pub use audit::{BlockAudit, BlockAuditor, FeedbackItem};
pub use channel::{
    question_channel, ChannelAsker, ChannelNotifier, Notifier, PendingQuestion, QuestionAsker,
    TracingNotifier,
};
pub use context::{ConversationContext, DialogueTurn};
pub use decision::{Decision, DecisionFunction, DecisionInput, TurnAnalysis, TurnDecision};
pub use flow::{
    ConversationFlowManager, FlowConfig, FlowState, FlowStep, Question, QuestionKind,
    MIN_QUESTIONS,
};
pub use reference_points::{
    default_bank, Coverage, CoverageSummary, PointCategory, Priority, ReferencePoint,
    ReferencePointManager, MAX_CLARIFICATIONS, PROJECT_NAME_ID,
};
