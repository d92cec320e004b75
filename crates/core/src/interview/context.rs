//! Per-session conversation context.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One question/answer exchange
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogueTurn {
    pub question: String,
    pub answer: String,
    /// Reference point the question targeted
    pub point_id: String,
    pub is_clarifying: bool,
    pub timestamp: DateTime<Utc>,
}

/// Everything the interview has accumulated so far.
///
/// Owned by exactly one `InteractiveInterviewerAgent`; `dialogue_history`
/// only ever grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub questions_asked: u32,
    pub follow_ups_asked: u32,
    dialogue_history: Vec<DialogueTurn>,
    pub asked_ids: BTreeSet<String>,
    pub skipped_ids: BTreeSet<String>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed exchange and update the counters
    pub fn record(&mut self, question: &str, answer: &str, point_id: &str, is_clarifying: bool) {
        self.questions_asked += 1;
        if is_clarifying {
            self.follow_ups_asked += 1;
        }
        self.asked_ids.insert(point_id.to_string());
        self.dialogue_history.push(DialogueTurn {
            question: question.to_string(),
            answer: answer.to_string(),
            point_id: point_id.to_string(),
            is_clarifying,
            timestamp: Utc::now(),
        });
    }

    pub fn history(&self) -> &[DialogueTurn] {
        &self.dialogue_history
    }

    pub fn last_turn(&self) -> Option<&DialogueTurn> {
        self.dialogue_history.last()
    }

    /// Turns after index `from`, used for block audits
    pub fn turns_since(&self, from: usize) -> &[DialogueTurn] {
        let from = from.min(self.dialogue_history.len());
        &self.dialogue_history[from..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_counters() {
        let mut ctx = ConversationContext::new();
        ctx.record("Name?", "Green Yard", "project_name", false);
        ctx.record("More detail?", "A courtyard garden", "project_name", true);

        assert_eq!(ctx.questions_asked, 2);
        assert_eq!(ctx.follow_ups_asked, 1);
        assert_eq!(ctx.asked_ids.len(), 1);
        assert_eq!(ctx.history().len(), 2);
        assert!(ctx.last_turn().unwrap().is_clarifying);
    }

    #[test]
    fn test_turns_since_clamps() {
        let mut ctx = ConversationContext::new();
        ctx.record("Q1", "A1", "a", false);
        ctx.record("Q2", "A2", "b", false);

        assert_eq!(ctx.turns_since(1).len(), 1);
        assert!(ctx.turns_since(10).is_empty());
    }
}
