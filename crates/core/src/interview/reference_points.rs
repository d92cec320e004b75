//! # Reference Points
//!
//! The fixed checklist of topics an interview must cover, and the coverage
//! state of each topic for one session.

use serde::{Deserialize, Serialize};

/// Maximum number of clarifying follow-ups per reference point
pub const MAX_CLARIFICATIONS: u8 = 2;

/// Id of the fixed opening question
pub const PROJECT_NAME_ID: &str = "project_name";

/// Priority of a reference point (P0 is asked first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl Priority {
    /// P0 and P1 points must be covered before the interview may finish
    pub fn is_required(&self) -> bool {
        matches!(self, Priority::P0 | Priority::P1)
    }
}

/// Thematic grouping of reference points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    Identity,
    Problem,
    Audience,
    Plan,
    Resources,
    Outcomes,
    Context,
}

/// Coverage status of a reference point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    #[default]
    Uncovered,
    Covered,
    /// Answered indirectly, according to the decision function
    Skipped,
}

/// One required topic in the interview checklist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub id: String,
    /// Question texts; the first one is asked by default
    pub questions: Vec<String>,
    pub priority: Priority,
    pub category: PointCategory,
    /// Anketa field the answers are folded into
    pub field: String,
    #[serde(default)]
    pub coverage: Coverage,
    #[serde(default)]
    pub clarification_count: u8,
}

impl ReferencePoint {
    pub fn new(
        id: &str,
        priority: Priority,
        category: PointCategory,
        field: &str,
        questions: &[&str],
    ) -> Self {
        Self {
            id: id.to_string(),
            questions: questions.iter().map(|q| q.to_string()).collect(),
            priority,
            category,
            field: field.to_string(),
            coverage: Coverage::Uncovered,
            clarification_count: 0,
        }
    }

    /// Primary question text
    pub fn question(&self) -> &str {
        self.questions.first().map(String::as_str).unwrap_or(&self.id)
    }

    /// Alternate wording for re-asking, falling back to the primary text
    pub fn alternate_question(&self) -> &str {
        self.questions
            .get(1)
            .map(String::as_str)
            .unwrap_or_else(|| self.question())
    }

    pub fn can_clarify(&self) -> bool {
        self.clarification_count < MAX_CLARIFICATIONS
    }
}

/// Aggregate coverage counts, used for logging and feedback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total: usize,
    pub covered: usize,
    pub skipped: usize,
    pub uncovered: usize,
    pub required_uncovered: usize,
}

/// Owns the checklist and its coverage state.
///
/// Ids coming in from the decision function are untrusted, so every
/// mutator ignores ids it does not know.
#[derive(Debug, Clone, Default)]
pub struct ReferencePointManager {
    points: Vec<ReferencePoint>,
}

impl ReferencePointManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager pre-loaded with [`default_bank`]
    pub fn with_default_bank() -> Self {
        let mut manager = Self::new();
        manager.register(default_bank());
        manager
    }

    /// Load points, keeping them stable-sorted by priority.
    /// A point whose id is already registered is dropped.
    pub fn register(&mut self, points: Vec<ReferencePoint>) {
        for point in points {
            if self.get(&point.id).is_some() {
                tracing::debug!(point_id = %point.id, "Duplicate reference point ignored");
                continue;
            }
            self.points.push(point);
        }
        // sort_by_key is stable, so bank order breaks ties
        self.points.sort_by_key(|p| p.priority);
    }

    pub fn get(&self, id: &str) -> Option<&ReferencePoint> {
        self.points.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ReferencePoint> {
        self.points.iter_mut().find(|p| p.id == id)
    }

    pub fn all(&self) -> &[ReferencePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn mark_covered(&mut self, id: &str) {
        if let Some(point) = self.get_mut(id) {
            point.coverage = Coverage::Covered;
        }
    }

    /// Mark a point as indirectly answered. Covered points stay covered.
    pub fn mark_skipped(&mut self, id: &str) {
        if let Some(point) = self.get_mut(id) {
            if point.coverage == Coverage::Uncovered {
                point.coverage = Coverage::Skipped;
            }
        }
    }

    /// Put a point back into the uncovered pool
    pub fn reopen(&mut self, id: &str) {
        if let Some(point) = self.get_mut(id) {
            point.coverage = Coverage::Uncovered;
        }
    }

    /// Count one clarification against a point.
    /// Returns false (and changes nothing) once the cap is reached.
    pub fn increment_clarification(&mut self, id: &str) -> bool {
        match self.get_mut(id) {
            Some(point) if point.can_clarify() => {
                point.clarification_count += 1;
                true
            }
            _ => false,
        }
    }

    /// Uncovered points, P0 before P1 before P2, bank order as tie-break
    pub fn remaining(&self) -> Vec<&ReferencePoint> {
        self.points
            .iter()
            .filter(|p| p.coverage == Coverage::Uncovered)
            .collect()
    }

    pub fn remaining_ids(&self) -> Vec<String> {
        self.remaining().into_iter().map(|p| p.id.clone()).collect()
    }

    pub fn next_uncovered(&self) -> Option<&ReferencePoint> {
        self.points
            .iter()
            .find(|p| p.coverage == Coverage::Uncovered)
    }

    /// Whether any P0/P1 point is still uncovered
    pub fn has_uncovered_required(&self) -> bool {
        self.points
            .iter()
            .any(|p| p.priority.is_required() && p.coverage == Coverage::Uncovered)
    }

    pub fn skipped(&self) -> Vec<&ReferencePoint> {
        self.points
            .iter()
            .filter(|p| p.coverage == Coverage::Skipped)
            .collect()
    }

    /// Last skipped point in priority order
    pub fn lowest_priority_skipped(&self) -> Option<&ReferencePoint> {
        self.points
            .iter()
            .rev()
            .find(|p| p.coverage == Coverage::Skipped)
    }

    /// Last covered point in priority order, skipping the opening question
    pub fn lowest_priority_covered(&self) -> Option<&ReferencePoint> {
        self.points
            .iter()
            .rev()
            .find(|p| p.coverage == Coverage::Covered && p.id != PROJECT_NAME_ID)
    }

    pub fn coverage_summary(&self) -> CoverageSummary {
        let mut summary = CoverageSummary {
            total: self.points.len(),
            ..CoverageSummary::default()
        };
        for point in &self.points {
            match point.coverage {
                Coverage::Covered => summary.covered += 1,
                Coverage::Skipped => summary.skipped += 1,
                Coverage::Uncovered => {
                    summary.uncovered += 1;
                    if point.priority.is_required() {
                        summary.required_uncovered += 1;
                    }
                }
            }
        }
        summary
    }
}

/// The fixed grant-application checklist.
///
/// Ten required points (P0/P1) followed by six optional ones. The first
/// point is always the project name.
pub fn default_bank() -> Vec<ReferencePoint> {
    use PointCategory::*;
    use Priority::*;

    vec![
        ReferencePoint::new(
            PROJECT_NAME_ID,
            P0,
            Identity,
            "project_name",
            &[
                "What is the name of your project?",
                "How would you title the project in the application?",
            ],
        ),
        ReferencePoint::new(
            "project_essence",
            P0,
            Identity,
            "project_description",
            &[
                "Describe the essence of the project in a few sentences: what exactly will you do?",
                "If you had one minute to explain the project to a grant expert, what would you say?",
            ],
        ),
        ReferencePoint::new(
            "problem",
            P0,
            Problem,
            "problem_statement",
            &[
                "What social problem does the project solve? Why is it important right now?",
                "What evidence do you have that this problem exists in your region?",
            ],
        ),
        ReferencePoint::new(
            "target_audience",
            P0,
            Audience,
            "target_audience",
            &[
                "Who is the target audience of the project, and roughly how many people will it reach?",
                "Describe the people who will benefit from the project most directly.",
            ],
        ),
        ReferencePoint::new(
            "goal",
            P0,
            Plan,
            "project_goal",
            &[
                "What is the main goal of the project? How will you know it has been achieved?",
                "Formulate the project goal so that its achievement can be measured.",
            ],
        ),
        ReferencePoint::new(
            "tasks",
            P1,
            Plan,
            "project_tasks",
            &[
                "Which tasks must be completed to reach the goal?",
                "List the key steps of the project in the order you plan to carry them out.",
            ],
        ),
        ReferencePoint::new(
            "activities",
            P1,
            Plan,
            "activities_plan",
            &[
                "What specific events or activities are planned, and when?",
                "Walk me through the project calendar month by month.",
            ],
        ),
        ReferencePoint::new(
            "budget",
            P1,
            Resources,
            "budget",
            &[
                "What budget does the project need, and what are the main expense items?",
                "How much funding are you requesting, and what will the largest share be spent on?",
            ],
        ),
        ReferencePoint::new(
            "expected_results",
            P1,
            Outcomes,
            "expected_results",
            &[
                "What quantitative and qualitative results do you expect?",
                "Which numbers will show that the project worked?",
            ],
        ),
        ReferencePoint::new(
            "team",
            P1,
            Resources,
            "team",
            &[
                "Who is on the project team, and what experience do they bring?",
                "Which team member is responsible for what?",
            ],
        ),
        ReferencePoint::new(
            "geography",
            P2,
            Context,
            "geography",
            &[
                "Where will the project take place: which region, city or district?",
                "Which territories does the project cover?",
            ],
        ),
        ReferencePoint::new(
            "timeline",
            P2,
            Plan,
            "timeline",
            &[
                "What are the start and end dates of the project?",
                "How long will the project run?",
            ],
        ),
        ReferencePoint::new(
            "partners",
            P2,
            Resources,
            "partners",
            &[
                "Which partners support the project, and how?",
                "Are there organisations that have agreed to help with resources or information?",
            ],
        ),
        ReferencePoint::new(
            "co_financing",
            P2,
            Resources,
            "co_financing",
            &[
                "Is there co-financing or in-kind contribution from your side or from partners?",
                "What resources besides the grant will the project use?",
            ],
        ),
        ReferencePoint::new(
            "sustainability",
            P2,
            Outcomes,
            "sustainability",
            &[
                "How will the project continue after the grant ends?",
                "What will remain in place once the funding period is over?",
            ],
        ),
        ReferencePoint::new(
            "risks",
            P2,
            Context,
            "risks",
            &[
                "What risks do you see for the project, and how will you mitigate them?",
                "What could go wrong, and what is your plan B?",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, priority: Priority) -> ReferencePoint {
        ReferencePoint::new(id, priority, PointCategory::Context, id, &["q?"])
    }

    #[test]
    fn test_default_bank_shape() {
        let bank = default_bank();
        assert_eq!(bank.len(), 16);
        assert_eq!(bank[0].id, PROJECT_NAME_ID);
        let required = bank.iter().filter(|p| p.priority.is_required()).count();
        assert_eq!(required, 10);
        assert!(bank.iter().all(|p| p.questions.len() >= 2));
    }

    #[test]
    fn test_remaining_is_priority_ordered_with_bank_tiebreak() {
        let mut manager = ReferencePointManager::new();
        manager.register(vec![
            point("c", Priority::P2),
            point("a", Priority::P0),
            point("d", Priority::P1),
            point("b", Priority::P0),
        ]);

        let ids = manager.remaining_ids();
        assert_eq!(ids, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_marks_are_idempotent_and_ignore_unknown_ids() {
        let mut manager = ReferencePointManager::with_default_bank();
        manager.mark_covered("budget");
        manager.mark_covered("budget");
        manager.mark_skipped("no_such_point");
        manager.mark_covered("no_such_point");

        assert_eq!(manager.get("budget").unwrap().coverage, Coverage::Covered);
        assert_eq!(manager.coverage_summary().covered, 1);
        assert_eq!(manager.len(), 16);
    }

    #[test]
    fn test_skip_does_not_downgrade_covered() {
        let mut manager = ReferencePointManager::with_default_bank();
        manager.mark_covered("team");
        manager.mark_skipped("team");
        assert_eq!(manager.get("team").unwrap().coverage, Coverage::Covered);

        manager.mark_skipped("risks");
        assert_eq!(manager.get("risks").unwrap().coverage, Coverage::Skipped);
        assert!(!manager.remaining_ids().contains(&"risks".to_string()));
    }

    #[test]
    fn test_clarification_cap() {
        let mut manager = ReferencePointManager::with_default_bank();
        assert!(manager.increment_clarification("goal"));
        assert!(manager.increment_clarification("goal"));
        assert!(!manager.increment_clarification("goal"));
        assert_eq!(
            manager.get("goal").unwrap().clarification_count,
            MAX_CLARIFICATIONS
        );
        assert!(!manager.increment_clarification("unknown"));
    }

    #[test]
    fn test_required_coverage_tracking() {
        let mut manager = ReferencePointManager::with_default_bank();
        assert!(manager.has_uncovered_required());

        let required: Vec<String> = manager
            .all()
            .iter()
            .filter(|p| p.priority.is_required())
            .map(|p| p.id.clone())
            .collect();
        for id in &required {
            manager.mark_covered(id);
        }

        assert!(!manager.has_uncovered_required());
        let summary = manager.coverage_summary();
        assert_eq!(summary.required_uncovered, 0);
        assert_eq!(summary.uncovered, 6);
    }

    #[test]
    fn test_lowest_priority_skipped_and_reopen() {
        let mut manager = ReferencePointManager::with_default_bank();
        manager.mark_skipped("geography");
        manager.mark_skipped("risks");

        assert_eq!(manager.lowest_priority_skipped().unwrap().id, "risks");

        manager.reopen("risks");
        assert_eq!(manager.get("risks").unwrap().coverage, Coverage::Uncovered);
        assert_eq!(manager.lowest_priority_skipped().unwrap().id, "geography");
    }
}
