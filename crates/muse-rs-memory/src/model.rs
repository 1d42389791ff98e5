//! Iteration record model shared by the store and its sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-criterion result parsed from an evaluator response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CriterionAssessment {
    /// Score on the criterion's rubric, when one was parsed.
    pub score: Option<f64>,
    /// Short justification for the score.
    #[serde(default)]
    pub explanation: String,
    /// Actionable improvement suggestions.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Evaluator output for one iteration.
///
/// Structured when at least one criterion section was recognized; the raw
/// response text otherwise, so nothing the model said is lost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evaluation {
    /// Per-criterion assessments keyed by criterion name.
    Structured {
        criteria: BTreeMap<String, CriterionAssessment>,
    },
    /// Unparsed response text.
    Raw { text: String },
}

impl Evaluation {
    /// Render the evaluation as plain text for prompt assembly.
    pub fn display_text(&self) -> String {
        match self {
            Evaluation::Structured { criteria } => {
                let mut lines = Vec::new();
                for (criterion, assessment) in criteria {
                    let score = assessment
                        .score
                        .map_or_else(|| "n/a".to_string(), |score| format!("{score}"));
                    lines.push(format!("{criterion}: {score}"));
                    if !assessment.explanation.is_empty() {
                        lines.push(format!("  {}", assessment.explanation));
                    }
                    for suggestion in &assessment.suggestions {
                        lines.push(format!("  - {suggestion}"));
                    }
                }
                lines.join("\n")
            }
            Evaluation::Raw { text } => text.clone(),
        }
    }
}

/// Human ratings and comments for one iteration, keyed by criterion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserEvaluation {
    /// Numeric score per criterion, each within `[0, 10]`.
    pub scores: BTreeMap<String, f64>,
    /// Free-text comment per criterion.
    #[serde(default)]
    pub feedback: BTreeMap<String, String>,
}

impl UserEvaluation {
    /// Arithmetic mean of the criterion scores; `None` when no scores exist.
    ///
    /// Always recomputed from the score map so the value can never drift
    /// from its inputs.
    pub fn mean_score(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        let total: f64 = self.scores.values().sum();
        Some(total / self.scores.len() as f64)
    }
}

/// Structured output of the feedback synthesizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackReport {
    /// Overall analysis of the interaction.
    #[serde(default)]
    pub overall_analysis: String,
    /// Suggestions for the content creator, keyed by criterion.
    #[serde(default)]
    pub creator_feedback: BTreeMap<String, Vec<String>>,
    /// Suggestions for the evaluator, keyed by criterion.
    #[serde(default)]
    pub evaluator_feedback: BTreeMap<String, Vec<String>>,
    /// Free-text verdict on whether another iteration is warranted.
    #[serde(default)]
    pub improvements_needed: String,
}

impl FeedbackReport {
    /// Whether the verdict calls for another iteration.
    ///
    /// Derived from the free text: the verdict counts as affirmative when
    /// it contains "YES" case-insensitively.
    pub fn needs_improvement(&self) -> bool {
        self.improvements_needed.to_uppercase().contains("YES")
    }
}

/// Feedback synthesizer output for one iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackSynthesis {
    /// Parsed section-structured report.
    Structured { report: FeedbackReport },
    /// Unparsed response text.
    Raw { text: String },
}

impl FeedbackSynthesis {
    /// Render the synthesis as plain text for prompt assembly.
    pub fn display_text(&self) -> String {
        match self {
            FeedbackSynthesis::Structured { report } => {
                let mut parts = Vec::new();
                if !report.overall_analysis.is_empty() {
                    parts.push(report.overall_analysis.clone());
                }
                if !report.improvements_needed.is_empty() {
                    parts.push(format!("Improvements needed: {}", report.improvements_needed));
                }
                parts.join("\n")
            }
            FeedbackSynthesis::Raw { text } => text.clone(),
        }
    }

    /// Whether the synthesis calls for another iteration.
    pub fn needs_improvement(&self) -> bool {
        match self {
            FeedbackSynthesis::Structured { report } => report.needs_improvement(),
            FeedbackSynthesis::Raw { text } => text.to_uppercase().contains("YES"),
        }
    }
}

/// One full generate/evaluate/rate cycle.
///
/// Immutable after creation: incorporating feedback appends a new
/// iteration rather than editing one in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Iteration {
    /// Monotonic identifier within the session, assigned at append time.
    pub id: u64,
    /// Session token grouping this iteration with its lineage.
    pub session_id: String,
    /// Creation time, assigned once.
    pub timestamp: DateTime<Utc>,
    /// Objective the content was generated for.
    pub prompt: String,
    /// Generated artifact.
    pub content: String,
    /// Evaluator output.
    pub ai_evaluation: Evaluation,
    /// Human ratings and comments.
    pub user_evaluation: UserEvaluation,
    /// Free-text human feedback on the evaluator itself.
    #[serde(default)]
    pub user_feedback_on_evaluator: String,
    /// Feedback synthesizer output.
    pub feedback_synthesis: FeedbackSynthesis,
}

impl Iteration {
    /// Mean of the human criterion scores; `None` when the map is empty.
    pub fn total_score(&self) -> Option<f64> {
        self.user_evaluation.mean_score()
    }
}
