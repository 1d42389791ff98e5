//! Feedback synthesizer agent and its section parser.

use crate::criteria::CriteriaTable;
use crate::error::MuseCoreError;
use crate::gateway::CompletionGateway;
use crate::types::ChatMessage;
use log::debug;
use muse_rs_memory::{Evaluation, FeedbackReport, FeedbackSynthesis, Iteration, UserEvaluation};
use std::collections::BTreeMap;
use std::sync::Arc;

const SYSTEM_MESSAGE: &str = "You are an AI improvement specialist with expertise in content \
creation, evaluation, and system optimization. Your goal is to provide insightful analysis and \
actionable feedback to enhance AI performance.";

const OVERALL_MARKER: &str = "[Overall Analysis]";
const CREATOR_MARKER: &str = "[Feedback for Content Creator]";
const EVALUATOR_MARKER: &str = "[Feedback for Evaluator]";
const IMPROVEMENTS_MARKER: &str = "[Improvements Needed]";

const MARKERS: [&str; 4] = [
    OVERALL_MARKER,
    CREATOR_MARKER,
    EVALUATOR_MARKER,
    IMPROVEMENTS_MARKER,
];

/// Synthesizes the interaction into feedback for both agents.
pub struct FeedbackSynthesizer {
    gateway: Arc<dyn CompletionGateway>,
    model: String,
    system_message: String,
    criteria: CriteriaTable,
}

impl FeedbackSynthesizer {
    /// Create a synthesizer for the given model and criteria.
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        model: impl Into<String>,
        criteria: CriteriaTable,
    ) -> Self {
        Self {
            gateway,
            model: model.into(),
            system_message: SYSTEM_MESSAGE.to_string(),
            criteria,
        }
    }

    /// Analyze one interaction against its evaluations and recent history.
    pub async fn analyze(
        &self,
        recent: &[&Iteration],
        objective: &str,
        content: &str,
        evaluation: &Evaluation,
        user_evaluation: &UserEvaluation,
        user_feedback_on_evaluator: &str,
    ) -> Result<FeedbackSynthesis, MuseCoreError> {
        let mut prompt = format!(
            "Analyze the following interaction:\n\n\
Original Prompt: {objective}\n\n\
Generated Content:\n{content}\n\n\
AI Evaluation:\n{}\n\n\
User Evaluation:\n{}\n",
            evaluation.display_text(),
            render_user_evaluation(user_evaluation),
        );
        if !user_feedback_on_evaluator.is_empty() {
            prompt.push_str(&format!(
                "\nUser Feedback on the Evaluator:\n{user_feedback_on_evaluator}\n"
            ));
        }
        if !recent.is_empty() {
            prompt.push_str("\nRecent iterations for context:\n");
            for iteration in recent {
                let score = iteration
                    .total_score()
                    .map_or_else(|| "unrated".to_string(), |score| format!("{score:.1}"));
                prompt.push_str(&format!(
                    "- iteration {} (user score {score}): {}\n",
                    iteration.id,
                    iteration.feedback_synthesis.display_text()
                ));
            }
        }
        prompt.push_str(&self.structure_instructions());

        let messages = [
            ChatMessage::system(&self.system_message),
            ChatMessage::user(prompt),
        ];
        debug!(
            "synthesizing feedback (model={}, recent={})",
            self.model,
            recent.len()
        );
        let response = self.gateway.complete(&self.model, &messages).await?;
        Ok(parse_feedback(&response, &self.criteria))
    }

    /// Re-synthesize a report after the user disagreed with it.
    pub async fn incorporate_user_feedback(
        &self,
        previous: &FeedbackSynthesis,
        additional: &str,
    ) -> Result<FeedbackSynthesis, MuseCoreError> {
        let mut prompt = format!(
            "Previous analysis:\n{}\n\nAdditional user feedback:\n{additional}\n\n\
Please incorporate the additional user feedback into your previous analysis and feedback. \
Update your recommendations for both the content creator and the evaluator based on this \
new information.\n",
            previous.display_text(),
        );
        prompt.push_str(&self.structure_instructions());

        let messages = [
            ChatMessage::system(&self.system_message),
            ChatMessage::user(prompt),
        ];
        let response = self.gateway.complete(&self.model, &messages).await?;
        Ok(parse_feedback(&response, &self.criteria))
    }

    /// Shared tail of both prompts: the required response structure.
    fn structure_instructions(&self) -> String {
        let names: Vec<&str> = self.criteria.names().collect();
        format!(
            "\nProvide a comprehensive analysis and actionable feedback in the following \
structure:\n\n\
{OVERALL_MARKER}\n\
(Provide a brief overall analysis of the interaction, including major discrepancies between \
AI and user evaluations)\n\n\
{CREATOR_MARKER}\n\
(For each criterion, provide specific, actionable feedback for the content creator. If no \
improvement is needed, explicitly state why.)\n\n\
{EVALUATOR_MARKER}\n\
(For each criterion, provide specific, actionable feedback for the evaluator. If no \
improvement is needed, explicitly state why.)\n\n\
{IMPROVEMENTS_MARKER}\n\
(Answer YES or NO, then briefly justify the verdict)\n\n\
Ensure you address all of the following criteria in both the Content Creator and Evaluator \
sections:\n{}\n",
            names.join(", ")
        )
    }
}

/// Render per-criterion user scores and comments as prompt text.
fn render_user_evaluation(user_evaluation: &UserEvaluation) -> String {
    let mut lines = Vec::new();
    for (criterion, score) in &user_evaluation.scores {
        match user_evaluation.feedback.get(criterion) {
            Some(comment) if !comment.is_empty() => {
                lines.push(format!("{criterion}: {score} ({comment})"));
            }
            _ => lines.push(format!("{criterion}: {score}")),
        }
    }
    if let Some(mean) = user_evaluation.mean_score() {
        lines.push(format!("Overall: {mean:.2}"));
    }
    lines.join("\n")
}

/// One-pass section scanner over a synthesizer response.
///
/// Each marker is optional. A duplicated marker makes that section absent
/// rather than guessing which occurrence wins. A response with no marker
/// at all is kept as raw text.
fn parse_feedback(response: &str, criteria: &CriteriaTable) -> FeedbackSynthesis {
    let mut sections: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
    let mut duplicated: Vec<&'static str> = Vec::new();
    let mut current: Option<&'static str> = None;

    for line in response.lines() {
        let trimmed = line.trim();
        if let Some(&marker) = MARKERS.iter().find(|marker| trimmed == **marker) {
            if sections.contains_key(marker) {
                duplicated.push(marker);
                current = None;
            } else {
                sections.insert(marker, Vec::new());
                current = Some(marker);
            }
            continue;
        }
        if let Some(marker) = current {
            if let Some(lines) = sections.get_mut(marker) {
                lines.push(line);
            }
        }
    }

    if sections.is_empty() {
        return FeedbackSynthesis::Raw {
            text: response.to_string(),
        };
    }
    for marker in duplicated {
        sections.remove(marker);
    }

    let section_text = |marker: &str| {
        sections
            .get(marker)
            .map(|lines| lines.join("\n").trim().to_string())
            .unwrap_or_default()
    };

    FeedbackSynthesis::Structured {
        report: FeedbackReport {
            overall_analysis: section_text(OVERALL_MARKER),
            creator_feedback: extract_criterion_feedback(&section_text(CREATOR_MARKER), criteria),
            evaluator_feedback: extract_criterion_feedback(
                &section_text(EVALUATOR_MARKER),
                criteria,
            ),
            improvements_needed: section_text(IMPROVEMENTS_MARKER),
        },
    }
}

/// Collect bullet suggestions under each criterion name mentioned in a
/// section. Criteria without suggestions are omitted.
fn extract_criterion_feedback(
    section: &str,
    criteria: &CriteriaTable,
) -> BTreeMap<String, Vec<String>> {
    let mut feedback: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in section.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(name) = criteria.names().find(|name| trimmed.contains(*name)) {
            current = Some(name.to_string());
            continue;
        }
        let Some(criterion) = &current else {
            continue;
        };
        let suggestion = if let Some(rest) = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix('•'))
        {
            Some(rest.trim())
        } else if trimmed.chars().next().is_some_and(|first| first.is_ascii_digit()) {
            Some(
                trimmed
                    .trim_start_matches(|ch: char| ch.is_ascii_digit() || ch == '.' || ch == ')')
                    .trim(),
            )
        } else {
            None
        };
        if let Some(suggestion) = suggestion {
            if !suggestion.is_empty() {
                feedback
                    .entry(criterion.clone())
                    .or_default()
                    .push(suggestion.to_string());
            }
        }
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::parse_feedback;
    use crate::criteria::CriteriaTable;
    use muse_rs_memory::FeedbackSynthesis;
    use pretty_assertions::assert_eq;

    const RESPONSE: &str = "\
[Overall Analysis]
The user rated the content lower than the evaluator did.

[Feedback for Content Creator]
Content Quality:
- Ground the claims in primary sources.
Structure and Clarity:
1. Tighten the introduction.

[Feedback for Evaluator]
Content Quality:
- Weight factual accuracy more heavily.

[Improvements Needed]
YES - the analysis section needs depth.
";

    #[test]
    fn parses_all_sections() {
        let table = CriteriaTable::standard();
        let FeedbackSynthesis::Structured { report } = parse_feedback(RESPONSE, &table) else {
            panic!("expected structured synthesis");
        };

        assert!(report.overall_analysis.contains("rated the content lower"));
        assert_eq!(
            report.creator_feedback["Content Quality"],
            vec!["Ground the claims in primary sources.".to_string()]
        );
        assert_eq!(
            report.creator_feedback["Structure and Clarity"],
            vec!["Tighten the introduction.".to_string()]
        );
        assert_eq!(report.evaluator_feedback.len(), 1);
        assert!(report.needs_improvement());
    }

    #[test]
    fn missing_sections_are_absent_not_errors() {
        let table = CriteriaTable::standard();
        let response = "[Overall Analysis]\nLooks good.\n";
        let FeedbackSynthesis::Structured { report } = parse_feedback(response, &table) else {
            panic!("expected structured synthesis");
        };
        assert_eq!(report.overall_analysis, "Looks good.");
        assert!(report.creator_feedback.is_empty());
        assert_eq!(report.improvements_needed, "");
        assert!(!report.needs_improvement());
    }

    #[test]
    fn duplicated_marker_makes_the_section_absent() {
        let table = CriteriaTable::standard();
        let response = "\
[Overall Analysis]
First version.
[Overall Analysis]
Second version.
[Improvements Needed]
NO
";
        let FeedbackSynthesis::Structured { report } = parse_feedback(response, &table) else {
            panic!("expected structured synthesis");
        };
        assert_eq!(report.overall_analysis, "");
        assert_eq!(report.improvements_needed, "NO");
    }

    #[test]
    fn response_without_markers_stays_raw() {
        let table = CriteriaTable::standard();
        let response = "Everything considered, this went well.";
        assert_eq!(
            parse_feedback(response, &table),
            FeedbackSynthesis::Raw {
                text: response.to_string()
            }
        );
    }
}
