//! Evaluator agent and its response parser.

use crate::criteria::CriteriaTable;
use crate::error::MuseCoreError;
use crate::gateway::CompletionGateway;
use crate::types::ChatMessage;
use log::debug;
use muse_rs_memory::{CriterionAssessment, Evaluation, EvaluatorContext};
use std::collections::BTreeMap;
use std::sync::Arc;

const SYSTEM_MESSAGE: &str = "You are an expert content evaluator with extensive linguistic \
knowledge and a commitment to objectivity. Critically assess content against the provided \
criteria: assign a score based on each rubric, provide a concise justification, and offer \
actionable improvement suggestions. Maintain unwavering objectivity, ensure all critiques are \
constructive, and acknowledge exceptional quality when warranted, without emotional bias. \
Avoid emotional language, maintaining a neutral, professional tone throughout.";

/// Scores content against the criteria table.
pub struct Evaluator {
    gateway: Arc<dyn CompletionGateway>,
    model: String,
    system_message: String,
    criteria: CriteriaTable,
    learned: BTreeMap<String, Vec<String>>,
}

impl Evaluator {
    /// Create an evaluator for the given model and criteria.
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
            learned: BTreeMap::new(),
        }
    }

    /// Replace the system message.
    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    /// Fold synthesized per-criterion feedback into subsequent evaluations.
    pub fn learn(&mut self, feedback: BTreeMap<String, Vec<String>>) {
        self.learned = feedback;
    }

    /// Evaluate content against the objective.
    ///
    /// Returns a structured evaluation when at least one criterion section
    /// was recognized in the response, the raw text otherwise.
    pub async fn evaluate(
        &self,
        content: &str,
        objective: &str,
        context: &EvaluatorContext,
    ) -> Result<Evaluation, MuseCoreError> {
        let mut prompt = self.criteria.evaluation_prompt(content, objective);

        if let Some(previous) = &context.last_evaluation {
            prompt.push_str("\n\nYour evaluation of the previous attempt, for continuity:\n");
            prompt.push_str(&previous.display_text());
        }
        if let Some(last_feedback) = &context.last_feedback {
            prompt.push_str("\n\nSynthesized feedback on the previous iteration:\n");
            prompt.push_str(last_feedback);
        }
        if !self.learned.is_empty() {
            prompt.push_str("\n\nPlease incorporate the following feedback into your evaluation:\n");
            for (criterion, suggestions) in &self.learned {
                prompt.push_str(&format!("\n{criterion}:\n"));
                for suggestion in suggestions {
                    prompt.push_str(&format!("- {suggestion}\n"));
                }
            }
            prompt.push_str("\nAfter your evaluation, explain how you incorporated the feedback.");
        }

        let messages = [
            ChatMessage::system(&self.system_message),
            ChatMessage::user(prompt),
        ];
        debug!(
            "evaluating content (model={}, content_len={})",
            self.model,
            content.len()
        );
        let response = self.gateway.complete(&self.model, &messages).await?;
        Ok(parse_evaluation(&response, &self.criteria))
    }
}

/// One-pass line scanner over an evaluator response.
///
/// A line naming a criterion opens its section; `Score:`, `Explanation:`,
/// and `- ` lines fill it. Responses with no recognizable criterion fall
/// back to the raw text.
fn parse_evaluation(response: &str, criteria: &CriteriaTable) -> Evaluation {
    let mut parsed: BTreeMap<String, CriterionAssessment> = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in response.lines() {
        let trimmed = line.trim();
        let candidate = trimmed
            .trim_start_matches('#')
            .trim()
            .trim_matches('*')
            .trim_end_matches(':');
        if criteria.contains(candidate) {
            current = Some(candidate.to_string());
            parsed.entry(candidate.to_string()).or_default();
            continue;
        }

        let Some(criterion) = &current else {
            continue;
        };
        if let Some(rest) = trimmed.strip_prefix("Score:") {
            let score = rest
                .trim()
                .split('/')
                .next()
                .unwrap_or_default()
                .trim()
                .parse::<f64>()
                .ok();
            if let Some(assessment) = parsed.get_mut(criterion) {
                assessment.score = score;
            }
        } else if let Some(rest) = trimmed.strip_prefix("Explanation:") {
            if let Some(assessment) = parsed.get_mut(criterion) {
                assessment.explanation = rest.trim().to_string();
            }
        } else if let Some(rest) = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix('•'))
        {
            let suggestion = rest.trim();
            if !suggestion.is_empty() {
                if let Some(assessment) = parsed.get_mut(criterion) {
                    assessment.suggestions.push(suggestion.to_string());
                }
            }
        }
    }

    if parsed.is_empty() {
        Evaluation::Raw {
            text: response.to_string(),
        }
    } else {
        Evaluation::Structured { criteria: parsed }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_evaluation;
    use crate::criteria::CriteriaTable;
    use muse_rs_memory::Evaluation;
    use pretty_assertions::assert_eq;

    const RESPONSE: &str = "\
Content Quality:
Score: 8
Explanation: Accurate and fairly deep.
- Add a worked example.
- Cite the reference manual.

Structure and Clarity:
Score: 6.5
Explanation: The middle section meanders.
";

    #[test]
    fn parses_scores_explanations_and_suggestions() {
        let table = CriteriaTable::standard();
        let Evaluation::Structured { criteria } = parse_evaluation(RESPONSE, &table) else {
            panic!("expected structured evaluation");
        };

        let quality = &criteria["Content Quality"];
        assert_eq!(quality.score, Some(8.0));
        assert_eq!(quality.explanation, "Accurate and fairly deep.");
        assert_eq!(quality.suggestions.len(), 2);

        let clarity = &criteria["Structure and Clarity"];
        assert_eq!(clarity.score, Some(6.5));
        assert!(clarity.suggestions.is_empty());
    }

    #[test]
    fn tolerates_markdown_headers_and_fractional_scores() {
        let table = CriteriaTable::standard();
        let response = "## **Content Quality**\nScore: 7/10\n";
        let Evaluation::Structured { criteria } = parse_evaluation(response, &table) else {
            panic!("expected structured evaluation");
        };
        assert_eq!(criteria["Content Quality"].score, Some(7.0));
    }

    #[test]
    fn unparseable_score_stays_none() {
        let table = CriteriaTable::standard();
        let response = "Content Quality:\nScore: N/A\n";
        let Evaluation::Structured { criteria } = parse_evaluation(response, &table) else {
            panic!("expected structured evaluation");
        };
        assert_eq!(criteria["Content Quality"].score, None);
    }

    #[test]
    fn unrecognized_response_falls_back_to_raw() {
        let table = CriteriaTable::standard();
        let response = "This essay is quite good overall.";
        assert_eq!(
            parse_evaluation(response, &table),
            Evaluation::Raw {
                text: response.to_string()
            }
        );
    }
}
