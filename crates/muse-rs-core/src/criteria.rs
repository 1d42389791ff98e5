//! Evaluation criteria schema.
//!
//! The table is immutable after construction: it is the schema that user
//! scores are validated against and the source of the evaluator's rubric
//! prompt. Per-iteration data keyed by these names lives in the store.

use std::collections::BTreeSet;

/// One named evaluation criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    /// What the criterion assesses.
    pub description: String,
    /// Score bands, one line per band.
    pub rubric: Vec<String>,
    /// Evaluation task given to the evaluator for this criterion.
    pub prompt: String,
}

/// Ordered, read-only table of evaluation criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriteriaTable {
    entries: Vec<(String, Criterion)>,
}

impl CriteriaTable {
    /// Build a table from ordered `(name, criterion)` entries.
    pub fn new(entries: Vec<(String, Criterion)>) -> Self {
        Self { entries }
    }

    /// Criterion names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Name set used by the store for score validation.
    pub fn key_set(&self) -> BTreeSet<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Whether the table defines a criterion with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(entry, _)| entry == name)
    }

    /// Look up a criterion by name.
    pub fn get(&self, name: &str) -> Option<&Criterion> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, criterion)| criterion)
    }

    /// Number of criteria.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries
            .iter()
            .map(|(name, criterion)| (name.as_str(), criterion))
    }

    /// Assemble the full criteria-based evaluation prompt for a piece of
    /// content against an objective.
    pub fn evaluation_prompt(&self, content: &str, objective: &str) -> String {
        let mut prompt = String::from("Evaluate the following content based on these criteria:\n\n");
        for (name, criterion) in &self.entries {
            prompt.push_str(&format!("{name}:\n"));
            prompt.push_str(&format!("Description: {}\n", criterion.description));
            prompt.push_str("Rubric:\n");
            prompt.push_str(&criterion.rubric.join("\n"));
            prompt.push('\n');
            prompt.push_str(&format!("Evaluation task: {}\n\n", criterion.prompt));
        }
        prompt.push_str(&format!("The initial objective:\n\n{objective}\n\n"));
        prompt.push_str(&format!("Content to evaluate:\n\n{content}\n\n"));
        prompt.push_str("For each criterion, provide:\n");
        prompt.push_str("1. A score (1-10) based on the rubric\n");
        prompt.push_str("2. A brief explanation for the score\n");
        prompt.push_str("3. Specific suggestions for improvement\n");
        prompt.push_str(
            "\nFinally, provide an overall assessment and key recommendations for improvement.",
        );
        prompt
    }

    /// The criteria shipped with Muse.
    pub fn standard() -> Self {
        let entry = |name: &str, description: &str, rubric: &[&str], prompt: &str| {
            (
                name.to_string(),
                Criterion {
                    description: description.to_string(),
                    rubric: rubric.iter().map(|line| line.to_string()).collect(),
                    prompt: prompt.to_string(),
                },
            )
        };

        Self::new(vec![
            entry(
                "Content Quality",
                "Assess the accuracy, depth, and relevance of the information presented.",
                &[
                    "1-2: Significant errors, shallow treatment, or off-topic",
                    "3-4: Some inaccuracies or lacks depth in key areas",
                    "5-6: Generally accurate and relevant but could be more comprehensive",
                    "7-8: Accurate, relevant, and fairly in-depth treatment",
                    "9: Highly accurate, comprehensive, and insightful with minor room for improvement",
                    "10: Perfect content quality, nothing more needed",
                ],
                "Evaluate the accuracy, depth, and relevance of the content. Consider complexity of ideas, use of expert knowledge, and alignment with the given prompt/objective. Suggest areas for improvement or expansion.",
            ),
            entry(
                "Critical Analysis and Argumentation",
                "Assess the level of critical thinking, insights, and quality of argumentation.",
                &[
                    "1-2: Superficial analysis with poor argumentation",
                    "3-4: Basic analysis with limited original thought or weak arguments",
                    "5-6: Some critical analysis and adequate argumentation, but could go deeper",
                    "7-8: Good critical analysis with well-constructed arguments",
                    "9: Exceptional critical thinking with compelling argumentation, minor improvements possible",
                    "10: Perfect critical analysis and argumentation, nothing more needed",
                ],
                "Evaluate the depth of analysis, presence of original insights, and strength of arguments. Assess the use of evidence/sources. Identify areas where the analysis could be deepened or argumentation improved.",
            ),
            entry(
                "Structure and Clarity",
                "Evaluate how well ideas are organized and communicated.",
                &[
                    "1-2: Confusing and poorly structured",
                    "3-4: Some clear points but overall difficult to follow",
                    "5-6: Generally clear but with some organizational issues",
                    "7-8: Clear and well-structured with minor issues",
                    "9: Exceptionally clear, coherent, and well-organized with minimal room for improvement",
                    "10: Perfect structure and clarity, nothing more needed",
                ],
                "Assess the clarity of expression and logical flow of ideas. Identify any unclear passages or structural issues. Suggest improvements for clarity and coherence.",
            ),
            entry(
                "Language and Style",
                "Evaluate the quality of writing, including grammar, vocabulary, and stylistic choices.",
                &[
                    "1-2: Poor grammar and inappropriate style",
                    "3-4: Frequent language errors or inconsistent style",
                    "5-6: Generally correct language with an appropriate style",
                    "7-8: Well-written with good command of language and style",
                    "9: Exceptional writing with near-perfect use of language and style",
                    "10: Perfect language and style, nothing more needed",
                ],
                "Assess the quality of writing, including grammar, vocabulary, and style. Consider the appropriateness for the intended audience and purpose. Suggest improvements in language use and style.",
            ),
            entry(
                "Perspective and Objectivity",
                "Evaluate the appropriateness of the perspective taken and the level of objectivity (when required).",
                &[
                    "1-2: Heavily biased or inappropriate perspective",
                    "3-4: Noticeable bias or misaligned perspective",
                    "5-6: Generally appropriate perspective with some bias",
                    "7-8: Well-balanced perspective, mostly objective when required",
                    "9: Near-perfect alignment of perspective, objective when required with minimal room for improvement",
                    "10: Perfect perspective and objectivity, nothing more needed",
                ],
                "Assess whether the perspective taken is appropriate for the given prompt/objective. If objectivity is required, evaluate its presence. If a specific viewpoint is needed, assess how well it's presented. Suggest ways to improve the balance or perspective as needed.",
            ),
            entry(
                "Relevance to Initial Objective and Accuracy",
                "Assess how well the content addresses the initial user-given objective and the accuracy of facts presented.",
                &[
                    "1-2: Content largely ignores or misses the initial objective; contains significant factual errors",
                    "3-4: Content partially addresses the initial objective with significant gaps; contains some inaccuracies",
                    "5-6: Content addresses the initial objective but lacks depth or comprehensiveness; mostly accurate with some minor errors",
                    "7-8: Content fully addresses the initial objective with good relevance; facts are generally accurate",
                    "9: Content exceptionally addresses and expands upon the initial objective with high accuracy; minimal room for improvement",
                    "10: Perfect relevance to initial objective and factual accuracy, nothing more needed",
                ],
                "Compare the content to the initial user-given objective. Evaluate how well it addresses and fulfills this objective. Also assess the accuracy of the facts presented in the content.",
            ),
            entry(
                "Creativity and Originality",
                "Assess the level of creativity and originality in the content.",
                &[
                    "1-2: Entirely derivative or lacking creativity",
                    "3-4: Mostly conventional with little originality",
                    "5-6: Some creative elements but largely conventional",
                    "7-8: Good level of creativity and originality",
                    "9: Exceptionally creative and original with minimal room for improvement",
                    "10: Perfect creativity and originality, nothing more needed",
                ],
                "Evaluate the creativity and originality of the content. Consider unique approaches, novel ideas, or innovative presentations. Suggest areas where more creative approaches could be applied.",
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::CriteriaTable;
    use pretty_assertions::assert_eq;

    #[test]
    fn standard_table_has_seven_ordered_criteria() {
        let table = CriteriaTable::standard();
        assert_eq!(table.len(), 7);
        assert_eq!(table.names().next(), Some("Content Quality"));
        assert!(table.contains("Creativity and Originality"));
        assert!(!table.contains("Sense of Humor"));
    }

    #[test]
    fn evaluation_prompt_includes_rubric_and_content() {
        let table = CriteriaTable::standard();
        let prompt = table.evaluation_prompt("the essay text", "explain ownership");

        assert!(prompt.contains("the essay text"));
        assert!(prompt.contains("explain ownership"));
        for name in table.names() {
            assert!(prompt.contains(name));
        }
        for (_, criterion) in table.entries() {
            for line in &criterion.rubric {
                assert!(prompt.contains(line.as_str()));
            }
        }
    }

    #[test]
    fn key_set_matches_names() {
        let table = CriteriaTable::standard();
        let keys = table.key_set();
        assert_eq!(keys.len(), table.len());
        assert!(keys.contains("Language and Style"));
    }
}
