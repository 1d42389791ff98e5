//! Content creator agent.

use crate::error::MuseCoreError;
use crate::gateway::CompletionGateway;
use crate::types::ChatMessage;
use log::debug;
use muse_rs_memory::CreatorContext;
use std::collections::BTreeMap;
use std::sync::Arc;

const SYSTEM_MESSAGE: &str = "You are an expert content creator with extensive knowledge across \
various subjects and exceptional linguistic proficiency. Your task is to generate high-quality, \
informative, and engaging content based on given prompts. Prioritize clarity, exhaustiveness, \
and factual accuracy; maintain strict relevance to the given objective; present information \
objectively; and implement a logical structure with a clear introduction, well-developed body, \
and conclusive ending.";

/// Generates content for an objective, folding in prior iterations and
/// learned feedback.
pub struct ContentCreator {
    gateway: Arc<dyn CompletionGateway>,
    model: String,
    system_message: String,
    learned: BTreeMap<String, Vec<String>>,
}

impl ContentCreator {
    /// Create a content creator for the given model.
    pub fn new(gateway: Arc<dyn CompletionGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            system_message: SYSTEM_MESSAGE.to_string(),
            learned: BTreeMap::new(),
        }
    }

    /// Replace the system message.
    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    /// Fold synthesized per-criterion feedback into subsequent prompts.
    pub fn learn(&mut self, feedback: BTreeMap<String, Vec<String>>) {
        self.learned = feedback;
    }

    /// Generate content for an objective.
    pub async fn create_content(
        &self,
        objective: &str,
        context: &CreatorContext,
    ) -> Result<String, MuseCoreError> {
        let request = self.build_request(objective, context);
        let messages = [
            ChatMessage::system(&self.system_message),
            ChatMessage::user(request),
        ];
        debug!(
            "creating content (model={}, objective_len={})",
            self.model,
            objective.len()
        );
        Ok(self.gateway.complete(&self.model, &messages).await?)
    }

    /// Assemble the user message from the objective and store context.
    fn build_request(&self, objective: &str, context: &CreatorContext) -> String {
        let mut sections = vec![format!("Prompt: {objective}")];

        if let Some(last_content) = &context.last_content {
            sections.push(format!("Your previous attempt:\n{last_content}"));
        }
        if let Some(last_feedback) = &context.last_feedback {
            sections.push(format!("Feedback on the previous attempt:\n{last_feedback}"));
        }
        if let Some(highest) = &context.highest_scoring_content {
            if context.last_content.as_deref() != Some(highest.as_str()) {
                sections.push(format!("Your strongest attempt so far:\n{highest}"));
            }
        }
        if let Some(highest_feedback) = &context.highest_scoring_feedback {
            if context.last_feedback.as_deref() != Some(highest_feedback.as_str()) {
                sections.push(format!(
                    "Feedback on the strongest attempt:\n{highest_feedback}"
                ));
            }
        }

        if self.learned.is_empty() {
            sections.push("Please generate content based on the given prompt.".to_string());
        } else {
            let mut feedback = String::from(
                "Please incorporate the following feedback into your content:\n",
            );
            for (criterion, suggestions) in &self.learned {
                feedback.push_str(&format!("\n{criterion}:\n"));
                for suggestion in suggestions {
                    feedback.push_str(&format!("- {suggestion}\n"));
                }
            }
            feedback.push_str(
                "\nGenerate the content based on the prompt and incorporate the feedback.",
            );
            sections.push(feedback);
        }

        sections.join("\n\n")
    }
}
