//! Grounded prompt builder.
//!
//! The rendered prompt is a pure function of the passages (in retrieval
//! order) and the question. No I/O happens here.

use crate::types::BuiltPrompt;
use handlebars::Handlebars;
use manualqa_core::{AppError, AppResult};

/// Answer the model must give when the context does not contain one.
pub const NOT_IN_CONTEXT_ANSWER: &str = "answer is not available in the context";

/// Identifier recorded in prompt metadata.
pub const GROUNDED_ANSWER_PROMPT_ID: &str = "manualqa.grounded-answer";

/// Handlebars source of the grounded answer prompt.
pub const GROUNDED_ANSWER_TEMPLATE: &str = "Answer the question as detailed as possible from the provided context, \
make sure to provide all the details, if the answer is not in provided context just say, \
\"{{sentinel}}\", don't provide the wrong answer\n\n\
Context:\n{{context}}\n\n\
Question:\n{{question}}\n\n\
Answer:\n";

const PASSAGE_SEPARATOR: &str = "\n\n";
const TEMPLATE_NAME: &str = "grounded-answer";

/// Builds grounded prompts from retrieved passages.
///
/// The template is compiled once and reused for every question.
pub struct PromptAssembler {
    handlebars: Handlebars<'static>,
}

impl PromptAssembler {
    /// Compile the grounded answer template.
    pub fn new() -> AppResult<Self> {
        let mut handlebars = Handlebars::new();

        // Disable HTML escaping for plain text
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars
            .register_template_string(TEMPLATE_NAME, GROUNDED_ANSWER_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self { handlebars })
    }

    /// Build the prompt for `question` from `passages`, in the given order.
    ///
    /// # Example
    /// ```
    /// use manualqa_prompt::{PromptAssembler, NOT_IN_CONTEXT_ANSWER};
    ///
    /// let assembler = PromptAssembler::new().unwrap();
    /// let built = assembler
    ///     .build(&["LED 1 shows MMI status."], "What does LED 1 show?")
    ///     .unwrap();
    /// assert!(built.user.contains("LED 1 shows MMI status."));
    /// assert!(built.user.contains(NOT_IN_CONTEXT_ANSWER));
    /// ```
    pub fn build<P: AsRef<str>>(&self, passages: &[P], question: &str) -> AppResult<BuiltPrompt> {
        let context = passages
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);

        let variables = serde_json::json!({
            "context": context,
            "question": question,
            "sentinel": NOT_IN_CONTEXT_ANSWER,
        });

        let user = self
            .handlebars
            .render(TEMPLATE_NAME, &variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        tracing::debug!(
            "Built prompt from {} passages ({} context chars)",
            passages.len(),
            context.chars().count()
        );

        Ok(BuiltPrompt::new(
            None,
            user,
            GROUNDED_ANSWER_PROMPT_ID,
            passages.len(),
            context.chars().count(),
            NOT_IN_CONTEXT_ANSWER,
        ))
    }
}

/// One-shot convenience wrapper around [`PromptAssembler`].
pub fn build_prompt<P: AsRef<str>>(passages: &[P], question: &str) -> AppResult<BuiltPrompt> {
    PromptAssembler::new()?.build(passages, question)
}
