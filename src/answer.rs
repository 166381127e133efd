//! Retrieval-augmented answer generation.
//!
//! [`RetrievalOrchestrator::answer`] retrieves the chunks nearest to the
//! query, folds them into a fixed prompt template together with any
//! caller-supplied context, and asks the [`Generator`] for a completion
//! under an explicit timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::corpus::{Corpus, DEFAULT_TOP_K};
use crate::error::{AnswerError, GenerationError};
use crate::generation::Generator;

/// Instruction line that opens every prompt.
pub const PROMPT_PREAMBLE: &str = "Use the following context to answer:";

/// A generated answer paired with the query it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub query: String,
    pub response: String,
    /// Retrieved chunks used in the prompt, nearest first.
    pub context: Vec<String>,
}

/// Assemble the generation prompt.
///
/// Layout: preamble, retrieved context, caller context, then the query
/// verbatim.
pub fn build_prompt(retrieved_context: &str, caller_context: &str, query: &str) -> String {
    format!(
        "\n{PROMPT_PREAMBLE}\n\nContext:\n{retrieved_context}\n{caller_context}\n\nPrompt:\n{query}\n"
    )
}

pub struct RetrievalOrchestrator {
    corpus: Arc<Corpus>,
    generator: Arc<dyn Generator>,
    top_k: usize,
    timeout: Duration,
}

impl RetrievalOrchestrator {
    pub fn new(corpus: Arc<Corpus>, generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self {
            corpus,
            generator,
            top_k: DEFAULT_TOP_K,
            timeout,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }

    /// Answer `query` from the corpus.
    ///
    /// An empty corpus is not an error: the prompt is built with an empty
    /// retrieved context and the generator still runs.
    pub async fn answer(&self, query: &str, caller_context: &str) -> Result<Answer, AnswerError> {
        let context = self.corpus.search_texts(query, self.top_k).await?;
        let prompt = build_prompt(&context.join("\n"), caller_context, query);

        let response = match tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!(error = %e, model = self.generator.model_name(), "generation failed");
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!(timeout = ?self.timeout, "generation timed out");
                return Err(GenerationError::Timeout(self.timeout).into());
            }
        };

        Ok(Answer {
            query: query.to_string(),
            response,
            context,
        })
    }
}
