//! The two-stage retrieve → generate workflow.
//!
//! The shape is fixed and acyclic, so it is compiled down to two sequential
//! stage calls rather than a general graph executor: a retrieval stage
//! populates the state, a generation stage consumes it, and the workflow
//! terminates. No branching, no retries, no cycles — an empty retrieval
//! still proceeds to generation with an empty context block.

use std::sync::Arc;

use tracing::{debug, info};

use crate::completion::CompletionModel;
use crate::message::Message;
use crate::retriever::Retriever;
use crate::stores::ScoredChunk;
use crate::types::RagError;

/// Ephemeral per-query state, populated stage by stage and discarded after
/// the answer is returned. Never shared across queries.
#[derive(Clone, Debug, Default)]
pub struct WorkflowState {
    /// The caller's question.
    pub question: String,
    /// Prior conversation, carried for future prompt shaping (currently not
    /// injected into the generation prompt).
    pub chat_history: Vec<Message>,
    /// Chunks produced by the retrieval stage, nearest first.
    pub retrieved_docs: Vec<ScoredChunk>,
    /// The generated answer, set by the generation stage.
    pub answer: Option<String>,
}

impl WorkflowState {
    pub fn new(question: impl Into<String>, chat_history: Vec<Message>) -> Self {
        Self {
            question: question.into(),
            chat_history,
            retrieved_docs: Vec::new(),
            answer: None,
        }
    }
}

/// Concatenates retrieved chunk texts, in retrieval order, into the context
/// block bound into the prompt.
pub fn build_context(docs: &[ScoredChunk]) -> String {
    docs.iter()
        .map(|doc| doc.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Renders the fixed instruction template.
///
/// The template binds exactly `{context}` and `{question}`:
///
/// ```text
/// You are a helpful assistant.
///
/// Use ONLY the context below to answer the question.
///
/// Context:
/// {context}
///
/// Question:
/// {question}
///
/// Answer with short and precise bullet points.
/// Also provide source citations.
/// ```
///
/// Rendering is pure: identical inputs produce a byte-identical prompt.
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant.\n\n\
         Use ONLY the context below to answer the question.\n\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Answer with short and precise bullet points.\n\
         Also provide source citations."
    )
}

/// The fixed retrieve-then-generate pipeline for one question.
pub struct RagWorkflow {
    retriever: Retriever,
    completion: Arc<dyn CompletionModel>,
    top_k: usize,
}

impl RagWorkflow {
    pub fn new(retriever: Retriever, completion: Arc<dyn CompletionModel>, top_k: usize) -> Self {
        Self {
            retriever,
            completion,
            top_k,
        }
    }

    /// Runs both stages in order and returns the terminal state.
    ///
    /// Retrieval failures (including [`RagError::IndexNotInitialized`])
    /// abort before generation; generation failures abort only this query
    /// and leave the index intact.
    pub async fn invoke(
        &self,
        question: impl Into<String>,
        chat_history: Vec<Message>,
    ) -> Result<WorkflowState, RagError> {
        let mut state = WorkflowState::new(question, chat_history);
        self.retrieve_stage(&mut state).await?;
        self.generate_stage(&mut state).await?;
        info!(
            retrieved = state.retrieved_docs.len(),
            "workflow complete"
        );
        Ok(state)
    }

    async fn retrieve_stage(&self, state: &mut WorkflowState) -> Result<(), RagError> {
        state.retrieved_docs = self.retriever.retrieve(&state.question, self.top_k).await?;
        debug!(retrieved = state.retrieved_docs.len(), "retrieval stage done");
        Ok(())
    }

    async fn generate_stage(&self, state: &mut WorkflowState) -> Result<(), RagError> {
        let context = build_context(&state.retrieved_docs);
        let prompt = render_prompt(&context, &state.question);
        state.answer = Some(self.completion.complete(&prompt).await?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{FailingCompletion, MockCompletion};
    use crate::embeddings::MockEmbeddingProvider;
    use crate::ingestion::Chunk;
    use crate::stores::VectorIndex;

    fn scored(id: usize, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id,
                text: text.to_string(),
                source: "doc1".to_string(),
                position_info: format!("Chunk {} of 2", id + 1),
            },
            distance: 0.1 * (id as f32 + 1.0),
        }
    }

    fn unseeded_workflow(completion: Arc<dyn CompletionModel>) -> RagWorkflow {
        let retriever = Retriever::new(
            Arc::new(MockEmbeddingProvider::new()),
            Arc::new(VectorIndex::new()),
        );
        RagWorkflow::new(retriever, completion, 5)
    }

    #[test]
    fn prompt_is_deterministic_and_binds_docs_in_order() {
        let docs = vec![
            scored(0, "First chunk about apples."),
            scored(1, "Second chunk about oranges."),
        ];
        let context = build_context(&docs);
        let prompt = render_prompt(&context, "Which fruits appear?");
        let again = render_prompt(&build_context(&docs), "Which fruits appear?");
        assert_eq!(prompt, again, "prompt must be byte-identical across runs");

        let apples = prompt.find("First chunk about apples.").unwrap();
        let oranges = prompt.find("Second chunk about oranges.").unwrap();
        assert!(apples < oranges, "context must keep retrieval order");
        assert!(prompt.contains("Which fruits appear?"));
        assert!(prompt.contains("Use ONLY the context below"));
    }

    #[tokio::test]
    async fn generation_consumes_retrieved_context() {
        let completion = Arc::new(MockCompletion::new("the answer"));
        let workflow = unseeded_workflow(completion.clone());

        let mut state = WorkflowState::new("Which fruits appear?", Vec::new());
        state.retrieved_docs = vec![scored(0, "apples"), scored(1, "oranges")];
        workflow.generate_stage(&mut state).await.unwrap();

        assert_eq!(state.answer.as_deref(), Some("the answer"));
        let prompts = completion.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("apples\n\noranges"));
    }

    #[tokio::test]
    async fn empty_retrieval_still_proceeds_to_generation() {
        let completion = Arc::new(MockCompletion::new("no context answer"));
        let workflow = unseeded_workflow(completion.clone());

        let mut state = WorkflowState::new("anything?", Vec::new());
        workflow.generate_stage(&mut state).await.unwrap();

        assert_eq!(state.answer.as_deref(), Some("no context answer"));
        assert!(completion.prompts()[0].contains("Context:\n\n\nQuestion:"));
    }

    #[tokio::test]
    async fn retrieval_failure_aborts_before_generation() {
        let completion = Arc::new(MockCompletion::new("never"));
        let workflow = unseeded_workflow(completion.clone());

        let err = workflow.invoke("question", Vec::new()).await.unwrap_err();
        assert!(matches!(err, RagError::IndexNotInitialized));
        assert!(completion.prompts().is_empty(), "generation must not run");
    }

    #[tokio::test]
    async fn generation_failure_surfaces_as_generation_error() {
        let workflow = unseeded_workflow(Arc::new(FailingCompletion));
        let mut state = WorkflowState::new("q", Vec::new());
        state.retrieved_docs = vec![scored(0, "some context")];
        let err = workflow.generate_stage(&mut state).await.unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
        assert!(state.answer.is_none());
    }
}
