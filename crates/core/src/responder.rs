use crate::error::QueryError;
use crate::llm::AnswerGenerator;
use crate::models::ScoredChunk;
use crate::store::Retriever;

/// Answer a query. With a retriever, the top-k chunks are folded into a
/// grounded prompt; without one (nothing ingested yet) the model is still
/// asked without context, so an empty knowledge base never hard-fails a
/// query. Returns the raw model output; cleanup is the shell's job.
pub async fn answer_query(
    query: &str,
    retriever: Option<&Retriever>,
    generator: &dyn AnswerGenerator,
) -> Result<String, QueryError> {
    let prompt = match retriever {
        Some(retriever) => {
            let hits = retriever.retrieve(query).await?;
            build_grounded_prompt(query, &hits)
        }
        None => build_plain_prompt(query),
    };

    generator.generate(&prompt).await
}

fn build_grounded_prompt(query: &str, hits: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for (position, hit) in hits.iter().enumerate() {
        context.push_str(&format!("[{}] {}\n\n", position + 1, hit.text));
    }

    format!(
        "Answer the question using only the context below. \
         If the context does not contain the answer, say so.\n\n\
         Context:\n{context}Question: {query}\n\nAnswer:"
    )
}

fn build_plain_prompt(query: &str) -> String {
    format!("Answer the question below.\n\nQuestion: {query}\n\nAnswer:")
}
