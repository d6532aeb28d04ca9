use crate::cleanup::clean_response;
use crate::error::QueryError;
use crate::llm::AnswerGenerator;
use crate::models::ChatTurn;
use crate::responder::answer_query;
use crate::store::Retriever;

/// Session-scoped chat state: an optional retriever installed by the last
/// successful ingestion, and an unbounded history ordered newest-first.
#[derive(Default)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
    retriever: Option<Retriever>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the retriever produced by a successful ingestion. A failed
    /// ingestion never reaches this point, so the previous retriever (or
    /// none) stays in place.
    pub fn install_retriever(&mut self, retriever: Retriever) {
        self.retriever = Some(retriever);
    }

    pub fn has_retriever(&self) -> bool {
        self.retriever.is_some()
    }

    /// History, newest turn first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Run one chat turn: validate, answer, clean, record. Empty and
    /// whitespace-only queries fail with [`QueryError::EmptyQuery`] and
    /// leave the session untouched.
    pub async fn submit(
        &mut self,
        query: &str,
        generator: &dyn AnswerGenerator,
    ) -> Result<&ChatTurn, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let raw = answer_query(query, self.retriever.as_ref(), generator).await?;
        let answer = clean_response(&raw)?;

        self.history.insert(
            0,
            ChatTurn {
                query: query.to_string(),
                answer,
            },
        );
        Ok(&self.history[0])
    }
}

#[cfg(test)]
mod tests {
    use super::ChatSession;
    use crate::error::QueryError;
    use crate::llm::AnswerGenerator;
    use async_trait::async_trait;

    struct CannedGenerator {
        reply: &'static str,
    }

    #[async_trait]
    impl AnswerGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, QueryError> {
            Ok(self.reply.to_string())
        }
    }

    #[tokio::test]
    async fn empty_queries_are_rejected_without_state_change() {
        let mut session = ChatSession::new();
        let generator = CannedGenerator { reply: "unused" };

        for query in ["", "   ", "\n\t"] {
            let result = session.submit(query, &generator).await;
            assert!(matches!(result, Err(QueryError::EmptyQuery)));
            assert!(session.history().is_empty());
        }
    }

    #[tokio::test]
    async fn answers_are_cleaned_before_entering_history() {
        let mut session = ChatSession::new();
        let generator = CannedGenerator {
            reply: "The pump needs service.\nadditional_kwargs={'tokens': 9}",
        };

        let turn = session.submit("pump status?", &generator).await.unwrap();
        assert_eq!(turn.answer, "The pump needs service.");
    }

    #[tokio::test]
    async fn history_grows_newest_first() {
        let mut session = ChatSession::new();
        let generator = CannedGenerator { reply: "answer" };

        session.submit("first question", &generator).await.unwrap();
        session.submit("second question", &generator).await.unwrap();

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "second question");
        assert_eq!(history[1].query, "first question");
    }

    #[tokio::test]
    async fn queries_work_with_no_retriever_installed() {
        let mut session = ChatSession::new();
        assert!(!session.has_retriever());

        let generator = CannedGenerator {
            reply: "Answering without any ingested context.",
        };
        let turn = session.submit("anything?", &generator).await.unwrap();
        assert_eq!(turn.answer, "Answering without any ingested context.");
    }
}
