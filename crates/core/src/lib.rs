pub mod chunking;
pub mod cleanup;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod responder;
pub mod session;
pub mod store;

pub use chunking::{chunk_document, load_document, split_chunks};
pub use cleanup::clean_response;
pub use embeddings::{Embedder, HashEmbedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbedError, IngestError, QueryError, StoreError};
pub use ingest::{
    digest_file, discover_document_files, ingest_file, ingest_folder, stage_upload,
    IngestionReport, SkippedDocument,
};
pub use llm::{load_api_key, AnswerGenerator, ChatCompletionsClient};
pub use models::{
    ChatTurn, ChunkingOptions, DocumentChunk, DocumentFingerprint, IndexRecord,
    NormalizedDocument, PipelinePaths, ScoredChunk, SourceFormat,
};
pub use normalize::normalize_document;
pub use responder::answer_query;
pub use session::ChatSession;
pub use store::{Retriever, VectorStore, DEFAULT_TOP_K};
