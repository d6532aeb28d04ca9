use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_chat_core::{
    ingest_file, ingest_folder, load_api_key, ChatCompletionsClient, ChatSession,
    ChunkingOptions, Embedder, HashEmbedder, HttpEmbedder, PipelinePaths, QueryError, Retriever,
    VectorStore, DEFAULT_TOP_K,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for normalized document text
    #[arg(long, default_value = "documents")]
    documents_dir: PathBuf,

    /// Staging directory for uploaded raw files
    #[arg(long, default_value = "temp")]
    temp_dir: PathBuf,

    /// Directory holding the persisted vector index
    #[arg(long, default_value = "database")]
    database_dir: PathBuf,

    /// Plaintext file holding the chat endpoint API key
    #[arg(long, default_value = "api_key.txt")]
    api_key_file: PathBuf,

    /// Chat-completions endpoint base URL (OpenAI-compatible)
    #[arg(long, default_value = "https://api.openai.com/v1")]
    llm_url: String,

    /// Chat model name
    #[arg(long, default_value = "gpt-4o-mini")]
    llm_model: String,

    /// Embedding endpoint base URL; the offline hash embedder is used when unset
    #[arg(long)]
    embedding_url: Option<String>,

    /// Embedding model name for the remote endpoint
    #[arg(long, default_value = "nomic-embed-text")]
    embedding_model: String,

    /// Embedding dimension for the remote endpoint
    #[arg(long, default_value = "768")]
    embedding_dimensions: usize,

    /// Maximum chunk length in characters
    #[arg(long, default_value = "1000")]
    chunk_max_chars: usize,

    /// Overlap between consecutive chunks in characters
    #[arg(long, default_value = "200")]
    chunk_overlap_chars: usize,

    /// Number of chunks retrieved per query
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Timeout in seconds for each embedding or chat request
    #[arg(long, default_value = "120")]
    request_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document (or a folder of documents) into the vector index.
    Ingest {
        /// Path of a .pdf or .txt file to ingest.
        #[arg(long, conflicts_with = "folder")]
        file: Option<PathBuf>,

        /// Folder to scan recursively for .pdf and .txt files.
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Ask a single question against the persisted index.
    Ask {
        /// The question to answer.
        #[arg(long)]
        query: String,
    },
    /// Start an interactive chat session.
    Chat,
}

impl Cli {
    fn pipeline_paths(&self) -> PipelinePaths {
        PipelinePaths {
            documents_dir: self.documents_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            database_dir: self.database_dir.clone(),
        }
    }

    fn chunking_options(&self) -> ChunkingOptions {
        ChunkingOptions {
            max_chars: self.chunk_max_chars,
            overlap_chars: self.chunk_overlap_chars,
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn build_embedder(cli: &Cli) -> anyhow::Result<Arc<dyn Embedder>> {
    match &cli.embedding_url {
        Some(endpoint) => {
            let embedder = HttpEmbedder::new(
                endpoint.as_str(),
                cli.embedding_model.as_str(),
                cli.embedding_dimensions,
                cli.request_timeout(),
            )?;
            Ok(Arc::new(embedder))
        }
        None => Ok(Arc::new(HashEmbedder::default())),
    }
}

fn build_generator(cli: &Cli) -> anyhow::Result<ChatCompletionsClient> {
    let api_key = match load_api_key(&cli.api_key_file) {
        Ok(key) => Some(key),
        Err(error) => {
            warn!(%error, "api key not loaded; calling the chat endpoint unauthenticated");
            None
        }
    };

    Ok(ChatCompletionsClient::new(
        cli.llm_url.as_str(),
        cli.llm_model.as_str(),
        api_key,
        cli.request_timeout(),
    )?)
}

/// Reopen the persisted index; an empty or absent index means queries run
/// without retrieved context.
fn load_retriever(cli: &Cli, embedder: Arc<dyn Embedder>) -> anyhow::Result<Option<Retriever>> {
    let store = VectorStore::load(&cli.database_dir)?;
    if store.is_empty() {
        return Ok(None);
    }
    Ok(Some(store.into_retriever(embedder, cli.top_k)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let embedder = build_embedder(&cli)?;
    let paths = cli.pipeline_paths();
    let options = cli.chunking_options();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-chat boot"
    );

    match &cli.command {
        Command::Ingest { file, folder } => match (file, folder) {
            (Some(file), None) => {
                let store = ingest_file(file, embedder.as_ref(), &paths, options).await?;
                println!(
                    "File ingested successfully: {} chunks in index at {}",
                    store.len(),
                    Utc::now().to_rfc3339()
                );
            }
            (None, Some(folder)) => {
                let report = ingest_folder(folder, embedder.as_ref(), &paths, options).await?;

                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
                }
                println!(
                    "{} file(s) ingested ({} skipped), {} chunks in index",
                    report.ingested_files,
                    report.skipped_files.len(),
                    report.store.len()
                );
            }
            _ => anyhow::bail!("pass exactly one of --file or --folder"),
        },
        Command::Ask { query } => {
            let generator = build_generator(&cli)?;
            let mut session = ChatSession::new();

            match load_retriever(&cli, Arc::clone(&embedder))? {
                Some(retriever) => session.install_retriever(retriever),
                None => warn!("no documents ingested yet; answering without retrieved context"),
            }

            let turn = session.submit(query, &generator).await?;
            println!("{}", turn.answer);
        }
        Command::Chat => {
            let generator = build_generator(&cli)?;
            run_chat_loop(&cli, embedder, &generator, &paths, options).await?;
        }
    }

    Ok(())
}

async fn run_chat_loop(
    cli: &Cli,
    embedder: Arc<dyn Embedder>,
    generator: &ChatCompletionsClient,
    paths: &PipelinePaths,
    options: ChunkingOptions,
) -> anyhow::Result<()> {
    let mut session = ChatSession::new();

    if let Some(retriever) = load_retriever(cli, Arc::clone(&embedder))? {
        session.install_retriever(retriever);
        println!("Loaded existing index from {}.", cli.database_dir.display());
    } else {
        println!("No documents ingested yet. Queries will be answered without context.");
    }

    println!("Ask your questions below. Commands: :ingest <path>, :history, :quit");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();

        if input == ":quit" || input == ":exit" {
            break;
        }

        if input == ":history" {
            for turn in session.history() {
                println!("You: {}", turn.query);
                println!("Bot: {}", turn.answer);
            }
            continue;
        }

        if let Some(path) = input.strip_prefix(":ingest ") {
            match ingest_file(Path::new(path.trim()), embedder.as_ref(), paths, options).await {
                Ok(store) => {
                    let chunk_count = store.len();
                    session.install_retriever(
                        store.into_retriever(Arc::clone(&embedder), cli.top_k),
                    );
                    println!("File ingested successfully ({chunk_count} chunks in index).");
                }
                Err(error) => println!("Ingestion failed: {error}"),
            }
            continue;
        }

        match session.submit(input, generator).await {
            Ok(turn) => println!("Bot: {}", turn.answer),
            Err(QueryError::EmptyQuery) => println!("Query cannot be empty."),
            Err(error) => println!("Query failed: {error}"),
        }
    }

    Ok(())
}
