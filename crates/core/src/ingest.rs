use crate::chunking::chunk_document;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::models::{ChunkingOptions, DocumentFingerprint, PipelinePaths, SourceFormat};
use crate::normalize::normalize_document;
use crate::store::VectorStore;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively find ingestable files (`.pdf` or `.txt`) under `folder`,
/// sorted for deterministic ingestion order.
pub fn discover_document_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        if SourceFormat::from_path(entry.path()).is_ok() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Copy an uploaded file into the staging directory, rejecting unsupported
/// extensions before the normalizer ever sees the file.
pub fn stage_upload(source: &Path, temp_dir: &Path) -> Result<PathBuf, IngestError> {
    SourceFormat::from_path(source)?;

    let name = source
        .file_name()
        .ok_or_else(|| IngestError::MissingFileName(source.display().to_string()))?;

    fs::create_dir_all(temp_dir)?;
    let staged = temp_dir.join(name);
    fs::copy(source, &staged)?;
    Ok(staged)
}

fn build_document_fingerprint(path: &Path) -> Result<DocumentFingerprint, IngestError> {
    Ok(DocumentFingerprint {
        source_path: path.to_string_lossy().to_string(),
        checksum: digest_file(path)?,
        ingested_at: Utc::now(),
    })
}

/// Run the full ingestion pipeline for one file: stage → normalize →
/// chunk → embed → index. Returns the updated store handle; callers wrap
/// it in a retriever when they want to query.
pub async fn ingest_file(
    source: &Path,
    embedder: &dyn Embedder,
    paths: &PipelinePaths,
    options: ChunkingOptions,
) -> Result<VectorStore, IngestError> {
    let staged = stage_upload(source, &paths.temp_dir)?;
    let fingerprint = build_document_fingerprint(&staged)?;
    let normalized = normalize_document(&staged, &paths.documents_dir)?;
    let chunks = chunk_document(&normalized.path, options)?;
    VectorStore::build(&chunks, embedder, &paths.database_dir, &fingerprint).await
}

pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub store: VectorStore,
    pub ingested_files: usize,
    pub skipped_files: Vec<SkippedDocument>,
}

/// Ingest every `.pdf`/`.txt` file under `folder`, best effort: a file
/// that fails is recorded and skipped, never aborting the rest.
pub async fn ingest_folder(
    folder: &Path,
    embedder: &dyn Embedder,
    paths: &PipelinePaths,
    options: ChunkingOptions,
) -> Result<IngestionReport, IngestError> {
    let files = discover_document_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pdf or txt files found in {}",
            folder.display()
        )));
    }

    let mut ingested_files = 0;
    let mut skipped_files = Vec::new();

    for path in files {
        match ingest_file(&path, embedder, paths, options).await {
            Ok(_) => ingested_files += 1,
            Err(error) => skipped_files.push(SkippedDocument {
                path,
                reason: error.to_string(),
            }),
        }
    }

    let store = VectorStore::load(&paths.database_dir)?;
    Ok(IngestionReport {
        store,
        ingested_files,
        skipped_files,
    })
}
