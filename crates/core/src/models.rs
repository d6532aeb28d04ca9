use crate::error::IngestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Text,
}

impl SourceFormat {
    /// Classify a file by extension, case-insensitively. Anything that is
    /// not `.pdf` or `.txt` is rejected before it reaches the normalizer.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Ok(SourceFormat::Pdf),
            Some("txt") => Ok(SourceFormat::Text),
            _ => Err(IngestError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A plain-text file derived from an uploaded source file. Written once by
/// the normalizer, read by the chunker, never mutated.
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    pub path: PathBuf,
    pub source_path: PathBuf,
    pub format: SourceFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub source_path: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// A bounded-length substring of a normalized document, the unit of
/// retrieval. Consecutive chunks share the configured overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub index: usize,
    pub text: String,
}

/// Persisted form of an embedded chunk inside the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    pub record_id: String,
    pub source_path: String,
    pub source_checksum: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    pub ingested_at: DateTime<Utc>,
}

/// A retrieval hit: chunk text plus its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub source_path: String,
    pub score: f32,
}

/// One completed exchange in a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub query: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_chars: 1_000,
            overlap_chars: 200,
        }
    }
}

/// Filesystem layout shared by every pipeline call.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    /// Where normalized `.txt` documents are written.
    pub documents_dir: PathBuf,
    /// Where uploaded raw files are staged before normalization.
    pub temp_dir: PathBuf,
    /// Where the persistent vector index lives.
    pub database_dir: PathBuf,
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("documents"),
            temp_dir: PathBuf::from("temp"),
            database_dir: PathBuf::from("database"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SourceFormat;
    use std::path::Path;

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(
            SourceFormat::from_path(Path::new("report.PDF")).unwrap(),
            SourceFormat::Pdf
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("notes.Txt")).unwrap(),
            SourceFormat::Text
        );
    }

    #[test]
    fn unknown_extensions_are_rejected() {
        assert!(SourceFormat::from_path(Path::new("slides.docx")).is_err());
        assert!(SourceFormat::from_path(Path::new("no_extension")).is_err());
    }
}
