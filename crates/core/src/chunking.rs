use crate::error::IngestError;
use crate::models::{ChunkingOptions, DocumentChunk};
use std::path::Path;

/// Load a normalized document as one logical text. The file must decode as
/// well-formed UTF-8; anything else is a [`IngestError::DocumentLoad`].
pub fn load_document(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes)
        .map_err(|error| IngestError::DocumentLoad(format!("{}: {error}", path.display())))
}

/// Split text into an ordered sequence of chunks with a character-index
/// sliding window: every chunk is at most `max_chars` long, and each chunk
/// after the first begins with the previous chunk's trailing
/// `overlap_chars` characters. An empty document yields an empty sequence.
pub fn split_chunks(
    text: &str,
    options: ChunkingOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    if options.max_chars == 0 || options.overlap_chars >= options.max_chars {
        return Err(IngestError::InvalidChunkConfig(format!(
            "overlap {} must be smaller than max length {}",
            options.overlap_chars, options.max_chars
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    let step = options.max_chars - options.overlap_chars;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + options.max_chars).min(chars.len());
        chunks.push(DocumentChunk {
            index: chunks.len(),
            text: chars[start..end].iter().collect(),
        });
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Load and split a normalized document in one pass.
pub fn chunk_document(
    path: &Path,
    options: ChunkingOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let text = load_document(path)?;
    split_chunks(&text, options)
}
