use crate::error::IngestError;
use crate::models::{NormalizedDocument, SourceFormat};
use lopdf::Document;
use std::fs;
use std::path::Path;

/// Convert an uploaded `.pdf` or `.txt` file into a canonical UTF-8 text
/// file inside `output_dir`, named after the source file's stem.
///
/// Text input round-trips byte-for-byte (re-encoded as UTF-8). PDF input is
/// extracted page by page; a page without extractable text contributes
/// nothing. An existing output file of the same name is overwritten.
pub fn normalize_document(
    source: &Path,
    output_dir: &Path,
) -> Result<NormalizedDocument, IngestError> {
    let format = SourceFormat::from_path(source)?;
    fs::create_dir_all(output_dir)?;

    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| IngestError::MissingFileName(source.display().to_string()))?;
    let output_path = output_dir.join(format!("{stem}.txt"));

    let text = match format {
        SourceFormat::Text => fs::read_to_string(source)?,
        SourceFormat::Pdf => extract_pdf_text(source)?,
    };

    fs::write(&output_path, text)?;

    Ok(NormalizedDocument {
        path: output_path,
        source_path: source.to_path_buf(),
        format,
    })
}

fn extract_pdf_text(path: &Path) -> Result<String, IngestError> {
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut text = String::new();
    for (page_no, _page_id) in document.get_pages() {
        // A page that fails extraction counts as having no extractable text.
        let Ok(page_text) = document.extract_text(&[page_no]) else {
            continue;
        };
        if page_text.trim().is_empty() {
            continue;
        }
        text.push_str(&page_text);
        text.push('\n');
    }

    Ok(text)
}
