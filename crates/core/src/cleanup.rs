use crate::error::QueryError;
use regex::Regex;

/// Clean raw model output for display: strip trailing structured metadata,
/// flatten whitespace, then rewrite `* label:` segments as markdown
/// bullets. Purely pattern-based, no semantic understanding.
///
/// Not idempotent for bulleted text; a second pass over plain text is a
/// no-op.
pub fn clean_response(response: &str) -> Result<String, QueryError> {
    // Everything from the first metadata marker onwards is representation
    // noise appended by the model API, not answer text.
    let metadata_marker = Regex::new(r"\nadditional_kwargs=|response_metadata=")?;
    let body = metadata_marker.splitn(response, 2).next().unwrap_or(response);

    let blank_lines = Regex::new(r"\n\s*\n")?;
    let collapsed = blank_lines.replace_all(body, "\n");
    let flattened = collapsed.replace('\n', " ");

    let whitespace_runs = Regex::new(r"\s+")?;
    let flat = whitespace_runs.replace_all(&flattened, " ");
    let flat = flat.trim();

    let bullet_labels = Regex::new(r"\*\s*([^*]+):")?;
    let labeled = bullet_labels.replace_all(flat, "\n- **${1}**:");

    let dashes = Regex::new(r"\s*-\s*")?;
    let bulleted = dashes.replace_all(&labeled, "\n- ");

    Ok(bulleted.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::clean_response;

    #[test]
    fn metadata_suffix_is_fully_stripped() {
        let raw = "Answer text\nadditional_kwargs={'usage': {'tokens': 42}}";
        assert_eq!(clean_response(raw).unwrap(), "Answer text");
    }

    #[test]
    fn response_metadata_marker_is_also_stripped() {
        let raw = "Answer text response_metadata={'model': 'x'}";
        assert_eq!(clean_response(raw).unwrap(), "Answer text");
    }

    #[test]
    fn newlines_collapse_to_single_spaces() {
        let raw = "First sentence.\n\n\nSecond   sentence.\nThird.";
        assert_eq!(
            clean_response(raw).unwrap(),
            "First sentence. Second sentence. Third."
        );
    }

    #[test]
    fn star_labels_become_markdown_bullets() {
        let raw = "Key points: * Pressure: 210 bar";
        let cleaned = clean_response(raw).unwrap();
        assert!(cleaned.contains("- **Pressure**: 210 bar"));
    }

    #[test]
    fn cleanup_is_a_no_op_on_plain_text() {
        let once = clean_response("A plain answer with no markers.").unwrap();
        let twice = clean_response(&once).unwrap();
        assert_eq!(once, "A plain answer with no markers.");
        assert_eq!(twice, once);
    }

    #[test]
    fn no_trailing_whitespace_survives() {
        let raw = "Answer text   \nadditional_kwargs={}";
        assert_eq!(clean_response(raw).unwrap(), "Answer text");
    }
}
