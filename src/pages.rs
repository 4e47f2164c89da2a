use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::segmenter::normalize::{is_boilerplate_line, DOC_MARK_RE, PAGE_MARK_RE};

const DEFAULT_MIN_PAGE_CHARS: usize = 40;

/// Pages shorter than this (after trimming) would go to OCR in the extraction
/// layer; here they are only flagged.
fn min_page_chars() -> usize {
    std::env::var("MSDS_PAGE_MIN_CHARS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MIN_PAGE_CHARS)
}

/// Load one document's ordered page texts.
///
/// `.json` holds an array of page strings; anything else is plain text with
/// pages separated by form feed (U+000C). Page-edge trimming is applied here,
/// at the aggregation boundary, so the segmenter sees pre-trimmed pages.
pub fn load_document(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let pages: Vec<String> = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&raw)
            .with_context(|| format!("parsing page array {}", path.display()))?,
        _ => raw.split('\u{0c}').map(str::to_string).collect(),
    };

    let min_chars = min_page_chars();
    let trimmed: Vec<String> = pages
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let t = strip_page_edges(text);
            if t.trim().chars().count() < min_chars {
                // The OCR fallback lives in the extraction layer; a thin page
                // here is processed as-is, never fatal.
                warn!(
                    "page {} of {} has under {} chars, continuing text-only",
                    i + 1,
                    path.display(),
                    min_chars
                );
            }
            t
        })
        .collect();

    Ok(trimmed)
}

/// Drop header/footer lines from the first and last three lines of a page.
pub fn strip_page_edges(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let n = lines.len();
    lines
        .iter()
        .enumerate()
        .filter(|(i, line)| {
            let at_top = *i < 3;
            let at_bottom = *i + 3 >= n;
            let top_hit = at_top && (DOC_MARK_RE.is_match(line) || is_boilerplate_line(line));
            let bottom_hit =
                at_bottom && (PAGE_MARK_RE.is_match(line) || is_boilerplate_line(line));
            !(top_hit || bottom_hit)
        })
        .map(|(_, line)| *line)
        .collect::<Vec<_>>()
        .join("\n")
}
