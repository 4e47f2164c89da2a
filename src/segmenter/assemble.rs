use std::sync::LazyLock;

use regex::Regex;

use super::matcher::flatten_ws;
use super::normalize::is_boilerplate_line;

/// First data field of section 1. Some documents put the product name on the
/// same physical line as the heading token, so this is narrower than the
/// heading grammar: an optional `1)`/`[1]`/`①` prefix, then the label.
static PRODUCT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:\[(?:1|①)\]|1\s*[\.\):]?)?\s*(?:제품\s*명|product\s*name)\s*[:：]?")
        .unwrap()
});

pub fn is_product_name_line(line: &str) -> bool {
    let s = flatten_ws(line);
    PRODUCT_NAME_RE.is_match(s.trim())
}

/// Build the body text for a resolved `[start, end)` window: lines after the
/// heading, minus blanks and boilerplate (headers can recur mid-document on
/// later pages). `include_start` widens the window to the heading line itself.
pub fn build_body(lines: &[String], start: usize, end: usize, include_start: bool) -> String {
    let from = if include_start { start } else { start + 1 };
    let from = from.min(lines.len());
    let to = end.min(lines.len());
    if from >= to {
        return String::new();
    }
    lines[from..to]
        .iter()
        .filter(|l| !l.trim().is_empty() && !is_boilerplate_line(l))
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn product_name_forms() {
        assert!(is_product_name_line("제품명: 아세톤"));
        assert!(is_product_name_line("1) 제품명 아세톤"));
        assert!(is_product_name_line("[1] 제품명"));
        assert!(is_product_name_line("Product Name: Acetone"));
        assert!(!is_product_name_line("1. 화학제품과 회사에 관한 정보"));
        assert!(!is_product_name_line("회사명: 한국화학"));
    }

    #[test]
    fn body_excludes_heading_blanks_and_boilerplate() {
        let doc = lines(&[
            "1. 화학제품과 회사에 관한 정보",
            "제품명: 아세톤",
            "",
            "MSDS번호: 2024-001",
            "회사명: 한국화학",
            "2. 유해성·위험성",
        ]);
        let body = build_body(&doc, 0, 5, false);
        assert_eq!(body, "제품명: 아세톤\n회사명: 한국화학");
    }

    #[test]
    fn start_line_included_when_it_carries_the_product_field() {
        let doc = lines(&["제품명: 아세톤", "회사명: 한국화학"]);
        let body = build_body(&doc, 0, 2, true);
        assert_eq!(body, "제품명: 아세톤\n회사명: 한국화학");
    }

    #[test]
    fn out_of_range_window_is_empty() {
        let doc = lines(&["한 줄"]);
        assert_eq!(build_body(&doc, 0, 1, false), "");
        assert_eq!(build_body(&doc, 5, 9, false), "");
    }
}
