use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::matcher::strip_ws;

/// Repeated header/footer patterns, applied to the case-folded,
/// whitespace-stripped form of a line. Kept conservative so running prose
/// never gets classified as boilerplate.
static BOILERPLATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Document-id labels and revision markers.
        r"msds번호",
        r"문서번호",
        r"개정일자",
        r"개정번호",
        r"document\s*no",
        r"revision\s*date",
        // Standalone document titles only; the same words inside a sentence
        // are excluded by the anchors.
        r"^물질안전보건자료$",
        r"^materialsafetydatasheets?$",
        r"^safetydatasheets?$",
        r"ghs[\-\s]?msds",
        // Page markers.
        r"\d+\s*/\s*\d+\s*(페이지|page)",
        r"page\s*\d+\s*/\s*\d+",
        // Revision footers and copyright.
        r"-\d+/\d+-\s*rev\.",
        r"rev\.\s*\d+",
        r"copyright",
        r"all\s*rights\s*reserved",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub static PAGE_MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+\s*/\s*\d+\s*(?:페이지|page)\b").unwrap());
pub static DOC_MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ghs[\-\s]?msds").unwrap());

/// Header/footer judgment for one line.
pub fn is_boilerplate_line(line: &str) -> bool {
    let normalized = strip_ws(line);
    // Sentences discussing the document itself are never headers.
    if normalized.contains("본msds는") {
        return false;
    }
    BOILERPLATE_PATTERNS.iter().any(|re| re.is_match(&normalized))
}

/// Detect boilerplate within the first ten lines, then drop every line in the
/// document whose normalized form equals one of the detected lines.
pub fn remove_repeated_headers(lines: Vec<String>) -> Vec<String> {
    let mut repeated: HashSet<String> = HashSet::new();
    for line in lines.iter().take(10) {
        if is_boilerplate_line(line) {
            repeated.insert(strip_ws(line));
        }
    }
    if repeated.is_empty() {
        return lines;
    }
    lines
        .into_iter()
        .filter(|line| !repeated.contains(&strip_ws(line)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_document_markers() {
        assert!(is_boilerplate_line("MSDS번호: 2024-001"));
        assert!(is_boilerplate_line("개정일자 2024.01.05"));
        assert!(is_boilerplate_line("1 / 12 페이지"));
        assert!(is_boilerplate_line("Page 3 / 12"));
        assert!(is_boilerplate_line("물질안전보건자료"));
        assert!(is_boilerplate_line("Material Safety Data Sheet"));
    }

    #[test]
    fn prose_is_not_boilerplate() {
        // Running prose that references the document by name stays.
        assert!(!is_boilerplate_line("본 MSDS는 산업안전보건법에 따라 작성되었다"));
        assert!(!is_boilerplate_line("물질안전보건자료에 관한 기준을 따른다"));
        assert!(!is_boilerplate_line("취급 시 보호구를 착용한다"));
    }

    #[test]
    fn removes_every_occurrence_of_detected_header() {
        let lines: Vec<String> = [
            "MSDS번호: 2024-001",
            "1. 화학제품과 회사에 관한 정보",
            "제품명: 아세톤",
            "MSDS번호: 2024-001",
            "2. 유해성·위험성",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let out = remove_repeated_headers(lines);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|l| !l.contains("MSDS번호")));
    }

    #[test]
    fn header_outside_detection_window_is_kept() {
        let mut lines: Vec<String> = (0..12).map(|i| format!("본문 내용 {i}")).collect();
        lines.push("MSDS번호: 2024-001".to_string());
        let out = remove_repeated_headers(lines);
        assert_eq!(out.len(), 13);
    }
}
