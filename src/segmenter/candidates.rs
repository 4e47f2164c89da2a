use std::sync::LazyLock;

use regex::Regex;

use super::catalog::{Catalog, Section};
use super::matcher::{flatten_ws, fuzzy_find_line, is_probable_heading};
use super::normalize::is_boilerplate_line;
use super::Strategy;

/// A resolved section start with its provenance.
pub struct Found {
    pub start: usize,
    pub strategy: Strategy,
    pub candidates: Vec<usize>,
}

/// Every line index where a strategy-1 pattern fires for this section.
pub fn find_all_starts(lines: &[String], section: &Section) -> Vec<usize> {
    // Sections that open a table (composition) skip prose-looking hits; a
    // sentence mentioning the ingredients is not the table heading.
    let filter_sentences = !section.spec.table_hint_keywords.is_empty();
    let mut idxs = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let cmp = flatten_ws(line);
        if section.line_res.iter().any(|re| re.is_match(&cmp)) {
            if filter_sentences && looks_like_sentence(&cmp) {
                continue;
            }
            idxs.push(i);
        }
    }
    idxs
}

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\.。．:：]$").unwrap());

pub fn looks_like_sentence(line: &str) -> bool {
    const DISCOURSE: &[&str] = &["에는", "에 ", "참조", "아래 표", "아래표", "아래 기재", "아래에", "보기"];
    let s = flatten_ws(line);
    let s = s.trim();
    if DISCOURSE.iter().any(|p| s.contains(p)) {
        return true;
    }
    SENTENCE_END_RE.is_match(s)
}

/// Non-blank, non-boilerplate lines strictly between `start` and `end`.
pub fn count_body_lines(lines: &[String], start: usize, end: usize) -> usize {
    let from = (start + 1).min(lines.len());
    let to = end.min(lines.len());
    if from >= to {
        return 0;
    }
    lines[from..to]
        .iter()
        .filter(|l| !l.trim().is_empty() && !is_boilerplate_line(l))
        .count()
}

pub fn has_table_header_ahead(
    lines: &[String],
    start: usize,
    hints: &[String],
    lookahead: usize,
) -> bool {
    let from = (start + 1).min(lines.len());
    let to = (start + 1 + lookahead).min(lines.len());
    if from >= to {
        return false;
    }
    let hay = flatten_ws(&lines[from..to].join("\n")).to_lowercase();
    hints.iter().any(|k| hay.contains(&k.to_lowercase()))
}

/// First line after `start` whose leading token matches `next_num`. The check
/// is numeric-only: title keywords are not required.
pub fn find_next_boundary(lines: &[String], start: usize, next_num: u32, catalog: &Catalog) -> usize {
    let Some(re) = catalog.boundary_re(next_num) else {
        return lines.len();
    };
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if re.is_match(&flatten_ws(line)) {
            return i;
        }
    }
    lines.len()
}

/// Pick the candidate with the most body content; ties go to the later
/// position (later occurrences are more likely real headings than TOC
/// echoes), and a best body of one line or less forces the last candidate.
pub fn select_best_start(
    lines: &[String],
    candidates: &[usize],
    section: &Section,
    catalog: &Catalog,
) -> Option<usize> {
    let last = *candidates.last()?;
    let mut best_idx = last;
    let mut best_score = i64::MIN;

    for &s in candidates {
        let trial_end = match section.spec.next_number {
            Some(n) => find_next_boundary(lines, s, n, catalog),
            None => candidates
                .iter()
                .copied()
                .filter(|&c| c > s)
                .min()
                .unwrap_or(lines.len()),
        };
        let mut score = count_body_lines(lines, s, trial_end) as i64;

        if !section.spec.table_hint_keywords.is_empty() {
            if has_table_header_ahead(lines, s, &section.spec.table_hint_keywords, 20) {
                score += 50;
            }
            if looks_like_sentence(&flatten_ws(&lines[s])) {
                score -= 30;
            }
        }

        if score > best_score || (score == best_score && s > best_idx) {
            best_score = score;
            best_idx = s;
        }
    }

    if best_score <= 1 {
        best_idx = last;
    }
    Some(best_idx)
}

/// Strategy chain for one section: exact line patterns, then the AND-gated
/// number+keyword test, then whole-line fuzzy. The cross-line fallback runs
/// at the pipeline level because it needs the full document text.
pub fn find_section_start(
    lines: &[String],
    section: &Section,
    catalog: &Catalog,
    threshold: f64,
) -> Option<Found> {
    let mut candidates = find_all_starts(lines, section);
    let mut strategy = Strategy::ExactLine;

    if candidates.is_empty() {
        for (i, line) in lines.iter().enumerate() {
            if is_probable_heading(
                line,
                &section.num_re,
                &section.spec.must_keywords,
                &section.spec.also_keywords,
                threshold,
            ) {
                candidates.push(i);
            }
        }
        strategy = Strategy::NumberKeyword;
    }

    if candidates.is_empty() {
        if !section.spec.fuzzy_titles.is_empty() {
            if let Some(idx) = fuzzy_find_line(lines, &section.spec.fuzzy_titles, threshold) {
                return Some(Found {
                    start: idx,
                    strategy: Strategy::WholeLineFuzzy,
                    candidates: vec![idx],
                });
            }
        }
        return None;
    }

    let start = select_best_start(lines, &candidates, section, catalog)?;
    Some(Found {
        start,
        strategy,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin()
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_heading_prefers_body_mass() {
        // A TOC echo of the section-9 heading with an empty body, then the
        // real heading followed by substantial prose.
        let mut doc = vec![
            "9. 물리 화학적 특성".to_string(),
            "10. 안정성 및 반응성".to_string(),
            "11. 독성에 관한 정보".to_string(),
            "9. 물리 화학적 특성".to_string(),
        ];
        for i in 0..40 {
            doc.push(format!("외관 및 성상 항목 {i}"));
        }
        doc.push("10. 안정성 및 반응성".to_string());
        doc.push("열 안정성이 높다".to_string());

        let cat = catalog();
        let section = cat.section_by_number(9).unwrap();
        let found = find_section_start(&doc, section, &cat, 0.78).unwrap();
        assert_eq!(found.candidates, vec![0, 3]);
        assert_eq!(found.start, 3);
        assert_eq!(found.strategy, Strategy::ExactLine);
    }

    #[test]
    fn tiny_body_falls_back_to_last_candidate() {
        let doc = lines(&[
            "9. 물리 화학적 특성",
            "10. 안정성 및 반응성",
            "9. 물리 화학적 특성",
            "10. 안정성 및 반응성",
        ]);
        let cat = catalog();
        let section = cat.section_by_number(9).unwrap();
        let found = find_section_start(&doc, section, &cat, 0.78).unwrap();
        assert_eq!(found.start, 2);
    }

    #[test]
    fn number_keyword_fallback_accepts_typo_heading() {
        // Strategy 1 cannot match: the phrase after the number starts with the
        // garbled word. The number plus the must/also keyword groups still
        // identify it.
        let doc = lines(&[
            "이전 본문",
            "15. 규졔현황 (법규)",
            "기존화학물질 해당",
        ]);
        let cat = catalog();
        let section = cat.section_by_number(15).unwrap();
        let found = find_section_start(&doc, section, &cat, 0.78).unwrap();
        assert_eq!(found.start, 1);
        assert_eq!(found.strategy, Strategy::NumberKeyword);
    }

    #[test]
    fn whole_line_fuzzy_accepts_close_title() {
        // No number token anywhere, one character off the canonical phrase.
        let doc = lines(&[
            "무관한 본문",
            "응급조치오령",
            "의사의 진료를 받는다",
        ]);
        let cat = catalog();
        let section = cat.section_by_number(4).unwrap();
        let found = find_section_start(&doc, section, &cat, 0.78).unwrap();
        assert_eq!(found.start, 1);
        assert_eq!(found.strategy, Strategy::WholeLineFuzzy);
    }

    #[test]
    fn boundary_is_numeric_only() {
        // An enumerated bullet carrying the next section's number stops the
        // scan even though it is not a real heading.
        let doc = lines(&[
            "3. 구성성분의 명칭 및 함유량",
            "에탄올 항목",
            "4) 기타 성분은 영업비밀",
            "물 항목",
        ]);
        let cat = catalog();
        assert_eq!(find_next_boundary(&doc, 0, 4, &cat), 2);
    }

    #[test]
    fn boundary_defaults_to_document_end() {
        let doc = lines(&["15. 법적 규제현황", "산업안전보건법 해당"]);
        let cat = catalog();
        assert_eq!(find_next_boundary(&doc, 0, 16, &cat), 2);
    }

    #[test]
    fn sentence_hits_are_not_composition_candidates() {
        let doc = lines(&[
            "3. 구성성분은 아래 표에 기재되어 있다.",
            "중간 본문",
            "3. 구성성분의 명칭 및 함유량",
            "화학물질명 CAS 함유량",
            "에탄올 64-17-5 10 - 20%",
        ]);
        let cat = catalog();
        let section = cat.section_by_number(3).unwrap();
        let found = find_section_start(&doc, section, &cat, 0.78).unwrap();
        assert_eq!(found.candidates, vec![2]);
        assert_eq!(found.start, 2);
    }
}
