use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::catalog::Catalog;
use super::matcher::{flatten_ws, is_probable_heading};

/// Leading enumeration grammar for TOC-like lines: `1.`, `10)`, `[15]`, `7:`.
static TOC_ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\[(\d{1,2})\]|(\d{1,2})\s*[\.\):])").unwrap());

pub fn toc_enum_number(line: &str) -> Option<u32> {
    let caps = TOC_ENUM_RE.captures(line)?;
    caps.get(1)
        .or_else(|| caps.get(2))?
        .as_str()
        .parse()
        .ok()
}

/// Page-level judgment: a known hint phrase, or a dense cluster of small
/// leading enumerations with section keywords sprinkled through the lines.
pub fn is_toc_page(text: &str, catalog: &Catalog) -> bool {
    let t = text.trim();
    if t.is_empty() {
        return false;
    }
    let lower = t.to_lowercase();
    if catalog.toc_hint_phrases.iter().any(|h| lower.contains(h)) {
        return true;
    }

    let lines: Vec<&str> = t.split('\n').filter(|l| !l.trim().is_empty()).collect();
    let mut unique_nums: HashSet<u32> = HashSet::new();
    let mut numbered_lines = 0usize;
    for line in &lines {
        if let Some(n) = toc_enum_number(line) {
            if (1..=16).contains(&n) {
                unique_nums.insert(n);
                numbered_lines += 1;
            }
        }
    }
    let total = lines.len().max(1);
    let kw_hits = lines.iter().filter(|l| has_toc_keyword(l, catalog)).count();

    unique_nums.len() >= 6
        && numbered_lines as f64 / total as f64 >= 0.30
        && kw_hits as f64 / total as f64 >= 0.10
}

/// Protect-first override: a page carrying any genuine heading is never
/// dropped, no matter how TOC-like it looks.
pub fn page_has_section_heading(text: &str, catalog: &Catalog, threshold: f64) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    let hay = flatten_ws(text);
    for section in catalog.sections() {
        if section.page_res.iter().any(|re| re.is_match(&hay)) {
            return true;
        }
    }
    // The regulatory heading is the most typo-prone; give it the AND-gated
    // keyword test as well.
    if let Some(legal) = catalog.section_by_number(15) {
        for line in hay.split('\n') {
            if is_probable_heading(
                line,
                &legal.num_re,
                &legal.spec.must_keywords,
                &legal.spec.also_keywords,
                threshold,
            ) {
                return true;
            }
        }
    }
    false
}

/// Strategy-1 heading test across every section, for block protection.
pub fn line_matches_any_heading(line: &str, catalog: &Catalog) -> bool {
    let cmp = flatten_ws(line);
    catalog
        .sections()
        .iter()
        .any(|s| s.line_res.iter().any(|re| re.is_match(&cmp)))
}

/// Remove embedded TOC blocks: maximal runs of consecutive enumerated lines
/// that look like a contents list. A run containing even one real heading is
/// kept verbatim. Two states: outside a run / accumulating a run.
pub fn strip_toc_block(lines: Vec<String>, catalog: &Catalog) -> Vec<String> {
    let n = lines.len();
    let mut out = Vec::with_capacity(n);
    let mut i = 0;
    while i < n {
        if toc_enum_number(&lines[i]).is_none() {
            out.push(lines[i].clone());
            i += 1;
            continue;
        }

        let mut j = i;
        let mut unique_nums: HashSet<u32> = HashSet::new();
        while j < n {
            match toc_enum_number(&lines[j]) {
                Some(num) => {
                    unique_nums.insert(num);
                    j += 1;
                }
                None => break,
            }
        }
        let run = &lines[i..j];

        let protected = run.iter().any(|l| line_matches_any_heading(l, catalog));
        if !protected {
            let seq = run.len();
            let avg_len =
                run.iter().map(|l| l.chars().count()).sum::<usize>() as f64 / seq as f64;
            let kw_hits = run.iter().filter(|l| has_toc_keyword(l, catalog)).count();
            let max_num = unique_nums.iter().copied().max().unwrap_or(0);
            let is_toc = seq >= 5
                && unique_nums.len() >= 5
                && max_num <= 16
                && avg_len <= 40.0
                && kw_hits as f64 / seq as f64 >= 0.5;
            if is_toc {
                i = j;
                continue;
            }
        }
        out.extend(run.iter().cloned());
        i = j;
    }
    out
}

fn has_toc_keyword(line: &str, catalog: &Catalog) -> bool {
    let lower = line.to_lowercase();
    catalog.toc_keywords.iter().any(|kw| lower.contains(kw))
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
    fn enum_grammar() {
        assert_eq!(toc_enum_number("1. 개요"), Some(1));
        assert_eq!(toc_enum_number("10) 안정성"), Some(10));
        assert_eq!(toc_enum_number("[15] 법적"), Some(15));
        assert_eq!(toc_enum_number("가. 항목"), None);
        assert_eq!(toc_enum_number("본문입니다"), None);
    }

    #[test]
    fn contents_page_is_toc() {
        let page = "Contents\n1. Section One\n2. Section Two\n3. Section Three\n\
                    4. Section Four\n5. Section Five\n6. Section Six\n\
                    15. Section Fifteen";
        let cat = catalog();
        assert!(is_toc_page(page, &cat));
        assert!(!page_has_section_heading(page, &cat, 0.78));
    }

    #[test]
    fn dense_numbering_without_hint_is_toc() {
        let page = "1. 화학제품 정보\n2. 유해성 항목\n3. 구성 항목\n4. 응급 항목\n\
                    5. 화재 항목\n6. 누출 항목\n7. 취급 항목";
        assert!(is_toc_page(page, &catalog()));
    }

    #[test]
    fn prose_page_is_not_toc() {
        let page = "이 제품은 인화성이 강하다.\n보호구를 착용하고 취급한다.\n\
                    환기가 잘 되는 곳에 보관한다.";
        assert!(!is_toc_page(page, &catalog()));
    }

    #[test]
    fn page_with_real_heading_is_protected() {
        let page = "목차\n1. Section One\n3. Composition Name and Content of Ingredients\n\
                    4. Section Four";
        let cat = catalog();
        assert!(is_toc_page(page, &cat));
        assert!(page_has_section_heading(page, &cat, 0.78));
    }

    #[test]
    fn toc_block_is_stripped() {
        let input = lines(&[
            "본문 시작",
            "1. 개요 항목",
            "2. 위험 요약",
            "3. 물질 목록",
            "4. 응급 항목",
            "5. 폭발 항목",
            "본문 계속",
        ]);
        let out = strip_toc_block(input, &catalog());
        assert_eq!(out, lines(&["본문 시작", "본문 계속"]));
    }

    #[test]
    fn block_with_heading_is_kept_verbatim() {
        // Same sparse list, but one entry is a genuine heading: the whole
        // run survives, sparse neighbors included.
        let input = lines(&[
            "1. 개요 항목",
            "2. 위험 요약",
            "3. 구성성분의 명칭 및 함유량",
            "4. 응급 항목",
            "5. 폭발 항목",
        ]);
        let out = strip_toc_block(input.clone(), &catalog());
        assert_eq!(out, input);
    }

    #[test]
    fn short_run_is_kept() {
        let input = lines(&["1. 취급 항목", "2. 보관 항목", "이후 본문"]);
        let out = strip_toc_block(input.clone(), &catalog());
        assert_eq!(out, input);
    }

    #[test]
    fn long_lines_are_not_a_toc_block() {
        let input = lines(&[
            "1. 화학물질을 취급할 때에는 반드시 환기 설비를 가동하고 보호구를 착용하여야 한다",
            "2. 유해 화학물질이 누출된 경우에는 즉시 관계 기관에 신고하고 출입을 통제하여야 한다",
            "3. 성분 정보가 변경된 경우에는 물질안전보건자료를 다시 작성하여 제공하여야 한다",
            "4. 응급 상황이 발생한 경우에는 즉시 의사의 진료를 받도록 조치하여야 한다",
            "5. 화재가 발생한 경우에는 이산화탄소 소화기를 사용하여 초기 진화를 시도한다",
        ]);
        let out = strip_toc_block(input.clone(), &catalog());
        assert_eq!(out, input);
    }
}
