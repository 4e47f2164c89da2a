pub mod assemble;
pub mod candidates;
pub mod catalog;
pub mod matcher;
pub mod normalize;
pub mod toc;

use std::collections::BTreeMap;

use catalog::Catalog;

/// Which tier of the fallback chain produced an accepted section start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Exact numbered-heading regex on a single cleaned line.
    ExactLine,
    /// Leading number plus AND-gated must/also keywords, fuzzy-tolerant.
    NumberKeyword,
    /// Whole-line similarity against canonical phrasings.
    WholeLineFuzzy,
    /// Cross-line regex over the raw (pre-cleanup) document text.
    CrossLineRaw,
    /// Cross-line regex over the cleaned document text.
    CrossLineClean,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ExactLine => "exact_line",
            Strategy::NumberKeyword => "number_keyword",
            Strategy::WholeLineFuzzy => "whole_line_fuzzy",
            Strategy::CrossLineRaw => "cross_line_raw",
            Strategy::CrossLineClean => "cross_line_clean",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Acceptance threshold shared by the keyword and whole-line fuzzy tiers.
    pub similarity_threshold: f64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        SegmenterConfig {
            similarity_threshold: 0.78,
        }
    }
}

impl SegmenterConfig {
    pub fn from_env() -> Self {
        let mut cfg = SegmenterConfig::default();
        if let Ok(v) = std::env::var("MSDS_SIM_THRESHOLD") {
            if let Ok(t) = v.parse::<f64>() {
                cfg.similarity_threshold = t;
            }
        }
        cfg
    }
}

/// Diagnostics for one accepted section.
#[derive(Debug, Clone)]
pub struct SectionTrace {
    pub key: String,
    pub number: u32,
    pub strategy: Strategy,
    pub candidates: Vec<usize>,
    pub start: usize,
    pub end: usize,
}

/// The section map plus the trace that explains it.
#[derive(Debug, Default)]
pub struct Segmentation {
    pub sections: BTreeMap<String, String>,
    pub trace: Vec<SectionTrace>,
}

struct Position {
    number: u32,
    start: usize,
    strategy: Strategy,
    candidates: Vec<usize>,
}

/// Segment one document's ordered page texts into canonical section bodies.
/// Pure: identical input always yields an identical result.
pub fn segment(pages: &[String], catalog: &Catalog, cfg: &SegmenterConfig) -> Segmentation {
    let threshold = cfg.similarity_threshold;

    // Drop whole TOC pages unless they carry a genuine heading.
    let kept: Vec<&str> = pages
        .iter()
        .filter(|t| {
            toc::page_has_section_heading(t, catalog, threshold) || !toc::is_toc_page(t, catalog)
        })
        .map(|s| s.as_str())
        .collect();

    let full_raw = kept.join("\n");
    let lines_raw: Vec<String> = full_raw.split('\n').map(str::to_string).collect();

    let lines = normalize::remove_repeated_headers(lines_raw);
    let lines = toc::strip_toc_block(lines, catalog);
    let full_clean = lines.join("\n");

    // Line-based strategies per section.
    let mut positions: BTreeMap<String, Position> = BTreeMap::new();
    for section in catalog.sections() {
        if let Some(found) = candidates::find_section_start(&lines, section, catalog, threshold) {
            positions.insert(
                section.spec.key.clone(),
                Position {
                    number: section.spec.number,
                    start: found.start,
                    strategy: found.strategy,
                    candidates: found.candidates,
                },
            );
        }
    }

    // Cross-line fallback for the remaining sections: raw text first (cleanup
    // can remove a line that carried part of the heading), then clean text.
    for (text, strategy) in [
        (&full_raw, Strategy::CrossLineRaw),
        (&full_clean, Strategy::CrossLineClean),
    ] {
        for section in catalog.sections() {
            if positions.contains_key(&section.spec.key) {
                continue;
            }
            let Some(re) = section.multiline_re.as_ref() else {
                continue;
            };
            if let Some(idx) = matcher::cross_line_find(text, re) {
                // Raw offsets can land past the cleaned sequence.
                let idx = idx.min(lines.len().saturating_sub(1));
                positions.insert(
                    section.spec.key.clone(),
                    Position {
                        number: section.spec.number,
                        start: idx,
                        strategy,
                        candidates: vec![idx],
                    },
                );
            }
        }
    }

    if positions.is_empty() {
        return Segmentation::default();
    }

    let mut ordered: Vec<(String, Position)> = positions.into_iter().collect();
    ordered.sort_by_key(|(_, p)| (p.start, p.number));
    // One line can only start one section; collisions keep the lower number.
    ordered.dedup_by(|a, b| a.1.start == b.1.start);

    let all_starts: Vec<usize> = ordered.iter().map(|(_, p)| p.start).collect();
    let mut out = Segmentation::default();

    for (key, pos) in ordered {
        let Some(section) = catalog.section_by_key(&key) else {
            continue;
        };
        let default_end = all_starts
            .iter()
            .copied()
            .filter(|&p| p > pos.start)
            .min()
            .unwrap_or(lines.len());
        let end = match section.spec.next_number {
            Some(n) => default_end.min(candidates::find_next_boundary(&lines, pos.start, n, catalog)),
            None => default_end,
        };

        let include_start = pos.number == 1
            && lines
                .get(pos.start)
                .is_some_and(|l| assemble::is_product_name_line(l));

        let body = assemble::build_body(&lines, pos.start, end, include_start);
        out.sections.insert(key.clone(), body);
        out.trace.push(SectionTrace {
            key,
            number: pos.number,
            strategy: pos.strategy,
            candidates: pos.candidates,
            start: pos.start,
            end,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat() -> Catalog {
        Catalog::builtin()
    }

    fn one_page(lines: &[&str]) -> Vec<String> {
        vec![lines.join("\n")]
    }

    #[test]
    fn english_heading_pair_splits_cleanly() {
        let pages = one_page(&[
            "1. Chemical Product and Company Information",
            "Product name: Alpha-9",
            "2. Hazards Identification",
            "Signal word: Warning",
        ]);
        let seg = segment(&pages, &cat(), &SegmenterConfig::default());
        assert_eq!(
            seg.sections.get("chemical_product_company").map(String::as_str),
            Some("Product name: Alpha-9")
        );
        assert_eq!(
            seg.sections.get("hazards").map(String::as_str),
            Some("Signal word: Warning")
        );
    }

    #[test]
    fn pure_contents_page_is_dropped() {
        let toc_page = "Contents\n1. Section One\n2. Section Two\n3. Section Three\n\
                        4. Section Four\n5. Section Five\n6. Section Six\n7. Section Seven\n\
                        15. Section Fifteen"
            .to_string();
        let body_page = "9. 물리 화학적 특성\n외관: 무색 액체".to_string();
        let seg = segment(&[toc_page, body_page], &cat(), &SegmenterConfig::default());
        assert_eq!(seg.trace.len(), 1);
        assert_eq!(seg.trace[0].key, "physical_chemical");
        assert_eq!(seg.trace[0].start, 0);
    }

    #[test]
    fn duplicated_heading_resolves_to_the_real_one() {
        let mut doc = vec![
            "9. 물리 화학적 특성",
            "10. 안정성 및 반응성",
            "11. 독성에 관한 정보",
            "9. 물리 화학적 특성",
        ]
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
        for i in 0..40 {
            doc.push(format!("외관 및 성상 항목 {i}"));
        }
        doc.push("10. 안정성 및 반응성".to_string());
        doc.push("열 안정성이 높다".to_string());
        let pages = vec![doc.join("\n")];

        let seg = segment(&pages, &cat(), &SegmenterConfig::default());
        let nine = seg
            .trace
            .iter()
            .find(|t| t.key == "physical_chemical")
            .unwrap();
        assert_eq!(nine.start, 3);
        assert_eq!(nine.end, 44);
        let body = &seg.sections["physical_chemical"];
        assert_eq!(body.lines().count(), 40);
        assert!(body.lines().all(|l| l.starts_with("외관")));
    }

    #[test]
    fn typo_regulatory_heading_found_by_keyword_gate() {
        let pages = one_page(&[
            "14. 운송에 필요한 사항",
            "UN 번호 없음",
            "15. 규졔현황 (법규)",
            "기존화학물질 해당",
        ]);
        let seg = segment(&pages, &cat(), &SegmenterConfig::default());
        let reg = seg.trace.iter().find(|t| t.key == "regulatory").unwrap();
        assert_eq!(reg.start, 2);
        assert_eq!(reg.strategy, Strategy::NumberKeyword);
        assert_eq!(seg.sections["regulatory"], "기존화학물질 해당");
    }

    #[test]
    fn split_heading_recovered_across_lines() {
        let pages = one_page(&[
            "8. 노출방지 및 개인보호구",
            "보호 장갑을 착용한다",
            "9.",
            "물리 화학적 특성 및 그 외",
            "외관: 무색",
        ]);
        let seg = segment(&pages, &cat(), &SegmenterConfig::default());
        let nine = seg
            .trace
            .iter()
            .find(|t| t.key == "physical_chemical")
            .unwrap();
        assert_eq!(nine.start, 2);
        assert_eq!(nine.strategy, Strategy::CrossLineRaw);
    }

    #[test]
    fn deterministic_output() {
        let pages = one_page(&[
            "1. 화학제품과 회사에 관한 정보",
            "제품명: 아세톤",
            "2. 유해성·위험성",
            "신호어: 경고",
            "3. 구성성분의 명칭 및 함유량",
            "아세톤 67-64-1 99%",
        ]);
        let cfg = SegmenterConfig::default();
        let a = segment(&pages, &cat(), &cfg);
        let b = segment(&pages, &cat(), &cfg);
        assert_eq!(a.sections, b.sections);
    }

    #[test]
    fn keys_are_a_subset_of_the_catalog() {
        let pages = one_page(&["1. 화학제품과 회사에 관한 정보", "제품명: 아세톤"]);
        let catalog = cat();
        let seg = segment(&pages, &catalog, &SegmenterConfig::default());
        for key in seg.sections.keys() {
            assert!(catalog.section_by_key(key).is_some());
        }
    }

    #[test]
    fn resolved_ranges_never_overlap() {
        let fixture = std::fs::read_to_string("tests/fixtures/acetone_kr.txt").unwrap();
        let pages: Vec<String> = fixture.split('\u{0c}').map(String::from).collect();
        let seg = segment(&pages, &cat(), &SegmenterConfig::default());
        let mut ranges: Vec<(usize, usize)> =
            seg.trace.iter().map(|t| (t.start, t.end)).collect();
        ranges.sort();
        for pair in ranges.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "overlap: {pair:?}");
        }
    }

    #[test]
    fn full_document_fixture_finds_all_sections() {
        let fixture = std::fs::read_to_string("tests/fixtures/acetone_kr.txt").unwrap();
        let pages: Vec<String> = fixture.split('\u{0c}').map(String::from).collect();
        let catalog = cat();
        let seg = segment(&pages, &catalog, &SegmenterConfig::default());
        for section in catalog.sections() {
            assert!(
                seg.sections.contains_key(&section.spec.key),
                "missing section {}",
                section.spec.key
            );
        }
        assert!(seg.sections["chemical_product_company"].contains("제품명"));
        assert!(seg.sections["composition"].contains("67-64-1"));
        assert!(seg.sections["hazards"].contains("H225"));
        // Repeated document header must not leak into any body.
        for body in seg.sections.values() {
            assert!(!body.contains("MSDS번호"));
        }
    }

    #[test]
    fn exact_boundary_never_leaks_next_number() {
        let fixture = std::fs::read_to_string("tests/fixtures/acetone_kr.txt").unwrap();
        let pages: Vec<String> = fixture.split('\u{0c}').map(String::from).collect();
        let catalog = cat();
        let seg = segment(&pages, &catalog, &SegmenterConfig::default());
        for trace in &seg.trace {
            let section = catalog.section_by_key(&trace.key).unwrap();
            let Some(next) = section.spec.next_number else {
                continue;
            };
            let re = catalog.boundary_re(next).unwrap();
            for line in seg.sections[&trace.key].lines() {
                assert!(
                    !re.is_match(&matcher::flatten_ws(line)),
                    "section {} body leaked a '{}' line: {}",
                    trace.key,
                    next,
                    line
                );
            }
        }
    }
}
