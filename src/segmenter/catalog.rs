use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::matcher::{num_prefix, SEP};

/// One canonical section, pure data. Adding a 17th section or adjusting a
/// keyword group is a data change only; nothing in the engine branches on a
/// specific key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSpec {
    pub key: String,
    pub number: u32,
    pub title: String,
    /// Full line-anchored heading regexes, evaluated in priority order.
    pub line_patterns: Vec<String>,
    /// Cross-line variant searched over the whole document text.
    #[serde(default)]
    pub multiline_pattern: Option<String>,
    /// AND-gate groups: a heading candidate must carry the section number plus
    /// one keyword from each group (exact or near match).
    #[serde(default)]
    pub must_keywords: Vec<String>,
    #[serde(default)]
    pub also_keywords: Vec<String>,
    /// Canonical phrasings for whole-line fuzzy matching.
    #[serde(default)]
    pub fuzzy_titles: Vec<String>,
    /// Table-header hints that boost a candidate when found shortly after it.
    #[serde(default)]
    pub table_hint_keywords: Vec<String>,
    /// Exact boundary: the section ends at the first line whose leading token
    /// matches this number.
    #[serde(default)]
    pub next_number: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSpec {
    pub sections: Vec<SectionSpec>,
    pub toc_hint_phrases: Vec<String>,
    pub toc_keywords: Vec<String>,
}

/// A section with its compiled matchers.
pub struct Section {
    pub spec: SectionSpec,
    /// Per-line matchers, anchored at the start of the line string.
    pub line_res: Vec<Regex>,
    /// The same patterns in multi-line mode, for page-level protection.
    pub page_res: Vec<Regex>,
    pub multiline_re: Option<Regex>,
    /// Leading-number grammar alone.
    pub num_re: Regex,
}

pub struct Catalog {
    sections: Vec<Section>,
    pub toc_hint_phrases: Vec<String>,
    pub toc_keywords: Vec<String>,
    boundary_res: BTreeMap<u32, Regex>,
}

impl Catalog {
    pub fn builtin() -> Catalog {
        Catalog::compile(CatalogSpec::builtin()).expect("built-in catalog compiles")
    }

    pub fn from_json_file(path: &Path) -> Result<Catalog> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let spec: CatalogSpec = serde_json::from_str(&raw)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        Catalog::compile(spec)
    }

    pub fn compile(spec: CatalogSpec) -> Result<Catalog> {
        let mut sections = Vec::with_capacity(spec.sections.len());
        let mut boundary_res = BTreeMap::new();
        for sec in &spec.sections {
            let line_res = sec
                .line_patterns
                .iter()
                .map(|p| build_re(p, false))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("section '{}' line patterns", sec.key))?;
            let page_res = sec
                .line_patterns
                .iter()
                .map(|p| build_re(p, true))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("section '{}' page patterns", sec.key))?;
            let multiline_re = sec
                .multiline_pattern
                .as_deref()
                .map(|p| build_re(p, true))
                .transpose()
                .with_context(|| format!("section '{}' multiline pattern", sec.key))?;
            let num_re = build_re(&num_prefix(sec.number), false)?;
            boundary_res
                .entry(sec.number)
                .or_insert_with(|| boundary_regex(sec.number));
            if let Some(n) = sec.next_number {
                boundary_res.entry(n).or_insert_with(|| boundary_regex(n));
            }
            sections.push(Section {
                spec: sec.clone(),
                line_res,
                page_res,
                multiline_re,
                num_re,
            });
        }
        Ok(Catalog {
            sections,
            toc_hint_phrases: spec.toc_hint_phrases.iter().map(|s| s.to_lowercase()).collect(),
            toc_keywords: spec.toc_keywords.iter().map(|s| s.to_lowercase()).collect(),
            boundary_res,
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_by_key(&self, key: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.spec.key == key)
    }

    pub fn section_by_number(&self, number: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.spec.number == number)
    }

    /// Numeric-only matcher used for exact next-number boundaries. The title
    /// keywords are deliberately not required: a hard stop beats body bleed
    /// from a missed heading.
    pub fn boundary_re(&self, n: u32) -> Option<&Regex> {
        self.boundary_res.get(&n)
    }
}

fn build_re(pattern: &str, multi_line: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(multi_line)
        .build()
        .with_context(|| format!("invalid pattern: {pattern}"))
}

fn boundary_regex(n: u32) -> Regex {
    RegexBuilder::new(&num_prefix(n))
        .case_insensitive(true)
        .build()
        .expect("numeric prefix grammar compiles")
}

impl CatalogSpec {
    /// The sixteen canonical MSDS sections, Korean heading families plus the
    /// standard English SDS titles.
    pub fn builtin() -> CatalogSpec {
        let s = SEP;
        let pat = |n: u32, suffix: String| format!("{}{}", num_prefix(n), suffix);
        let multi = |n: u32, alts: &[String]| format!("{}(?:{})", num_prefix(n), alts.join("|"));
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let sec1_alts = vec![
            format!("화학{s}제품{s}과{s}회사(?:{s}에{s}관한{s}정보)?"),
            format!("화학{s}제품"),
            format!("제품{s}명"),
            format!("화학{s}회사"),
            format!("chemical{s}products?{s}and{s}company(?:{s}(?:information|identification))?"),
            format!("product{s}and{s}company{s}identification"),
            format!("identification{s}of{s}the{s}(?:substance|mixture|product)"),
        ];
        let sec2_alts = vec![
            format!("유해{s}성{s}[·・\\.]?{s}위험{s}성"),
            format!("유해{s}위험{s}성"),
            format!("유해{s}성"),
            format!("유해{s}위험"),
            format!("위험{s}성{s}[·・\\.]?{s}유해{s}성"),
            format!("위험{s}유해{s}성"),
            format!("위험{s}유해"),
            format!("(?:유해|위험){s}성{s}및{s}(?:유해|위험){s}성"),
            format!("(?:유해|위험){s}및{s}(?:유해|위험){s}성"),
            format!("hazards?{s}identification"),
        ];
        let sec3_alts = vec![
            format!("구성{s}성분(?:{s}의{s}명칭{s}및{s}(?:함유?{s}?량|함량|조성))?"),
            format!("(?:구성{s})?성분{s}(?:표|정보)?"),
            format!("성분{s}(?:명|명칭){s}및{s}(?:함유?{s}?량|함량)"),
            format!("조성{s}(?:및{s}명칭|정보|표)?"),
            format!("composition"),
            format!("information{s}on{s}ingredients"),
        ];
        let sec9_alts = vec![
            format!("물리{s}화학{s}?적{s}(?:특성|특징)"),
            format!("물리{s}화학{s}(?:특성|특징)"),
            format!("물리{s}적{s}(?:특성|특징)"),
            format!("physical{s}and{s}chemical{s}properties"),
        ];
        let sec15_alts = vec![
            format!("(?:법적|법\\s*규){s}규[제졔](?:{s}현황)?"),
            format!("(?:관련|기\\s*타)?{s}(?:법|규){s}제"),
            format!("regulatory{s}information"),
        ];

        let sections = vec![
            SectionSpec {
                key: "chemical_product_company".into(),
                number: 1,
                title: "화학제품과 회사에 관한 정보".into(),
                line_patterns: sec1_alts.iter().map(|a| pat(1, a.clone())).collect(),
                multiline_pattern: Some(multi(1, &sec1_alts)),
                must_keywords: owned(&["화학", "제품", "회사", "정보", "제품명", "chemical", "product", "company"]),
                also_keywords: owned(&["제품", "회사", "정보", "product", "company", "identification"]),
                fuzzy_titles: owned(&[
                    "화학 제품과 회사",
                    "화학제품",
                    "화학 회사",
                    "회사 정보",
                    "chemical product and company information",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(2),
            },
            SectionSpec {
                key: "hazards".into(),
                number: 2,
                title: "유해성·위험성".into(),
                line_patterns: sec2_alts.iter().map(|a| pat(2, a.clone())).collect(),
                multiline_pattern: Some(multi(2, &sec2_alts)),
                must_keywords: owned(&["유해", "위험", "hazard"]),
                also_keywords: owned(&["유해성", "위험성", "유해위험", "hazards", "identification"]),
                fuzzy_titles: owned(&[
                    "유해 위험성",
                    "위험 유해성",
                    "유해성",
                    "위험성",
                    "유해 위험",
                    "hazards identification",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(3),
            },
            SectionSpec {
                key: "composition".into(),
                number: 3,
                title: "구성성분의 명칭 및 함유량".into(),
                line_patterns: sec3_alts.iter().map(|a| pat(3, a.clone())).collect(),
                multiline_pattern: Some(multi(3, &sec3_alts)),
                must_keywords: owned(&["구성", "성분", "함량", "함유", "조성", "composition", "ingredient"]),
                also_keywords: owned(&["성분", "함량", "함유", "조성", "ingredients", "information"]),
                fuzzy_titles: owned(&[
                    "구성 성분",
                    "성분표",
                    "성분 함유량",
                    "성분 함량",
                    "조성 성분",
                    "composition information on ingredients",
                ]),
                table_hint_keywords: owned(&["화학물질명", "카스", "cas", "함유량", "성분표"]),
                next_number: Some(4),
            },
            SectionSpec {
                key: "first_aid".into(),
                number: 4,
                title: "응급조치요령".into(),
                line_patterns: vec![
                    pat(4, format!("응급{s}조치{s}(?:요령|방법)?")),
                    pat(4, format!("응급{s}조치")),
                    pat(4, format!("first{s}aid{s}measures")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["응급", "조치", "first"]),
                also_keywords: owned(&["응급조치", "조치요령", "aid", "measures"]),
                fuzzy_titles: owned(&[
                    "응급조치요령",
                    "응급 조치 요령",
                    "응급조치",
                    "응급 조치",
                    "first aid measures",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(5),
            },
            SectionSpec {
                key: "fire_fighting".into(),
                number: 5,
                title: "폭발·화재 시 대처방법".into(),
                line_patterns: vec![
                    pat(5, format!("(?:폭발|화재){s}시{s}(?:대처|조치){s}방법?")),
                    pat(5, format!("화재{s}및{s}폭발{s}시{s}(?:대처|조치)")),
                    pat(5, format!("fire{s}fighting{s}measures")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["폭발", "화재", "fire"]),
                also_keywords: owned(&["폭발", "화재", "대처", "fighting", "measures"]),
                fuzzy_titles: owned(&[
                    "폭발 화재 시 대처방법",
                    "폭발 및 화재시 대처방법",
                    "폭발 화재 대처",
                    "화재 폭발 조치",
                    "fire fighting measures",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(6),
            },
            SectionSpec {
                key: "accidental_release".into(),
                number: 6,
                title: "누출사고 시 대처방법".into(),
                line_patterns: vec![
                    pat(6, format!("(?:누출|유출){s}사고{s}시{s}(?:대처|조치){s}방법?")),
                    pat(6, format!("(?:누출|유출){s}(?:대처|조치)")),
                    pat(6, format!("accidental{s}release{s}measures")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["누출", "사고", "release"]),
                also_keywords: owned(&["누출", "유출", "대처", "accidental", "measures"]),
                fuzzy_titles: owned(&[
                    "누출사고시 대처방법",
                    "누출 사고 대처",
                    "유출사고 대처",
                    "accidental release measures",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(7),
            },
            SectionSpec {
                key: "handling_storage".into(),
                number: 7,
                title: "취급 및 저장방법".into(),
                line_patterns: vec![
                    pat(7, format!("취급{s}및{s}저장{s}방법")),
                    pat(7, format!("취급{s}및{s}보관")),
                    pat(7, format!("handling{s}and{s}storage")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["취급", "저장", "handling"]),
                also_keywords: owned(&["취급", "저장", "보관", "storage"]),
                fuzzy_titles: owned(&[
                    "취급 및 저장방법",
                    "취급 및 보관",
                    "저장방법",
                    "handling and storage",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(8),
            },
            SectionSpec {
                key: "exposure_protection".into(),
                number: 8,
                title: "노출방지 및 개인보호구".into(),
                line_patterns: vec![
                    pat(8, format!("노출{s}방지{s}및{s}개인{s}보호구")),
                    pat(8, format!("노출{s}방지")),
                    pat(8, format!("개인{s}보호구")),
                    pat(8, format!("exposure{s}controls?(?:{s}personal{s}protection)?")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["노출", "보호구", "exposure"]),
                also_keywords: owned(&["노출", "방지", "개인", "보호구", "controls", "protection"]),
                fuzzy_titles: owned(&[
                    "노출방지 및 개인보호구",
                    "노출 방지",
                    "개인 보호구",
                    "exposure controls personal protection",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(9),
            },
            SectionSpec {
                key: "physical_chemical".into(),
                number: 9,
                title: "물리 화학적 특성".into(),
                line_patterns: sec9_alts.iter().map(|a| pat(9, a.clone())).collect(),
                multiline_pattern: Some(multi(9, &sec9_alts)),
                must_keywords: owned(&["물리", "화학", "특성", "특징", "physical"]),
                also_keywords: owned(&["물리화학", "특성", "특징", "chemical", "properties"]),
                fuzzy_titles: owned(&[
                    "물리 화학적 특성",
                    "물리 화학적 특징",
                    "물리. 화학적 특성",
                    "물리·화학적 특성",
                    "physical and chemical properties",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(10),
            },
            SectionSpec {
                key: "stability_reactivity".into(),
                number: 10,
                title: "안정성 및 반응성".into(),
                line_patterns: vec![
                    pat(10, format!("안정{s}성{s}및{s}반응{s}성")),
                    pat(10, format!("안정{s}성")),
                    pat(10, format!("반응{s}성")),
                    pat(10, format!("stability{s}and{s}reactivity")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["안정", "반응", "stability"]),
                also_keywords: owned(&["안정성", "반응성", "reactivity"]),
                fuzzy_titles: owned(&[
                    "안정성 및 반응성",
                    "안정성",
                    "반응성",
                    "stability and reactivity",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(11),
            },
            SectionSpec {
                key: "toxicological".into(),
                number: 11,
                title: "독성에 관한 정보".into(),
                line_patterns: vec![
                    pat(11, format!("독성{s}에{s}관한{s}정보")),
                    pat(11, format!("독성{s}정보")),
                    pat(11, format!("toxicological{s}information")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["독성", "toxicological"]),
                also_keywords: owned(&["독성", "독성정보", "information"]),
                fuzzy_titles: owned(&["독성에 관한 정보", "독성 정보", "독성", "toxicological information"]),
                table_hint_keywords: vec![],
                next_number: Some(12),
            },
            SectionSpec {
                key: "ecological".into(),
                number: 12,
                title: "환경에 미치는 영향".into(),
                line_patterns: vec![
                    pat(12, format!("환경{s}에{s}미치는{s}영향")),
                    pat(12, format!("환경{s}영향")),
                    pat(12, format!("ecological{s}information")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["환경", "ecological"]),
                also_keywords: owned(&["환경", "영향", "information"]),
                fuzzy_titles: owned(&["환경에 미치는 영향", "환경 영향", "ecological information"]),
                table_hint_keywords: vec![],
                next_number: Some(13),
            },
            SectionSpec {
                key: "disposal".into(),
                number: 13,
                title: "폐기 시 주의사항".into(),
                line_patterns: vec![
                    pat(13, format!("폐기{s}시{s}주의{s}사항")),
                    pat(13, format!("폐기{s}방법")),
                    pat(13, format!("disposal{s}considerations?")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["폐기", "disposal"]),
                also_keywords: owned(&["폐기", "주의", "considerations"]),
                fuzzy_titles: owned(&[
                    "폐기시 주의사항",
                    "폐기 시 주의사항",
                    "폐기 방법",
                    "disposal considerations",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(14),
            },
            SectionSpec {
                key: "transport".into(),
                number: 14,
                title: "운송에 필요한 사항".into(),
                line_patterns: vec![
                    pat(14, format!("운송{s}에{s}필요한{s}사항")),
                    pat(14, format!("운송{s}에{s}관한{s}사항")),
                    pat(14, format!("transport{s}information")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["운송", "transport"]),
                also_keywords: owned(&["운송", "사항", "information"]),
                fuzzy_titles: owned(&[
                    "운송에 필요한 사항",
                    "운송에 관한 사항",
                    "운송 사항",
                    "transport information",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(15),
            },
            SectionSpec {
                key: "regulatory".into(),
                number: 15,
                title: "법적 규제현황".into(),
                line_patterns: sec15_alts.iter().map(|a| pat(15, a.clone())).collect(),
                multiline_pattern: Some(multi(15, &sec15_alts)),
                must_keywords: owned(&["법적", "법규", "regulatory"]),
                also_keywords: owned(&["규제", "규졔", "규제현황", "규졔현황", "information"]),
                fuzzy_titles: owned(&[
                    "법적 규제",
                    "법적 규제 현황",
                    "법규 규제",
                    "법규 규제 현황",
                    "regulatory information",
                ]),
                table_hint_keywords: vec![],
                next_number: Some(16),
            },
            SectionSpec {
                key: "other_information".into(),
                number: 16,
                title: "그 밖의 참고사항".into(),
                line_patterns: vec![
                    pat(16, format!("기타{s}참고{s}사항")),
                    pat(16, format!("기타{s}사항")),
                    pat(16, format!("그{s}밖{s}의{s}참고{s}사항")),
                    pat(16, format!("그{s}밖{s}의{s}사항")),
                    pat(16, format!("other{s}information")),
                ],
                multiline_pattern: None,
                must_keywords: owned(&["참고", "사항", "other"]),
                also_keywords: owned(&["기타", "그 밖의", "참고사항", "information"]),
                fuzzy_titles: owned(&[
                    "기타 참고사항",
                    "기타 사항",
                    "기타 참고",
                    "그 밖의 참고사항",
                    "그 밖의 사항",
                    "other information",
                ]),
                table_hint_keywords: vec![],
                next_number: None,
            },
        ];

        CatalogSpec {
            sections,
            toc_hint_phrases: owned(&[
                "목차",
                "contents",
                "table of contents",
                "ghs-msds",
                "물질 안전보건자료",
            ]),
            toc_keywords: owned(&[
                // Korean section-name fragments.
                "화학", "회사", "유해", "위험", "구성", "응급", "폭발", "누출", "취급", "보관",
                "노출", "보호구", "물리", "화학적", "안정성", "반응성", "독성", "환경", "폐기",
                "운송", "법적", "규제", "기타", "참고",
                // English counterparts.
                "hazard", "composition", "ingredient", "first aid", "fire", "release",
                "handling", "storage", "exposure", "physical", "stability", "reactivity",
                "toxicolog", "ecolog", "disposal", "transport", "regulatory", "other information",
            ]),
        }
    }
}
