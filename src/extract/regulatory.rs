use std::sync::LazyLock;

use regex::Regex;

use crate::db::RegulatoryRow;
use crate::segmenter::matcher::flatten_ws;

const MATCH_THRESHOLD: f64 = 0.72;

/// Canonical regulatory-item names matched against section 15 lines.
const MASTER_ITEMS: &[&str] = &[
    "기존화학물질",
    "유독물질",
    "허가물질",
    "제한물질",
    "금지물질",
    "사고대비물질",
    "배출량조사대상화학물질",
    "PRTR1그룹",
    "PRTR2그룹",
    "등록대상기존화학물질",
    "중점관리물질(2019년시행)",
    "중점관리물질(2021년시행)",
    "CMR등록물질(2021년까지)",
    "중점관리물질",
    "제조금지물질",
    "제조허가물질",
    "제조미등록화학물질",
    "노출기준설정대상물질",
    "작업자노출기준",
    "관리대상유해물질",
    "작업환경측정대상유해인자",
    "특수건강진단대상유해인자",
    "특별관리물질",
    "허용기준설정대상유해인자",
    "공정안전관리대상물질",
    "영업비밀대체물질",
    "소비자제품안전검사대상물질",
    "특수고압가스",
    "가연성가스",
    "독성고압가스",
    "제1류",
    "제2류",
    "제3류",
    "제4류",
    "제5류",
    "제6류",
    "제7류",
    "위험물",
    "대기오염물질",
    "특정대기유해물질",
    "휘발성유기화합물",
    "기후생태계변화유발물질",
    "온실가스",
    "유해성대기감시물질",
    "장거리이동대기오염물질",
    "수질오염물질",
    "특정수질유해물질",
    "토양오염물질",
    "지정악취물질",
    "특정물질",
    "폐유기용제",
    "지정폐기물",
];

/// Source phrasings that map onto a canonical item.
const ALIASES: &[(&str, &[&str])] = &[(
    "작업환경측정대상유해인자",
    &["작업환경측정물질", "작업환경측정대상물질"],
)];

/// Law names are headers over the items beneath them, never items themselves.
const LAW_NAME_HINTS: &[&str] = &[
    "산업안전보건법",
    "화학물질관리법",
    "화학물질 등록 및 평가 등에 관한 법률",
    "화학물질의 등록 및 평가 등에 관한 법률",
    "고압가스안전관리법",
    "위험물안전관리법",
    "대기환경보전법",
    "물환경보전법",
    "토양환경보전법",
    "악취방지법",
    "오존층보호를 위한 특정물질의 제조, 규제 등에 관한 법률",
    "폐기물관리법",
];

const NEGATIVE_HINTS: &[&str] = &["해당없음", "해당 없음", "미해당", "비대상", "대상이 아님", "포함되지 않음"];
const POSITIVE_HINTS: &[&str] = &["해당", "대상", "포함", "적용"];

static NORM_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\.,\(\)\[\]\-_/·]").unwrap());

fn normalize(s: &str) -> String {
    NORM_STRIP_RE
        .replace_all(&flatten_ws(s).to_lowercase(), "")
        .into_owned()
}

fn is_law_name(line: &str) -> bool {
    let raw = line.trim();
    if raw.is_empty() {
        return false;
    }
    let norm = normalize(raw);
    if LAW_NAME_HINTS.iter().any(|h| norm.contains(&normalize(h))) {
        return true;
    }
    // Short lines ending in 법/법률 without item words read as law names.
    if norm.chars().count() <= 30 && (raw.ends_with('법') || raw.ends_with("법률")) {
        return !raw.contains("물질") && !raw.contains("대상");
    }
    false
}

/// Negative hints win over positive ones; "해당없음" contains "해당".
fn infer_presence(line: &str) -> Option<bool> {
    let norm = normalize(line);
    if norm.is_empty() {
        return None;
    }
    if NEGATIVE_HINTS.iter().any(|h| norm.contains(&normalize(h))) {
        return Some(false);
    }
    if POSITIVE_HINTS.iter().any(|h| norm.contains(&normalize(h))) {
        return Some(true);
    }
    None
}

fn aliases_for(item: &str) -> &'static [&'static str] {
    ALIASES
        .iter()
        .find(|(name, _)| *name == item)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

fn best_match_for_item(item: &str, cand_lines: &[&str]) -> Option<(String, f64)> {
    let norm_item = normalize(item);
    if norm_item.is_empty() {
        return None;
    }
    let alias_norms: Vec<String> = aliases_for(item).iter().map(|a| normalize(a)).collect();

    let mut best_score = 0.0_f64;
    let mut best_line: Option<&str> = None;
    for line in cand_lines {
        let norm_line = normalize(line);
        if norm_line.is_empty() {
            continue;
        }
        let score = if alias_norms.iter().any(|a| !a.is_empty() && norm_line.contains(a)) {
            1.0
        } else if norm_line.contains(&norm_item) || norm_item.contains(&norm_line) {
            1.0
        } else {
            strsim::normalized_levenshtein(&norm_item, &norm_line)
        };
        if score > best_score {
            best_score = score;
            best_line = Some(line);
        }
    }

    let line = best_line?;
    if best_score < MATCH_THRESHOLD {
        return None;
    }
    Some((line.to_string(), best_score))
}

/// Section 15 parser: match every master item against the section's non-law
/// lines and infer whether the document marks it applicable.
pub fn extract(doc_name: &str, body: &str) -> Vec<RegulatoryRow> {
    let text = flatten_ws(body);
    let cand_lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !is_law_name(l))
        .collect();

    let mut rows = Vec::new();
    for item in MASTER_ITEMS {
        let Some((source_line, score)) = best_match_for_item(item, &cand_lines) else {
            continue;
        };
        let present = infer_presence(&source_line);
        rows.push(RegulatoryRow {
            doc_name: doc_name.to_string(),
            canonical_name: item.to_string(),
            source_line,
            score: (score * 1000.0).round() / 1000.0,
            present,
        });
    }
    rows
}
