use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::db::HazardRow;

// H220, H280, H360D and similar.
static H_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bH\d{3}[A-Z]?\b").unwrap());
// P210 and combined forms like P301+P310.
static P_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bP\d{3}(?:\+P\d{3})*\b").unwrap());

static SIGNAL_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(신호어|signal\s*word)").unwrap());
static KOR_SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(위험|경고)").unwrap());
static ENG_SIGNAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(danger|warning)\b").unwrap());

/// GHS pictogram → hazard statement codes that imply it. Built around the
/// codes that actually show up in practice; extend here when a new one does.
const GHS_H_CODES: &[(&str, &[&str])] = &[
    ("GHS01", &["H200", "H201", "H202", "H203", "H204", "H205", "H240", "H241"]),
    (
        "GHS02",
        &[
            "H220", "H221", "H222", "H223", "H224", "H225", "H226", "H228", "H230", "H231",
            "H242", "H250", "H251", "H252", "H261",
        ],
    ),
    ("GHS03", &["H270", "H271", "H272"]),
    ("GHS04", &["H280", "H281", "H282", "H283"]),
    ("GHS05", &["H290", "H314", "H318"]),
    ("GHS06", &["H300", "H301", "H310", "H311", "H330", "H331"]),
    (
        "GHS07",
        &[
            "H302", "H303", "H312", "H313", "H315", "H316", "H317", "H319", "H320", "H332",
            "H335",
        ],
    ),
    (
        "GHS08",
        &[
            "H334", "H340", "H341", "H350", "H351", "H360", "H360D", "H360F", "H361", "H361D",
            "H361F", "H362", "H370", "H371", "H372", "H373",
        ],
    ),
    (
        "GHS09",
        &["H400", "H401", "H402", "H410", "H411", "H412", "H413", "H420"],
    ),
];

/// Section 2 parser: signal word, H/P codes, inferred GHS pictograms.
pub fn extract(doc_name: &str, body: &str) -> HazardRow {
    let h_codes = collect_h_codes(body);
    let (p_raw, p_flat) = collect_p_codes(body);
    let signal_word = extract_signal_word(body);
    let pictograms = infer_pictograms(&h_codes);

    HazardRow {
        doc_name: doc_name.to_string(),
        signal_word,
        h_codes: to_json(&h_codes),
        p_codes_raw: to_json(&p_raw),
        p_codes_flat: to_json(&p_flat),
        pictograms: to_json(&pictograms),
    }
}

fn to_json(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_default()
}

fn collect_h_codes(text: &str) -> Vec<String> {
    let set: BTreeSet<String> = H_CODE_RE
        .find_iter(text)
        .map(|m| m.as_str().to_uppercase())
        .collect();
    let mut codes: Vec<String> = set.into_iter().collect();
    codes.sort_by_key(|c| {
        let num: u32 = c[1..4].parse().unwrap_or(999);
        (num, c[4..].to_string())
    });
    codes
}

fn collect_p_codes(text: &str) -> (Vec<String>, Vec<String>) {
    let raw: BTreeSet<String> = P_CODE_RE
        .find_iter(text)
        .map(|m| m.as_str().to_uppercase())
        .collect();
    let mut flat: BTreeSet<String> = BTreeSet::new();
    for combined in &raw {
        for part in combined.split('+') {
            if part.starts_with('P') && part.len() >= 4 {
                flat.insert(part.to_string());
            }
        }
    }
    (raw.into_iter().collect(), flat.into_iter().collect())
}

/// Signal word: a labeled line wins; otherwise the first occurrence anywhere.
/// Korean takes precedence over English on the same line.
fn extract_signal_word(text: &str) -> Option<String> {
    for line in text.lines() {
        if SIGNAL_LABEL_RE.is_match(line) {
            let tail = SIGNAL_LABEL_RE.replace(line, "");
            if let Some(m) = KOR_SIGNAL_RE.captures(&tail) {
                return Some(m[1].to_string());
            }
            if let Some(m) = ENG_SIGNAL_RE.captures(&tail) {
                return Some(title_case(&m[1]));
            }
        }
    }
    if let Some(m) = KOR_SIGNAL_RE.captures(text) {
        return Some(m[1].to_string());
    }
    if let Some(m) = ENG_SIGNAL_RE.captures(text) {
        return Some(title_case(&m[1]));
    }
    None
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn infer_pictograms(h_codes: &[String]) -> Vec<String> {
    let h_set: BTreeSet<&str> = h_codes.iter().map(|c| c.as_str()).collect();
    GHS_H_CODES
        .iter()
        .filter(|(_, codes)| codes.iter().any(|c| h_set.contains(c)))
        .map(|(id, _)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_collected_and_sorted() {
        let body = "유해위험문구\nH280 고압가스\nH225 인화성 액체\n예방조치 P210 P301+P310";
        let row = extract("doc", body);
        assert_eq!(row.h_codes, r#"["H225","H280"]"#);
        assert_eq!(row.p_codes_raw, r#"["P210","P301+P310"]"#);
        assert_eq!(row.p_codes_flat, r#"["P210","P301","P310"]"#);
    }

    #[test]
    fn labeled_signal_word_wins() {
        let body = "개요: 위험한 물질이 아님\n신호어 : 경고";
        // The labeled line overrides the earlier incidental "위험".
        assert_eq!(extract_signal_word(body).as_deref(), Some("경고"));
    }

    #[test]
    fn english_signal_word_is_title_cased() {
        let body = "Signal word: DANGER";
        assert_eq!(extract_signal_word(body).as_deref(), Some("Danger"));
    }

    #[test]
    fn fallback_signal_word_from_body() {
        let body = "이 제품은 위험 등급에 해당한다";
        assert_eq!(extract_signal_word(body).as_deref(), Some("위험"));
    }

    #[test]
    fn pictograms_follow_h_codes() {
        let row = extract("doc", "H225 및 H280, H318 표시");
        assert_eq!(row.pictograms, r#"["GHS02","GHS04","GHS05"]"#);
    }

    #[test]
    fn no_codes_yields_empty_lists() {
        let row = extract("doc", "해당 자료 없음");
        assert_eq!(row.h_codes, "[]");
        assert_eq!(row.pictograms, "[]");
        assert_eq!(row.signal_word, None);
    }
}
