use std::sync::LazyLock;

use regex::Regex;

use crate::db::ProductRow;
use crate::segmenter::matcher::{flatten_ws, similarity};

const PRODUCT_ALIASES: &[&str] = &[
    "제품명", "제품 명", "제품명칭", "상품명", "물질명", "물질의 명칭", "제품 식별자",
    "product name", "product identifier", "trade name",
];
const COMPANY_ALIASES: &[&str] = &[
    "회사명", "제조사명", "제조자", "제조 회사", "제조업체", "생산자", "공급자",
    "공급회사명", "판매사", "공급업체", "수입자", "수입사", "manufacturer", "supplier",
];
const ADDRESS_ALIASES: &[&str] = &["주소", "주 소", "소재지", "본사주소", "사업장주소", "사업장 소재지", "address"];

const PRODUCT_FORBIDDEN: &[&str] = &[
    "전화", "전화번호", "긴급", "tel", "fax", "주소", "회사", "제조", "공급자", "판매사",
    "권고 용도", "용도", "제한", "정보", "기재", "문의", "연락",
];
const COMPANY_GARBAGE: &[&str] = &[
    "주소", "address", "전화", "tel", "fax", "웹사이트", "homepage", "http", "www.",
    "긴급 연락", "담당자", "문의", "기재", "해당 없음",
];

static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[○●◦∙•□■\-–—\*]|[①-⑳]|[\(\[]?\d{1,2}[\)\].])\s*").unwrap()
});
static KOR_ENUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[가-힣]\.\s*").unwrap());
static LABEL_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*[:：\-]\s*").unwrap());
static TWO_COL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}|\t+").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\+?\d{1,3}[-\s]?)?(0\d{1,2}[-\s]?\d{3,4}[-\s]?\d{4})\b").unwrap()
});
static COMPANY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:회사명|제조\s*회사|제조자|제조사명|제조업체명?|제조업체|공급자명?|공급자|공급회사명|공급업체|manufacturer|supplier|수입자)\s*[:：]?\s*",
    )
    .unwrap()
});
static PHONE_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(전화|tel|phone|fax)").unwrap());
static PRODUCT_FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:제품\s*명|product\s*(?:name|identifier)|trade\s*name)\s*[:：]?\s*([^\s,;:/|]+(?:[-_/\.][^\s,;:/|]+)*)",
    )
    .unwrap()
});

/// Section 1 parser: product name, company name, address.
pub fn extract(doc_name: &str, body: &str) -> ProductRow {
    let lines: Vec<String> = body.lines().map(prep_line).collect();

    let product_name = find_labeled_value(&lines, PRODUCT_ALIASES)
        .filter(|v| looks_product_like(v))
        .or_else(|| fallback_product(&lines));

    let company_name = find_labeled_value(&lines, COMPANY_ALIASES)
        .map(|v| normalize_company(&v))
        .filter(|v| !v.is_empty());

    let address = find_address(&lines);

    ProductRow {
        doc_name: doc_name.to_string(),
        product_name,
        company_name,
        address,
    }
}

/// Flatten special whitespace and strip bullet / enumeration prefixes.
fn prep_line(raw: &str) -> String {
    let s = flatten_ws(raw);
    let s = BULLET_RE.replace(&s, "");
    let s = KOR_ENUM_RE.replace(&s, "");
    s.trim().to_string()
}

/// Split a line into (label, value): colon or dash first, then a two-column
/// gap, then an alias prefix.
fn split_label_value(line: &str, aliases: &[&str]) -> (String, String) {
    if let Some(m) = LABEL_SPLIT_RE.find(line) {
        let label = line[..m.start()].trim().to_string();
        let value = line[m.end()..].trim().to_string();
        if !value.is_empty() {
            return (label, value);
        }
    }
    if let Some(m) = TWO_COL_RE.find(line) {
        let label = line[..m.start()].trim().to_string();
        let value = line[m.end()..].trim().to_string();
        if !value.is_empty() {
            return (label, value);
        }
    }
    let low = line.to_lowercase();
    for alias in aliases {
        let alias_low = alias.to_lowercase();
        if low.starts_with(&alias_low) {
            let rest = line[alias.len().min(line.len())..]
                .trim_matches(|c: char| c.is_whitespace() || ":：-".contains(c))
                .to_string();
            return (alias.to_string(), rest);
        }
    }
    (line.trim().to_string(), String::new())
}

fn label_matches(label: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|a| similarity(label, a) >= 0.78)
}

fn find_labeled_value(lines: &[String], aliases: &[&str]) -> Option<String> {
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (label, value) = split_label_value(line, aliases);
        if !value.is_empty() && label_matches(&label, aliases) {
            return Some(value);
        }
    }
    None
}

fn fallback_product(lines: &[String]) -> Option<String> {
    for line in lines {
        if let Some(caps) = PRODUCT_FALLBACK_RE.captures(line) {
            let v = caps[1].trim().to_string();
            if looks_product_like(&v) {
                return Some(v);
            }
        }
    }
    None
}

fn find_address(lines: &[String]) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let (label, value) = split_label_value(line, ADDRESS_ALIASES);
        if value.is_empty() || !label_matches(&label, ADDRESS_ALIASES) {
            continue;
        }
        // Addresses often wrap; gather continuation lines until the next
        // labeled line.
        let mut parts = vec![value];
        for cont in &lines[i + 1..] {
            if cont.is_empty() || looks_like_label(cont) {
                break;
            }
            parts.push(cont.clone());
        }
        return Some(parts.join(" "));
    }
    None
}

fn looks_like_label(line: &str) -> bool {
    BULLET_RE.is_match(line) || LABEL_SPLIT_RE.is_match(line) || TWO_COL_RE.is_match(line)
}

fn is_hangul(c: char) -> bool {
    ('가'..='힣').contains(&c)
}

fn has_forbidden_product_word(v: &str) -> bool {
    let low = v.to_lowercase();
    PRODUCT_FORBIDDEN.iter().any(|w| low.contains(w))
}

/// Product names are short codes or chemical names: letters, digits and a few
/// punctuation marks, and never phone numbers or contact boilerplate.
fn looks_product_like(v: &str) -> bool {
    if v.is_empty() || PHONE_RE.is_match(v) || has_forbidden_product_word(v) {
        return false;
    }
    let count = v.chars().count();
    if !(2..=160).contains(&count) {
        return false;
    }
    if !v.chars().any(|c| c.is_alphabetic()) {
        return false;
    }
    let Some(first) = v.chars().next() else {
        return false;
    };
    if !(first.is_ascii_alphanumeric() || is_hangul(first)) {
        return false;
    }
    v.chars()
        .all(|c| c.is_ascii_alphanumeric() || is_hangul(c) || " ,#-.()%/™".contains(c))
}

fn is_garbage_company(v: &str) -> bool {
    let s = v.trim().to_lowercase();
    if s.is_empty() || s.chars().count() <= 1 {
        return true;
    }
    if matches!(s.as_str(), "정보" | "information" | "info") {
        return true;
    }
    COMPANY_GARBAGE.iter().any(|w| s.contains(w))
}

fn normalize_company(value: &str) -> String {
    let v = prep_line(value);
    let v = COMPANY_PREFIX_RE.replace(&v, "").into_owned();
    // Phone or fax details appended to the name: keep what comes before.
    let v = match PHONE_TAIL_RE.find(&v) {
        Some(m) => v[..m.start()].to_string(),
        None => v,
    };
    // A comma usually separates the name from an inline address.
    let v = v.split(',').next().unwrap_or("").trim_matches(|c: char| {
        c.is_whitespace() || "-:·,;".contains(c)
    });
    if v.is_empty() || is_garbage_company(v) || PHONE_RE.is_match(v) {
        return String::new();
    }
    v.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_fields() {
        let body = "가. 제품명 : 아세톤\n나. 회사명 : 한국케미칼\n다. 주소 : 서울특별시 강남구 테헤란로";
        let row = extract("doc", body);
        assert_eq!(row.product_name.as_deref(), Some("아세톤"));
        assert_eq!(row.company_name.as_deref(), Some("한국케미칼"));
        assert_eq!(row.address.as_deref(), Some("서울특별시 강남구 테헤란로"));
    }

    #[test]
    fn english_labels() {
        let body = "Product name : SP-33\nSupplier : Hankook Chemical Co.";
        let row = extract("doc", body);
        assert_eq!(row.product_name.as_deref(), Some("SP-33"));
        assert_eq!(row.company_name.as_deref(), Some("Hankook Chemical Co."));
    }

    #[test]
    fn phone_tail_is_cut_from_company() {
        let body = "회사명 : 한국케미칼 전화 02-1234-5678";
        let row = extract("doc", body);
        assert_eq!(row.company_name.as_deref(), Some("한국케미칼"));
    }

    #[test]
    fn contact_lines_are_not_product_names() {
        let body = "제품명 : 긴급 연락처 참고\n전화번호 : 02-1234-5678";
        let row = extract("doc", body);
        assert_eq!(row.product_name, None);
    }

    #[test]
    fn wrapped_address_is_joined() {
        let body = "주소 : 서울특별시 강남구\n테헤란로 123\n회사명 : 한국케미칼";
        let row = extract("doc", body);
        assert_eq!(row.address.as_deref(), Some("서울특별시 강남구 테헤란로 123"));
    }

    #[test]
    fn fuzzy_label_still_matches() {
        // One-character typo in a longer label alias.
        let body = "물질의 명침 : 아세톤";
        let row = extract("doc", body);
        assert_eq!(row.product_name.as_deref(), Some("아세톤"));
    }
}
