use std::sync::LazyLock;

use regex::Regex;

use crate::db::CompositionRow;

// CAS numbers only in the 2-7 digit / 2 digit / 1 digit shape.
static CAS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{2,7}-\d{2}-\d)\b").unwrap());

// Ranges: "10 - 20%", "0.1~1 %", "1 – <5", "1 to 5".
static CONC_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        (?P<min>\d+(?:\.\d+)?)
        \s*(?:~|–|-|to)\s*
        (?:<=|>=|<|>)?
        \s*(?P<max>\d+(?:\.\d+)?)
        \s*(?P<unit>w/w|v/v|wt\.?\s*%|vol\.?\s*%|%)?
        ",
    )
    .unwrap()
});

// Comparators: ">= 10%", "< 1 %".
static CONC_CMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        (?P<op><=|>=|<|>)
        \s*
        (?P<value>\d+(?:\.\d+)?)
        \s*(?P<unit>w/w|v/v|wt\.?\s*%|vol\.?\s*%|%)?
        ",
    )
    .unwrap()
});

// Single values: "5%", "0.1 % w/w".
static CONC_SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?xi)
        (?P<value>\d+(?:\.\d+)?)
        \s*(?P<unit>w/w|v/v|wt\.?\s*%|vol\.?\s*%|%)
        ",
    )
    .unwrap()
});

static NAME_BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\-\*\x{2022}\x{F0B7}·]+").unwrap());
static NAME_NUM_ENUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+[\.\)]\s*").unwrap());
static NAME_ALPHA_ENUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[가-힣A-Za-z]\.\s*").unwrap());
static CAS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)CAS\s*No").unwrap());

#[derive(Debug, PartialEq)]
pub struct Concentration {
    pub raw: String,
    pub conc_type: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub repr: Option<f64>,
    pub unit: Option<String>,
}

/// Parse a concentration expression. Priority: range, comparator, single.
pub fn parse_concentration(text: &str) -> Option<Concentration> {
    let raw = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(caps) = CONC_RANGE_RE.captures(&raw) {
        let min = caps.name("min").and_then(|m| m.as_str().parse().ok());
        let max = caps.name("max").and_then(|m| m.as_str().parse().ok());
        let repr = match (min, max) {
            // Representative value of a range: the midpoint.
            (Some(a), Some(b)) => Some((a + b) / 2.0),
            _ => None,
        };
        return Some(Concentration {
            raw: caps.get(0).map(|m| m.as_str().trim().to_string())?,
            conc_type: "range",
            min,
            max,
            repr,
            unit: norm_unit(caps.name("unit").map(|m| m.as_str())),
        });
    }

    if let Some(caps) = CONC_CMP_RE.captures(&raw) {
        let value: Option<f64> = caps.name("value").and_then(|m| m.as_str().parse().ok());
        let op = caps.name("op").map(|m| m.as_str()).unwrap_or("");
        let (min, max) = if op.starts_with('>') {
            (value, None)
        } else {
            (None, value)
        };
        return Some(Concentration {
            raw: caps.get(0).map(|m| m.as_str().trim().to_string())?,
            conc_type: "cmp",
            min,
            max,
            repr: value,
            unit: norm_unit(caps.name("unit").map(|m| m.as_str())),
        });
    }

    if let Some(caps) = CONC_SINGLE_RE.captures(&raw) {
        let value: Option<f64> = caps.name("value").and_then(|m| m.as_str().parse().ok());
        return Some(Concentration {
            raw: caps.get(0).map(|m| m.as_str().trim().to_string())?,
            conc_type: "single",
            min: value,
            max: value,
            repr: value,
            unit: norm_unit(caps.name("unit").map(|m| m.as_str())),
        });
    }

    None
}

fn norm_unit(unit: Option<&str>) -> Option<String> {
    let Some(u) = unit else {
        return Some("%".to_string());
    };
    let u = u.to_lowercase().replace(' ', "");
    if u.contains("wt") || u.contains("w/w") {
        Some("wt%".to_string())
    } else if u.contains("vol") || u.contains("v/v") {
        Some("vol%".to_string())
    } else if u.contains('%') {
        Some("%".to_string())
    } else {
        Some(u)
    }
}

fn clean_name(name: &str) -> String {
    let s = name.trim();
    let s = NAME_BULLET_RE.replace(s, "");
    let s = NAME_NUM_ENUM_RE.replace(s.trim(), "").into_owned();
    NAME_ALPHA_ENUM_RE.replace(s.trim(), "").trim().to_string()
}

/// Section 3 parser: one row per CAS number found, with the substance name
/// taken from the text before the CAS (or the previous line for table
/// layouts) and the concentration from the text after it (or the next line).
pub fn extract(doc_name: &str, body: &str) -> Vec<CompositionRow> {
    let lines: Vec<&str> = body.lines().collect();
    let mut rows = Vec::new();
    let mut prev_nonempty: Option<String> = None;

    for (idx, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let cas_matches: Vec<_> = CAS_RE.captures_iter(line).collect();
        if cas_matches.is_empty() {
            prev_nonempty = Some(line.to_string());
            continue;
        }

        for caps in &cas_matches {
            let cas = caps[1].to_string();
            let whole = caps.get(0).unwrap();

            let prefix = line[..whole.start()].trim_matches(|c: char| {
                c.is_whitespace() || c == '|' || c == '-'
            });
            let mut name = clean_name(prefix);
            if name.is_empty() || CAS_HEADER_RE.is_match(&name) {
                if let Some(prev) = &prev_nonempty {
                    name = clean_name(prev);
                }
            }

            let after_cas = &line[whole.end()..];
            let next_line = lines.get(idx + 1).map(|l| l.trim()).unwrap_or("");
            // The whole-line fallback masks CAS numbers so their digit groups
            // are not mistaken for a range.
            let conc = parse_concentration(after_cas)
                .or_else(|| parse_concentration(&CAS_RE.replace_all(line, " ")))
                .or_else(|| parse_concentration(next_line));

            rows.push(match conc {
                Some(c) => CompositionRow {
                    doc_name: doc_name.to_string(),
                    cas,
                    name,
                    concentration_raw: c.raw,
                    conc_type: Some(c.conc_type.to_string()),
                    conc_min: c.min,
                    conc_max: c.max,
                    conc_repr: c.repr,
                    unit: c.unit,
                    source_line: line.to_string(),
                },
                // Keep at least the CAS and name when no concentration parses.
                None => CompositionRow {
                    doc_name: doc_name.to_string(),
                    cas,
                    name,
                    concentration_raw: String::new(),
                    conc_type: None,
                    conc_min: None,
                    conc_max: None,
                    conc_repr: None,
                    unit: None,
                    source_line: line.to_string(),
                },
            });
        }

        prev_nonempty = Some(line.to_string());
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_midpoint() {
        let c = parse_concentration("10 - 20%").unwrap();
        assert_eq!(c.conc_type, "range");
        assert_eq!(c.min, Some(10.0));
        assert_eq!(c.max, Some(20.0));
        assert_eq!(c.repr, Some(15.0));
        assert_eq!(c.unit.as_deref(), Some("%"));
    }

    #[test]
    fn comparator_keeps_value() {
        let c = parse_concentration("< 1 %").unwrap();
        assert_eq!(c.conc_type, "cmp");
        assert_eq!(c.min, None);
        assert_eq!(c.max, Some(1.0));
        assert_eq!(c.repr, Some(1.0));
    }

    #[test]
    fn greater_equal_sets_lower_bound() {
        let c = parse_concentration(">= 10%").unwrap();
        assert_eq!(c.min, Some(10.0));
        assert_eq!(c.max, None);
    }

    #[test]
    fn table_rows_extracted() {
        let body = "물질명        CAS No.       함유량(%)\n\
                    에탄올        64-17-5       10 - 20%\n\
                    물            7732-18-5     80~90 %\n\
                    불소계 용제   123-45-6      < 1 %";
        let rows = extract("doc", body);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cas, "64-17-5");
        assert_eq!(rows[0].name, "에탄올");
        assert_eq!(rows[0].conc_repr, Some(15.0));
        assert_eq!(rows[1].name, "물");
        assert_eq!(rows[1].conc_type.as_deref(), Some("range"));
        assert_eq!(rows[2].conc_type.as_deref(), Some("cmp"));
        assert_eq!(rows[2].conc_max, Some(1.0));
    }

    #[test]
    fn name_falls_back_to_previous_line() {
        let body = "에탄올\n64-17-5 10 - 20%";
        let rows = extract("doc", body);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "에탄올");
    }

    #[test]
    fn missing_concentration_still_keeps_cas() {
        let body = "에탄올 64-17-5";
        let rows = extract("doc", body);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].conc_type, None);
        assert_eq!(rows[0].cas, "64-17-5");
    }

    #[test]
    fn enumeration_is_stripped_from_names() {
        assert_eq!(clean_name("1. 에탄올"), "에탄올");
        assert_eq!(clean_name("- 에탄올"), "에탄올");
        assert_eq!(clean_name("가. 에탄올"), "에탄올");
    }
}
