use std::sync::LazyLock;

use regex::Regex;

/// Whitespace run including NBSP and the U+2000 block up to zero-width space.
pub const WS: &str = r"[\s\x{00A0}\x{2000}-\x{200B}]*";

/// Separator run tolerated between the words of a heading phrase: whitespace,
/// special whitespace, dot, dash, middle dots, comma, slash.
pub const SEP: &str = r"[\s\x{00A0}\x{2000}-\x{200B}\.\-·・,／/]*";

/// Junk tolerated before the leading number: bullets, quotes, backticks, BOM.
const LEAD: &str = r#"[\s\x{00A0}\x{2000}-\x{200B}`\x{FEFF}"'“”‘’·•–—-]*"#;

/// Leading-number grammar for section `n`.
///
/// Accepts `[9]`, `9.`, `9)`, `9-`, `9:`, full-width punctuation variants,
/// a bare `9`, and the chapter form `제 9 장`/`제 9 항`.
pub fn num_prefix(n: u32) -> String {
    const PUNC: &str = r"[\.\)\-:：．。]";
    format!(
        r"^{lead}(?:\[?{n}\]?|{n}{ws}(?:{punc})?{ws}|제?{ws}{n}{ws}[장항]){ws}",
        lead = LEAD,
        n = n,
        ws = WS,
        punc = PUNC
    )
}

static SPECIAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{00A0}\x{2000}-\x{200B}]").unwrap());
static ANY_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\x{00A0}\x{2000}-\x{200B}]+").unwrap());
static TOKEN_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w]+").unwrap());

/// Replace special whitespace with plain spaces. Newlines survive, so the
/// result is safe for both per-line and whole-document matching.
pub fn flatten_ws(s: &str) -> String {
    SPECIAL_WS.replace_all(s, " ").into_owned()
}

/// Remove every whitespace character and fold case.
pub fn strip_ws(s: &str) -> String {
    ANY_WS.replace_all(s, "").to_lowercase()
}

/// Similarity in [0, 1] on whitespace-stripped, case-folded text.
/// Symmetric, 1.0 on exact match, degrades gracefully with edits.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&strip_ws(a), &strip_ws(b))
}

/// True if the line contains any of `targets`, either as an exact substring of
/// the whitespace-stripped line or as a per-token near match at `threshold`.
/// Tolerates OCR character substitutions inside a single word.
pub fn contains_near(line: &str, targets: &[String], threshold: f64) -> bool {
    let hay = strip_ws(line);
    for target in targets {
        let needle = strip_ws(target);
        if needle.is_empty() {
            continue;
        }
        if hay.contains(&needle) {
            return true;
        }
        for token in TOKEN_SPLIT.split(&hay) {
            if !token.is_empty() && strsim::normalized_levenshtein(token, &needle) >= threshold {
                return true;
            }
        }
    }
    false
}

/// AND-gated heading test: the line must carry the section's leading number
/// and at least one keyword from each of the must/also groups.
pub fn is_probable_heading(
    line: &str,
    num_re: &Regex,
    must: &[String],
    also: &[String],
    threshold: f64,
) -> bool {
    let s = flatten_ws(line);
    if !num_re.is_match(&s) {
        return false;
    }
    contains_near(&s, must, threshold) && contains_near(&s, also, threshold)
}

/// Whole-line fuzzy search: the single best-scoring line across the document
/// against a short list of canonical phrasings, accepted at `threshold`.
pub fn fuzzy_find_line(lines: &[String], titles: &[String], threshold: f64) -> Option<usize> {
    let mut best_idx = None;
    let mut best_score = 0.0_f64;
    for (i, line) in lines.iter().enumerate() {
        let line_clean = strip_ws(line);
        for title in titles {
            let score = strsim::normalized_levenshtein(&line_clean, &strip_ws(title));
            if score > best_score {
                best_score = score;
                best_idx = Some(i);
            }
        }
    }
    best_idx.filter(|_| best_score >= threshold)
}

/// Cross-line search over the flattened document text. Returns the line
/// offset of the match start, counted in newlines.
pub fn cross_line_find(full_text: &str, re: &Regex) -> Option<usize> {
    let txt = flatten_ws(full_text);
    let m = re.find(&txt)?;
    Some(txt[..m.start()].matches('\n').count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn num_re(n: u32) -> Regex {
        RegexBuilder::new(&num_prefix(n))
            .case_insensitive(true)
            .build()
            .unwrap()
    }

    #[test]
    fn number_prefix_forms() {
        let re = num_re(9);
        for line in [
            "9. 물리 화학적 특성",
            "9) 물리 화학적 특성",
            "[9] 물리 화학적 특성",
            "9： 물리 화학적 특성",
            "제 9 장 물리 화학적 특성",
            "  ·9. 물리 화학적 특성",
        ] {
            assert!(re.is_match(line), "no match: {line}");
        }
        assert!(!re.is_match("물리 화학적 특성 9"));
    }

    #[test]
    fn two_digit_prefix() {
        let re = num_re(15);
        assert!(re.is_match("15. 법적 규제현황"));
        assert!(!re.is_match("5. 법적 규제현황"));
    }

    #[test]
    fn contains_near_exact_and_fuzzy() {
        let targets = vec!["규제".to_string(), "규제현황".to_string()];
        assert!(contains_near("15. 법적 규제현황", &targets, 0.78));
        // One-character edit inside a longer token passes the per-token test.
        let targets = vec!["응급조치요령".to_string()];
        assert!(contains_near("응급조치오령", &targets, 0.78));
        assert!(!contains_near("전혀 다른 내용", &targets, 0.78));
    }

    #[test]
    fn similarity_contract() {
        assert_eq!(similarity("물리 화학적 특성", "물리화학적특성"), 1.0);
        assert!(similarity("abc", "abd") > 0.6);
        assert_eq!(similarity("a", "a"), similarity("a", "a"));
    }

    #[test]
    fn cross_line_counts_offset() {
        let re = RegexBuilder::new(&format!(
            "{}{}",
            num_prefix(12),
            format!("환경{s}에{s}미치는{s}영향", s = SEP)
        ))
        .case_insensitive(true)
        .multi_line(true)
        .build()
        .unwrap();
        let text = "first line\nsecond line\n12.\n환경에 미치는 영향\nbody";
        assert_eq!(cross_line_find(text, &re), Some(2));
    }
}
