//! Answer normalizer: free-text classifier reply → canonical label.
//!
//! Numeric forms are tried before word forms. Within word forms the table
//! order (largest first) decides, because short words like "ten" or "five"
//! also occur inside longer phrases.

use once_cell::sync::Lazy;
use payguide_core::{CanonicalLabel, Denomination};
use regex::{Captures, Regex};

/// A whole comma-grouped number: `1,000`, `1,000,000`.
static GROUPED_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}(?:,\d{3})+\b").unwrap());

/// `n500` / `ngn500` → `₦500`
static LETTER_SIGN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:ngn|n)\s*(\d)").unwrap());

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:₦\s*)?\b(1000|500|200|100|50|20|10|5)\b(?:\s*(?:nigerian\s+)?naira)?").unwrap()
});

const WORD_FORMS: [(&str, Denomination); 8] = [
    ("one thousand", Denomination::N1000),
    ("five hundred", Denomination::N500),
    ("two hundred", Denomination::N200),
    ("one hundred", Denomination::N100),
    ("fifty", Denomination::N50),
    ("twenty", Denomination::N20),
    ("ten", Denomination::N10),
    ("five", Denomination::N5),
];

static WORD_FORM_RES: Lazy<Vec<(Regex, Denomination)>> = Lazy::new(|| {
    WORD_FORMS
        .iter()
        .map(|(words, d)| {
            let words = words.split(' ').collect::<Vec<_>>().join(r"[\s-]+");
            let pattern = format!(r"\b{words}[\s-]+(?:nigerian\s+)?naira\b");
            (Regex::new(&pattern).unwrap(), *d)
        })
        .collect()
});

/// Map a classifier reply to a denomination, or `Unrecognized`.
pub fn normalize(answer: &str) -> CanonicalLabel {
    let text = answer.to_lowercase();
    let text = GROUPED_NUMBER_RE.replace_all(&text, |caps: &Captures| caps[0].replace(',', ""));
    let text = LETTER_SIGN_RE.replace_all(&text, "₦$1");

    if let Some(d) = match_numeric(&text) {
        return CanonicalLabel::Note(d);
    }
    if let Some(d) = match_word_form(&text) {
        return CanonicalLabel::Note(d);
    }
    CanonicalLabel::Unrecognized
}

/// Leftmost standalone amount in the text.
fn match_numeric(text: &str) -> Option<Denomination> {
    NUMERIC_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .find_map(Denomination::from_value)
}

/// First table entry spelled out and followed by "naira".
fn match_word_form(text: &str) -> Option<Denomination> {
    WORD_FORM_RES
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, d)| *d)
}
