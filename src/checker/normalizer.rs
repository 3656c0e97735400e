//! Content normalization before hashing
//!
//! Strips markup noise, timestamps, and tracking parameters so that only
//! meaningful edits to a page change its state hash.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Query parameters removed from links regardless of value
const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "gclsrc", "dclid", "msclkid", "mc_cid", "mc_eid", "_ga", "_gl", "yclid",
    "igshid", "ref_src",
];

/// Query parameter prefixes removed from links
const TRACKING_PREFIXES: &[&str] = &["utm_"];

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static UNCLOSED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:script|style)\b.*$").unwrap());
static STRAY_CLOSING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</\s*(?:script|style)\b[^>]*>").unwrap());

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static UNCLOSED_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*$").unwrap());
static STRAY_COMMENT_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-->").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const ISO_DATETIME: &str = r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?";
const ISO_DATE: &str = r"\d{4}-\d{2}-\d{2}";
const MONTH: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";

static LABELED_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    let date = format!(
        r"(?:{ISO_DATETIME}|{ISO_DATE}|{MONTH}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}|\d{{1,2}}\s+{MONTH}\.?,?\s+\d{{4}}|\d{{1,2}}/\d{{1,2}}/\d{{2,4}})"
    );
    Regex::new(&format!(
        r"(?i)\b(?:last[\s-]+(?:updated|modified|edited|changed)|updated|modified|published|generated)(?:\s+(?:on|at))?\s*:?\s*{date}"
    ))
    .unwrap()
});
static STANDALONE_ISO_DATETIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b{ISO_DATETIME}")).unwrap());
static LONG_FORM_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:{MONTH}\s+\d{{1,2}}(?:st|nd|rd|th)?,\s+\d{{4}}|\d{{1,2}}\s+{MONTH}\s+\d{{4}})\b"
    ))
    .unwrap()
});

static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>()]+"#).unwrap());

/// Apply `step` repeatedly until the text stops changing
fn until_stable(text: String, step: impl Fn(&str) -> String) -> String {
    let mut current = text;
    loop {
        let next = step(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Remove all matches of `pattern`, repeating until the text stops changing
fn remove_until_stable(text: String, pattern: &Regex) -> String {
    until_stable(text, |current| pattern.replace_all(current, "").into_owned())
}

// Removing a stray closing tag can join its neighbours into a new opener,
// so the whole pass repeats until nothing is removed.
fn strip_script_and_style(text: String) -> String {
    until_stable(text, |current| {
        let next = remove_until_stable(current.to_string(), &SCRIPT_BLOCK);
        let next = remove_until_stable(next, &STYLE_BLOCK);
        let next = UNCLOSED_BLOCK.replace(&next, "").into_owned();
        remove_until_stable(next, &STRAY_CLOSING_TAG)
    })
}

fn strip_comments(text: String) -> String {
    until_stable(text, |current| {
        let next = remove_until_stable(current.to_string(), &COMMENT);
        let next = UNCLOSED_COMMENT.replace(&next, "").into_owned();
        remove_until_stable(next, &STRAY_COMMENT_END)
    })
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn strip_timestamps(text: String) -> String {
    let current = remove_until_stable(text, &LABELED_TIMESTAMP);
    let current = remove_until_stable(current, &STANDALONE_ISO_DATETIME);
    remove_until_stable(current, &LONG_FORM_DATE)
}

fn strip_tracking_links(text: &str) -> String {
    EMBEDDED_URL
        .replace_all(text, |caps: &regex::Captures| normalize_url(&caps[0]))
        .into_owned()
}

fn normalize_pass(text: &str) -> String {
    let text = until_stable(text.to_string(), |current| {
        strip_comments(strip_script_and_style(current.to_string()))
    });
    let text = collapse_whitespace(&text);
    let text = strip_timestamps(text);
    let text = strip_tracking_links(&text);
    collapse_whitespace(&text)
}

/// Normalize fetched text so that non-semantic noise doesn't affect its hash.
///
/// Deterministic and idempotent. Empty or whitespace-only input yields `""`.
pub fn normalize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    until_stable(normalize_pass(raw), normalize_pass)
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    TRACKING_PARAMS.contains(&key.as_str())
        || TRACKING_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// Remove tracking parameters from a URL's query string.
///
/// Returns the input unchanged if it cannot be parsed or carries no tracking
/// parameters.
pub fn normalize_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !pairs.iter().any(|(k, _)| is_tracking_param(k)) {
        return url.to_string();
    }

    let kept: Vec<_> = pairs
        .into_iter()
        .filter(|(k, _)| !is_tracking_param(k))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }

    parsed.to_string()
}
