//! Redaction of secrets and contact details before text reaches the logs

use once_cell::sync::Lazy;
use regex::Regex;

static PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"sk-[A-Za-z0-9_-]{20,}", "sk-REDACTED"),
        (
            r"(?i)api[_-]?key\s*[:=]?\s*[A-Za-z0-9_-]{12,}",
            "api_key=REDACTED",
        ),
        (
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            "email@redacted",
        ),
        (r"\+?\d[\d\s-]{7,}\d", "PHONE_REDACTED"),
    ]
    .into_iter()
    .filter_map(|(p, r)| Regex::new(p).ok().map(|re| (re, r)))
    .collect()
});

const MAX_LOGGED_CHARS: usize = 500;

/// Truncate and redact a message for logging
pub fn scrub_message(input: &str) -> String {
    let mut s: String = input.chars().take(MAX_LOGGED_CHARS).collect();
    for (re, replacement) in PATTERNS.iter() {
        s = re.replace_all(&s, *replacement).into_owned();
    }
    s
}
