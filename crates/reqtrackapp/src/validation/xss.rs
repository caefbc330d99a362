//! Markup/script pattern detector.
//!
//! Runs on the raw submitter fields before a ticket is accepted. It is independent of
//! the sanitizer: a value can be rejected here even though sanitizing would have
//! neutralized it.

use once_cell::sync::Lazy;
use regex::Regex;

static XSS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<script\b.*?</script>",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?is)<iframe\b.*?</iframe>",
        r"(?is)<object\b.*?</object>",
        r"(?is)<embed\b.*?</embed>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid xss pattern"))
    .collect()
});

/// True if `input` contains a script block, `javascript:` URL, inline event
/// handler, or an iframe/object/embed element.
pub fn detect_xss(input: &str) -> bool {
    XSS_PATTERNS.iter().any(|re| re.is_match(input))
}
