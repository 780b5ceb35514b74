//! Wildcard matching for filter patterns.
//!
//! `*` matches any (possibly empty) substring. Every other character is
//! literal. A pattern must cover the whole resource id.

/// True when `item` matches `pattern` in full.
#[must_use]
pub fn wildcard_match(item: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return item == pattern;
    }

    let mut segments: Vec<&str> = pattern.split('*').collect();
    // At least two segments: pattern contains '*'
    let last = segments.pop().unwrap_or_default();
    let first = segments.remove(0);

    let Some(mut rest) = item.strip_prefix(first) else {
        return false;
    };
    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

/// First pattern in `patterns` matching `item`.
pub fn matches_any<'a, I>(item: &str, patterns: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    patterns
        .into_iter()
        .find(|p| wildcard_match(item, p))
        .map(String::as_str)
}
