use std::borrow::Cow;

use regex::Regex;

const NUM_PLACEHOLDER: &str = "<NUM>";
const HEX_PLACEHOLDER: &str = "<HEX>";

/// Shortest slash-delimited hex segment that gets replaced
const MIN_HEX_LEN: usize = 8;

/// Maps free-text messages to low-cardinality template keys.
///
/// 1. Whole-token digit runs (`\b[0-9]+\b`) become `<NUM>`.
/// 2. Segments of 8+ hex characters with a `/` on both sides become `<HEX>`,
///    keeping the slashes.
///
/// Hex runs that are not slash-delimited are left as they are.
#[derive(Clone, Debug)]
pub struct MessageNormalizer {
    numbers: Regex,
}

impl MessageNormalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            numbers: Regex::new(r"\b[0-9]+\b")?,
        })
    }

    /// Normalize a message. Borrows when nothing was replaced.
    pub fn normalize<'a>(&self, message: &'a str) -> Cow<'a, str> {
        let numbered = self.numbers.replace_all(message, NUM_PLACEHOLDER);
        match replace_hex_segments(&numbered) {
            Some(hexed) => Cow::Owned(hexed),
            None => numbered,
        }
    }
}

/// Replace every qualifying `/<hex>/` segment, or `None` if there is none.
fn replace_hex_segments(text: &str) -> Option<String> {
    if !text.contains('/') {
        return None;
    }

    let segments: Vec<&str> = text.split('/').collect();
    // The first and last pieces lack a slash on one side
    let last = segments.len() - 1;
    let is_hex = |i: usize, seg: &str| {
        i != 0
            && i != last
            && seg.len() >= MIN_HEX_LEN
            && seg.bytes().all(|b| b.is_ascii_hexdigit())
    };

    if !segments.iter().enumerate().any(|(i, s)| is_hex(i, s)) {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(if is_hex(i, seg) { HEX_PLACEHOLDER } else { seg });
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        MessageNormalizer::new().unwrap().normalize(s).into_owned()
    }

    #[test]
    fn test_numbers_replaced() {
        assert_eq!(
            norm("User login success id=42"),
            "User login success id=<NUM>"
        );
        assert_eq!(norm("took 15 ms (retry 3/5)"), "took <NUM> ms (retry <NUM>/<NUM>)");
        assert_eq!(norm("1.2.3"), "<NUM>.<NUM>.<NUM>");
    }

    #[test]
    fn test_digits_inside_words_kept() {
        assert_eq!(norm("host web01 and v2 and 42abc"), "host web01 and v2 and 42abc");
    }

    #[test]
    fn test_slash_delimited_hex_replaced() {
        assert_eq!(
            norm("GET /api/deadbeefcafe/items"),
            "GET /api/<HEX>/items"
        );
        assert_eq!(
            norm("path /aaaaaaaa/bbbbbbbbbb/ end"),
            "path /<HEX>/<HEX>/ end"
        );
    }

    #[test]
    fn test_hex_without_both_slashes_untouched() {
        assert_eq!(norm("trace deadbeefcafe"), "trace deadbeefcafe");
        assert_eq!(norm("/deadbeefcafe"), "/deadbeefcafe");
        assert_eq!(norm("deadbeefcafe/"), "deadbeefcafe/");
        assert_eq!(norm("/deadbeef-cafe/"), "/deadbeef-cafe/");
        assert_eq!(norm("/abcdef1/"), "/abcdef1/");
    }

    #[test]
    fn test_digit_only_segment_becomes_num_first() {
        assert_eq!(norm("/users/123456789/"), "/users/<NUM>/");
    }

    #[test]
    fn test_case_and_punctuation_preserved() {
        assert_eq!(norm("Disk FULL!!! on /dev/sda"), "Disk FULL!!! on /dev/sda");
    }

    #[test]
    fn test_unchanged_message_is_borrowed() {
        let n = MessageNormalizer::new().unwrap();
        assert!(matches!(n.normalize("nothing to do here"), Cow::Borrowed(_)));
        assert!(matches!(n.normalize("a/b/c"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_idempotent() {
        let n = MessageNormalizer::new().unwrap();
        for input in [
            "User login success id=42",
            "/aaaaaaaa/bbbbbbbb/cccccccc/",
            "/12345678/deadbeef9/",
            "mixed 7 /0a0a0a0a0a/ x99 99x 1/2",
            "",
            "////",
            "<NUM> <HEX> already",
        ] {
            let once = n.normalize(input).into_owned();
            let twice = n.normalize(&once).into_owned();
            assert_eq!(once, twice, "input: {input}");
        }
    }
}
