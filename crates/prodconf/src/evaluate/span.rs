//! `[eval:...]` span scanning and the escaping ladder
use regex::Regex;
use std::sync::LazyLock;

pub const MARKER: &str = "[eval:";

/// `[`, one or more underscores, `eval:`
static ESCAPED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(_+)eval:").expect("escaped marker pattern must compile"));

/// Piece of a scalar string
#[derive(Debug, PartialEq, Eq)]
pub enum Segment<'s> {
    Literal(&'s str),
    Expression {
        /// the full `[eval:...]` text
        span: &'s str,
        /// the text between `[eval:` and the matching `]`
        expr: &'s str,
    },
}

/// Split a string into literal text and outermost balanced `[eval:...]` spans
///
/// A marker without a matching closing bracket is literal text.
pub fn segments(input: &str) -> Vec<Segment<'_>> {
    let mut segments = vec![];
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(found) = input[cursor..].find(MARKER) {
        let start = cursor + found;
        let Some(end) = matching_bracket(&input[start..]).map(|end| start + end) else {
            // unbalanced, keep looking for a later marker
            cursor = start + 1;
            continue;
        };

        if literal_start < start {
            segments.push(Segment::Literal(&input[literal_start..start]));
        }
        segments.push(Segment::Expression {
            span: &input[start..=end],
            expr: &input[start + MARKER.len()..end],
        });

        cursor = end + 1;
        literal_start = cursor;
    }

    if literal_start < input.len() {
        segments.push(Segment::Literal(&input[literal_start..]));
    }

    segments
}

/// Byte offset of the `]` closing the `[` at offset 0
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in s.bytes().enumerate() {
        match byte {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove one level of escaping: `[_eval:` becomes `[eval:`, `[__eval:` becomes `[_eval:`, ...
pub fn unshift(text: &str) -> std::borrow::Cow<'_, str> {
    ESCAPED_MARKER.replace_all(text, |captures: &regex::Captures| {
        format!("[{}eval:", &captures[1][1..])
    })
}

/// Whether evaluating `text` can change it at all
pub fn has_markers(text: &str) -> bool {
    text.contains(MARKER) || ESCAPED_MARKER.is_match(text)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_text() {
        assert_eq!(segments("no markers"), vec![Segment::Literal("no markers")]);
        assert!(segments("").is_empty());
    }

    #[test]
    fn outermost_spans_only() {
        assert_eq!(
            segments("a [eval: x[0] ] b [eval: [1, [2]] ]"),
            vec![
                Segment::Literal("a "),
                Segment::Expression {
                    span: "[eval: x[0] ]",
                    expr: " x[0] "
                },
                Segment::Literal(" b "),
                Segment::Expression {
                    span: "[eval: [1, [2]] ]",
                    expr: " [1, [2]] "
                },
            ]
        );
    }

    #[test]
    fn unbalanced_marker_is_literal() {
        assert_eq!(
            segments("[eval: [ open [eval:1]"),
            vec![
                Segment::Literal("[eval: [ open "),
                Segment::Expression {
                    span: "[eval:1]",
                    expr: "1"
                },
            ]
        );
    }

    #[test]
    fn escaped_markers_are_not_spans() {
        assert_eq!(
            segments("[_eval: 1]"),
            vec![Segment::Literal("[_eval: 1]")]
        );
    }

    #[test]
    fn unshift_one_level() {
        assert_eq!(
            unshift("[_eval: a] [__eval: b] [_____eval: c] [eval: d]"),
            "[eval: a] [_eval: b] [____eval: c] [eval: d]"
        );
    }

    #[test]
    fn marker_detection() {
        assert!(has_markers("x [eval: 1]"));
        assert!(has_markers("x [___eval: 1]"));
        assert!(!has_markers("eval: plain"));
    }
}
