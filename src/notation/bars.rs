// Bar tokenizer
// Splits one voice of LilyPond text into bars, honouring `{}` nesting and quoted strings

use std::iter::FusedIterator;
use std::str::CharIndices;

/// Bar delimiter
pub const BAR_DELIMITER: char = '|';

/// One bar of a voice, delimiter included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar<'a> {
    /// 1-based position within the voice
    pub ordinal: usize,

    /// Trimmed bar text, ending in `|` unless it is the trailing remainder
    pub text: &'a str,
}

impl<'a> Bar<'a> {
    /// True when the bar carries the given end-of-piece marker (e.g. `\fine`)
    pub fn contains_marker(&self, marker: &str) -> bool {
        self.text.contains(marker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InQuote,
}

/// Lazy single-pass iterator over the bars of one voice
#[derive(Debug, Clone)]
pub struct Bars<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
    state: ScanState,
    depth: usize,
    prev: Option<char>,
    bar_start: usize,
    emitted: usize,
}

/// Tokenize a voice into bars
pub fn bars(text: &str) -> Bars<'_> {
    Bars {
        text,
        chars: text.char_indices(),
        state: ScanState::Normal,
        depth: 0,
        prev: None,
        bar_start: 0,
        emitted: 0,
    }
}

impl<'a> Bars<'a> {
    fn emit(&mut self, end: usize) -> Option<Bar<'a>> {
        let text = self.text[self.bar_start..end].trim();
        self.bar_start = end;
        if text.is_empty() {
            return None;
        }
        self.emitted += 1;
        Some(Bar {
            ordinal: self.emitted,
            text,
        })
    }
}

impl<'a> Iterator for Bars<'a> {
    type Item = Bar<'a>;

    fn next(&mut self) -> Option<Bar<'a>> {
        while let Some((index, ch)) = self.chars.next() {
            let escaped = self.prev == Some('\\');
            self.prev = Some(ch);

            match (self.state, ch) {
                (ScanState::Normal, '"') if !escaped => self.state = ScanState::InQuote,
                (ScanState::InQuote, '"') if !escaped => self.state = ScanState::Normal,
                (ScanState::Normal, '{') => self.depth += 1,
                // Unbalanced closers stay at top level instead of going negative
                (ScanState::Normal, '}') => self.depth = self.depth.saturating_sub(1),
                (ScanState::Normal, BAR_DELIMITER) if self.depth == 0 => {
                    if let Some(bar) = self.emit(index + ch.len_utf8()) {
                        return Some(bar);
                    }
                }
                _ => {}
            }
        }

        if self.bar_start < self.text.len() {
            return self.emit(self.text.len());
        }
        None
    }
}

impl FusedIterator for Bars<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        bars(input).map(|bar| bar.text).collect()
    }

    #[test]
    fn test_simple_bars() {
        assert_eq!(
            texts("c4 d e f | g1 |\n  a2 b |"),
            vec!["c4 d e f |", "g1 |", "a2 b |"]
        );
    }

    #[test]
    fn test_delimiters_inside_groups_and_quotes_are_ignored() {
        assert_eq!(
            texts(r#"a { x | y } | "p|q" |"#),
            vec!["a { x | y } |", r#""p|q" |"#]
        );
    }

    #[test]
    fn test_nested_groups() {
        assert_eq!(
            texts(r"\tuplet 3/2 { c8 { d | e } f } | g2 |"),
            vec![r"\tuplet 3/2 { c8 { d | e } f } |", "g2 |"]
        );
    }

    #[test]
    fn test_escaped_quote_does_not_close_string() {
        assert_eq!(
            texts(r#"c4^"say \"hi|there\"" | d1 |"#),
            vec![r#"c4^"say \"hi|there\"" |"#, "d1 |"]
        );
    }

    #[test]
    fn test_braces_inside_quotes_are_not_counted() {
        assert_eq!(texts(r#"c4^"{" | d1 |"#), vec![r#"c4^"{" |"#, "d1 |"]);
    }

    #[test]
    fn test_escape_at_start_of_input_is_safe() {
        assert_eq!(texts(r#""| x"#), vec![r#""| x"#]);
        assert_eq!(texts(r"\| y"), vec![r"\|", "y"]);
    }

    #[test]
    fn test_trailing_remainder_is_a_bar() {
        assert_eq!(texts("c1 | d1 \\fine"), vec!["c1 |", "d1 \\fine"]);
    }

    #[test]
    fn test_no_delimiter_yields_single_bar() {
        assert_eq!(texts("  c4 d e f  "), vec!["c4 d e f"]);
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(texts("").is_empty());
        assert!(texts(" \n\t ").is_empty());
    }

    #[test]
    fn test_ordinals_are_one_based() {
        let ordinals: Vec<usize> = bars("a | b | c").map(|bar| bar.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[test]
    fn test_iterator_is_fused() {
        let mut it = bars("a |");
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_non_ascii_text() {
        assert_eq!(texts(r#"c4^"café" | d |"#), vec![r#"c4^"café" |"#, "d |"]);
    }
}
