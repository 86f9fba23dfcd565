//! Keyword and pattern location
//!
//! Locates literal and regex matches over a line, merges overlapping spans
//! per detection type, and emits one coherent marker stream per line. All
//! positions are character positions; the renderer maps them back to byte
//! offsets when splicing color strings.

use crate::core::model::Query;

/// Color-transition role attached to an interval boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Found,
    FoundReset,
    Matched,
    MatchedReset,
}

impl MarkerRole {
    /// Orders markers sharing a position: start roles before resets, so a
    /// right-to-left splice leaves the reset left of the following start.
    fn rank(&self) -> u8 {
        match self {
            MarkerRole::Found => 0,
            MarkerRole::Matched => 1,
            MarkerRole::FoundReset => 2,
            MarkerRole::MatchedReset => 3,
        }
    }
}

/// Everything the engine found on one line
#[derive(Debug, Clone, Default)]
pub struct LineHits {
    /// Boundary markers, sorted descending by position
    pub markers: Vec<(usize, MarkerRole)>,
    /// Raw literal hits `(matched_text, span)`, sorted by start
    pub found: Vec<(String, (usize, usize))>,
    /// Raw pattern hits `(pattern_source, span)`, sorted by start
    pub matched: Vec<(String, (usize, usize))>,
}

impl LineHits {
    pub fn any(&self) -> bool {
        !self.found.is_empty() || !self.matched.is_empty()
    }
}

/// Locates every active query in a line
pub struct StringFinder<'a> {
    queries: &'a [Query],
}

impl<'a> StringFinder<'a> {
    pub fn new(queries: &'a [Query]) -> Self {
        Self { queries }
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Find all hits on one line and produce the merged marker stream.
    pub fn find_in_line(&self, line: &str) -> LineHits {
        let chars: Vec<char> = line.chars().collect();
        let folded: Vec<char> = chars.iter().map(|c| fold_char(*c)).collect();

        let mut found = Vec::new();
        let mut matched = Vec::new();

        for query in self.queries {
            match query {
                Query::Literal { text, ignore_case } => {
                    let needle: Vec<char> = if *ignore_case {
                        text.chars().map(fold_char).collect()
                    } else {
                        text.chars().collect()
                    };
                    let haystack = if *ignore_case { &folded } else { &chars };
                    for span in literal_spans(haystack, &needle) {
                        let text: String = chars[span.0..span.1].iter().collect();
                        found.push((text, span));
                    }
                }
                Query::Pattern { regex, source, .. } => {
                    let char_starts: Vec<usize> = line.char_indices().map(|(i, _)| i).collect();
                    for hit in regex.find_iter(line) {
                        let span = (
                            byte_to_char(&char_starts, hit.start(), chars.len()),
                            byte_to_char(&char_starts, hit.end(), chars.len()),
                        );
                        matched.push((source.clone(), span));
                    }
                }
            }
        }

        found.sort_by_key(|(_, span)| *span);
        matched.sort_by_key(|(_, span)| *span);

        let mut markers = Vec::new();
        for (start, end) in merge_spans(found.iter().map(|(_, s)| *s).collect()) {
            markers.push((start, MarkerRole::Found));
            markers.push((end, MarkerRole::FoundReset));
        }
        for (start, end) in merge_spans(matched.iter().map(|(_, s)| *s).collect()) {
            markers.push((start, MarkerRole::Matched));
            markers.push((end, MarkerRole::MatchedReset));
        }
        markers.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.rank().cmp(&b.1.rank())));

        LineHits {
            markers,
            found,
            matched,
        }
    }
}

/// One-to-one case fold, preserving positional mapping.
fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// All occurrences of `needle` in `haystack`, restarting just past each
/// match's start so overlapping occurrences are reported too. An empty
/// needle yields a zero-length match at every position including the end.
fn literal_spans(haystack: &[char], needle: &[char]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut from = 0;
    while from <= haystack.len() {
        match find_chars(haystack, needle, from) {
            Some(pos) => {
                spans.push((pos, pos + needle.len()));
                from = pos + 1;
            }
            None => break,
        }
    }
    spans
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&pos| haystack[pos..pos + needle.len()] == *needle)
}

/// Map a byte offset at a char boundary to its character position.
fn byte_to_char(char_starts: &[usize], byte: usize, char_len: usize) -> usize {
    char_starts
        .binary_search(&byte)
        .unwrap_or(char_len)
}

/// Coalesce overlapping and touching spans into a minimal disjoint list.
///
/// A span whose start falls within `[top.start, top.end]` (end inclusive,
/// so touching spans merge) extends the top span to the larger end.
pub fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in spans {
        if let Some(top) = merged.last_mut() {
            if start <= top.1 {
                top.1 = top.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn literal(text: &str, ignore_case: bool) -> Query {
        Query::Literal {
            text: text.into(),
            ignore_case,
        }
    }

    fn pattern(source: &str) -> Query {
        Query::Pattern {
            regex: Regex::new(source).unwrap(),
            source: source.into(),
            ignore_case: false,
        }
    }

    #[test]
    fn test_overlapping_literal_occurrences_all_reported() {
        let queries = vec![literal("aa", false)];
        let hits = StringFinder::new(&queries).find_in_line("aaa");
        let spans: Vec<_> = hits.found.iter().map(|(_, s)| *s).collect();
        assert_eq!(spans, vec![(0, 2), (1, 3)]);

        // Merged into one covering span
        assert_eq!(
            hits.markers,
            vec![(3, MarkerRole::FoundReset), (0, MarkerRole::Found)]
        );
    }

    #[test]
    fn test_empty_query_yields_n_plus_one_positions() {
        let queries = vec![literal("", false)];
        let hits = StringFinder::new(&queries).find_in_line("abc");
        assert_eq!(hits.found.len(), 4);
        let spans: Vec<_> = hits.found.iter().map(|(_, s)| *s).collect();
        assert_eq!(spans, vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_case_insensitive_literal() {
        let queries = vec![literal("hello", true)];
        let hits = StringFinder::new(&queries).find_in_line("say HELLO twice");
        assert_eq!(hits.found.len(), 1);
        assert_eq!(hits.found[0].0, "HELLO");
        assert_eq!(hits.found[0].1, (4, 9));
    }

    #[test]
    fn test_pattern_hits_sorted_by_start() {
        let queries = vec![pattern("[0-9]+")];
        let hits = StringFinder::new(&queries).find_in_line("a1b22c333");
        let spans: Vec<_> = hits.matched.iter().map(|(_, s)| *s).collect();
        assert_eq!(spans, vec![(1, 2), (3, 5), (6, 9)]);
    }

    #[test]
    fn test_pattern_positions_are_character_based() {
        let queries = vec![pattern("[0-9]+")];
        // Multi-byte characters before the match
        let hits = StringFinder::new(&queries).find_in_line("héllo 42");
        assert_eq!(hits.matched[0].1, (6, 8));
    }

    #[test]
    fn test_merge_touching_spans() {
        assert_eq!(merge_spans(vec![(0, 2), (2, 4)]), vec![(0, 4)]);
        assert_eq!(merge_spans(vec![(0, 3), (1, 2)]), vec![(0, 3)]);
        assert_eq!(merge_spans(vec![(4, 6), (0, 2)]), vec![(0, 2), (4, 6)]);
    }

    #[test]
    fn test_merged_intervals_disjoint_and_ordered() {
        let spans = vec![(0, 2), (1, 4), (4, 5), (8, 9), (7, 8), (20, 21)];
        let merged = merge_spans(spans.clone());
        for pair in merged.windows(2) {
            assert!(pair[0].1 < pair[1].0, "overlap or touch in {:?}", merged);
        }
        // Every covered position stays covered by exactly one merged span
        for (start, end) in &spans {
            for pos in *start..*end {
                let covering = merged
                    .iter()
                    .filter(|(s, e)| pos >= *s && pos < *e)
                    .count();
                assert_eq!(covering, 1, "position {} in {:?}", pos, merged);
            }
        }
    }

    #[test]
    fn test_literal_and_pattern_merge_independently() {
        let queries = vec![literal("ab", false), pattern("b.")];
        let hits = StringFinder::new(&queries).find_in_line("abcabc");
        // Literal spans (0,2),(3,5); pattern spans (1,3),(4,6) stay separate
        assert_eq!(
            hits.markers,
            vec![
                (6, MarkerRole::MatchedReset),
                (5, MarkerRole::FoundReset),
                (4, MarkerRole::Matched),
                (3, MarkerRole::Found),
                (3, MarkerRole::MatchedReset),
                (2, MarkerRole::FoundReset),
                (1, MarkerRole::Matched),
                (0, MarkerRole::Found),
            ]
        );
    }

    #[test]
    fn test_markers_descending() {
        let queries = vec![literal("a", false), pattern("b")];
        let hits = StringFinder::new(&queries).find_in_line("ab ab");
        for pair in hits.markers.windows(2) {
            assert!(pair[0].0 >= pair[1].0);
        }
    }

    #[test]
    fn test_no_queries_no_hits() {
        let queries = Vec::new();
        let finder = StringFinder::new(&queries);
        assert!(finder.is_empty());
        let hits = finder.find_in_line("anything");
        assert!(!hits.any());
        assert!(hits.markers.is_empty());
    }
}
