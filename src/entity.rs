/**
This module segments a flat sequence of tags into spans (also called cuts). A span is a maximal
run of identical consecutive tags and is represented by its start, its (exclusive) end and its
tag. The spans of a sequence are contiguous, do not overlap and cover the whole sequence.
*/
use crate::config::TagSet;
use crate::metrics::InconsistentLengthError;
use std::fmt::Display;
use std::hash::Hash;
use std::slice::Iter;

/// A span represents a run of identical tags. It contains a start and an end (i.e. at what index
/// of the sequence does it start and end, the end being exclusive) and a reference to the tag
/// shared by every position of the run, such as `PER`, `LOC` or `O`.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span<'a, T> {
    pub start: usize,
    pub end: usize,
    pub tag: &'a T,
}

// Deriving these would require `T: Clone`. The span only holds a reference.
impl<T> Clone for Span<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Span<'_, T> {}

impl<'a, T> Span<'a, T> {
    pub fn new(start: usize, end: usize, tag: &'a T) -> Self {
        Span { start, end, tag }
    }
    /// Number of positions covered by the span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl<T: Display> Display for Span<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.start, self.end, self.tag)
    }
}

/// Two spans are collocated when they share their start and their end. Their tags can differ.
#[inline]
pub fn is_collocated<T>(first: &Span<'_, T>, second: &Span<'_, T>) -> bool {
    first.start == second.start && first.end == second.end
}

/// This struct iterates over a *single* sequence and returns its spans, from left to right.
pub struct CutIter<'a, T> {
    /// The content on which we are iterating
    content: Iter<'a, T>,
    /// The tag of the span currently open, if any
    current: Option<&'a T>,
    begin_offset: usize,
    index: usize,
}

impl<'a, T> CutIter<'a, T> {
    pub fn new(sequence: &'a [T]) -> Self {
        CutIter {
            content: sequence.iter(),
            current: None,
            begin_offset: 0,
            index: 0,
        }
    }
}

impl<'a, T: PartialEq> Iterator for CutIter<'a, T> {
    type Item = Span<'a, T>;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(tag) = self.content.next() else {
                // The last open span is always emitted, whatever its tag.
                let last = self.current.take()?;
                return Some(Span::new(self.begin_offset, self.index, last));
            };
            let index = self.index;
            self.index += 1;
            match self.current {
                Some(prev) if prev != tag => {
                    let span = Span::new(self.begin_offset, index, prev);
                    self.current = Some(tag);
                    self.begin_offset = index;
                    return Some(span);
                }
                Some(_) => {}
                None => {
                    self.current = Some(tag);
                    self.begin_offset = index;
                }
            }
        }
    }
}

/// Retrieves the spans of a sequence. The triplets are ordered by their start and partition
/// `[0, sequence.len())`. An empty sequence has no span.
///
/// * `sequence`: Flat sequence of tags.
pub fn get_cut<T: PartialEq>(sequence: &[T]) -> Vec<Span<'_, T>> {
    CutIter::new(sequence).collect()
}

/// Expands spans back into a flat sequence of tags. This is the inverse of `get_cut`.
pub fn expand_cuts<'a, T>(cuts: &[Span<'a, T>]) -> Vec<&'a T> {
    let length = cuts.last().map(|c| c.end).unwrap_or(0);
    let mut res = Vec::with_capacity(length);
    for cut in cuts {
        res.extend(std::iter::repeat(cut.tag).take(cut.len()));
    }
    res
}

/// Counts the predicted spans that exactly match (same start, end *and* tag) a true span, and
/// the total number of predicted spans. Predicted spans bearing a special tag are ignored; the
/// true spans are not filtered. Counts are returned instead of a ratio so they can be summed over
/// many samples before dividing.
///
/// * `ps`: Predicted tags of a single sample
/// * `ts`: True tags of the same sample
/// * `special_tags`: Tags excluded from the predicted spans
pub fn word_count<T: Eq + Hash>(
    ps: &[T],
    ts: &[T],
    special_tags: &TagSet<T>,
) -> Result<(usize, usize), InconsistentLengthError> {
    if ps.len() != ts.len() {
        return Err(InconsistentLengthError::new(ts.len(), ps.len()));
    }
    let pred_cuts: Vec<_> = CutIter::new(ps)
        .filter(|c| !special_tags.contains(c.tag))
        .collect();
    let true_cuts: TagSet<Span<'_, T>> = CutIter::new(ts).collect();
    let matches = pred_cuts.iter().filter(|c| true_cuts.contains(*c)).count();
    Ok((matches, pred_cuts.len()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};
    use rstest::rstest;

    /// Small alphabet of tags. Using few values creates long runs of identical tags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) enum TagsToTest {
        O,
        Per,
        Org,
        Beg,
    }

    impl Arbitrary for TagsToTest {
        fn arbitrary(g: &mut Gen) -> Self {
            *g.choose(&[Self::O, Self::Per, Self::Org, Self::Beg]).unwrap()
        }
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn owned<T: Copy>(cuts: Vec<Span<'_, T>>) -> Vec<(usize, usize, T)> {
        cuts.into_iter().map(|c| (c.start, c.end, *c.tag)).collect()
    }

    #[test]
    fn test_get_cut_begin_inside() {
        let seq = chars("OOBIOO");
        let actual = owned(get_cut(&seq));
        let expected = vec![(0, 2, 'O'), (2, 3, 'B'), (3, 4, 'I'), (4, 6, 'O')];
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case("", vec![])]
    #[case("O", vec![(0, 1, 'O')])]
    #[case("OOO", vec![(0, 3, 'O')])]
    #[case("AB", vec![(0, 1, 'A'), (1, 2, 'B')])]
    #[case("ABA", vec![(0, 1, 'A'), (1, 2, 'B'), (2, 3, 'A')])]
    fn test_get_cut_cases(#[case] seq: &str, #[case] expected: Vec<(usize, usize, char)>) {
        let seq = chars(seq);
        assert_eq!(owned(get_cut(&seq)), expected);
    }

    #[test]
    fn test_cut_iter_is_fused_after_end() {
        let seq = vec!["O", "PER"];
        let mut iter = CutIter::new(&seq);
        assert_eq!(iter.next(), Some(Span::new(0, 1, &"O")));
        assert_eq!(iter.next(), Some(Span::new(1, 2, &"PER")));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_span_display() {
        let tag = "PER";
        assert_eq!(Span::new(0, 3, &tag).to_string(), "(0, 3, PER)");
    }

    #[test]
    fn test_is_collocated() {
        let (per, org) = ("PER", "ORG");
        assert!(is_collocated(&Span::new(0, 3, &per), &Span::new(0, 3, &org)));
        assert!(!is_collocated(&Span::new(0, 3, &per), &Span::new(0, 2, &per)));
        assert!(!is_collocated(&Span::new(1, 3, &per), &Span::new(0, 3, &per)));
    }

    #[test]
    fn test_word_count_boundary_mismatch() {
        let ps = vec!["O", "O"];
        let ts = vec!["O", "B"];
        let actual = word_count(&ps, &ts, &TagSet::default()).unwrap();
        assert_eq!(actual, (0, 1));
    }

    #[test]
    fn test_word_count_ignores_special_predictions_only() {
        let ps = vec!["BEG", "PER", "PER", "O", "END"];
        let ts = vec!["BEG", "PER", "PER", "LOC", "END"];
        let special: TagSet<&str> = ["BEG", "END"].into_iter().collect();
        let actual = word_count(&ps, &ts, &special).unwrap();
        assert_eq!(actual, (1, 2));
    }

    #[test]
    fn test_word_count_inconsistent_length() {
        let ps = vec!["O"];
        let ts = vec!["O", "O"];
        let actual = word_count(&ps, &ts, &TagSet::default());
        assert_eq!(actual, Err(InconsistentLengthError::new(2, 1)));
    }

    #[test]
    fn test_property_partition() {
        fn partition(seq: Vec<TagsToTest>) -> bool {
            let cuts = get_cut(&seq);
            let mut expected_start = 0;
            for cut in cuts.iter() {
                if cut.start != expected_start || cut.is_empty() {
                    return false;
                }
                if seq[cut.start..cut.end].iter().any(|t| t != cut.tag) {
                    return false;
                }
                expected_start = cut.end;
            }
            let maximal = cuts.windows(2).all(|w| w[0].tag != w[1].tag);
            expected_start == seq.len() && maximal
        }
        QuickCheck::new()
            .tests(2000)
            .quickcheck(partition as fn(Vec<TagsToTest>) -> bool)
    }

    #[test]
    fn test_property_expand_then_cut_is_identity() {
        fn idempotence(seq: Vec<TagsToTest>) -> bool {
            let cuts = get_cut(&seq);
            let expanded: Vec<TagsToTest> = expand_cuts(&cuts).into_iter().copied().collect();
            expanded == seq && owned(get_cut(&expanded)) == owned(cuts)
        }
        QuickCheck::new()
            .tests(2000)
            .quickcheck(idempotence as fn(Vec<TagsToTest>) -> bool)
    }

    #[test]
    fn test_property_word_count_bounded() {
        fn bounded(pairs: Vec<(TagsToTest, TagsToTest)>) -> TestResult {
            let (ps, ts): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
            let special: TagSet<TagsToTest> = [TagsToTest::Beg].into_iter().collect();
            let (matched, total) = word_count(&ps, &ts, &special).unwrap();
            if ps.iter().all(|t| *t == TagsToTest::Beg) {
                return TestResult::from_bool(matched == 0 && total == 0);
            }
            TestResult::from_bool(matched <= total)
        }
        QuickCheck::new()
            .tests(2000)
            .quickcheck(bounded as fn(Vec<(TagsToTest, TagsToTest)>) -> TestResult)
    }
}
