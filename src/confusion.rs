/**
This module holds the confusion matrices. The rows are indexed by the true tag and the columns by
the predicted tag. Entity-level matrices carry one more row and one more column, the *sink*,
counting the predicted entities without any collocated true entity (last row) and the true
entities without any collocated predicted entity (last column).
*/
use ahash::HashMap as AHashMap;
use ndarray::{prelude::*, Zip};
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::iter::Sum;
use std::ops::Add;

/// Bijection between the tag vocabulary and the indices of a confusion matrix. The order of the
/// vocabulary given by the caller is kept for the whole evaluation run.
#[derive(Debug, PartialEq, Eq)]
pub struct TagIndex<'a, T: Eq + Hash> {
    tags: &'a [T],
    positions: AHashMap<&'a T, usize>,
}

impl<T: Eq + Hash> Clone for TagIndex<'_, T> {
    fn clone(&self) -> Self {
        Self {
            tags: self.tags,
            positions: self.positions.clone(),
        }
    }
}

impl<'a, T: Eq + Hash> TagIndex<'a, T> {
    pub fn new(tags: &'a [T]) -> Self {
        let mut positions = AHashMap::with_capacity_and_hasher(tags.len(), Default::default());
        for (i, tag) in tags.iter().enumerate() {
            // A repeated tag keeps its last position
            positions.insert(tag, i);
        }
        Self { tags, positions }
    }
    /// Index of the tag, or `None` if the tag is not part of the vocabulary.
    #[inline]
    pub fn get(&self, tag: &T) -> Option<usize> {
        self.positions.get(tag).copied()
    }
    #[inline]
    pub fn contains(&self, tag: &T) -> bool {
        self.positions.contains_key(tag)
    }
    /// Number of rows (and columns) of the vocabulary block.
    pub fn len(&self) -> usize {
        self.tags.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
    /// Iterates over the distinct tags and their indices, in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a T, usize)> + '_ {
        self.tags
            .iter()
            .enumerate()
            .filter(|(i, t)| self.positions.get(t) == Some(i))
            .map(|(i, t)| (t, i))
    }
}

/// Counts of a single tag, read from a confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

impl TagCounts {
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }
}

impl Add for TagCounts {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            true_positive: self.true_positive + rhs.true_positive,
            false_positive: self.false_positive + rhs.false_positive,
            false_negative: self.false_negative + rhs.false_negative,
            true_negative: self.true_negative + rhs.true_negative,
        }
    }
}

impl Sum for TagCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| acc + c)
    }
}

/// Confusion matrix over a tag vocabulary. It is built fresh for every evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix<'a, T: Eq + Hash> {
    index: TagIndex<'a, T>,
    counts: Array2<usize>,
    with_sink: bool,
}

impl<'a, T: Eq + Hash> ConfusionMatrix<'a, T> {
    /// Builds an empty `n x n` matrix, or `(n + 1) x (n + 1)` if `with_sink` is true.
    pub fn new(index: TagIndex<'a, T>, with_sink: bool) -> Self {
        let n_dim = index.len() + usize::from(with_sink);
        Self {
            index,
            counts: Array2::zeros((n_dim, n_dim)),
            with_sink,
        }
    }

    /// Wraps already accumulated counts. The shape must match the index (and the sink).
    #[cfg(test)]
    pub(crate) fn from_counts(
        index: TagIndex<'a, T>,
        counts: Array2<usize>,
        with_sink: bool,
    ) -> Self {
        debug_assert_eq!(counts.nrows(), index.len() + usize::from(with_sink));
        debug_assert!(counts.is_square());
        Self {
            index,
            counts,
            with_sink,
        }
    }

    pub fn tag_index(&self) -> &TagIndex<'a, T> {
        &self.index
    }

    pub fn counts(&self) -> ArrayView2<'_, usize> {
        self.counts.view()
    }

    /// Index of the sink row and column, if the matrix has one.
    pub fn sink(&self) -> Option<usize> {
        self.with_sink.then_some(self.index.len())
    }

    /// Adds one to the cell (`true_idx`, `pred_idx`).
    #[inline]
    pub fn increment(&mut self, true_idx: usize, pred_idx: usize) {
        self.counts[[true_idx, pred_idx]] += 1;
    }

    /// Sum of the whole matrix, sink included.
    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// Block of the matrix restricted to the vocabulary (sink row and column excluded).
    pub fn vocabulary_block(&self) -> ArrayView2<'_, usize> {
        let n = self.index.len();
        self.counts.slice(s![..n, ..n])
    }

    /// Trace of the vocabulary block: the number of correctly typed entries.
    pub fn true_positives(&self) -> usize {
        self.vocabulary_block().diag().sum()
    }

    /// Sum of the vocabulary columns (sink row included, sink column excluded).
    pub fn predicted_total(&self) -> usize {
        let n = self.index.len();
        self.counts.slice(s![.., ..n]).sum()
    }

    /// Sum of the vocabulary rows (sink column included, sink row excluded).
    pub fn true_total(&self) -> usize {
        let n = self.index.len();
        self.counts.slice(s![..n, ..]).sum()
    }

    /// Number of times `tag_idx` is the true tag.
    pub fn row_sum(&self, tag_idx: usize) -> usize {
        self.counts.row(tag_idx).sum()
    }

    /// Reads the true/false positives/negatives of a single tag.
    pub fn tag_counts(&self, tag_idx: usize) -> TagCounts {
        let true_positive = self.counts[[tag_idx, tag_idx]];
        let false_positive = self.counts.column(tag_idx).sum() - true_positive;
        let false_negative = self.counts.row(tag_idx).sum() - true_positive;
        let true_negative = self.total() - true_positive - false_positive - false_negative;
        TagCounts {
            true_positive,
            false_positive,
            false_negative,
            true_negative,
        }
    }

    /// Adds the counts of another matrix built over the same vocabulary.
    pub fn merge(&mut self, other: &Self) {
        Zip::from(&mut self.counts)
            .and(&other.counts)
            .for_each(|a, &b| *a += b);
    }
}
