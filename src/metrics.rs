/**
This module computes the metrics (precision, recall, accuracy, f-score) of predicted sequences
against ground-truth sequences, either token by token or entity by entity.
*/
use crate::annotate::DuplicateTagError;
use crate::config::TagSet;
use crate::confusion::{ConfusionMatrix, TagCounts, TagIndex};
use crate::entity::CutIter;
use crate::reporter::{Average, ClassMetrics, OverallAverage, Reporter};
use ahash::{HashMap as AHashMap, HashSet as AHashSet};
use core::fmt;
use ndarray::parallel::prelude::*;
use ndarray::prelude::*;
use ndarray_stats::SummaryStatisticsExt;
use num::{Float, NumCast};
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt::Display, hash::Hash};

#[derive(Debug, PartialEq, Clone, Copy)]
/// Error type to represent when two lists or arrays are not of the
/// same length (when they should be).
pub struct InconsistentLengthError(usize, usize);

impl InconsistentLengthError {
    pub(crate) fn new(true_len: usize, pred_len: usize) -> Self {
        Self(true_len, pred_len)
    }
}

impl Display for InconsistentLengthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inconsistent length between two lists. `tag_true` is length {}, `tag_pred` is length {}",
            self.0, self.1
        )
    }
}
impl Error for InconsistentLengthError {}

#[derive(Debug, Clone, PartialEq)]
/// Enum error encompassing the failures that could happen when evaluating tagged sequences. None
/// of them is recoverable: the whole computation stops and no partial result is returned.
pub enum ComputationError {
    InconsistentLength(InconsistentLengthError),
    DuplicateTag(DuplicateTagError),
    EmptyInput(String),
}

impl Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentLength(length_err) => std::fmt::Display::fmt(length_err, f),
            Self::DuplicateTag(tag_err) => std::fmt::Display::fmt(tag_err, f),
            Self::EmptyInput(which) => write!(f, "Nothing to score in {}", which),
        }
    }
}
impl Error for ComputationError {}

impl From<InconsistentLengthError> for ComputationError {
    fn from(value: InconsistentLengthError) -> Self {
        Self::InconsistentLength(value)
    }
}

impl From<DuplicateTagError> for ComputationError {
    fn from(value: DuplicateTagError) -> Self {
        Self::DuplicateTag(value)
    }
}

/// Checks that there are as many true sequences as predicted sequences and that each pair of
/// sequences has the same length.
pub(crate) fn check_consistent_length<T, S: AsRef<[T]>>(
    tag_true: &[S],
    tag_pred: &[S],
) -> Result<(), InconsistentLengthError> {
    if tag_true.len() != tag_pred.len() {
        return Err(InconsistentLengthError(tag_true.len(), tag_pred.len()));
    }
    for (ts, ps) in tag_true.iter().zip(tag_pred) {
        let (t_l, p_l) = (ts.as_ref().len(), ps.as_ref().len());
        if t_l != p_l {
            return Err(InconsistentLengthError(t_l, p_l));
        }
    }
    Ok(())
}

/// A ratio is undefined (`None`) when its denominator is zero.
pub type Ratio = Option<f32>;

#[inline]
pub(crate) fn ratio<F: Float>(numerator: usize, denominator: usize) -> Option<F> {
    if denominator == 0 {
        return None;
    }
    let numerator = <F as NumCast>::from(numerator)?;
    let denominator = <F as NumCast>::from(denominator)?;
    Some(numerator / denominator)
}

/// Harmonic mean of the precision and the recall. It is 0 as soon as one of them is 0, and
/// undefined if one of them is undefined.
#[inline]
fn harmonic_mean<F: Float>(precision: Option<F>, recall: Option<F>) -> Option<F> {
    let (precision, recall) = (precision?, recall?);
    if precision == F::zero() || recall == F::zero() {
        return Some(F::zero());
    }
    let two = F::one() + F::one();
    Some(two / (precision.recip() + recall.recip()))
}

/// Precision, recall, accuracy and f-score. Each of them is undefined when its denominator is 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub precision: Ratio,
    pub recall: Ratio,
    pub accuracy: Ratio,
    pub fscore: Ratio,
}

impl From<TagCounts> for Metrics {
    fn from(value: TagCounts) -> Self {
        let tp = value.true_positive;
        let precision = ratio(tp, tp + value.false_positive);
        let recall = ratio(tp, tp + value.false_negative);
        Self {
            precision,
            recall,
            accuracy: ratio(tp + value.true_negative, value.total()),
            fscore: harmonic_mean(precision, recall),
        }
    }
}

pub(crate) fn fmt_ratio(ratio: Ratio) -> String {
    match ratio {
        Some(v) => v.to_string(),
        None => String::from("-"),
    }
}

impl Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            fmt_ratio(self.precision),
            fmt_ratio(self.recall),
            fmt_ratio(self.accuracy),
            fmt_ratio(self.fscore)
        )
    }
}

/// Metrics computed at the entity level. The collocation ratio is the fraction of the entities
/// that found a counterpart with the same boundaries, whatever its type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub precision: Ratio,
    pub recall: Ratio,
    pub accuracy: Ratio,
    pub fscore: Ratio,
    pub collocation_ratio: Ratio,
}

impl Display for EntityMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Precision, Recall, Accuracy, Fscore, Collocation")?;
        writeln!(
            f,
            "{}, {}, {}, {}, {}",
            fmt_ratio(self.precision),
            fmt_ratio(self.recall),
            fmt_ratio(self.accuracy),
            fmt_ratio(self.fscore),
            fmt_ratio(self.collocation_ratio)
        )
    }
}

/// Builds a token-level confusion matrix. Every position of every sample is counted once, in the
/// cell (true tag, predicted tag). Positions whose true or predicted tag is not part of `tag_list`
/// are silently skipped.
///
/// * `tag_true`: True tags
/// * `tag_pred`: Predicted tags
/// * `tag_list`: Vocabulary. Its order gives the order of the rows and columns.
pub fn prepare_confusion_matrix<'a, T, S>(
    tag_true: &[S],
    tag_pred: &[S],
    tag_list: &'a [T],
) -> Result<ConfusionMatrix<'a, T>, ComputationError>
where
    T: Eq + Hash,
    S: AsRef<[T]>,
{
    check_consistent_length(tag_true, tag_pred)?;
    let mut confusion_matrix = ConfusionMatrix::new(TagIndex::new(tag_list), false);
    for (ps, ts) in tag_pred.iter().zip(tag_true) {
        for (p, t) in ps.as_ref().iter().zip(ts.as_ref()) {
            let index = confusion_matrix.tag_index();
            let (Some(true_idx), Some(pred_idx)) = (index.get(t), index.get(p)) else {
                continue;
            };
            confusion_matrix.increment(true_idx, pred_idx);
        }
    }
    Ok(confusion_matrix)
}

/// Computes the metrics of a single tag, using the counts of its row and column.
pub fn process_confusion_matrix<T: Eq + Hash>(
    confusion_matrix: &ConfusionMatrix<'_, T>,
    tag_idx: usize,
) -> Metrics {
    Metrics::from(confusion_matrix.tag_counts(tag_idx))
}

/// Weighted average of the defined values. Undefined values and their weights are dropped before
/// averaging. Returns `None` if nothing is left or if the remaining weights sum to 0.
fn weighted_average_of_defined<I>(values: I, weights: &[f32]) -> Ratio
where
    I: IntoIterator<Item = Ratio>,
{
    let (kept, kept_weights): (Vec<f32>, Vec<f32>) = values
        .into_iter()
        .zip(weights)
        .filter_map(|(v, w)| v.map(|v| (v, *w)))
        .unzip();
    let kept_weights = Array1::from(kept_weights);
    if kept_weights.sum() == 0.0 {
        return None;
    }
    Array1::from(kept).weighted_mean(&kept_weights).ok()
}

/// Macro-averaged metrics. The metrics of every tag not in `ignore_tags` are averaged. If
/// `weighted` is true, each tag is weighted by its number of true occurrences (its row sum).
/// Tags whose metric is undefined are skipped for that metric.
///
/// * `confusion_matrix`: Token-level or entity-level confusion matrix
/// * `ignore_tags`: Tags excluded from the average
/// * `weighted`: Weight the tags by their support
pub fn process_confusion_matrix_macro<T: Eq + Hash>(
    confusion_matrix: &ConfusionMatrix<'_, T>,
    ignore_tags: &TagSet<T>,
    weighted: bool,
) -> Metrics {
    let mut per_tag = Vec::with_capacity(confusion_matrix.tag_index().len());
    let mut weights = Vec::with_capacity(confusion_matrix.tag_index().len());
    for (tag, tag_idx) in confusion_matrix.tag_index().iter() {
        if ignore_tags.contains(tag) {
            continue;
        }
        weights.push(if weighted {
            confusion_matrix.row_sum(tag_idx) as f32
        } else {
            1.0
        });
        per_tag.push(process_confusion_matrix(confusion_matrix, tag_idx));
    }
    Metrics {
        precision: weighted_average_of_defined(per_tag.iter().map(|m| m.precision), &weights),
        recall: weighted_average_of_defined(per_tag.iter().map(|m| m.recall), &weights),
        accuracy: weighted_average_of_defined(per_tag.iter().map(|m| m.accuracy), &weights),
        fscore: weighted_average_of_defined(per_tag.iter().map(|m| m.fscore), &weights),
    }
}

/// Micro-averaged metrics. The true/false positives/negatives of every tag not in `ignore_tags`
/// are pooled before computing the ratios once.
pub fn process_confusion_matrix_micro<T: Eq + Hash>(
    confusion_matrix: &ConfusionMatrix<'_, T>,
    ignore_tags: &TagSet<T>,
) -> Metrics {
    let pooled: TagCounts = confusion_matrix
        .tag_index()
        .iter()
        .filter(|(tag, _)| !ignore_tags.contains(*tag))
        .map(|(_, tag_idx)| confusion_matrix.tag_counts(tag_idx))
        .sum();
    Metrics::from(pooled)
}

/// Support of the tags not ignored: the sum of their rows.
fn support<T: Eq + Hash>(
    confusion_matrix: &ConfusionMatrix<'_, T>,
    ignore_tags: &TagSet<T>,
) -> usize {
    confusion_matrix
        .tag_index()
        .iter()
        .filter(|(tag, _)| !ignore_tags.contains(*tag))
        .map(|(_, tag_idx)| confusion_matrix.row_sum(tag_idx))
        .sum()
}

/// Matches the entities of a single sample and accumulates them into an entity-level confusion
/// matrix. Entities whose tag is ignored or out of the vocabulary are dropped from both sides.
fn add_sample_collocations<T: Eq + Hash>(
    ps: &[T],
    ts: &[T],
    ignore_tags: &TagSet<T>,
    confusion_matrix: &mut ConfusionMatrix<'_, T>,
) {
    let index = confusion_matrix.tag_index();
    let sink = index.len();
    let keep = |tag: &T| {
        if ignore_tags.contains(tag) {
            None
        } else {
            index.get(tag)
        }
    };
    let pred_cuts: Vec<_> = CutIter::new(ps)
        .filter_map(|c| keep(c.tag).map(|i| (c, i)))
        .collect();
    let true_cuts: Vec<_> = CutIter::new(ts)
        .filter_map(|c| keep(c.tag).map(|i| (c, i)))
        .collect();
    // Boundaries of the true entities. The first true entity found keeps the boundaries.
    let mut true_boundaries: AHashMap<(usize, usize), usize> =
        AHashMap::with_capacity_and_hasher(true_cuts.len(), Default::default());
    for (tc, true_idx) in true_cuts.iter() {
        true_boundaries.entry((tc.start, tc.end)).or_insert(*true_idx);
    }
    // Every predicted entity is counted once, in the row of its collocated true entity or in the
    // sink row.
    let mut pred_boundaries: AHashSet<(usize, usize)> =
        AHashSet::with_capacity_and_hasher(pred_cuts.len(), Default::default());
    for (pc, pred_idx) in pred_cuts.iter() {
        pred_boundaries.insert((pc.start, pc.end));
        let true_idx = true_boundaries
            .get(&(pc.start, pc.end))
            .copied()
            .unwrap_or(sink);
        confusion_matrix.increment(true_idx, *pred_idx);
    }
    // True entities without any collocated prediction go to the sink column.
    for (tc, true_idx) in true_cuts.iter() {
        if !pred_boundaries.contains(&(tc.start, tc.end)) {
            confusion_matrix.increment(*true_idx, sink);
        }
    }
}

/// Builds the entity-level confusion matrix. The entities of both sequences are matched by their
/// boundaries: a predicted entity sharing its start and end with a true entity increments the
/// cell (true tag, predicted tag), even if the tags differ. Predicted entities without such a
/// match increment the sink row, true entities without such a match increment the sink column.
/// Entities whose tag is not in `tag_list` are ignored.
///
/// * `tag_pred`: Predicted tags
/// * `tag_true`: True tags
/// * `tag_list`: Vocabulary of the entity tags
/// * `parallel`: Can we use multiple cores to match the samples?
pub fn calc_entity_confusion_matrix<'a, T, S>(
    tag_pred: &[S],
    tag_true: &[S],
    tag_list: &'a [T],
    parallel: bool,
) -> Result<ConfusionMatrix<'a, T>, ComputationError>
where
    T: Eq + Hash + Sync,
    S: AsRef<[T]> + Sync,
{
    entity_confusion_matrix(tag_pred, tag_true, tag_list, &TagSet::default(), parallel)
}

/// Same as `calc_entity_confusion_matrix`, but the entities tagged with one of `ignore_tags`
/// (e.g. the special tags) are removed from both sequences before matching. Their rows and
/// columns stay empty.
pub(crate) fn entity_confusion_matrix<'a, T, S>(
    tag_pred: &[S],
    tag_true: &[S],
    tag_list: &'a [T],
    ignore_tags: &TagSet<T>,
    parallel: bool,
) -> Result<ConfusionMatrix<'a, T>, ComputationError>
where
    T: Eq + Hash + Sync,
    S: AsRef<[T]> + Sync,
{
    check_consistent_length(tag_true, tag_pred)?;
    let index = TagIndex::new(tag_list);
    if parallel {
        Ok(tag_pred
            .par_iter()
            .zip(tag_true.par_iter())
            .fold(
                || ConfusionMatrix::new(index.clone(), true),
                |mut acc, (ps, ts)| {
                    add_sample_collocations(ps.as_ref(), ts.as_ref(), ignore_tags, &mut acc);
                    acc
                },
            )
            .reduce(
                || ConfusionMatrix::new(index.clone(), true),
                |mut a, b| {
                    a.merge(&b);
                    a
                },
            ))
    } else {
        let mut confusion_matrix = ConfusionMatrix::new(index, true);
        for (ps, ts) in tag_pred.iter().zip(tag_true) {
            add_sample_collocations(ps.as_ref(), ts.as_ref(), ignore_tags, &mut confusion_matrix);
        }
        Ok(confusion_matrix)
    }
}

/// Derives the entity-level metrics from an entity-level confusion matrix. This is a
/// generalization of the micro metrics, where the sink counts as a false positive (last row) or
/// as a false negative (last column).
pub fn entity_metrics<T: Eq + Hash>(confusion_matrix: &ConfusionMatrix<'_, T>) -> EntityMetrics {
    let tp = confusion_matrix.true_positives();
    let total = confusion_matrix.total();
    let precision = ratio(tp, confusion_matrix.predicted_total());
    let recall = ratio(tp, confusion_matrix.true_total());
    EntityMetrics {
        precision,
        recall,
        accuracy: ratio(tp, total),
        fscore: harmonic_mean(precision, recall),
        collocation_ratio: ratio(confusion_matrix.vocabulary_block().sum(), total),
    }
}

/// Computes the entity-level precision, recall, accuracy, f-score and collocation ratio of the
/// predicted tags.
///
/// * `tag_pred`: Predicted tags
/// * `tag_true`: True tags
/// * `tag_list`: Vocabulary of the entity tags, special tags excluded
/// * `parallel`: Can we use multiple cores to match the samples?
pub fn calc_entity_metrics<T, S>(
    tag_pred: &[S],
    tag_true: &[S],
    tag_list: &[T],
    parallel: bool,
) -> Result<EntityMetrics, ComputationError>
where
    T: Eq + Hash + Sync,
    S: AsRef<[T]> + Sync,
{
    let confusion_matrix = calc_entity_confusion_matrix(tag_pred, tag_true, tag_list, parallel)?;
    Ok(entity_metrics(&confusion_matrix))
}

/// Builds a report with the metrics of every tag not in `ignore_tags`, followed by the micro,
/// macro and weighted overall metrics.
///
/// * `confusion_matrix`: Token-level or entity-level confusion matrix
/// * `ignore_tags`: Tags excluded from the report and from the averages
pub fn classification_report<T>(
    confusion_matrix: &ConfusionMatrix<'_, T>,
    ignore_tags: &TagSet<T>,
) -> Reporter
where
    T: Eq + Hash + Display,
{
    let mut reporter = Reporter::default();
    for (tag, tag_idx) in confusion_matrix.tag_index().iter() {
        if ignore_tags.contains(tag) {
            continue;
        }
        reporter.insert(ClassMetrics {
            class: tag.to_string(),
            average: Average::None,
            metrics: process_confusion_matrix(confusion_matrix, tag_idx),
            support: confusion_matrix.row_sum(tag_idx),
        });
    }
    let total_support = support(confusion_matrix, ignore_tags);
    for avg in enum_iterator::all::<OverallAverage>() {
        let metrics = match avg {
            OverallAverage::Micro => process_confusion_matrix_micro(confusion_matrix, ignore_tags),
            OverallAverage::Macro => {
                process_confusion_matrix_macro(confusion_matrix, ignore_tags, false)
            }
            OverallAverage::Weighted => {
                process_confusion_matrix_macro(confusion_matrix, ignore_tags, true)
            }
        };
        reporter.insert(ClassMetrics::new_overall(avg, metrics, total_support));
    }
    reporter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::get_cut;
    use crate::entity::tests::TagsToTest;
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;

    const EPS: f32 = 1e-5;

    fn assert_close(actual: Ratio, expected: f32) {
        let actual = actual.expect("the ratio should be defined");
        assert!(
            (actual - expected).abs() < EPS,
            "actual: {}, expected: {}",
            actual,
            expected
        );
    }

    fn token_matrix<'a>(tags: &'a [&'static str]) -> ConfusionMatrix<'a, &'static str> {
        // C is a true tag once and never predicted.
        let counts = array![[4, 1, 0], [2, 3, 0], [0, 1, 0]];
        ConfusionMatrix::from_counts(TagIndex::new(tags), counts, false)
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio::<f32>(1, 0), None);
        assert_eq!(ratio::<f32>(0, 4), Some(0.0));
        assert_eq!(ratio::<f64>(1, 4), Some(0.25));
    }

    #[rstest]
    #[case(Some(0.5), Some(0.5), Some(0.5))]
    #[case(Some(0.0), Some(0.8), Some(0.0))]
    #[case(Some(1.0), Some(0.0), Some(0.0))]
    #[case(None, Some(0.8), None)]
    #[case(Some(0.8), None, None)]
    fn test_harmonic_mean(#[case] p: Ratio, #[case] r: Ratio, #[case] expected: Ratio) {
        assert_eq!(harmonic_mean(p, r), expected);
    }

    #[test]
    fn test_check_consistent_length() {
        let test_cases = [
            (vec![vec![]], vec![vec![]], Ok(())),
            (vec![vec!['B']], vec![vec!['B']], Ok(())),
            (
                vec![vec![]],
                vec![vec!['B']],
                Err(InconsistentLengthError(0, 1)),
            ),
            (
                vec![vec!['B'], vec![]],
                vec![vec!['B']],
                Err(InconsistentLengthError(2, 1)),
            ),
        ];
        for (tag_true, tag_pred, expected) in test_cases.into_iter() {
            assert_eq!(check_consistent_length(&tag_true, &tag_pred), expected)
        }
    }

    #[test]
    fn test_prepare_confusion_matrix_skips_unknown_tags() {
        let tags = vec!["A", "B", "C"];
        let tag_true = vec![vec!["A", "B", "X"], vec!["C"]];
        let tag_pred = vec![vec!["A", "A", "A"], vec!["B"]];
        let matrix = prepare_confusion_matrix(&tag_true, &tag_pred, &tags).unwrap();
        let expected = array![[1usize, 0, 0], [1, 0, 0], [0, 1, 0]];
        assert_eq!(matrix.counts(), expected);
        assert_eq!(matrix.sink(), None);
    }

    #[test]
    fn test_prepare_confusion_matrix_inconsistent_length() {
        let tags = vec!["A"];
        let tag_true = vec![vec!["A", "A"]];
        let tag_pred = vec![vec!["A"]];
        let actual = prepare_confusion_matrix(&tag_true, &tag_pred, &tags);
        assert_eq!(
            actual.unwrap_err(),
            ComputationError::InconsistentLength(InconsistentLengthError(2, 1))
        );
    }

    #[test]
    fn test_process_confusion_matrix() {
        let tags = vec!["A", "B", "C"];
        let matrix = token_matrix(&tags);
        let a = process_confusion_matrix(&matrix, 0);
        assert_close(a.precision, 4.0 / 6.0);
        assert_close(a.recall, 0.8);
        assert_close(a.accuracy, 8.0 / 11.0);
        assert_close(a.fscore, 2.0 / 2.75);
        let c = process_confusion_matrix(&matrix, 2);
        assert_eq!(c.precision, None);
        assert_eq!(c.recall, Some(0.0));
        assert_eq!(c.fscore, None);
        assert_close(c.accuracy, 10.0 / 11.0);
    }

    #[test]
    fn test_macro_weighted_skips_undefined() {
        let tags = vec!["A", "B", "C"];
        let matrix = token_matrix(&tags);
        let actual = process_confusion_matrix_macro(&matrix, &TagSet::default(), true);
        assert_close(actual.precision, (4.0 / 6.0 * 5.0 + 0.6 * 5.0) / 10.0);
        assert_close(actual.recall, 7.0 / 11.0);
        assert_close(actual.accuracy, 85.0 / 121.0);
        assert_close(actual.fscore, (2.0 / 2.75 * 5.0 + 0.6 * 5.0) / 10.0);
    }

    #[test]
    fn test_macro_weighted_equals_hand_excluded_average() {
        let tags = vec!["A", "B", "C"];
        let matrix = token_matrix(&tags);
        let actual = process_confusion_matrix_macro(&matrix, &TagSet::default(), true);
        let (a, b) = (
            process_confusion_matrix(&matrix, 0),
            process_confusion_matrix(&matrix, 1),
        );
        let (wa, wb) = (matrix.row_sum(0) as f32, matrix.row_sum(1) as f32);
        let expected = (a.precision.unwrap() * wa + b.precision.unwrap() * wb) / (wa + wb);
        assert_close(actual.precision, expected);
    }

    #[test]
    fn test_macro_unweighted() {
        let tags = vec!["A", "B", "C"];
        let matrix = token_matrix(&tags);
        let actual = process_confusion_matrix_macro(&matrix, &TagSet::default(), false);
        assert_close(actual.precision, (4.0 / 6.0 + 0.6) / 2.0);
        assert_close(actual.recall, (0.8 + 0.6) / 3.0);
    }

    #[test]
    fn test_macro_all_undefined() {
        let tags = vec!["A", "B"];
        let matrix = ConfusionMatrix::new(TagIndex::new(&tags), false);
        let actual = process_confusion_matrix_macro(&matrix, &TagSet::default(), true);
        assert_eq!(actual, Metrics::default());
    }

    #[test]
    fn test_micro() {
        let tags = vec!["A", "B", "C"];
        let matrix = token_matrix(&tags);
        let actual = process_confusion_matrix_micro(&matrix, &TagSet::default());
        assert_close(actual.precision, 7.0 / 11.0);
        assert_close(actual.recall, 7.0 / 11.0);
        assert_close(actual.accuracy, 25.0 / 33.0);
        assert_close(actual.fscore, 7.0 / 11.0);
    }

    #[test]
    fn test_micro_ignore_tags() {
        let tags = vec!["A", "B", "C"];
        let matrix = token_matrix(&tags);
        let ignore: TagSet<&str> = ["C"].into_iter().collect();
        let actual = process_confusion_matrix_micro(&matrix, &ignore);
        assert_close(actual.precision, 7.0 / 11.0);
        assert_close(actual.recall, 0.7);
    }

    #[test]
    fn test_collocated_with_wrong_type() {
        let tags = vec!["PER", "ORG"];
        let tag_true = vec![vec!["PER", "PER", "PER", "O"]];
        let tag_pred = vec![vec!["ORG", "ORG", "ORG", "O"]];
        let matrix = calc_entity_confusion_matrix(&tag_pred, &tag_true, &tags, false).unwrap();
        assert_eq!(matrix.counts(), array![[0usize, 1, 0], [0, 0, 0], [0, 0, 0]]);
        let metrics = entity_metrics(&matrix);
        assert_eq!(metrics.precision, Some(0.0));
        assert_eq!(metrics.recall, Some(0.0));
        assert_eq!(metrics.fscore, Some(0.0));
        assert_eq!(metrics.collocation_ratio, Some(1.0));
    }

    #[test]
    fn test_missed_entity_goes_to_sink_column() {
        let tags = vec!["PER", "ORG"];
        let tag_true = vec![vec!["PER", "PER", "PER"]];
        let tag_pred = vec![vec!["O", "O", "O"]];
        let matrix = calc_entity_confusion_matrix(&tag_pred, &tag_true, &tags, false).unwrap();
        assert_eq!(matrix.counts(), array![[0usize, 0, 1], [0, 0, 0], [0, 0, 0]]);
        let metrics = entity_metrics(&matrix);
        assert_eq!(metrics.precision, None);
        assert_eq!(metrics.recall, Some(0.0));
        assert_eq!(metrics.fscore, None);
        assert_eq!(metrics.collocation_ratio, Some(0.0));
    }

    #[test]
    fn test_every_missed_true_entity_is_counted() {
        let tags = vec!["PER", "ORG"];
        let tag_true = vec![vec!["PER", "PER", "ORG", "ORG", "ORG"]];
        let tag_pred = vec![vec!["PER", "PER", "ORG", "ORG", "O"]];
        let matrix = calc_entity_confusion_matrix(&tag_pred, &tag_true, &tags, false).unwrap();
        assert_eq!(matrix.counts(), array![[1usize, 0, 0], [0, 0, 1], [0, 1, 0]]);
    }

    #[test]
    fn test_calc_entity_metrics() {
        let tags = vec!["PER", "ORG"];
        let tag_true = vec![
            vec!["PER", "PER", "O", "ORG"],
            vec!["PER", "PER", "PER", "O"],
            vec!["O", "ORG", "ORG"],
        ];
        let tag_pred = vec![
            vec!["PER", "PER", "O", "ORG"],
            vec!["PER", "PER", "O", "O"],
            vec!["O", "PER", "PER"],
        ];
        let matrix = calc_entity_confusion_matrix(&tag_pred, &tag_true, &tags, false).unwrap();
        assert_eq!(matrix.counts(), array![[1usize, 0, 1], [1, 1, 0], [1, 0, 0]]);
        let actual = calc_entity_metrics(&tag_pred, &tag_true, &tags, false).unwrap();
        assert_close(actual.precision, 0.5);
        assert_close(actual.recall, 0.5);
        assert_close(actual.accuracy, 0.4);
        assert_close(actual.fscore, 0.5);
        assert_close(actual.collocation_ratio, 0.6);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_ignored_tags_are_not_matched(#[case] parallel: bool) {
        let tags = vec!["PER", "LOC", "O", "BEG", "END"];
        let tag_true = vec![vec!["BEG", "PER", "PER", "O", "LOC", "END"]];
        let tag_pred = vec![vec!["BEG", "PER", "O", "O", "O", "END"]];
        let ignore: TagSet<&str> = ["BEG", "END"].into_iter().collect();
        let matrix =
            entity_confusion_matrix(&tag_pred, &tag_true, &tags, &ignore, parallel).unwrap();
        assert_eq!(matrix.row_sum(3) + matrix.row_sum(4), 0);
        assert_eq!(matrix.counts().column(3).sum() + matrix.counts().column(4).sum(), 0);
        let actual = entity_metrics(&matrix);
        let without_specials = calc_entity_metrics(&tag_pred, &tag_true, &tags[..3], parallel);
        assert_eq!(Ok(actual), without_specials);
        assert_eq!(actual.precision, Some(0.0));
        assert_eq!(actual.recall, Some(0.0));
    }

    #[test]
    fn test_calc_entity_metrics_inconsistent_length() {
        let tags = vec!["PER"];
        let tag_true = vec![vec!["PER"], vec!["O"]];
        let tag_pred = vec![vec!["PER"]];
        let actual = calc_entity_metrics(&tag_pred, &tag_true, &tags, true);
        assert_eq!(
            actual,
            Err(ComputationError::InconsistentLength(
                InconsistentLengthError(2, 1)
            ))
        );
    }

    #[test]
    fn test_classification_report() {
        let tags = vec!["A", "B", "C"];
        let matrix = token_matrix(&tags);
        let ignore: TagSet<&str> = ["C"].into_iter().collect();
        let reporter = classification_report(&matrix, &ignore);
        assert!(reporter.get("C").is_none());
        let a = reporter.get("A").unwrap();
        assert_eq!(a.support, 5);
        assert_eq!(a.average, Average::None);
        let micro = reporter.get("Overall_Micro").unwrap();
        assert_eq!(micro.support, 10);
        assert_close(micro.metrics.recall, 0.7);
        assert_eq!(reporter.iter().count(), 5);
    }

    type TagPairs = Vec<Vec<(TagsToTest, TagsToTest)>>;

    fn split(pairs: TagPairs) -> (Vec<Vec<TagsToTest>>, Vec<Vec<TagsToTest>>) {
        pairs
            .into_iter()
            .map(|sample| sample.into_iter().unzip::<_, _, Vec<_>, Vec<_>>())
            .unzip()
    }

    #[test]
    fn test_propertie_mass_conservation() {
        fn mass_conservation(pairs: TagPairs) -> TestResult {
            let (tag_pred, tag_true) = split(pairs);
            let tags = vec![TagsToTest::O, TagsToTest::Per, TagsToTest::Org];
            let matrix =
                calc_entity_confusion_matrix(&tag_pred, &tag_true, &tags, false).unwrap();
            let mut expected = 0;
            for (ps, ts) in tag_pred.iter().zip(tag_true.iter()) {
                let pred_cuts: Vec<_> = get_cut(ps)
                    .into_iter()
                    .filter(|c| *c.tag != TagsToTest::Beg)
                    .collect();
                let true_cuts: Vec<_> = get_cut(ts)
                    .into_iter()
                    .filter(|c| *c.tag != TagsToTest::Beg)
                    .collect();
                expected += pred_cuts.len();
                expected += true_cuts
                    .iter()
                    .filter(|tc| {
                        !pred_cuts
                            .iter()
                            .any(|pc| pc.start == tc.start && pc.end == tc.end)
                    })
                    .count();
            }
            TestResult::from_bool(matrix.total() == expected)
        }
        QuickCheck::new()
            .tests(1000)
            .quickcheck(mass_conservation as fn(TagPairs) -> TestResult)
    }

    #[test]
    fn test_propertie_parallel_matches_sequential() {
        fn same_matrix(pairs: TagPairs) -> bool {
            let (tag_pred, tag_true) = split(pairs);
            let tags = vec![TagsToTest::Per, TagsToTest::Org];
            let sequential =
                calc_entity_confusion_matrix(&tag_pred, &tag_true, &tags, false).unwrap();
            let parallel = calc_entity_confusion_matrix(&tag_pred, &tag_true, &tags, true).unwrap();
            sequential == parallel
        }
        QuickCheck::new().tests(500).quickcheck(same_matrix as fn(TagPairs) -> bool)
    }
}
