/*!
This library evaluates the output of sequence tagging models (named entity recognition, field
extraction over characters or tokens) against the ground truth. It works on flat tag sequences:
every position carries a tag and an entity is a maximal run of identical tags.

# Terminology
* A tag is any label of a position, such as `PER`, `LOC` or `O`. Tags can be of any type
    implementing `Eq` and `Hash`, but are usually strings.
* A span (or cut) is a maximal run of identical tags, represented by its start, its exclusive end
    and its tag.
* Two spans are collocated when they share the same start and the same end, whatever their tags.
    They are an exact match when their tags are also the same.
* The special tags (such as `BEG` and `END`) mark the boundaries of a sequence. They are learned
    by the models but never scored.

# Metrics
* Token-level metrics are computed from a confusion matrix indexed by the true tag (rows) and the
    predicted tag (columns). They can be reported per tag or averaged (micro, macro, weighted).
* Entity-level metrics are computed from a confusion matrix of collocated entities. This matrix
    carries one more row and one more column, the *sink*, counting the predicted entities without
    any collocated true entity and the true entities without any collocated predicted entity.

A ratio whose denominator is 0 is undefined and is represented by `None`.
*/

mod annotate;
mod config;
mod confusion;
mod entity;
mod evaluation;
mod metrics;
mod reporter;

// The public api starts here
pub use entity::{expand_cuts, get_cut, is_collocated, word_count, CutIter, Span};

pub use confusion::{ConfusionMatrix, TagCounts, TagIndex};

pub use metrics::{
    calc_entity_confusion_matrix, calc_entity_metrics, classification_report, entity_metrics,
    prepare_confusion_matrix, process_confusion_matrix, process_confusion_matrix_macro,
    process_confusion_matrix_micro, ComputationError, EntityMetrics, InconsistentLengthError,
    Metrics, Ratio,
};

pub use reporter::{
    output_entity_details, Average, AverageParsingError, ClassMetrics, EntityDetail,
    EntityDetails, OverallAverage, Reporter, ENTITY_DETAIL_FILENAME,
};

pub use evaluation::{
    correct_ratio, correct_ratio_calculation, count_tags, entity_correct_ratio, tag_correct_ratio,
    tag_count, Sample, TagModel, TagStatistics, TaskType, TaskTypeParsingError,
};

pub use annotate::{
    convert_to_orig, get_keywords_from_tagged_record, get_sent_len_for_pages, is_empty_cell,
    modify_tag_seq, CharSample, DuplicateTagError,
};

pub use config::{
    DefaultEvalConfig, EvalConfig, EvalConfigBuilder, TagSet, DEFAULT_EOS_TAG,
    DEFAULT_MAX_ENTITY_RECORDS, DEFAULT_NULL_TAG, DEFAULT_PADDING_CHAR, DEFAULT_SPECIAL_TAGS,
};

use std::fmt::Display;
use std::hash::Hash;

/// Main entrypoint of the library. This function matches the entities of the predicted and true
/// tags, then returns the entity-level metrics along with a report of the metrics of every tag.
/// Instead of taking in the raw parameters, this function takes an `EvalConfig` struct: the
/// entities tagged with a special tag are removed from both sequences before matching, they are
/// left out of the report, and the samples are matched in parallel if requested.
///
/// * `tag_pred`: Predicted tags
/// * `tag_true`: True tags
/// * `tag_list`: Vocabulary of the entity tags
/// * `config`: Parameters of the evaluation
///
/// # Example
/// ```rust
/// use spaneval::{evaluate_entities, DefaultEvalConfig};
///
/// let tag_true = vec![vec!["BEG", "PER", "PER", "O", "LOC", "END"]];
/// let tag_pred = vec![vec!["BEG", "PER", "PER", "O", "O", "END"]];
/// let tags = vec!["PER", "LOC", "O", "BEG", "END"];
/// let config = DefaultEvalConfig::default();
///
/// let (metrics, reporter) = evaluate_entities(&tag_pred, &tag_true, &tags, &config).unwrap();
/// assert_eq!(metrics.precision, Some(0.5));
/// assert_eq!(metrics.recall, Some(1.0 / 3.0));
/// assert_eq!(reporter.get("PER").unwrap().support, 1);
/// assert!(reporter.get("BEG").is_none());
/// ```
pub fn evaluate_entities<T, S>(
    tag_pred: &[S],
    tag_true: &[S],
    tag_list: &[T],
    config: &EvalConfig<T>,
) -> Result<(EntityMetrics, Reporter), ComputationError>
where
    T: Eq + Hash + Display + Sync,
    S: AsRef<[T]> + Sync,
{
    let confusion_matrix = metrics::entity_confusion_matrix(
        tag_pred,
        tag_true,
        tag_list,
        config.special_tags(),
        config.parallel(),
    )?;
    let reporter = classification_report(&confusion_matrix, config.special_tags());
    Ok((entity_metrics(&confusion_matrix), reporter))
}
