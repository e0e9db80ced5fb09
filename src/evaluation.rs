/**
Evaluation of a tagging model over a set of samples. The model is a collaborator: this module
only asks it for the predicted and true tags of the samples, then scores them and logs the
results.
*/
use crate::config::{EvalConfig, TagSet};
use crate::entity::word_count;
use crate::metrics::{check_consistent_length, ratio, ComputationError};
use ahash::HashMap as AHashMap;
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// A sample of a dataset, such as a page or a record. It exposes the input of the model and the
/// expected output.
pub trait Sample {
    type Input;
    type Output;
    fn get_x(&self) -> &Self::Input;
    fn get_y(&self) -> &Self::Output;
}

/// A tagging model. Given the inputs and the expected outputs of some samples, it returns for
/// every sample the predicted tags and the true tags, in this order.
pub trait TagModel {
    type Input;
    type Output;
    type Tag;
    /// Parameters of the evaluation, forwarded untouched to the model.
    type Args;
    fn evaluate_model(
        &self,
        inputs: &[(&Self::Input, &Self::Output)],
        args: &Self::Args,
    ) -> Vec<(Vec<Self::Tag>, Vec<Self::Tag>)>;
}

/// Kind of samples evaluated. Page models are only scored on the end-of-sentence tag, record
/// models on every tag but the special tags.
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize, Sequence)]
pub enum TaskType {
    Page,
    Record,
}

impl Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str_content = match self {
            Self::Page => "page",
            Self::Record => "record",
        };
        write!(f, "{}", str_content)
    }
}

impl FromStr for TaskType {
    type Err = TaskTypeParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "page" => Ok(TaskType::Page),
            "record" => Ok(TaskType::Record),
            _ => Err(TaskTypeParsingError(String::from(s))),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TaskTypeParsingError(String);
impl Display for TaskTypeParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Impossible to parse the string ({}) into a TaskType",
            self.0
        )
    }
}
impl std::error::Error for TaskTypeParsingError {}

/// Token-level correct ratio. For `TaskType::Page`, only the positions whose true tag is the
/// end-of-sentence tag are scored. For `TaskType::Record`, every position whose true tag is not
/// a special tag is scored.
///
/// * `tag_pred`: Predicted tags
/// * `tag_true`: True tags
/// * `task_type`: Page or record model
/// * `config`: Special tags and end-of-sentence tag
pub fn correct_ratio<T, S>(
    tag_pred: &[S],
    tag_true: &[S],
    task_type: TaskType,
    config: &EvalConfig<T>,
) -> Result<f32, ComputationError>
where
    T: Eq + Hash,
    S: AsRef<[T]>,
{
    check_consistent_length(tag_true, tag_pred)?;
    let is_scored = |t: &T| match task_type {
        TaskType::Page => t == config.eos_tag(),
        TaskType::Record => !config.is_special(t),
    };
    let (mut correct, mut total) = (0, 0);
    for (ps, ts) in tag_pred.iter().zip(tag_true) {
        for (p, t) in ps.as_ref().iter().zip(ts.as_ref()) {
            if is_scored(t) {
                total += 1;
                correct += usize::from(p == t);
            }
        }
    }
    ratio(correct, total).ok_or_else(|| match task_type {
        TaskType::Page => ComputationError::EmptyInput(String::from("the end-of-sentence tags")),
        TaskType::Record => ComputationError::EmptyInput(String::from("the true tags")),
    })
}

/// Entity-level correct ratio: the number of predicted entities matching exactly a true entity,
/// divided by the number of predicted entities. The counts are summed over every sample before
/// dividing. Predicted entities bearing a special tag are not counted.
pub fn entity_correct_ratio<T, S>(
    tag_pred: &[S],
    tag_true: &[S],
    special_tags: &TagSet<T>,
) -> Result<f32, ComputationError>
where
    T: Eq + Hash,
    S: AsRef<[T]>,
{
    check_consistent_length(tag_true, tag_pred)?;
    let (mut matched, mut total) = (0, 0);
    for (ps, ts) in tag_pred.iter().zip(tag_true) {
        let (m, t) = word_count(ps.as_ref(), ts.as_ref(), special_tags)?;
        matched += m;
        total += t;
    }
    ratio(matched, total)
        .ok_or_else(|| ComputationError::EmptyInput(String::from("the predicted entities")))
}

/// Number of occurrences of every tag, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStatistics<T> {
    /// Occurrences of every true tag
    pub true_counts: Vec<(T, usize)>,
    /// Occurrences of every correctly predicted tag, special tags excluded
    pub correct_counts: Vec<(T, usize)>,
}

fn count_in_order<'a, T, I>(tags: I) -> Vec<(&'a T, usize)>
where
    T: Eq + Hash + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut positions: AHashMap<&'a T, usize> = AHashMap::default();
    let mut counts: Vec<(&'a T, usize)> = vec![];
    for tag in tags {
        let i = *positions.entry(tag).or_insert_with(|| {
            counts.push((tag, 0));
            counts.len() - 1
        });
        counts[i].1 += 1;
    }
    counts
}

/// Counts the true tags and the correctly predicted tags (special tags excluded).
pub fn count_tags<'a, T, S>(
    tag_pred: &'a [S],
    tag_true: &'a [S],
    config: &EvalConfig<T>,
) -> Result<TagStatistics<&'a T>, ComputationError>
where
    T: Eq + Hash,
    S: AsRef<[T]>,
{
    check_consistent_length(tag_true, tag_pred)?;
    let true_counts = count_in_order(tag_true.iter().flat_map(|ts| ts.as_ref()));
    let correct = tag_pred
        .iter()
        .zip(tag_true)
        .flat_map(|(ps, ts)| ps.as_ref().iter().zip(ts.as_ref()))
        .filter(|(p, t)| p == t && !config.is_special(t))
        .map(|(_, t)| t);
    Ok(TagStatistics {
        true_counts,
        correct_counts: count_in_order(correct),
    })
}

/// Asks the model for the predicted and true tags of every sample. The first list holds the
/// predictions.
fn predict_samples<M, S>(
    samples: &[S],
    model: &M,
    args: &M::Args,
) -> (Vec<Vec<M::Tag>>, Vec<Vec<M::Tag>>)
where
    M: TagModel,
    S: Sample<Input = M::Input, Output = M::Output>,
{
    let inputs: Vec<_> = samples.iter().map(|s| (s.get_x(), s.get_y())).collect();
    model.evaluate_model(&inputs, args).into_iter().unzip()
}

/// Token-level correct ratio of a model over a subset of samples (train, dev, test, ...).
///
/// * `samples`: Pages or records
/// * `model`: Model predicting the tags
/// * `args`: Parameters forwarded to the model
/// * `subset_name`: Name of the subset, used in the logs
/// * `task_type`: Page or record model
/// * `config`: Special tags and end-of-sentence tag
#[instrument(skip_all, fields(subset = subset_name, task = %task_type))]
pub fn correct_ratio_calculation<M, S>(
    samples: &[S],
    model: &M,
    args: &M::Args,
    subset_name: &str,
    task_type: TaskType,
    config: &EvalConfig<M::Tag>,
) -> Result<f32, ComputationError>
where
    M: TagModel,
    M::Tag: Eq + Hash,
    S: Sample<Input = M::Input, Output = M::Output>,
{
    let (tag_pred, tag_true) = predict_samples(samples, model, args);
    let correct_ratio = correct_ratio(&tag_pred, &tag_true, task_type, config)?;
    info!("Correct ratio of {} set is {}", subset_name, correct_ratio);
    Ok(correct_ratio)
}

/// Entity-level correct ratio of a record model over a subset of samples.
#[instrument(skip_all, fields(subset = subset_name))]
pub fn tag_correct_ratio<M, S>(
    samples: &[S],
    model: &M,
    args: &M::Args,
    subset_name: &str,
    config: &EvalConfig<M::Tag>,
) -> Result<f32, ComputationError>
where
    M: TagModel,
    M::Tag: Eq + Hash,
    S: Sample<Input = M::Input, Output = M::Output>,
{
    let (tag_pred, tag_true) = predict_samples(samples, model, args);
    let entity_correct_ratio = entity_correct_ratio(&tag_pred, &tag_true, config.special_tags())?;
    info!(
        "Entity level correct ratio of {} set is {}",
        subset_name, entity_correct_ratio
    );
    Ok(entity_correct_ratio)
}

/// Counts the true tags and the correctly predicted tags of a model over a subset of samples.
#[instrument(skip_all, fields(subset = subset_name))]
pub fn tag_count<M, S>(
    samples: &[S],
    model: &M,
    args: &M::Args,
    subset_name: &str,
    config: &EvalConfig<M::Tag>,
) -> Result<TagStatistics<M::Tag>, ComputationError>
where
    M: TagModel,
    M::Tag: Eq + Hash + Clone + Debug,
    S: Sample<Input = M::Input, Output = M::Output>,
{
    let (tag_pred, tag_true) = predict_samples(samples, model, args);
    let statistics = count_tags(&tag_pred, &tag_true, config)?;
    for (tag, count) in statistics.true_counts.iter() {
        debug!(
            "For {} data, the number of real tag {:?} : {}",
            subset_name, tag, count
        );
    }
    for (tag, count) in statistics.correct_counts.iter() {
        debug!(
            "For {} data, the number of correctly predicted tag {:?} : {}",
            subset_name, tag, count
        );
    }
    let owned = |counts: Vec<(&M::Tag, usize)>| {
        counts
            .into_iter()
            .map(|(t, c)| (t.clone(), c))
            .collect::<Vec<_>>()
    };
    Ok(TagStatistics {
        true_counts: owned(statistics.true_counts),
        correct_counts: owned(statistics.correct_counts),
    })
}
