/**
This modules gives a few tools to prettyprint the metrics of every tag and the overall metrics,
and to export the details of the entities of a set of samples.
*/
use crate::config::EvalConfig;
use crate::entity::get_cut;
use crate::metrics::{check_consistent_length, ComputationError, InconsistentLengthError, Metrics};
use ahash::HashSet as AHashSet;
use csv::{Terminator, WriterBuilder};
use enum_iterator::Sequence;
use itertools::{izip, Itertools};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// The reporter holds the metrics of every tag and the overall metrics. It can be used to display
/// the results (i.e. prettyprint them) as if they were collected into a dataframe. The reporter
/// can be built with the `classification_report` function.
///
/// # Example
///
/// ```rust
/// use spaneval::{classification_report, prepare_confusion_matrix, TagSet};
///
/// let tag_true = vec![vec!["PER", "PER", "O", "LOC"]];
/// let tag_pred = vec![vec!["PER", "O", "O", "LOC"]];
/// let tags = vec!["PER", "LOC", "O"];
/// let matrix = prepare_confusion_matrix(&tag_true, &tag_pred, &tags).unwrap();
/// let ignore: TagSet<&str> = ["O"].into_iter().collect();
/// let reporter = classification_report(&matrix, &ignore);
///
/// let per = reporter.get("PER").unwrap();
/// assert_eq!(per.metrics.precision, Some(1.0));
/// assert_eq!(per.metrics.recall, Some(0.5));
/// assert_eq!(per.support, 2);
/// assert!(reporter.get("O").is_none());
///
/// let lines: Vec<String> = reporter.to_string().lines().map(String::from).collect();
/// assert_eq!(lines[0], "Class, Precision, Recall, Accuracy, Fscore, Support");
/// assert!(lines[1].starts_with("Overall_Micro"));
/// assert_eq!(lines[4], "PER, 1, 0.5, 0.75, 0.6666667, 2");
/// assert_eq!(lines[5], "LOC, 1, 1, 1, 1, 1");
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Reporter {
    pub(crate) overall: Vec<ClassMetrics>,
    pub(crate) classes: Vec<ClassMetrics>,
}

impl Reporter {
    pub(crate) fn insert(&mut self, metrics: ClassMetrics) {
        match metrics.average {
            Average::None => self.classes.push(metrics),
            _ => self.overall.push(metrics),
        }
    }
    /// Gets the metrics of a class, such as `"PER"` or `"Overall_Micro"`.
    pub fn get(&self, class: &str) -> Option<&ClassMetrics> {
        self.iter().find(|c| c.class == class)
    }
    /// Iterates over the overall metrics, then over the metrics of every class.
    pub fn iter(&self) -> impl Iterator<Item = &ClassMetrics> {
        self.overall.iter().chain(self.classes.iter())
    }
}

/// The Reporter struct acts as a dataframe when displayed.
impl Display for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Class, Precision, Recall, Accuracy, Fscore, Support")?;
        for v in self.iter() {
            writeln!(f, "{}", v)?
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
/// Datastructure holding metrics about a given class.
pub struct ClassMetrics {
    /// The class, such as "PER", "GEO", "MISC", etc.
    pub class: String,
    /// The average used to compute this class' metrics
    pub average: Average,
    /// Precision, recall, accuracy and fscore
    pub metrics: Metrics,
    /// Number of true occurrences
    pub support: usize,
}

impl ClassMetrics {
    pub(crate) fn new_overall(average: OverallAverage, metrics: Metrics, support: usize) -> Self {
        ClassMetrics {
            class: average.to_string(),
            average: average.into(),
            metrics,
            support,
        }
    }
}

/// The ClassMetrics struct acts as a line in a dataframe when displayed.
impl Display for ClassMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.class, self.metrics, self.support)
    }
}

/// Enumeration of the different types of averaging supported by this crate. &str can be parsed
/// to create an `Average`.
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize, Sequence)]
pub enum Average {
    None,
    Micro,
    Macro,
    Weighted,
}
impl Display for Average {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
impl FromStr for Average {
    type Err = AverageParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Average::None),
            "micro" => Ok(Average::Micro),
            "macro" => Ok(Average::Macro),
            "weighted" => Ok(Average::Weighted),
            _ => Err(AverageParsingError(String::from(s))),
        }
    }
}

#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub struct AverageParsingError(String);
impl Display for AverageParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Impossible to parse the string ({}) into an Average",
            self.0
        )
    }
}
impl std::error::Error for AverageParsingError {}

/// Averages reported on top of the per-class metrics, in their display order.
#[derive(Debug, Hash, PartialEq, Eq, Copy, Clone, Serialize, Deserialize, Sequence)]
pub enum OverallAverage {
    Micro,
    Macro,
    Weighted,
}

impl Display for OverallAverage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str_content = match self {
            Self::Micro => "Overall_Micro",
            Self::Macro => "Overall_Macro",
            Self::Weighted => "Overall_Weighted",
        };
        write!(f, "{}", str_content)
    }
}

impl From<OverallAverage> for Average {
    fn from(value: OverallAverage) -> Self {
        match value {
            OverallAverage::Micro => Average::Micro,
            OverallAverage::Macro => Average::Macro,
            OverallAverage::Weighted => Average::Weighted,
        }
    }
}

/// Name of the file written by `EntityDetails::save`.
pub const ENTITY_DETAIL_FILENAME: &str = "entity_detail.csv";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A true entity with the text it covers, its tags and the tags predicted at the same positions.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EntityDetail {
    pub word: String,
    /// True tags of the entity, separated by spaces
    pub expected: String,
    /// Predicted tags at the positions of the entity, separated by spaces
    pub pred: String,
    /// Was the entity predicted exactly (same boundaries and same tag)?
    pub correct: bool,
}

/// In-memory list of entity details. The records are collected first and written once.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct EntityDetails {
    records: Vec<EntityDetail>,
}

impl EntityDetails {
    pub fn records(&self) -> &[EntityDetail] {
        &self.records
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    /// Writes the records as a UTF-8 CSV with a byte order mark, header included.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<(), csv::Error> {
        writer.write_all(UTF8_BOM)?;
        let mut csv_writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);
        for record in self.records.iter() {
            csv_writer.serialize(record)?;
        }
        // The header is only written along the first record.
        if self.records.is_empty() {
            csv_writer.write_record(["word", "expected", "pred", "correct"])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
    /// Writes the records in `ENTITY_DETAIL_FILENAME`, inside `directory`.
    pub fn save<P: AsRef<Path>>(&self, directory: P) -> Result<(), csv::Error> {
        let file = File::create(directory.as_ref().join(ENTITY_DETAIL_FILENAME))?;
        self.write_csv(BufWriter::new(file))
    }
}

impl Display for EntityDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "word, expected, pred, correct")?;
        for r in self.records.iter() {
            writeln!(f, "{}, {}, {}, {}", r.word, r.expected, r.pred, r.correct)?
        }
        Ok(())
    }
}

/// Collects the details of the true entities of the first `config.max_entity_records()`
/// samples. Entities bearing a special tag are skipped. If `mismatch_only` is true, only the
/// entities that were not predicted exactly are kept.
///
/// * `tag_pred`: Predicted tags
/// * `tag_true`: True tags
/// * `inputs`: Texts of the samples, one character per tag
/// * `mismatch_only`: Keep only the wrongly predicted entities
/// * `config`: Special tags and maximum number of samples
pub fn output_entity_details<T, S, I>(
    tag_pred: &[S],
    tag_true: &[S],
    inputs: &[I],
    mismatch_only: bool,
    config: &EvalConfig<T>,
) -> Result<EntityDetails, ComputationError>
where
    T: Eq + Hash + Display,
    S: AsRef<[T]>,
    I: AsRef<str>,
{
    if inputs.len() != tag_pred.len() {
        return Err(InconsistentLengthError::new(tag_pred.len(), inputs.len()).into());
    }
    check_consistent_length(tag_true, tag_pred)?;
    let mut records = vec![];
    for (sent, ps, ts) in izip!(inputs, tag_pred, tag_true).take(config.max_entity_records()) {
        let (sent, ps, ts) = (sent.as_ref(), ps.as_ref(), ts.as_ref());
        let chars: Vec<char> = sent.chars().collect();
        if chars.len() != ps.len() {
            return Err(InconsistentLengthError::new(ps.len(), chars.len()).into());
        }
        let pred_cuts: AHashSet<_> = get_cut(ps).into_iter().collect();
        for tc in get_cut(ts) {
            let correct = pred_cuts.contains(&tc);
            if (mismatch_only && correct) || config.is_special(tc.tag) {
                continue;
            }
            records.push(EntityDetail {
                word: chars[tc.start..tc.end].iter().collect(),
                expected: ts[tc.start..tc.end].iter().join(" "),
                pred: ps[tc.start..tc.end].iter().join(" "),
                correct,
            });
        }
    }
    Ok(EntityDetails { records })
}
