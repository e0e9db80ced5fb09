/*
 * This modules contains the configuration of an evaluation run. The `EvalConfig` struct is passed
 * explicitly to the functions needing it (special tags, padding character, report size, ...)
 * instead of being read from global constants. It can be built with the `EvalConfigBuilder`.
*/
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Set of tags, such as the special tags or the tags ignored by the reducers.
pub type TagSet<T> = ahash::HashSet<T>;

/// Tags marking the boundaries of a sequence. They are learned by the models but never scored.
pub const DEFAULT_SPECIAL_TAGS: [&str; 2] = ["BEG", "END"];
/// Tag carried by the characters that are not part of any entity.
pub const DEFAULT_NULL_TAG: &str = "O";
/// Tag carried by the last character of a sentence in page models.
pub const DEFAULT_EOS_TAG: &str = "S";
/// Character replacing the spaces of the stored text to recover the original text.
pub const DEFAULT_PADDING_CHAR: char = '\u{3000}';
/// Maximum number of samples written in the entity detail report.
pub const DEFAULT_MAX_ENTITY_RECORDS: usize = 1000;

/// Reasonable default configuration for string tags.
pub type DefaultEvalConfig = EvalConfig<&'static str>;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Config struct holding the parameters of an evaluation run. It is built once, then borrowed by
/// every function needing it. `DefaultEvalConfig` implements the default trait.
pub struct EvalConfig<T: Eq + Hash> {
    /// Tags excluded from entity-level scoring, such as sequence boundary markers.
    special_tags: TagSet<T>,
    /// Tag of the characters outside of any entity. A character bearing another tag cannot be
    /// tagged a second time.
    null_tag: T,
    /// End-of-sentence tag. Page models are only scored on this tag.
    eos_tag: T,
    /// Character used in place of the spaces when reconstructing the original text.
    padding_char: char,
    /// Maximum number of samples kept in the entity detail report.
    max_entity_records: usize,
    /// Can we use multiple cores to match the entities? The results are the same in both cases.
    parallel: bool,
}

impl<T: Eq + Hash> EvalConfig<T> {
    pub fn special_tags(&self) -> &TagSet<T> {
        &self.special_tags
    }
    pub fn is_special(&self, tag: &T) -> bool {
        self.special_tags.contains(tag)
    }
    pub fn null_tag(&self) -> &T {
        &self.null_tag
    }
    pub fn eos_tag(&self) -> &T {
        &self.eos_tag
    }
    pub fn padding_char(&self) -> char {
        self.padding_char
    }
    pub fn max_entity_records(&self) -> usize {
        self.max_entity_records
    }
    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

impl DefaultEvalConfig {
    pub fn new() -> Self {
        EvalConfigBuilder::default().build()
    }
}

impl Default for DefaultEvalConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Display for EvalConfig<T>
where
    T: Eq + Hash + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!("Special tags: {:?}\n Null tag: {:?}\n End of sentence tag: {:?}\n Padding character: {:?}\n Maximum number of entity records: {}\n Using parallel computations: {}", self.special_tags, self.null_tag, self.eos_tag, self.padding_char, self.max_entity_records, self.parallel);
        write!(f, "{}", string)
    }
}

impl<T: Eq + Hash> From<EvalConfigBuilder<T>> for EvalConfig<T> {
    fn from(value: EvalConfigBuilder<T>) -> Self {
        Self {
            special_tags: value.special_tags,
            null_tag: value.null_tag,
            eos_tag: value.eos_tag,
            padding_char: value.padding_char,
            max_entity_records: value.max_entity_records,
            parallel: value.parallel,
        }
    }
}

/// This builder can be used to build and customize an `EvalConfig` stucture.
pub struct EvalConfigBuilder<T: Eq + Hash> {
    special_tags: TagSet<T>,
    null_tag: T,
    eos_tag: T,
    padding_char: char,
    max_entity_records: usize,
    parallel: bool,
}

impl Default for EvalConfigBuilder<&'static str> {
    fn default() -> Self {
        Self::new(DEFAULT_NULL_TAG, DEFAULT_EOS_TAG).special_tags(DEFAULT_SPECIAL_TAGS)
    }
}

impl<T: Eq + Hash> EvalConfigBuilder<T> {
    /// Starts a builder without any special tag. The null tag and the end-of-sentence tag have no
    /// sensible default for arbitrary tag types.
    pub fn new(null_tag: T, eos_tag: T) -> Self {
        Self {
            special_tags: TagSet::default(),
            null_tag,
            eos_tag,
            padding_char: DEFAULT_PADDING_CHAR,
            max_entity_records: DEFAULT_MAX_ENTITY_RECORDS,
            parallel: false,
        }
    }
    /// Replaces the special tags.
    pub fn special_tags<I: IntoIterator<Item = T>>(mut self, special_tags: I) -> Self {
        self.special_tags = special_tags.into_iter().collect();
        self
    }
    pub fn null_tag(mut self, null_tag: T) -> Self {
        self.null_tag = null_tag;
        self
    }
    pub fn eos_tag(mut self, eos_tag: T) -> Self {
        self.eos_tag = eos_tag;
        self
    }
    pub fn padding_char(mut self, padding_char: char) -> Self {
        self.padding_char = padding_char;
        self
    }
    pub fn max_entity_records(mut self, max_entity_records: usize) -> Self {
        self.max_entity_records = max_entity_records;
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
    pub fn build(self) -> EvalConfig<T> {
        EvalConfig::from(self)
    }
}
