/**
Helpers used while annotating raw records: tagging the occurrences of a keyword, extracting the
keywords back from a tagged record and splitting tagged pages into sentences.
*/
use crate::config::EvalConfig;
use std::error::Error;
use std::fmt::Display;
use std::hash::Hash;

/// Error raised when a character already bearing a tag (other than the null tag) is tagged a
/// second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateTagError {
    /// Position of the character, counted in characters.
    pub position: usize,
}

impl Display for DuplicateTagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Same char cannot bear more than one tag (character at position {})",
            self.position
        )
    }
}
impl Error for DuplicateTagError {}

/// Converts a string coming from the database to the original text, where the spaces were
/// replaced by a padding character.
pub fn convert_to_orig(s: &str, padding_char: char) -> String {
    s.replace(' ', &padding_char.to_string())
}

/// Is the cell missing or empty?
pub fn is_empty_cell(cell: Option<&str>) -> bool {
    cell.map_or(true, str::is_empty)
}

/// Tags every occurrence of `keyword` in `text` with `tagname`. The keyword is converted with
/// `convert_to_orig` first and matched literally. Occurrences do not overlap.
///
/// Nothing is done if the keyword is empty, if it is not part of the text or if the text and the
/// tags do not have the same number of characters. If a character of an occurrence already bears
/// a tag other than the null tag, an error is returned and `tag_seq` is left untouched.
///
/// * `text`: Original text
/// * `tag_seq`: Tags of the text, one per character
/// * `keyword`: Keyword to tag, possibly missing
/// * `tagname`: Tag given to the characters of the keyword
/// * `config`: Null tag and padding character
pub fn modify_tag_seq<T>(
    text: &str,
    tag_seq: &mut [T],
    keyword: Option<&str>,
    tagname: &T,
    config: &EvalConfig<T>,
) -> Result<(), DuplicateTagError>
where
    T: Eq + Hash + Clone,
{
    let keyword = match keyword {
        Some(k) if !is_empty_cell(keyword) => k,
        _ => return Ok(()),
    };
    let keyword = convert_to_orig(keyword, config.padding_char());
    if text.chars().count() != tag_seq.len() {
        return Ok(());
    }
    let keyword_len = keyword.chars().count();
    let mut char_offset = 0;
    let mut byte_offset = 0;
    let mut starts = vec![];
    for (byte_start, _) in text.match_indices(keyword.as_str()) {
        char_offset += text[byte_offset..byte_start].chars().count();
        byte_offset = byte_start;
        starts.push(char_offset);
    }
    for &start in starts.iter() {
        if let Some(position) =
            (start..start + keyword_len).find(|&i| tag_seq[i] != *config.null_tag())
        {
            return Err(DuplicateTagError { position });
        }
    }
    for start in starts {
        tag_seq[start..start + keyword_len].fill(tagname.clone());
    }
    Ok(())
}

/// A character of a record and its tag.
pub trait CharSample {
    type Tag: PartialEq;
    fn get_char(&self) -> char;
    fn get_tag(&self) -> &Self::Tag;
}

impl<T: PartialEq> CharSample for (char, T) {
    type Tag = T;
    fn get_char(&self) -> char {
        self.0
    }
    fn get_tag(&self) -> &T {
        &self.1
    }
}

/// Collects the maximal runs of characters tagged with `tag_name`, in order of appearance.
pub fn get_keywords_from_tagged_record<C: CharSample>(
    char_samples: &[C],
    tag_name: &C::Tag,
) -> Vec<String> {
    let mut res = vec![];
    let mut current_keyword = String::new();
    for cs in char_samples {
        if cs.get_tag() == tag_name {
            current_keyword.push(cs.get_char());
        } else if !current_keyword.is_empty() {
            res.push(std::mem::take(&mut current_keyword));
        }
    }
    // The last keyword can end the record
    if !current_keyword.is_empty() {
        res.push(current_keyword);
    }
    res
}

/// Splits every page into sentences and returns their lengths. A sentence ends with `eos_tag`.
/// The first and the last tags of a page (the boundary markers) are not counted. A trailing
/// sentence without `eos_tag` is kept.
pub fn get_sent_len_for_pages<T, S>(tag_seq_list: &[S], eos_tag: &T) -> Vec<Vec<usize>>
where
    T: PartialEq,
    S: AsRef<[T]>,
{
    tag_seq_list
        .iter()
        .map(|tag_seq| {
            let tag_seq = tag_seq.as_ref();
            let inner = tag_seq
                .get(1..tag_seq.len().saturating_sub(1))
                .unwrap_or(&[]);
            let mut lengths = vec![];
            let mut current_len = 0;
            for tag in inner {
                current_len += 1;
                if tag == eos_tag {
                    lengths.push(current_len);
                    current_len = 0;
                }
            }
            if current_len > 0 {
                lengths.push(current_len);
            }
            lengths
        })
        .collect()
}
