//! Name-Splitter: decomposes a pivoted column header into derived fields.
//!
//! A header is split either by a separator (literal, regex, or character
//! positions) or by a pattern with one capture group per entry of
//! `names_to`. Entries of `names_to` are tagged:
//!
//! - [`NameField::Field`] - an ordinary derived column
//! - [`NameField::Value`] - the `.value` sentinel: the piece names a value column
//! - [`NameField::Skip`] - the piece is discarded
//!
//! ```text
//! header "dob_child1", names_sep "_", names_to [.value, child]
//!        ├── "dob"    → value column name
//!        └── "child1" → field "child"
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ReshapeError, ReshapeResult};

/// The sentinel string recognised in `names_to` when parsing recipes.
pub const VALUE_SENTINEL: &str = ".value";

// =============================================================================
// names_to entries
// =============================================================================

/// One entry of `names_to`.
///
/// Serialized as a plain string (`".value"` for [`NameField::Value`]) or
/// `null` for [`NameField::Skip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum NameField {
    Field(String),
    Value,
    Skip,
}

impl From<Option<String>> for NameField {
    fn from(raw: Option<String>) -> Self {
        match raw {
            None => NameField::Skip,
            Some(s) if s == VALUE_SENTINEL => NameField::Value,
            Some(s) => NameField::Field(s),
        }
    }
}

impl From<NameField> for Option<String> {
    fn from(field: NameField) -> Self {
        match field {
            NameField::Field(s) => Some(s),
            NameField::Value => Some(VALUE_SENTINEL.to_string()),
            NameField::Skip => None,
        }
    }
}

impl From<&str> for NameField {
    fn from(s: &str) -> Self {
        NameField::from(Some(s.to_string()))
    }
}

impl From<String> for NameField {
    fn from(s: String) -> Self {
        NameField::from(Some(s))
    }
}

// =============================================================================
// Separator
// =============================================================================

/// How `names_sep` splits a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Separator {
    /// Split on every occurrence of a literal string.
    Literal(String),
    /// Split at these character offsets (strictly increasing).
    Positions(Vec<usize>),
    /// Split on every match of a regular expression.
    Pattern { pattern: String },
}

impl From<&str> for Separator {
    fn from(s: &str) -> Self {
        Separator::Literal(s.to_string())
    }
}

// =============================================================================
// Splitter
// =============================================================================

#[derive(Debug, Clone)]
enum SplitMode {
    Verbatim,
    Literal(String),
    Positions(Vec<usize>),
    SepPattern(Regex),
    Capture(Regex),
}

/// Result of splitting one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitName {
    /// `(field name, piece)` for every [`NameField::Field`], in `names_to` order.
    pub fields: Vec<(String, String)>,
    /// Piece at the `.value` position, if `names_to` has one.
    pub value_name: Option<String>,
}

/// A validated, compiled Name-Splitter.
#[derive(Debug, Clone)]
pub struct NameSplitter {
    names_to: Vec<NameField>,
    mode: SplitMode,
    prefix: Option<String>,
}

impl NameSplitter {
    /// Validates the argument combination and compiles any pattern.
    pub fn new(
        names_to: &[NameField],
        names_sep: Option<&Separator>,
        names_pattern: Option<&str>,
        names_prefix: Option<&str>,
    ) -> ReshapeResult<Self> {
        if names_to.is_empty() {
            return Err(ReshapeError::ConflictingArguments(
                "names_to must have at least one entry".into(),
            ));
        }
        if names_to.iter().filter(|f| **f == NameField::Value).count() > 1 {
            return Err(ReshapeError::ConflictingArguments(format!(
                "names_to may contain '{}' at most once",
                VALUE_SENTINEL
            )));
        }

        let mode = match (names_sep, names_pattern) {
            (Some(_), Some(_)) => {
                return Err(ReshapeError::ConflictingArguments(
                    "names_sep and names_pattern are mutually exclusive".into(),
                ))
            }
            (None, None) if names_to.len() > 1 => {
                return Err(ReshapeError::ConflictingArguments(format!(
                    "names_to has {} entries: names_sep or names_pattern is required",
                    names_to.len()
                )))
            }
            (None, None) => SplitMode::Verbatim,
            (Some(sep), None) => compile_separator(sep, names_to.len())?,
            (None, Some(pattern)) => {
                let re = Regex::new(pattern)?;
                let groups = re.captures_len() - 1;
                if groups != names_to.len() {
                    return Err(ReshapeError::PatternMismatch(format!(
                        "pattern '{}' has {} capture group(s) but names_to has {} entries",
                        pattern,
                        groups,
                        names_to.len()
                    )));
                }
                SplitMode::Capture(re)
            }
        };

        Ok(Self {
            names_to: names_to.to_vec(),
            mode,
            prefix: names_prefix.filter(|p| !p.is_empty()).map(str::to_string),
        })
    }

    /// Whether `names_to` contains the `.value` sentinel.
    pub fn has_value_field(&self) -> bool {
        self.names_to.contains(&NameField::Value)
    }

    /// Names of the ordinary derived fields, in declared order.
    pub fn field_names(&self) -> Vec<&str> {
        self.names_to
            .iter()
            .filter_map(|f| match f {
                NameField::Field(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Splits one header.
    pub fn split(&self, header: &str) -> ReshapeResult<SplitName> {
        let text = match &self.prefix {
            Some(prefix) => header.strip_prefix(prefix.as_str()).unwrap_or(header),
            None => header,
        };

        // Separators split into at most `names_to.len()` pieces; the last
        // piece keeps any remaining separators.
        let n = self.names_to.len();
        let pieces: Vec<String> = match &self.mode {
            SplitMode::Verbatim => vec![text.to_string()],
            SplitMode::Literal(sep) => text.splitn(n, sep.as_str()).map(str::to_string).collect(),
            SplitMode::SepPattern(re) => re.splitn(text, n).map(str::to_string).collect(),
            SplitMode::Positions(cuts) => split_at_positions(text, cuts),
            SplitMode::Capture(re) => {
                let caps = re.captures(text).ok_or_else(|| {
                    ReshapeError::PatternMismatch(format!(
                        "pattern '{}' does not match header '{}'",
                        re.as_str(),
                        header
                    ))
                })?;
                caps.iter()
                    .skip(1)
                    .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                    .collect()
            }
        };

        if pieces.len() < n {
            return Err(ReshapeError::ShapeMismatch {
                header: header.to_string(),
                expected: n,
                found: pieces.len(),
            });
        }

        let mut split = SplitName {
            fields: Vec::new(),
            value_name: None,
        };
        for (field, piece) in self.names_to.iter().zip(pieces) {
            match field {
                NameField::Field(name) => split.fields.push((name.clone(), piece)),
                NameField::Value => split.value_name = Some(piece),
                NameField::Skip => {}
            }
        }
        Ok(split)
    }
}

fn compile_separator(sep: &Separator, expected: usize) -> ReshapeResult<SplitMode> {
    match sep {
        Separator::Literal(s) if s.is_empty() => Err(ReshapeError::ConflictingArguments(
            "names_sep must not be empty".into(),
        )),
        Separator::Literal(s) => Ok(SplitMode::Literal(s.clone())),
        Separator::Pattern { pattern } => Ok(SplitMode::SepPattern(Regex::new(pattern)?)),
        Separator::Positions(cuts) => {
            if cuts.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ReshapeError::ConflictingArguments(
                    "names_sep positions must be strictly increasing".into(),
                ));
            }
            if cuts.len() + 1 != expected {
                return Err(ReshapeError::ConflictingArguments(format!(
                    "{} split position(s) give {} pieces but names_to has {} entries",
                    cuts.len(),
                    cuts.len() + 1,
                    expected
                )));
            }
            Ok(SplitMode::Positions(cuts.clone()))
        }
    }
}

/// Splits at character offsets; offsets past the end yield empty pieces.
fn split_at_positions(text: &str, cuts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for &cut in cuts {
        let end = cut.min(chars.len());
        let begin = start.min(end);
        pieces.push(chars[begin..end].iter().collect());
        start = end;
    }
    pieces.push(chars[start.min(chars.len())..].iter().collect());
    pieces
}
