//! Scenario files: initial segments plus a list of mutation steps.
//!
//! ```toml
//! name = "demo"
//! segments = [["a", "b"], ["c"]]
//!
//! [[steps]]
//! op = "push"
//! segment = 1
//! value = "d"
//!
//! [[steps]]
//! op = "swap_segments"
//! a = 0
//! b = 1
//! ```
//!
//! Segment numbers always refer to current outer positions.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use livelist_core::{LiveListError, Sequence, SourceOfSequences};
use serde::{Deserialize, Serialize};

/// Element type of scenario lists.
pub type Item = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Used as the view name in logs and output.
    pub name: Option<String>,
    /// Initial contents, one list per segment.
    pub segments: Vec<Vec<Item>>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("parse scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("scenario")
    }

    /// A fresh source holding the initial segments.
    pub fn build_source(&self) -> SourceOfSequences<Item> {
        self.segments
            .iter()
            .map(|items| Sequence::from(items.clone()))
            .collect()
    }
}

/// One mutation of a segment or of the list of segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Push {
        segment: usize,
        value: Item,
    },
    Insert {
        segment: usize,
        index: usize,
        value: Item,
    },
    Remove {
        segment: usize,
        index: usize,
    },
    Set {
        segment: usize,
        index: usize,
        value: Item,
    },
    Splice {
        segment: usize,
        from: usize,
        to: usize,
        #[serde(default)]
        values: Vec<Item>,
    },
    Reverse {
        segment: usize,
    },
    Sort {
        segment: usize,
    },
    InsertSegment {
        at: usize,
        #[serde(default)]
        values: Vec<Item>,
    },
    RemoveSegment {
        at: usize,
    },
    ReplaceSegment {
        at: usize,
        #[serde(default)]
        values: Vec<Item>,
    },
    SwapSegments {
        a: usize,
        b: usize,
    },
    ReverseSegments,
}

impl Step {
    /// Apply this step to `source` or one of its segments.
    pub fn apply(&self, source: &SourceOfSequences<Item>) -> livelist_core::Result<()> {
        match self {
            Self::Push { segment, value } => segment_at(source, *segment)?.push(value.clone()),
            Self::Insert {
                segment,
                index,
                value,
            } => segment_at(source, *segment)?.insert(*index, value.clone()),
            Self::Remove { segment, index } => {
                segment_at(source, *segment)?.remove(*index).map(drop)
            }
            Self::Set {
                segment,
                index,
                value,
            } => segment_at(source, *segment)?
                .set(*index, value.clone())
                .map(drop),
            Self::Splice {
                segment,
                from,
                to,
                values,
            } => segment_at(source, *segment)?
                .splice(*from..*to, values.iter().cloned())
                .map(drop),
            Self::Reverse { segment } => segment_at(source, *segment)?.reverse(),
            Self::Sort { segment } => segment_at(source, *segment)?.sort(),
            Self::InsertSegment { at, values } => {
                source.insert(*at, Sequence::from(values.clone()))
            }
            Self::RemoveSegment { at } => source.remove(*at).map(drop),
            Self::ReplaceSegment { at, values } => source
                .set(*at, Sequence::from(values.clone()))
                .map(drop),
            Self::SwapSegments { a, b } => source.swap(*a, *b),
            Self::ReverseSegments => source.reverse(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push { segment, value } => write!(f, "push {value:?} onto segment {segment}"),
            Self::Insert {
                segment,
                index,
                value,
            } => write!(f, "insert {value:?} at {segment}:{index}"),
            Self::Remove { segment, index } => write!(f, "remove {segment}:{index}"),
            Self::Set {
                segment,
                index,
                value,
            } => write!(f, "set {segment}:{index} to {value:?}"),
            Self::Splice {
                segment,
                from,
                to,
                values,
            } => write!(f, "splice {segment}:{from}..{to} with {values:?}"),
            Self::Reverse { segment } => write!(f, "reverse segment {segment}"),
            Self::Sort { segment } => write!(f, "sort segment {segment}"),
            Self::InsertSegment { at, values } => write!(f, "insert segment {values:?} at {at}"),
            Self::RemoveSegment { at } => write!(f, "remove segment {at}"),
            Self::ReplaceSegment { at, values } => {
                write!(f, "replace segment {at} with {values:?}")
            }
            Self::SwapSegments { a, b } => write!(f, "swap segments {a} and {b}"),
            Self::ReverseSegments => f.write_str("reverse segments"),
        }
    }
}

fn segment_at(
    source: &SourceOfSequences<Item>,
    position: usize,
) -> livelist_core::Result<Sequence<Item>> {
    source
        .get(position)
        .ok_or_else(|| LiveListError::out_of_range(position, source.len()))
}
