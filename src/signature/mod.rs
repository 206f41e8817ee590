//! Anchored signatures.
//!
//! A [`Signature`] is an ordered list of [`SubSignature`]s, each a
//! [`Pattern`] tied to an [`Anchor`]. Offsets chain the way DROID byte
//! sequences do:
//!
//! - the first `Bof` sub-signature is measured from the first byte of the
//!   stream to the start of the match, every following `Bof` sub-signature
//!   from the end of the previous one;
//! - the first `Eof` sub-signature is measured backwards from the end of the
//!   stream to the end of the match, every following one from the start of
//!   the previous `Eof` match;
//! - `Var` sub-signatures float in the region between the last `Bof` match and
//!   the innermost `Eof` match, each measured from the end of the previous
//!   `Var` match.
//!
//! Offsets are `min..=max` search windows; `max == None` leaves the window
//! open up to the buffered region.

mod matching;

pub use matching::Extents;

use crate::common::{Error, Result};
use crate::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positional constraint for a sub-signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Offset from the beginning of the stream
    Bof,
    /// Offset from the end of the stream
    Eof,
    /// Anywhere between the anchored parts
    Var,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Anchor::Bof => "BOF",
            Anchor::Eof => "EOF",
            Anchor::Var => "VAR",
        })
    }
}

/// Byte range of a matched sub-signature, in absolute stream offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Extent {
    pub offset: u64,
    pub len: u64,
}

impl Extent {
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.offset, self.end())
    }
}

/// A pattern with its anchor and search window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubSignature {
    pattern: Pattern,
    anchor: Anchor,
    min_offset: usize,
    max_offset: Option<usize>,
}

impl SubSignature {
    /// Pattern that must start exactly at the anchor point after the
    /// preceding BOF match (or the first byte).
    pub fn bof(pattern: Pattern) -> Self {
        Self {
            pattern,
            anchor: Anchor::Bof,
            min_offset: 0,
            max_offset: Some(0),
        }
    }

    /// Pattern that must end exactly at the end of stream (or at the start of
    /// the preceding EOF match).
    pub fn eof(pattern: Pattern) -> Self {
        Self {
            pattern,
            anchor: Anchor::Eof,
            min_offset: 0,
            max_offset: Some(0),
        }
    }

    /// Floating pattern.
    pub fn var(pattern: Pattern) -> Self {
        Self {
            pattern,
            anchor: Anchor::Var,
            min_offset: 0,
            max_offset: None,
        }
    }

    /// Pin the offset to exactly `offset`.
    pub fn at(mut self, offset: usize) -> Self {
        self.min_offset = offset;
        self.max_offset = Some(offset);
        self
    }

    /// Allow any offset in `min..=max`.
    pub fn within(mut self, min: usize, max: usize) -> Self {
        self.min_offset = min;
        self.max_offset = Some(max);
        self
    }

    /// Allow any offset from `min` up to the end of the buffered region.
    pub fn from_offset(mut self, min: usize) -> Self {
        self.min_offset = min;
        self.max_offset = None;
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn min_offset(&self) -> usize {
        self.min_offset
    }

    pub fn max_offset(&self) -> Option<usize> {
        self.max_offset
    }

    /// Bytes from the anchor point to the far end of the match, `None` if
    /// unbounded.
    fn reach(&self) -> Option<usize> {
        Some(self.max_offset? + self.pattern.max_len()?)
    }

    fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_offset
            && max < self.min_offset
        {
            return Err(Error::InvalidSignature(format!(
                "{} pattern {} has offset window {}..={}",
                self.anchor, self.pattern, self.min_offset, max
            )));
        }
        let misplaced_gap = match self.anchor {
            Anchor::Bof => self.pattern.has_unbounded_except_last(),
            Anchor::Eof => self.pattern.has_unbounded_except_first(),
            Anchor::Var => self.pattern.max_len().is_none(),
        };
        if misplaced_gap {
            return Err(Error::InvalidSignature(format!(
                "{} pattern {} has an unbounded gap in a position its anchor cannot scan",
                self.anchor, self.pattern
            )));
        }
        Ok(())
    }
}

/// How far into the stream from one end a signature needs to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Reach {
    /// The signature does not look at this end
    #[default]
    None,
    /// Bounded by the declared offsets and pattern lengths
    Bounded(usize),
    /// Limited only by the configured window cap
    Unbounded,
}

impl Reach {
    /// Combine two requirements, keeping the larger.
    pub fn max(self, other: Reach) -> Reach {
        match (self, other) {
            (Reach::Unbounded, _) | (_, Reach::Unbounded) => Reach::Unbounded,
            (Reach::Bounded(a), Reach::Bounded(b)) => Reach::Bounded(a.max(b)),
            (Reach::Bounded(a), Reach::None) | (Reach::None, Reach::Bounded(a)) => {
                Reach::Bounded(a)
            },
            (Reach::None, Reach::None) => Reach::None,
        }
    }

    /// Bytes to buffer under `cap` for unbounded requirements.
    pub fn resolve(self, cap: usize) -> usize {
        match self {
            Reach::None => 0,
            Reach::Bounded(n) => n,
            Reach::Unbounded => cap,
        }
    }
}

/// A complete, validated signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    subs: Vec<SubSignature>,
    specificity: usize,
    bof_reach: Reach,
    eof_reach: Reach,
    floating: bool,
}

impl Signature {
    /// Validate and freeze a list of sub-signatures.
    pub fn new(subs: impl IntoIterator<Item = SubSignature>) -> Result<Self> {
        let subs: Vec<SubSignature> = subs.into_iter().collect();
        if subs.is_empty() {
            return Err(Error::InvalidSignature(
                "signature has no sub-signatures".to_string(),
            ));
        }
        for sub in &subs {
            sub.validate()?;
        }

        let reach_of = |anchor: Anchor| {
            subs.iter()
                .filter(|s| s.anchor == anchor)
                .try_fold(None::<usize>, |acc, s| {
                    s.reach().map(|r| Some(acc.unwrap_or(0) + r))
                })
                .map_or(Reach::Unbounded, |r| r.map_or(Reach::None, Reach::Bounded))
        };

        Ok(Self {
            specificity: subs.iter().map(|s| s.pattern.specificity()).sum(),
            bof_reach: reach_of(Anchor::Bof),
            eof_reach: reach_of(Anchor::Eof),
            floating: subs.iter().any(|s| s.anchor == Anchor::Var),
            subs,
        })
    }

    /// Single BOF pattern at offset zero.
    pub fn bof(notation: &str) -> Result<Self> {
        Self::new([SubSignature::bof(Pattern::parse(notation)?)])
    }

    /// Single floating pattern.
    pub fn var(notation: &str) -> Result<Self> {
        Self::new([SubSignature::var(Pattern::parse(notation)?)])
    }

    pub fn subs(&self) -> &[SubSignature] {
        &self.subs
    }

    /// Number of pinned bytes across all sub-signatures.
    pub fn specificity(&self) -> usize {
        self.specificity
    }

    pub fn bof_reach(&self) -> Reach {
        self.bof_reach
    }

    pub fn eof_reach(&self) -> Reach {
        self.eof_reach
    }

    /// True if any sub-signature floats.
    pub fn is_floating(&self) -> bool {
        self.floating
    }
}
