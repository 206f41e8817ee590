//! Byte patterns.
//!
//! A [`Pattern`] is a non-empty, ordered list of [`Segment`]s: literal byte
//! runs, single-byte wildcards and gaps. Patterns know nothing about where in
//! a stream they may occur; anchoring is the job of
//! [`SubSignature`](crate::signature::SubSignature).
//!
//! # Example
//!
//! ```rust
//! use quince::pattern::Pattern;
//!
//! let pattern = Pattern::parse("FFD8FF{0-1024}3C68746D6C")?;
//! assert_eq!(pattern.min_len(), 8);
//! assert_eq!(pattern.max_len(), Some(1032));
//! assert_eq!(pattern.specificity(), 8);
//! # Ok::<(), quince::Error>(())
//! ```

pub(crate) mod automaton;
mod notation;
mod segment;

pub use segment::Segment;

use crate::common::{Error, Result};
use automaton::{Direction, positions, single};
use fixedbitset::FixedBitSet;
use std::fmt;

/// An immutable, validated byte pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    segments: Vec<Segment>,
    min_len: usize,
    max_len: Option<usize>,
    specificity: usize,
}

impl Pattern {
    /// Build a pattern from segments.
    ///
    /// Adjacent literals and adjacent gaps are merged and empty segments are
    /// dropped. The result must pin at least one byte.
    pub fn new(segments: impl IntoIterator<Item = Segment>) -> Result<Self> {
        let mut merged: Vec<Segment> = Vec::new();
        for segment in segments {
            match segment {
                Segment::Literal(ref bytes) if bytes.is_empty() => continue,
                Segment::Gap { min: 0, max: Some(0) } => continue,
                Segment::Gap { min, max: Some(max) } if min > max => {
                    return Err(Error::invalid_pattern(
                        format!("{{{min}-{max}}}"),
                        "gap minimum exceeds maximum",
                    ));
                },
                _ => {},
            }
            match (merged.last_mut(), &segment) {
                (Some(Segment::Literal(prev)), Segment::Literal(bytes)) => {
                    prev.extend_from_slice(bytes);
                    continue;
                },
                (Some(Segment::Gap { min: pmin, max: pmax }), Segment::Gap { min, max }) => {
                    *pmin += min;
                    *pmax = pmax.zip(*max).map(|(a, b)| a + b);
                    continue;
                },
                _ => {},
            }
            merged.push(segment);
        }

        let specificity: usize = merged.iter().map(Segment::fixed_len).sum();
        if specificity == 0 {
            let notation = merged.iter().map(ToString::to_string).collect::<String>();
            return Err(Error::invalid_pattern(notation, "pattern pins no bytes"));
        }

        let min_len = merged.iter().map(Segment::min_len).sum();
        let max_len = merged
            .iter()
            .try_fold(0usize, |acc, s| s.max_len().map(|m| acc + m));

        Ok(Self {
            segments: merged,
            min_len,
            max_len,
            specificity,
        })
    }

    /// Pattern matching exactly `bytes`.
    pub fn literal(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new([Segment::Literal(bytes.into())])
    }

    /// Parse hex notation such as `504B0304{26}6D696D6574797065`.
    pub fn parse(notation: &str) -> Result<Self> {
        let segments = notation::parse_segments(notation)?;
        Self::new(segments).map_err(|err| match err {
            Error::InvalidPattern { reason, .. } => Error::invalid_pattern(notation, reason),
            other => other,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Smallest number of bytes a match can span.
    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Largest number of bytes a match can span, `None` if unbounded.
    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    /// Number of pinned (literal or wildcard) bytes.
    pub fn specificity(&self) -> usize {
        self.specificity
    }

    /// Longest literal segment, used as a prefilter key.
    pub fn longest_literal(&self) -> Option<&[u8]> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .fold(None, |best: Option<&[u8]>, lit| match best {
                Some(b) if b.len() >= lit.len() => Some(b),
                _ => Some(lit),
            })
    }

    /// True if any gap other than the last segment is unbounded.
    pub(crate) fn has_unbounded_except_last(&self) -> bool {
        let n = self.segments.len();
        self.segments[..n.saturating_sub(1)]
            .iter()
            .any(Segment::is_unbounded)
    }

    /// True if any gap other than the first segment is unbounded.
    pub(crate) fn has_unbounded_except_first(&self) -> bool {
        self.segments.iter().skip(1).any(Segment::is_unbounded)
    }

    /// Run the pattern from every position in `live`, returning the set of
    /// positions where a match can finish.
    pub(crate) fn advance(&self, data: &[u8], live: FixedBitSet, direction: Direction) -> FixedBitSet {
        automaton::run(&self.segments, data, live, direction)
    }

    /// Earliest-ending match whose start lies in `lo..=hi`.
    ///
    /// Returns `(start, end)` indices into `data`.
    pub fn find_forward(&self, data: &[u8], lo: usize, hi: usize) -> Option<(usize, usize)> {
        if lo > data.len() {
            return None;
        }
        let starts = positions(data.len(), lo, hi);
        let ends = automaton::run(&self.segments, data, starts, Direction::Forward);
        let end = ends.ones().next()?;

        let from_end = single(data.len(), end);
        let starts = automaton::run(&self.segments, data, from_end, Direction::Backward);
        let start = starts.ones().find(|&s| s >= lo && s <= hi)?;
        Some((start, end))
    }

    /// Latest-starting match whose end lies in `lo..=hi`.
    ///
    /// Returns `(start, end)` indices into `data`.
    pub fn find_backward(&self, data: &[u8], lo: usize, hi: usize) -> Option<(usize, usize)> {
        if lo > data.len() {
            return None;
        }
        let ends = positions(data.len(), lo, hi);
        let starts = automaton::run(&self.segments, data, ends, Direction::Backward);
        let start = starts.ones().last()?;

        let from_start = single(data.len(), start);
        let ends = automaton::run(&self.segments, data, from_start, Direction::Forward);
        let end = ends.ones().filter(|&e| e >= lo && e <= hi).last()?;
        Some((start, end))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
