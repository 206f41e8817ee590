//! Pattern segment definitions.

use std::fmt;

/// One element of a [`Pattern`](super::Pattern).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Fixed byte sequence
    Literal(Vec<u8>),
    /// Exactly one byte of any value
    Any,
    /// Run of unconstrained bytes; `max == None` means unbounded
    Gap { min: usize, max: Option<usize> },
}

impl Segment {
    /// Literal segment from raw bytes.
    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Segment::Literal(bytes.into())
    }

    /// Gap of exactly `len` bytes.
    pub fn exact_gap(len: usize) -> Self {
        Segment::Gap {
            min: len,
            max: Some(len),
        }
    }

    /// Gap of `min..=max` bytes.
    pub fn gap(min: usize, max: usize) -> Self {
        Segment::Gap {
            min,
            max: Some(max),
        }
    }

    /// Gap of at least `min` bytes with no upper bound.
    pub fn unbounded_gap(min: usize) -> Self {
        Segment::Gap { min, max: None }
    }

    /// Minimum number of bytes this segment consumes.
    #[inline]
    pub fn min_len(&self) -> usize {
        match self {
            Segment::Literal(bytes) => bytes.len(),
            Segment::Any => 1,
            Segment::Gap { min, .. } => *min,
        }
    }

    /// Maximum number of bytes this segment consumes, `None` if unbounded.
    #[inline]
    pub fn max_len(&self) -> Option<usize> {
        match self {
            Segment::Literal(bytes) => Some(bytes.len()),
            Segment::Any => Some(1),
            Segment::Gap { max, .. } => *max,
        }
    }

    /// Number of bytes whose position is pinned by this segment.
    #[inline]
    pub fn fixed_len(&self) -> usize {
        match self {
            Segment::Literal(bytes) => bytes.len(),
            Segment::Any => 1,
            Segment::Gap { .. } => 0,
        }
    }

    #[inline]
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Segment::Gap { max: None, .. })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(bytes) => {
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            },
            Segment::Any => f.write_str("??"),
            Segment::Gap { min, max: Some(max) } if min == max => write!(f, "{{{min}}}"),
            Segment::Gap { min, max: Some(max) } => write!(f, "{{{min}-{max}}}"),
            Segment::Gap { min: 0, max: None } => f.write_str("*"),
            Segment::Gap { min, max: None } => write!(f, "{{{min}-*}}"),
        }
    }
}
