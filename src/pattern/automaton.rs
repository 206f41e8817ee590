//! Bounded nondeterministic matching over a byte window.
//!
//! Live positions are kept in a bitset of `data.len() + 1` slots. Literals and
//! wildcards move every live position at once; gaps widen the set with a
//! single sliding pass, so a step costs O(window) whatever the gap bounds are.
//! Positions are boundaries between bytes: position `p` sits just before
//! `data[p]`.

use super::Segment;
use fixedbitset::FixedBitSet;

/// Scan direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Live positions are pattern starts, the result is the set of ends
    Forward,
    /// Live positions are pattern ends, the result is the set of starts
    Backward,
}

/// Run `segments` over `data` from every position in `live`.
///
/// Returns the set of positions reachable after the last segment (in the
/// direction of travel). The input set is consumed.
pub(crate) fn run(
    segments: &[Segment],
    data: &[u8],
    mut live: FixedBitSet,
    direction: Direction,
) -> FixedBitSet {
    let mut next = FixedBitSet::with_capacity(data.len() + 1);

    let step = |segment: &Segment, live: &FixedBitSet, next: &mut FixedBitSet| {
        next.clear();
        match (segment, direction) {
            (Segment::Literal(lit), Direction::Forward) => {
                for p in live.ones() {
                    let end = p + lit.len();
                    if end <= data.len() && data[p..end] == lit[..] {
                        next.insert(end);
                    }
                }
            },
            (Segment::Literal(lit), Direction::Backward) => {
                for p in live.ones() {
                    if p >= lit.len() && data[p - lit.len()..p] == lit[..] {
                        next.insert(p - lit.len());
                    }
                }
            },
            (Segment::Any, Direction::Forward) => {
                for p in live.ones() {
                    if p < data.len() {
                        next.insert(p + 1);
                    }
                }
            },
            (Segment::Any, Direction::Backward) => {
                for p in live.ones() {
                    if p > 0 {
                        next.insert(p - 1);
                    }
                }
            },
            (Segment::Gap { min, max }, Direction::Forward) => {
                expand_forward(live, next, *min, *max, data.len());
            },
            (Segment::Gap { min, max }, Direction::Backward) => {
                expand_backward(live, next, *min, *max, data.len());
            },
        }
    };

    match direction {
        Direction::Forward => {
            for segment in segments {
                step(segment, &live, &mut next);
                std::mem::swap(&mut live, &mut next);
                if live.is_clear() {
                    break;
                }
            }
        },
        Direction::Backward => {
            for segment in segments.iter().rev() {
                step(segment, &live, &mut next);
                std::mem::swap(&mut live, &mut next);
                if live.is_clear() {
                    break;
                }
            }
        },
    }
    live
}

/// q is reachable iff some live p satisfies `p + min <= q <= p + max`.
fn expand_forward(
    live: &FixedBitSet,
    next: &mut FixedBitSet,
    min: usize,
    max: Option<usize>,
    len: usize,
) {
    let mut nearest: Option<usize> = None;
    for q in min..=len {
        if live.contains(q - min) {
            nearest = Some(q - min);
        }
        match (nearest, max) {
            (Some(p), Some(max)) if q - p <= max => next.insert(q),
            (Some(_), None) => next.insert(q),
            _ => {},
        }
    }
}

/// q is reachable iff some live p satisfies `p - max <= q <= p - min`.
fn expand_backward(
    live: &FixedBitSet,
    next: &mut FixedBitSet,
    min: usize,
    max: Option<usize>,
    len: usize,
) {
    if min > len {
        return;
    }
    let mut nearest: Option<usize> = None;
    for q in (0..=len - min).rev() {
        if live.contains(q + min) {
            nearest = Some(q + min);
        }
        match (nearest, max) {
            (Some(p), Some(max)) if p - q <= max => next.insert(q),
            (Some(_), None) => next.insert(q),
            _ => {},
        }
    }
}

/// Bitset over `len + 1` positions with `range` set, clamped to the window.
pub(crate) fn positions(len: usize, lo: usize, hi: usize) -> FixedBitSet {
    let mut set = FixedBitSet::with_capacity(len + 1);
    if lo <= hi && lo <= len {
        set.insert_range(lo..hi.min(len) + 1);
    }
    set
}

/// Bitset over `len + 1` positions with only `p` set.
pub(crate) fn single(len: usize, p: usize) -> FixedBitSet {
    let mut set = FixedBitSet::with_capacity(len + 1);
    set.insert(p);
    set
}
