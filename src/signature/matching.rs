//! Evaluation of a signature against a buffered window.
//!
//! Chained sub-signatures of one anchor are matched as sets: every end
//! position a sub-signature can reach seeds the next one, so an early
//! choice never hides a later match. Extents are recovered by walking the
//! recorded sets backwards once the whole chain is known to match.

use super::{Anchor, Extent, Signature, SubSignature};
use crate::matcher::Window;
use crate::pattern::automaton::{Direction, single};
use fixedbitset::FixedBitSet;
use memchr::memmem;
use smallvec::SmallVec;

/// Extents of every sub-signature of a successful match.
pub type Extents = SmallVec<[Extent; 4]>;

/// Distance allowed between a sub-signature and the point it is measured
/// from.
#[derive(Debug, Clone, Copy)]
struct Step {
    min: u64,
    max: Option<u64>,
}

impl Step {
    fn fits(self, distance: u64) -> bool {
        distance >= self.min && self.max.is_none_or(|max| distance <= max)
    }
}

/// Positions entering and leaving one sub-signature.
struct Stage {
    entry: FixedBitSet,
    exit: FixedBitSet,
}

/// A buffered slice of the stream at absolute offset `base`.
struct Region<'a> {
    data: &'a [u8],
    base: u64,
}

impl Region<'_> {
    fn positions(&self) -> FixedBitSet {
        FixedBitSet::with_capacity(self.data.len() + 1)
    }
}

impl SubSignature {
    fn step(&self) -> Step {
        Step {
            min: self.min_offset as u64,
            max: self.max_offset.map(|max| max as u64),
        }
    }
}

impl Signature {
    /// Match the signature against `window`.
    ///
    /// `var_scan` bounds how far a floating sub-signature may start from
    /// either end of its region. Returns the extents of all sub-signatures
    /// ordered by offset, or `None` if any sub-signature fails.
    pub fn evaluate(&self, window: &Window, var_scan: usize) -> Option<Extents> {
        let mut extents = Extents::new();
        let bof_end = self.match_bof(window.head(), &mut extents)?;
        let eof_start = self.match_eof(window, bof_end, &mut extents)?;
        self.match_var(window, bof_end, eof_start, var_scan as u64, &mut extents)?;
        extents.sort_unstable();
        Some(extents)
    }

    fn anchored(&self, anchor: Anchor) -> SmallVec<[&SubSignature; 4]> {
        self.subs.iter().filter(|s| s.anchor == anchor).collect()
    }

    /// Returns the end of the BOF chain, zero if there is none.
    fn match_bof(&self, head: &[u8], extents: &mut Extents) -> Option<u64> {
        let subs = self.anchored(Anchor::Bof);
        if subs.is_empty() {
            return Some(0);
        }

        let mut stages: SmallVec<[Stage; 4]> = SmallVec::new();
        let mut live = single(head.len(), 0);
        for sub in &subs {
            let mut entry = FixedBitSet::with_capacity(head.len() + 1);
            spread(&live, 0, &mut entry, 0, sub.step(), 0, Direction::Forward);
            let exit = sub.pattern.advance(head, entry.clone(), Direction::Forward);
            if exit.is_clear() {
                return None;
            }
            live = exit.clone();
            stages.push(Stage { entry, exit });
        }

        // The earliest end leaves the most room for EOF and floating parts
        let bof_end = live.ones().next()?;
        let mut end = bof_end;
        for (i, sub) in subs.iter().enumerate().rev() {
            let starts = sub
                .pattern
                .advance(head, single(head.len(), end), Direction::Backward);
            let start = starts.ones().find(|&s| stages[i].entry.contains(s))?;
            extents.push(Extent::new(start as u64, (end - start) as u64));
            if i > 0 {
                end = stages[i - 1]
                    .exit
                    .ones()
                    .filter(|&e| e <= start && sub.step().fits((start - e) as u64))
                    .last()?;
            }
        }
        Some(bof_end as u64)
    }

    /// Returns the start of the EOF chain, the stream length if there is
    /// none.
    fn match_eof(&self, window: &Window, bof_end: u64, extents: &mut Extents) -> Option<u64> {
        let subs = self.anchored(Anchor::Eof);
        if subs.is_empty() {
            return Some(window.len());
        }

        let (tail, base) = window.tail();
        let mut stages: SmallVec<[Stage; 4]> = SmallVec::new();
        let mut live = single(tail.len(), tail.len());
        for sub in &subs {
            let mut entry = FixedBitSet::with_capacity(tail.len() + 1);
            spread(&live, base, &mut entry, base, sub.step(), 0, Direction::Backward);
            let exit = sub.pattern.advance(tail, entry.clone(), Direction::Backward);
            if exit.is_clear() {
                return None;
            }
            live = exit.clone();
            stages.push(Stage { entry, exit });
        }

        // EOF matches may not reach back into the BOF matches
        let eof_start = live.ones().filter(|&s| base + s as u64 >= bof_end).last()?;
        let mut start = eof_start;
        for (i, sub) in subs.iter().enumerate().rev() {
            let ends = sub
                .pattern
                .advance(tail, single(tail.len(), start), Direction::Forward);
            let end = ends.ones().filter(|&e| stages[i].entry.contains(e)).last()?;
            extents.push(Extent::new(base + start as u64, (end - start) as u64));
            if i > 0 {
                start = stages[i - 1]
                    .exit
                    .ones()
                    .find(|&s| s >= end && sub.step().fits((s - end) as u64))?;
            }
        }
        Some(base + eof_start as u64)
    }

    /// Match floating sub-signatures between `bof_end` and `limit`.
    ///
    /// A floating sub-signature may start up to `scan` bytes past the point
    /// it is measured from, or anywhere in the last `scan` bytes before
    /// `limit`. Matches never span the unbuffered middle of a stream.
    fn match_var(
        &self,
        window: &Window,
        bof_end: u64,
        limit: u64,
        scan: u64,
        extents: &mut Extents,
    ) -> Option<()> {
        let subs = self.anchored(Anchor::Var);
        if subs.is_empty() {
            return Some(());
        }

        let head = window.head();
        let mut regions: SmallVec<[Region<'_>; 2]> = SmallVec::new();
        regions.push(Region {
            data: &head[..head.len().min(limit as usize)],
            base: 0,
        });
        if !window.is_complete() {
            let (tail, base) = window.tail();
            if base <= limit {
                regions.push(Region {
                    data: &tail[..tail.len().min((limit - base) as usize)],
                    base,
                });
            }
        }
        let floor = limit.saturating_sub(scan);

        let mut stages: SmallVec<[SmallVec<[Stage; 2]>; 4]> = SmallVec::new();
        let mut live: SmallVec<[FixedBitSet; 2]> = regions.iter().map(Region::positions).collect();
        live[0].insert(bof_end as usize);
        for sub in &subs {
            let far = sub.step();
            let near = Step {
                min: far.min,
                max: Some(far.max.unwrap_or(u64::MAX).min(far.min.saturating_add(scan))),
            };

            let mut stage: SmallVec<[Stage; 2]> = SmallVec::new();
            for region in &regions {
                let mut entry = region.positions();
                for (from, source) in live.iter().zip(&regions) {
                    spread(from, source.base, &mut entry, region.base, near, 0, Direction::Forward);
                    spread(from, source.base, &mut entry, region.base, far, floor, Direction::Forward);
                }
                let present = sub
                    .pattern
                    .longest_literal()
                    .is_none_or(|literal| memmem::find(region.data, literal).is_some());
                let exit = if present && !entry.is_clear() {
                    sub.pattern.advance(region.data, entry.clone(), Direction::Forward)
                } else {
                    region.positions()
                };
                stage.push(Stage { entry, exit });
            }
            if stage.iter().all(|s| s.exit.is_clear()) {
                return None;
            }
            live = stage.iter().map(|s| s.exit.clone()).collect();
            stages.push(stage);
        }

        let (mut at, first_end) = stages
            .last()?
            .iter()
            .enumerate()
            .find_map(|(r, s)| s.exit.ones().next().map(|e| (r, e)))?;
        let mut end = first_end;
        for (i, sub) in subs.iter().enumerate().rev() {
            let region = &regions[at];
            let starts = sub.pattern.advance(
                region.data,
                single(region.data.len(), end),
                Direction::Backward,
            );
            let start = starts.ones().find(|&s| stages[i][at].entry.contains(s))?;
            let start_abs = region.base + start as u64;
            extents.push(Extent::new(start_abs, (end - start) as u64));
            if i > 0 {
                let far = sub.step();
                let links = |e: u64| {
                    e <= start_abs && {
                        let distance = start_abs - e;
                        far.fits(distance) && (distance <= far.min.saturating_add(scan) || start_abs >= floor)
                    }
                };
                (at, end) = stages[i - 1]
                    .iter()
                    .enumerate()
                    .rev()
                    .find_map(|(r, s)| {
                        s.exit
                            .ones()
                            .filter(|&e| links(regions[r].base + e as u64))
                            .last()
                            .map(|e| (r, e))
                    })?;
            }
        }
        Some(())
    }
}

/// Mark in `to` every position `step` away from a position in `from`,
/// moving in `direction` and never below the absolute offset `floor`.
///
/// Both sets are region-local with the given absolute bases. The reachable
/// positions form intervals ordered by their start, so they are merged as
/// they are produced and each set is walked once.
fn spread(
    from: &FixedBitSet,
    from_base: u64,
    to: &mut FixedBitSet,
    to_base: u64,
    step: Step,
    floor: u64,
    direction: Direction,
) {
    let mut pending: Option<(u64, u64)> = None;
    for p in from.ones() {
        let at = from_base + p as u64;
        let (lo, hi) = match direction {
            Direction::Forward => (
                at.saturating_add(step.min),
                step.max.map_or(u64::MAX, |max| at.saturating_add(max)),
            ),
            Direction::Backward => match at.checked_sub(step.min) {
                Some(hi) => (step.max.map_or(0, |max| at.saturating_sub(max)), hi),
                None => continue,
            },
        };
        let lo = lo.max(floor);
        if lo > hi {
            continue;
        }
        pending = match pending {
            Some((a, b)) if lo <= b.saturating_add(1) => Some((a, b.max(hi))),
            Some((a, b)) => {
                fill(to, to_base, a, b);
                Some((lo, hi))
            },
            None => Some((lo, hi)),
        };
    }
    if let Some((a, b)) = pending {
        fill(to, to_base, a, b);
    }
}

/// Set the absolute positions `lo..=hi` that fall inside `to`.
fn fill(to: &mut FixedBitSet, base: u64, lo: u64, hi: u64) {
    let top = base + to.len() as u64 - 1;
    let (lo, hi) = (lo.max(base), hi.min(top));
    if lo <= hi {
        to.insert_range((lo - base) as usize..(hi - base) as usize + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::WindowSpec;
    use crate::pattern::Pattern;

    fn pat(s: &str) -> Pattern {
        Pattern::parse(s).unwrap()
    }

    fn full(data: &[u8]) -> Window {
        Window::from_slice(data, WindowSpec::new(data.len(), 0))
    }

    #[test]
    fn test_bof_chain_is_relative() {
        let sig = Signature::new([
            SubSignature::bof(pat("AA")),
            SubSignature::bof(pat("BB")).at(2),
        ])
        .unwrap();
        let extents = sig.evaluate(&full(&[0xAA, 0, 0, 0xBB, 0]), 64).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(0, 1), Extent::new(3, 1)]);
        assert!(sig.evaluate(&full(&[0xAA, 0, 0xBB, 0]), 64).is_none());
    }

    #[test]
    fn test_eof_chain_is_relative() {
        let sig = Signature::new([
            SubSignature::eof(pat("CC")),
            SubSignature::eof(pat("DD")).within(0, 1),
        ])
        .unwrap();
        let extents = sig.evaluate(&full(&[0, 0xDD, 0, 0xCC]), 64).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(1, 1), Extent::new(3, 1)]);
        assert!(sig.evaluate(&full(&[0xDD, 0, 0, 0xCC]), 64).is_none());
    }

    #[test]
    fn test_ranged_bof_chain_tries_every_end() {
        // The first AA leaves no room for BB; the second one does
        let sig = Signature::new([
            SubSignature::bof(pat("AA")).within(0, 4),
            SubSignature::bof(pat("BB")),
        ])
        .unwrap();
        let extents = sig.evaluate(&full(&[0xAA, 0, 0xAA, 0xBB, 0]), 64).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(2, 1), Extent::new(3, 1)]);

        let sig = Signature::new([
            SubSignature::bof(pat("41{0-3}42")),
            SubSignature::bof(pat("43")).at(1),
        ])
        .unwrap();
        let extents = sig.evaluate(&full(b"AB-B-C"), 64).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(0, 4), Extent::new(5, 1)]);
    }

    #[test]
    fn test_ranged_eof_chain_tries_every_start() {
        let sig = Signature::new([
            SubSignature::eof(pat("CC")).within(0, 4),
            SubSignature::eof(pat("DD")),
        ])
        .unwrap();
        let extents = sig.evaluate(&full(&[0, 0xDD, 0xCC, 0, 0xCC]), 64).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(1, 1), Extent::new(2, 1)]);
    }

    #[test]
    fn test_var_chain_tries_every_end() {
        let sig = Signature::new([
            SubSignature::var(pat("41")),
            SubSignature::var(pat("42")).at(0),
        ])
        .unwrap();
        let extents = sig.evaluate(&full(b"A_AB"), 64).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(2, 1), Extent::new(3, 1)]);
        assert!(sig.evaluate(&full(b"A_A_B"), 64).is_none());
    }

    #[test]
    fn test_eof_must_not_overlap_bof() {
        let sig = Signature::new([SubSignature::bof(pat("FFD8FF")), SubSignature::eof(pat("FFD9"))])
            .unwrap();
        assert!(sig.evaluate(&full(&[0xFF, 0xD8, 0xFF, 0xD9]), 64).is_none());
        assert!(sig.evaluate(&full(&[0xFF, 0xD8, 0xFF, 0xFF, 0xD9]), 64).is_some());

        // A later EOF start clears the BOF match
        let sig = Signature::new([
            SubSignature::bof(pat("AA")).within(0, 2),
            SubSignature::eof(pat("AA")).from_offset(0),
        ])
        .unwrap();
        let extents = sig.evaluate(&full(&[0xAA, 0, 0, 0xAA, 0]), 64).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(0, 1), Extent::new(3, 1)]);
    }

    #[test]
    fn test_var_between_anchors() {
        let sig = Signature::new([
            SubSignature::bof(pat("00")),
            SubSignature::var(pat("3C68746D6C")),
            SubSignature::eof(pat("FF")),
        ])
        .unwrap();
        let mut data = vec![0x00, 1, 2];
        data.extend_from_slice(b"<html");
        data.push(0xFF);
        let extents = sig.evaluate(&full(&data), 64).unwrap();
        assert_eq!(extents[1], Extent::new(3, 5));

        // floating pattern may not run into the EOF match
        let sig = Signature::new([
            SubSignature::var(pat("3C68746D6C")),
            SubSignature::eof(pat("6C")),
        ])
        .unwrap();
        assert!(sig.evaluate(&full(b"<html"), 64).is_none());
    }

    #[test]
    fn test_var_scan_cap() {
        let sig = Signature::var("4142").unwrap();
        let mut data = vec![0u8; 100];
        data.extend_from_slice(b"AB");
        data.extend_from_slice(&[0u8; 100]);
        assert!(sig.evaluate(&full(&data), 10).is_none());
        assert!(sig.evaluate(&full(&data), 100).is_some());

        // Starts near the end of the region are in reach as well
        let mut data = vec![0u8; 100];
        data.extend_from_slice(b"AB");
        assert_eq!(sig.evaluate(&full(&data), 10).unwrap()[0], Extent::new(100, 2));
    }

    #[test]
    fn test_split_window() {
        let mut data = vec![0x11, 0x22];
        data.extend(std::iter::repeat_n(0u8, 1000));
        data.extend_from_slice(b"AB");
        data.extend(std::iter::repeat_n(0u8, 10));
        data.push(0x33);
        let window = Window::from_slice(&data, WindowSpec::new(16, 16));
        assert!(!window.is_complete());

        let sig = Signature::new([
            SubSignature::bof(pat("1122")),
            SubSignature::var(pat("4142")),
            SubSignature::eof(pat("33")),
        ])
        .unwrap();
        let extents = sig.evaluate(&window, 4096).unwrap();
        assert_eq!(extents[1], Extent::new(1002, 2));

        // A tail match is in reach even when the head side cap is short
        assert_eq!(sig.evaluate(&window, 16).unwrap()[1], Extent::new(1002, 2));

        let far = Signature::new([SubSignature::eof(pat("1122")).from_offset(0)]).unwrap();
        assert!(far.evaluate(&window, 4096).is_none());
    }

    #[test]
    fn test_var_chain_crosses_into_tail() {
        let mut data = b"<a>".to_vec();
        data.extend(std::iter::repeat_n(b'.', 500));
        data.extend_from_slice(b"</a>");
        let window = Window::from_slice(&data, WindowSpec::new(32, 32));
        assert!(!window.is_complete());

        let sig = Signature::new([
            SubSignature::var(pat("3C613E")),
            SubSignature::var(pat("3C2F613E")),
        ])
        .unwrap();
        let extents = sig.evaluate(&window, 32).unwrap();
        assert_eq!(extents.as_slice(), &[Extent::new(0, 3), Extent::new(503, 4)]);
    }

    #[test]
    fn test_spread_merges_intervals() {
        let mut from = FixedBitSet::with_capacity(11);
        from.insert(1);
        from.insert(2);
        from.insert(8);
        let mut to = FixedBitSet::with_capacity(11);
        let step = Step { min: 1, max: Some(2) };
        spread(&from, 0, &mut to, 0, step, 0, Direction::Forward);
        assert_eq!(to.ones().collect::<Vec<_>>(), vec![2, 3, 4, 9, 10]);

        let mut to = FixedBitSet::with_capacity(11);
        spread(&from, 0, &mut to, 0, step, 0, Direction::Backward);
        assert_eq!(to.ones().collect::<Vec<_>>(), vec![0, 1, 6, 7]);
    }
}
