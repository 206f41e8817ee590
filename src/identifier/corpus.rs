//! Frozen, validated signature corpus shared by all identification calls.

use super::{ContainerKind, Format, FormatId};
use crate::config::Config;
use crate::matcher::{Needs, Prefilter, WindowSpec};
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// A byte signature together with the prefilter keys it requires.
#[derive(Debug, Clone)]
pub(crate) struct SignatureEntry {
    pub format: usize,
    pub signature: usize,
    pub keys: SmallVec<[usize; 2]>,
}

/// A container signature of some format.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ContainerEntry {
    pub format: usize,
    pub signature: usize,
}

#[derive(Debug)]
pub(crate) struct Corpus {
    pub name: String,
    pub formats: Vec<Format>,
    pub index: BTreeMap<FormatId, usize>,
    /// `dominates[a]` holds every format `a` has transitive priority over
    pub dominates: Vec<FixedBitSet>,
    pub by_extension: BTreeMap<String, Vec<usize>>,
    pub by_mime: BTreeMap<String, Vec<usize>>,
    pub entries: Vec<SignatureEntry>,
    pub containers: BTreeMap<ContainerKind, Vec<ContainerEntry>>,
    pub prefilter: Prefilter,
    pub needs: Needs,
    pub member_needs: Needs,
}

impl Corpus {
    pub fn lookup(&self, id: &FormatId) -> Option<usize> {
        self.index.get(id).copied()
    }

    #[inline]
    pub fn has_priority(&self, winner: usize, loser: usize) -> bool {
        self.dominates[winner].contains(loser)
    }

    pub fn window_spec(&self, config: &Config) -> WindowSpec {
        self.needs.spec(config)
    }

    /// Window for a member too large to buffer: wide enough for both the
    /// corpus and any container member signature.
    pub fn member_spec(&self, config: &Config) -> WindowSpec {
        self.needs.merge(self.member_needs).spec(config)
    }

    pub fn container_entries(&self, kind: ContainerKind) -> &[ContainerEntry] {
        self.containers.get(&kind).map_or(&[], Vec::as_slice)
    }
}
