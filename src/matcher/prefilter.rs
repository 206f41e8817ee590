//! Literal prefilter for floating sub-signatures.
//!
//! Every `Var` sub-signature must contain its longest literal somewhere in the
//! window. One Aho-Corasick pass over the window finds which of those
//! literals are present, so signatures missing one are skipped before the
//! automaton runs.

use super::Window;
use crate::common::{Error, Result};
use aho_corasick::AhoCorasick;
use fixedbitset::FixedBitSet;
use std::collections::BTreeMap;

/// Deduplicated literal keys and the automaton over them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Prefilter {
    automaton: Option<AhoCorasick>,
    keys: BTreeMap<Vec<u8>, usize>,
}

impl Prefilter {
    /// Register a literal, returning its key id.
    pub(crate) fn intern(&mut self, literal: &[u8]) -> usize {
        let next = self.keys.len();
        *self.keys.entry(literal.to_vec()).or_insert(next)
    }

    /// Compile the registered literals.
    pub(crate) fn compile(&mut self) -> Result<()> {
        if self.keys.is_empty() {
            self.automaton = None;
            return Ok(());
        }
        let mut ordered: Vec<(&Vec<u8>, usize)> = self.keys.iter().map(|(k, &id)| (k, id)).collect();
        ordered.sort_unstable_by_key(|&(_, id)| id);
        let automaton = AhoCorasick::builder()
            .build(ordered.into_iter().map(|(k, _)| k))
            .map_err(|e| Error::InvalidSignature(format!("literal prefilter: {e}")))?;
        self.automaton = Some(automaton);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    /// Ids of the literals present in the window.
    pub(crate) fn scan(&self, window: &Window) -> FixedBitSet {
        let mut present = FixedBitSet::with_capacity(self.keys.len());
        let Some(automaton) = &self.automaton else {
            return present;
        };
        let mut mark = |haystack: &[u8]| {
            for m in automaton.find_overlapping_iter(haystack) {
                present.insert(m.pattern().as_usize());
            }
        };
        mark(window.head());
        if !window.is_complete() {
            mark(window.tail().0);
        }
        present
    }
}
