//! Byte matching.
//!
//! The matcher reads a bounded [`Window`] from a source and evaluates every
//! byte signature of a corpus against it, producing raw per-signature hits.
//! Window sizes follow from the signatures themselves: the largest BOF and
//! EOF reach in the corpus, with unbounded reaches and floating patterns
//! capped by [`Config`].

mod prefilter;
mod window;

pub(crate) use prefilter::Prefilter;
pub use window::{Window, WindowSpec};

use crate::config::Config;
use crate::identifier::Corpus;
use crate::resolver::Basis;
use crate::signature::{Extents, Reach, Signature};
use tracing::trace;

/// One satisfied signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Hit {
    pub format: usize,
    pub specificity: usize,
    pub extents: Extents,
    pub basis: Basis,
}

/// Accumulated window requirements of a set of signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Needs {
    bof: Reach,
    eof: Reach,
    floating: bool,
}

impl Needs {
    pub fn absorb(&mut self, signature: &Signature) {
        self.bof = self.bof.max(signature.bof_reach());
        self.eof = self.eof.max(signature.eof_reach());
        self.floating |= signature.is_floating();
    }

    pub fn merge(self, other: Needs) -> Needs {
        Needs {
            bof: self.bof.max(other.bof),
            eof: self.eof.max(other.eof),
            floating: self.floating || other.floating,
        }
    }

    /// Concrete window sizes under the configured caps.
    pub fn spec(&self, config: &Config) -> WindowSpec {
        let scan = if self.floating { config.max_var_scan } else { 0 };
        WindowSpec::new(
            self.bof.resolve(config.max_bof_window).max(scan),
            self.eof.resolve(config.max_eof_window).max(scan),
        )
    }
}

/// Evaluate every byte signature of `corpus` against `window`.
///
/// Hits are produced in corpus order, so the output is a pure function of
/// the window content.
pub(crate) fn scan(corpus: &Corpus, window: &Window, config: &Config) -> Vec<Hit> {
    let present = corpus.prefilter.scan(window);
    let mut hits = Vec::new();
    let mut skipped = 0usize;

    for entry in &corpus.entries {
        if !entry.keys.iter().all(|&key| present.contains(key)) {
            skipped += 1;
            continue;
        }
        let format = &corpus.formats[entry.format];
        let signature = &format.signatures()[entry.signature];
        if let Some(extents) = signature.evaluate(window, config.max_var_scan) {
            trace!(
                format = %format.id(),
                signature = entry.signature,
                specificity = signature.specificity(),
                "signature matched"
            );
            hits.push(Hit {
                format: entry.format,
                specificity: signature.specificity(),
                extents,
                basis: Basis::Signature {
                    index: entry.signature,
                },
            });
        }
    }

    trace!(
        len = window.len(),
        complete = window.is_complete(),
        hits = hits.len(),
        skipped,
        "window scanned"
    );
    hits
}
