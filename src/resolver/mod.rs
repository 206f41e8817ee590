//! Reduction of raw hits to an ordered result list.
//!
//! Hits are accumulated per format in a `BTreeMap`, so nothing depends on
//! insertion or hashing order. Name and MIME hints add corroborating bases
//! and break ties, and stand in for content matches only when there are
//! none. Under [`ResolutionPolicy::BestMatch`] a format is dropped when
//! another matched format has (transitive) priority over it.

mod result;

pub use result::{Basis, ContainerContext, Identification, MatchResult, Warning};

use crate::config::{Config, ResolutionPolicy};
use crate::identifier::Corpus;
use crate::matcher::Hit;
use crate::signature::Extents;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::Path;

/// Advisory hints supplied with a byte source.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Hints<'a> {
    pub name: &'a str,
    pub mime: Option<&'a str>,
}

impl<'a> Hints<'a> {
    pub fn new(name: &'a str, mime: Option<&'a str>) -> Self {
        Self { name, mime }
    }

    /// Lower-cased extension of the last path component.
    pub fn extension(&self) -> Option<String> {
        Path::new(self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(str::to_ascii_lowercase)
    }
}

/// Resolver output before container context is attached.
#[derive(Debug, Clone, Default)]
pub(crate) struct Resolution {
    pub results: Vec<MatchResult>,
    /// True if the results rest only on hints
    pub hint_only: bool,
}

#[derive(Debug, Default)]
struct Candidate {
    specificity: usize,
    extents: Extents,
    bases: SmallVec<[Basis; 2]>,
    corroborated: bool,
}

impl Candidate {
    fn absorb(&mut self, hit: &Hit) {
        if self.bases.is_empty() || hit.specificity > self.specificity {
            self.specificity = hit.specificity;
            self.extents = hit.extents.clone();
        }
        if !self.bases.contains(&hit.basis) {
            self.bases.push(hit.basis.clone());
        }
    }
}

pub(crate) fn resolve(corpus: &Corpus, hits: &[Hit], hints: &Hints<'_>, config: &Config) -> Resolution {
    let mut candidates: BTreeMap<usize, Candidate> = BTreeMap::new();
    for hit in hits {
        candidates.entry(hit.format).or_default().absorb(hit);
    }

    let extension = hints.extension();
    let mime = hints.mime.map(str::to_ascii_lowercase);

    let hint_only = candidates.is_empty();
    if hint_only && config.extension_fallback {
        let by_ext = extension.as_ref().and_then(|e| corpus.by_extension.get(e));
        let by_mime = mime.as_ref().and_then(|m| corpus.by_mime.get(m));
        for &fi in by_ext.into_iter().chain(by_mime).flatten() {
            candidates.entry(fi).or_default();
        }
    }

    for (&fi, candidate) in candidates.iter_mut() {
        let format = &corpus.formats[fi];
        if let Some(ext) = &extension
            && format.extensions().contains(ext)
        {
            candidate.corroborated = true;
            candidate.bases.push(Basis::Extension(ext.clone()));
        }
        if let (Some(hint), Some(own)) = (&mime, format.mime())
            && own.eq_ignore_ascii_case(hint)
        {
            candidate.bases.push(Basis::Mime(hint.clone()));
        }
    }

    if config.policy == ResolutionPolicy::BestMatch {
        let matched: Vec<usize> = candidates.keys().copied().collect();
        candidates.retain(|&fi, _| !matched.iter().any(|&other| corpus.has_priority(other, fi)));
    }

    let mut ranked: Vec<(usize, Candidate)> = candidates.into_iter().collect();
    match config.policy {
        ResolutionPolicy::BestMatch => ranked.sort_by(|(a, ca), (b, cb)| {
            (Reverse(ca.specificity), !ca.corroborated, corpus.formats[*a].id())
                .cmp(&(Reverse(cb.specificity), !cb.corroborated, corpus.formats[*b].id()))
        }),
        ResolutionPolicy::KeepAll => ranked.sort_by(|(a, ca), (b, cb)| {
            (Reverse(ca.specificity), corpus.formats[*a].id())
                .cmp(&(Reverse(cb.specificity), corpus.formats[*b].id()))
        }),
    }

    let results: Vec<MatchResult> = ranked
        .into_iter()
        .map(|(fi, candidate)| {
            let format = &corpus.formats[fi];
            MatchResult {
                id: format.id().clone(),
                name: format.name().to_string(),
                bases: candidate.bases,
                extents: candidate.extents,
                specificity: candidate.specificity,
                context: None,
                identifier: corpus.name.clone(),
            }
        })
        .collect();

    Resolution {
        hint_only: hint_only && !results.is_empty(),
        results,
    }
}
