//! Running several identifiers over the same source.

use super::Identifier;
use crate::common::Result;
use crate::resolver::{Identification, MatchResult, Warning};
use std::cmp::Reverse;
use std::io::{Read, Seek};
use std::time::{Duration, Instant};

/// Several identifiers applied to one source, with merged results.
///
/// Each identifier resolves on its own, so priorities never cross corpus
/// boundaries. Top-level results of all identifiers are merged by
/// specificity (descending), then format identity, then identifier name;
/// container member results follow in identifier order. Every result names
/// the identifier that produced it.
#[derive(Debug, Clone, Default)]
pub struct MultiIdentifier {
    identifiers: Vec<Identifier>,
}

impl MultiIdentifier {
    pub fn new(identifiers: impl IntoIterator<Item = Identifier>) -> Self {
        Self {
            identifiers: identifiers.into_iter().collect(),
        }
    }

    pub fn push(&mut self, identifier: Identifier) {
        self.identifiers.push(identifier);
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    pub fn identify<R: Read + Seek>(
        &self,
        reader: &mut R,
        name: &str,
        mime: Option<&str>,
    ) -> Result<Vec<MatchResult>> {
        Ok(self.identify_report(reader, name, mime)?.matches)
    }

    pub fn identify_report<R: Read + Seek>(
        &self,
        reader: &mut R,
        name: &str,
        mime: Option<&str>,
    ) -> Result<Identification> {
        let start = Instant::now();
        let reports = self
            .identifiers
            .iter()
            .map(|identifier| identifier.identify_report(reader, name, mime))
            .collect::<Result<Vec<_>>>()?;
        Ok(merge(reports, start.elapsed()))
    }

    pub fn identify_bytes(&self, data: &[u8], name: &str, mime: Option<&str>) -> Vec<MatchResult> {
        let start = Instant::now();
        let reports = self
            .identifiers
            .iter()
            .map(|identifier| identifier.identify_bytes_report(data, name, mime))
            .collect();
        merge(reports, start.elapsed()).matches
    }
}

fn merge(reports: Vec<Identification>, elapsed: Duration) -> Identification {
    let mut top = Vec::new();
    let mut nested = Vec::new();
    let mut warnings = Vec::new();

    for report in reports {
        let (own, members): (Vec<_>, Vec<_>) = report
            .matches
            .into_iter()
            .partition(|result| result.context().is_none());
        top.extend(own);
        nested.extend(members);
        warnings.extend(
            report
                .warnings
                .into_iter()
                .filter(|warning| *warning != Warning::ExtensionOnly),
        );
    }

    top.sort_by(|a: &MatchResult, b: &MatchResult| {
        (Reverse(a.specificity()), a.id(), a.identifier())
            .cmp(&(Reverse(b.specificity()), b.id(), b.identifier()))
    });
    if !top.is_empty() && top.iter().all(MatchResult::is_hint_only) {
        warnings.insert(0, Warning::ExtensionOnly);
    }

    top.extend(nested);
    Identification {
        matches: top,
        warnings,
        elapsed,
    }
}
