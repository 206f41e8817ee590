//! Validating construction of an [`Identifier`].

use super::corpus::{ContainerEntry, Corpus, SignatureEntry};
use super::{Format, Identifier};
use crate::common::{Error, Result};
use crate::config::Config;
use crate::matcher::{Needs, Prefilter};
use crate::signature::Anchor;
use fixedbitset::FixedBitSet;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Collects format definitions and freezes them into an [`Identifier`].
///
/// All corpus validation happens in [`build`](Self::build); identification
/// calls never re-check the corpus.
///
/// # Examples
///
/// ```rust
/// use quince::{Format, FormatId, Identifier, Signature};
///
/// let identifier = Identifier::builder("example")
///     .add(
///         Format::new(FormatId::parse("fmt/11")?, "Portable Network Graphics")
///             .with_extension("png")
///             .with_signature(Signature::bof("89504E470D0A1A0A")?),
///     )
///     .build()?;
/// assert_eq!(identifier.formats().count(), 1);
/// # Ok::<(), quince::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdentifierBuilder {
    name: String,
    formats: Vec<Format>,
    config: Config,
}

impl IdentifierBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formats: Vec::new(),
            config: Config::default(),
        }
    }

    pub fn add(mut self, format: Format) -> Self {
        self.formats.push(format);
        self
    }

    pub fn extend(mut self, formats: impl IntoIterator<Item = Format>) -> Self {
        self.formats.extend(formats);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Validate the corpus and freeze it.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateFormat`] if two formats share an identity
    /// - [`Error::UnknownPriority`] if a priority names a missing format
    /// - [`Error::PriorityCycle`] if the priority graph has a cycle
    /// - [`Error::InvalidSignature`] for container signatures without members
    pub fn build(self) -> Result<Identifier> {
        let IdentifierBuilder {
            name,
            formats,
            config,
        } = self;

        let mut index = BTreeMap::new();
        for (i, format) in formats.iter().enumerate() {
            if index.insert(format.id().clone(), i).is_some() {
                return Err(Error::DuplicateFormat(format.id().clone()));
            }
        }

        let mut edges: Vec<SmallVec<[usize; 4]>> = Vec::with_capacity(formats.len());
        for format in &formats {
            let mut targets = SmallVec::new();
            for target in format.priorities() {
                let &t = index.get(target).ok_or_else(|| Error::UnknownPriority {
                    format: format.id().clone(),
                    target: target.clone(),
                })?;
                targets.push(t);
            }
            edges.push(targets);
        }
        let dominates = priority_closure(&formats, &edges)?;

        let mut by_extension: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_mime: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut prefilter = Prefilter::default();
        let mut entries = Vec::new();
        let mut containers: BTreeMap<_, Vec<ContainerEntry>> = BTreeMap::new();
        let mut needs = Needs::default();
        let mut member_needs = Needs::default();

        for (fi, format) in formats.iter().enumerate() {
            for ext in format.extensions() {
                by_extension.entry(ext.clone()).or_default().push(fi);
            }
            if let Some(mime) = format.mime() {
                by_mime.entry(mime.to_ascii_lowercase()).or_default().push(fi);
            }

            for (si, signature) in format.signatures().iter().enumerate() {
                let keys = signature
                    .subs()
                    .iter()
                    .filter(|sub| sub.anchor() == Anchor::Var)
                    .filter_map(|sub| sub.pattern().longest_literal())
                    .map(|literal| prefilter.intern(literal))
                    .collect();
                needs.absorb(signature);
                entries.push(SignatureEntry {
                    format: fi,
                    signature: si,
                    keys,
                });
            }

            for (ci, container) in format.container_signatures().iter().enumerate() {
                if container.members().is_empty() {
                    return Err(Error::InvalidSignature(format!(
                        "container signature {ci} of {} lists no members",
                        format.id()
                    )));
                }
                for signature in container.members().iter().filter_map(|m| m.signature()) {
                    member_needs.absorb(signature);
                }
                containers
                    .entry(container.kind())
                    .or_default()
                    .push(ContainerEntry {
                        format: fi,
                        signature: ci,
                    });
            }
        }
        prefilter.compile()?;

        debug!(
            identifier = %name,
            formats = formats.len(),
            signatures = entries.len(),
            literals = prefilter.len(),
            "identifier built"
        );

        let corpus = Corpus {
            name,
            formats,
            index,
            dominates,
            by_extension,
            by_mime,
            entries,
            containers,
            prefilter,
            needs,
            member_needs,
        };
        Ok(Identifier::from_parts(Arc::new(corpus), config))
    }
}

/// Transitive closure of the priority graph, rejecting cycles.
fn priority_closure(formats: &[Format], edges: &[SmallVec<[usize; 4]>]) -> Result<Vec<FixedBitSet>> {
    let n = formats.len();
    let mut closure = Vec::with_capacity(n);
    let mut stack = Vec::new();

    for start in 0..n {
        let mut reached = FixedBitSet::with_capacity(n);
        stack.clear();
        stack.extend(edges[start].iter().copied());
        while let Some(node) = stack.pop() {
            if reached.put(node) {
                continue;
            }
            stack.extend(edges[node].iter().copied());
        }
        if reached.contains(start) {
            return Err(Error::PriorityCycle(formats[start].id().clone()));
        }
        closure.push(reached);
    }
    Ok(closure)
}
