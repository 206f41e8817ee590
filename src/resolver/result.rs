//! Identification results.

use crate::identifier::{ContainerKind, FormatId};
use crate::signature::Extent;
use smallvec::SmallVec;
use std::fmt;
use std::time::Duration;

/// Why a format was reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Basis {
    /// A byte signature matched; `index` is its position in the format's
    /// signature list
    Signature { index: usize },
    /// A container signature matched the listed members
    Container {
        kind: ContainerKind,
        members: Vec<String>,
    },
    /// The name hint carries one of the format's extensions
    Extension(String),
    /// The MIME hint equals the format's MIME type
    Mime(String),
}

impl Basis {
    /// True for bases derived from content rather than hints.
    pub fn is_content(&self) -> bool {
        matches!(self, Basis::Signature { .. } | Basis::Container { .. })
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Basis::Signature { index } => write!(f, "byte match (signature {index})"),
            Basis::Container { kind, members } => {
                write!(f, "{kind} container match on {}", members.join(", "))
            },
            Basis::Extension(ext) => write!(f, "extension match {ext}"),
            Basis::Mime(mime) => write!(f, "mime match {mime}"),
        }
    }
}

/// Path of container members leading to a nested result.
///
/// The first element is the name of the outermost stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerContext {
    path: Vec<String>,
}

impl ContainerContext {
    pub fn new(path: Vec<String>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Nesting depth: one for a direct member of the outer stream.
    pub fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Name of the innermost member.
    pub fn member(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

impl fmt::Display for ContainerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path.join(" -> "))
    }
}

/// One identified format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub(crate) id: FormatId,
    pub(crate) name: String,
    pub(crate) bases: SmallVec<[Basis; 2]>,
    pub(crate) extents: SmallVec<[Extent; 4]>,
    pub(crate) specificity: usize,
    pub(crate) context: Option<ContainerContext>,
    pub(crate) identifier: String,
}

impl MatchResult {
    pub fn id(&self) -> &FormatId {
        &self.id
    }

    /// Human-readable format name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary basis first, then corroborating ones.
    pub fn bases(&self) -> &[Basis] {
        &self.bases
    }

    pub fn basis(&self) -> Option<&Basis> {
        self.bases.first()
    }

    /// Byte ranges of the best signature match; empty for container and hint
    /// matches.
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    pub fn specificity(&self) -> usize {
        self.specificity
    }

    /// Where inside a container this result was found, `None` at top level.
    pub fn context(&self) -> Option<&ContainerContext> {
        self.context.as_ref()
    }

    /// Name of the identifier that produced the result.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// True if the result rests only on name or MIME hints.
    pub fn is_hint_only(&self) -> bool {
        !self.bases.iter().any(Basis::is_content)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{context}: {}", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Advisory condition raised during an identification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Only name or MIME hints matched
    ExtensionOnly,
    /// The call took longer than the configured threshold
    Slow { elapsed: Duration, threshold: Duration },
    /// A stream identified as a container could not be opened
    ContainerUnreadable {
        path: String,
        kind: ContainerKind,
        reason: String,
    },
    /// A member could not be read
    MemberUnreadable { path: String, reason: String },
    /// A member exceeded the buffering limit and was skipped
    MemberTooLarge { path: String, size: u64 },
    /// Members were not walked because the depth limit was reached
    DepthLimit { path: String, depth: usize },
    /// Only the first `limit` members were walked
    MemberLimit { path: String, limit: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ExtensionOnly => f.write_str("match on extension only"),
            Warning::Slow { elapsed, threshold } => write!(
                f,
                "identification took {} ms (threshold {} ms)",
                elapsed.as_millis(),
                threshold.as_millis()
            ),
            Warning::ContainerUnreadable { path, kind, reason } => {
                write!(f, "{path}: cannot open {kind} container: {reason}")
            },
            Warning::MemberUnreadable { path, reason } => {
                write!(f, "{path}: cannot read member: {reason}")
            },
            Warning::MemberTooLarge { path, size } => {
                write!(f, "{path}: member of {size} bytes not buffered")
            },
            Warning::DepthLimit { path, depth } => {
                write!(f, "{path}: container depth limit {depth} reached")
            },
            Warning::MemberLimit { path, limit } => {
                write!(f, "{path}: only the first {limit} members were examined")
            },
        }
    }
}

/// Full report of one identification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    /// Ordered results: top-level identities first, then container members
    pub matches: Vec<MatchResult>,
    pub warnings: Vec<Warning>,
    pub elapsed: Duration,
}

impl Identification {
    /// Results for the stream itself, without container members.
    pub fn top_level(&self) -> impl Iterator<Item = &MatchResult> {
        self.matches.iter().filter(|m| m.context.is_none())
    }

    pub fn is_unidentified(&self) -> bool {
        self.matches.is_empty()
    }
}
