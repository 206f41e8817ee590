//! Format identities and their definitions.

use crate::common::{Error, Result};
use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Stable format identity, e.g. `fmt/41` or `x-fmt/384`.
///
/// Identities order by namespace, then by code. Numeric codes compare as
/// numbers so `fmt/9` sorts before `fmt/10`, and come before non-numeric
/// codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FormatId {
    namespace: String,
    code: String,
}

impl FormatId {
    pub fn new(namespace: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            code: code.into(),
        }
    }

    /// Parse `namespace/code`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quince::FormatId;
    ///
    /// let id = FormatId::parse("x-fmt/384")?;
    /// assert_eq!(id.namespace(), "x-fmt");
    /// assert_eq!(id.code(), "384");
    /// # Ok::<(), quince::Error>(())
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((namespace, code))
                if !namespace.is_empty() && !code.is_empty() && !code.contains('/') =>
            {
                Ok(Self::new(namespace, code))
            },
            _ => Err(Error::InvalidFormatId(s.to_string())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl Ord for FormatId {
    fn cmp(&self, other: &Self) -> Ordering {
        let numeric = match (self.code.parse::<u64>(), other.code.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => Ordering::Equal,
        };
        self.namespace
            .cmp(&other.namespace)
            .then(numeric)
            .then_with(|| self.code.cmp(&other.code))
    }
}

impl PartialOrd for FormatId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.code)
    }
}

impl FromStr for FormatId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FormatId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<FormatId> for String {
    fn from(id: FormatId) -> Self {
        id.to_string()
    }
}

/// Container families the walker can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerKind {
    /// ZIP archive (OOXML, ODF, JAR, EPUB, ...)
    Zip,
    /// OLE2 compound document (legacy Office, MSI, ...)
    Ole2,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerKind::Zip => "ZIP",
            ContainerKind::Ole2 => "OLE2",
        })
    }
}

/// A member that must exist inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerMember {
    name: String,
    signature: Option<Signature>,
}

impl ContainerMember {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signature the member contents must satisfy, if any.
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Pinned bytes contributed by this member: its name plus its signature.
    pub fn specificity(&self) -> usize {
        self.name.len() + self.signature.as_ref().map_or(0, Signature::specificity)
    }
}

/// Signature over the member names (and optionally contents) of a container.
///
/// # Examples
///
/// ```rust
/// use quince::{ContainerKind, ContainerSignature, Signature};
///
/// let docx = ContainerSignature::new(ContainerKind::Zip)
///     .with_member("[Content_Types].xml")
///     .with_member_signature("word/document.xml", Signature::var("3C773A646F63756D656E74")?);
/// assert_eq!(docx.members().len(), 2);
/// # Ok::<(), quince::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerSignature {
    kind: ContainerKind,
    members: Vec<ContainerMember>,
}

impl ContainerSignature {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            members: Vec::new(),
        }
    }

    /// Require a member to exist.
    pub fn with_member(mut self, name: impl Into<String>) -> Self {
        self.members.push(ContainerMember {
            name: name.into(),
            signature: None,
        });
        self
    }

    /// Require a member to exist and its contents to match `signature`.
    pub fn with_member_signature(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.members.push(ContainerMember {
            name: name.into(),
            signature: Some(signature),
        });
        self
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn members(&self) -> &[ContainerMember] {
        &self.members
    }

    pub fn specificity(&self) -> usize {
        self.members.iter().map(ContainerMember::specificity).sum()
    }
}

/// A format definition handed to the [`IdentifierBuilder`](super::IdentifierBuilder).
///
/// # Examples
///
/// ```rust
/// use quince::{Format, FormatId, Signature};
///
/// let jpeg = Format::new(FormatId::parse("fmt/41")?, "Raw JPEG Stream")
///     .with_mime("image/jpeg")
///     .with_extension("jpg")
///     .with_extension("jpeg")
///     .with_signature(Signature::bof("FFD8FF")?);
/// assert_eq!(jpeg.extensions(), ["jpg", "jpeg"]);
/// # Ok::<(), quince::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    id: FormatId,
    name: String,
    mime: Option<String>,
    extensions: Vec<String>,
    signatures: Vec<Signature>,
    container_signatures: Vec<ContainerSignature>,
    container: Option<ContainerKind>,
    priorities: Vec<FormatId>,
}

impl Format {
    pub fn new(id: FormatId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mime: None,
            extensions: Vec::new(),
            signatures: Vec::new(),
            container_signatures: Vec::new(),
            container: None,
            priorities: Vec::new(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Add a file extension; a leading dot is dropped and case is folded.
    pub fn with_extension(mut self, extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !self.extensions.contains(&ext) {
            self.extensions.push(ext);
        }
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn with_container_signature(mut self, signature: ContainerSignature) -> Self {
        self.container_signatures.push(signature);
        self
    }

    /// Mark the format as a container the walker may open.
    pub fn as_container(mut self, kind: ContainerKind) -> Self {
        self.container = Some(kind);
        self
    }

    /// Declare that this format is preferred over `narrower` when both match.
    pub fn with_priority_over(mut self, narrower: FormatId) -> Self {
        if !self.priorities.contains(&narrower) {
            self.priorities.push(narrower);
        }
        self
    }

    pub fn id(&self) -> &FormatId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn container_signatures(&self) -> &[ContainerSignature] {
        &self.container_signatures
    }

    pub fn container(&self) -> Option<ContainerKind> {
        self.container
    }

    /// Formats this one takes priority over, as declared.
    pub fn priorities(&self) -> &[FormatId] {
        &self.priorities
    }
}
