//! Quince - signature-based file format identification
//!
//! Quince identifies the format of a byte stream by matching it against a
//! corpus of format signatures, in the manner of PRONOM-based preservation
//! tools. A signature is an ordered set of byte patterns anchored to the
//! beginning of the stream, its end, or a floating position between them.
//!
//! # Features
//!
//! - **Bounded reads**: only a head and a tail window are buffered, sized
//!   from the corpus; the middle of a large file is never read
//! - **Any source**: seekable readers, forward-only streams, in-memory buffers
//! - **Priorities**: declared format priorities suppress generic matches
//!   under the default best-match policy; keep-all reports every match
//! - **Containers**: ZIP archives and OLE2 compound documents are opened,
//!   matched against container signatures and walked member by member
//! - **Deterministic**: the same content always yields the same ordered
//!   results, whatever the source type
//!
//! # Example - Building an identifier
//!
//! ```rust
//! use quince::{Format, FormatId, Identifier, Signature};
//!
//! let identifier = Identifier::builder("example")
//!     .add(
//!         Format::new(FormatId::parse("fmt/668")?, "Minolta RAW")
//!             .with_extension("mrw")
//!             .with_signature(Signature::bof("004D52")?),
//!     )
//!     .add(
//!         Format::new(FormatId::parse("fmt/669")?, "Minolta MRW")
//!             .with_extension("mrw")
//!             .with_signature(Signature::bof("004D524D")?)
//!             .with_priority_over(FormatId::parse("fmt/668")?),
//!     )
//!     .build()?;
//!
//! let results = identifier.identify_bytes(b"\x00MRM\x00", "test.mrw", None);
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].id().to_string(), "fmt/669");
//! # Ok::<(), quince::Error>(())
//! ```
//!
//! # Example - Identifying a file
//!
//! ```no_run
//! use quince::{Identifier, ResolutionPolicy, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let identifier = Identifier::builder("empty").build()?;
//! let identifier = identifier.with_config(Config::default().with_policy(ResolutionPolicy::KeepAll));
//! let report = identifier.identify_file("document.docx")?;
//! for result in &report.matches {
//!     println!("{result}: {}", result.name());
//! }
//! for warning in &report.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! # Ok(())
//! # }
//! ```

/// Shared error types
pub mod common;

/// Engine configuration
pub mod config;

/// ZIP and OLE2 member access and recursion
mod container;

/// Format definitions, identifier construction and identification calls
pub mod identifier;

/// Bounded windows and raw signature evaluation
pub mod matcher;

/// OLE2 compound document reader
pub mod ole;

/// Byte patterns and their hex notation
pub mod pattern;

/// Ranking of matches into results
pub mod resolver;

/// Anchored signatures
pub mod signature;

pub use common::{Error, Result};
pub use config::{Config, ResolutionPolicy};
pub use identifier::{
    ContainerKind, ContainerMember, ContainerSignature, Format, FormatId, Identifier,
    IdentifierBuilder, MultiIdentifier,
};
pub use matcher::{Window, WindowSpec};
pub use pattern::{Pattern, Segment};
pub use resolver::{Basis, ContainerContext, Identification, MatchResult, Warning};
pub use signature::{Anchor, Extent, Signature, SubSignature};
