//! Container recursion.
//!
//! When a stream resolves to a container format, the walker opens it,
//! evaluates the container signatures of that kind against its members and
//! identifies each member in turn, one level deeper. Member names are
//! visited in sorted order, so nested results are reproducible. Nothing in
//! here fails an identification call: unreadable containers and members
//! only raise warnings.

mod ole2;
mod zip_archive;

use crate::common::Result;
use crate::identifier::{ContainerKind, ContainerSignature, Session};
use crate::matcher::{Hit, Window, WindowSpec};
use crate::resolver::{Basis, Hints, MatchResult, Warning};
use crate::signature::Extents;
use ole2::Ole2Container;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use tracing::debug;
use zip_archive::ZipContainer;

/// Outcome of reading one member.
#[derive(Debug)]
pub(crate) enum Loaded {
    Window(Window),
    /// The member is larger than the buffering limit and cannot be streamed
    TooLarge(u64),
    Failed(String),
}

/// Member access shared by the container readers.
pub(crate) trait Container {
    fn kind(&self) -> ContainerKind;

    /// Member names in sorted order.
    fn members(&self) -> &[String];

    /// Canonical name of the member called `name`, if present.
    fn find(&self, name: &str) -> Option<&str>;

    /// Read a member. Members up to `limit` bytes are buffered whole;
    /// larger ones are reduced to a `spec` window where the reader allows.
    fn load(&mut self, name: &str, spec: WindowSpec, limit: usize) -> Loaded;
}

pub(crate) fn open<'a, R: Read + Seek>(
    kind: ContainerKind,
    reader: &'a mut R,
) -> Result<Box<dyn Container + 'a>> {
    let container: Box<dyn Container + 'a> = match kind {
        ContainerKind::Zip => Box::new(ZipContainer::open(reader)?),
        ContainerKind::Ole2 => Box::new(Ole2Container::open(reader)?),
    };
    Ok(container)
}

type Cache = BTreeMap<String, Loaded>;

/// Walk a container stream found at `path`.
///
/// Returns the container signature hits for the stream itself; results for
/// its members are appended to `nested` in member order.
pub(crate) fn walk<R: Read + Seek>(
    session: &mut Session<'_>,
    kind: ContainerKind,
    reader: &mut R,
    path: &[String],
    depth: usize,
    nested: &mut Vec<MatchResult>,
) -> Vec<Hit> {
    let corpus = session.corpus;
    let config = session.config;
    let mut container = match open(kind, reader) {
        Ok(container) => container,
        Err(e) => {
            session.warn(Warning::ContainerUnreadable {
                path: path.join(" -> "),
                kind,
                reason: e.to_string(),
            });
            return Vec::new();
        },
    };
    debug!(
        path = %path.join(" -> "),
        kind = %container.kind(),
        members = container.members().len(),
        depth,
        "walking container"
    );

    let spec = corpus.member_spec(config);
    let limit = config.max_member_buffer;
    let mut cache = Cache::new();

    let mut hits = Vec::new();
    for entry in corpus.container_entries(kind) {
        let signature = &corpus.formats[entry.format].container_signatures()[entry.signature];
        let matched = satisfy(
            container.as_mut(),
            signature,
            &mut cache,
            spec,
            limit,
            config.max_var_scan,
        );
        if let Some(members) = matched {
            hits.push(Hit {
                format: entry.format,
                specificity: signature.specificity(),
                extents: Extents::new(),
                basis: Basis::Container { kind, members },
            });
        }
    }

    if container.members().is_empty() {
        return hits;
    }
    if depth >= config.max_container_depth {
        session.warn(Warning::DepthLimit {
            path: path.join(" -> "),
            depth: config.max_container_depth,
        });
        return hits;
    }

    let members = container.members().to_vec();
    if members.len() > config.max_container_members {
        session.warn(Warning::MemberLimit {
            path: path.join(" -> "),
            limit: config.max_container_members,
        });
    }

    for name in members.iter().take(config.max_container_members) {
        let loaded = cache
            .remove(name)
            .unwrap_or_else(|| container.load(name, spec, limit));
        let mut member_path = path.to_vec();
        member_path.push(name.clone());

        match loaded {
            Loaded::Window(window) => {
                let results = session.examine::<Cursor<&[u8]>>(
                    &window,
                    None,
                    Hints::new(name, None),
                    &member_path,
                    depth + 1,
                );
                nested.extend(results);
            },
            Loaded::TooLarge(size) => session.warn(Warning::MemberTooLarge {
                path: member_path.join(" -> "),
                size,
            }),
            Loaded::Failed(reason) => session.warn(Warning::MemberUnreadable {
                path: member_path.join(" -> "),
                reason,
            }),
        }
    }
    hits
}

/// Match one container signature, returning the canonical names of the
/// members it requires.
fn satisfy(
    container: &mut dyn Container,
    signature: &ContainerSignature,
    cache: &mut Cache,
    spec: WindowSpec,
    limit: usize,
    var_scan: usize,
) -> Option<Vec<String>> {
    let mut matched = Vec::with_capacity(signature.members().len());
    for member in signature.members() {
        let name = container.find(member.name())?.to_string();
        if let Some(member_signature) = member.signature() {
            let loaded = cache
                .entry(name.clone())
                .or_insert_with(|| container.load(&name, spec, limit));
            match loaded {
                Loaded::Window(window) => {
                    member_signature.evaluate(window, var_scan)?;
                },
                Loaded::TooLarge(_) | Loaded::Failed(_) => return None,
            }
        }
        matched.push(name);
    }
    Some(matched)
}
