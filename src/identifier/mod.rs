//! Identifiers: frozen signature corpora and the calls that run them.
//!
//! An [`Identifier`] is built once through [`IdentifierBuilder`] and is
//! immutable afterwards. Cloning one is cheap (the corpus is shared), it is
//! `Send + Sync`, and every identification call works on its own state, so
//! a single identifier can serve any number of threads.

mod builder;
mod corpus;
mod format;
mod multi;
mod session;

pub use builder::IdentifierBuilder;
pub(crate) use corpus::Corpus;
pub use format::{ContainerKind, ContainerMember, ContainerSignature, Format, FormatId};
pub use multi::MultiIdentifier;
pub(crate) use session::Session;

use crate::common::Result;
use crate::config::Config;
use crate::matcher::Window;
use crate::resolver::{Hints, Identification, MatchResult};
use rayon::prelude::*;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// A validated, immutable signature corpus plus the configuration used to
/// run it.
///
/// # Examples
///
/// ```rust
/// use quince::{Format, FormatId, Identifier, Pattern, Signature, SubSignature};
///
/// let identifier = Identifier::builder("example")
///     .add(
///         Format::new(FormatId::parse("fmt/41")?, "JPEG File Interchange Format")
///             .with_extension("jpg")
///             .with_signature(Signature::new([
///                 SubSignature::bof(Pattern::parse("FFD8FF")?),
///                 SubSignature::eof(Pattern::parse("FFD9")?),
///             ])?),
///     )
///     .build()?;
///
/// let results = identifier.identify_bytes(b"\xFF\xD8\xFF\xE0 ... \xFF\xD9", "photo.jpg", None);
/// assert_eq!(results[0].id().to_string(), "fmt/41");
/// # Ok::<(), quince::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Identifier {
    corpus: Arc<Corpus>,
    config: Config,
}

impl Identifier {
    pub fn builder(name: impl Into<String>) -> IdentifierBuilder {
        IdentifierBuilder::new(name)
    }

    pub(crate) fn from_parts(corpus: Arc<Corpus>, config: Config) -> Self {
        Self { corpus, config }
    }

    pub(crate) fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Name given to the builder; copied into every result.
    pub fn name(&self) -> &str {
        &self.corpus.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Same corpus under a different configuration.
    pub fn with_config(&self, config: Config) -> Self {
        Self {
            corpus: Arc::clone(&self.corpus),
            config,
        }
    }

    /// Formats in the order they were added.
    pub fn formats(&self) -> impl Iterator<Item = &Format> {
        self.corpus.formats.iter()
    }

    pub fn format(&self, id: &FormatId) -> Option<&Format> {
        self.corpus.lookup(id).map(|i| &self.corpus.formats[i])
    }

    /// Identify a seekable source.
    ///
    /// Only the head and tail windows are read, plus container members when
    /// the source is a container. `name` is used for extension signals and
    /// as the outermost element of container contexts; `mime` is advisory.
    ///
    /// # Errors
    ///
    /// [`Error::Io`](crate::Error::Io) if the source cannot be read or
    /// sought. An unrecognized source is `Ok(vec![])`.
    pub fn identify<R: Read + Seek>(
        &self,
        reader: &mut R,
        name: &str,
        mime: Option<&str>,
    ) -> Result<Vec<MatchResult>> {
        Ok(self.identify_report(reader, name, mime)?.matches)
    }

    /// Like [`identify`](Self::identify), also returning warnings and timing.
    #[instrument(level = "debug", skip(self, reader), fields(identifier = %self.corpus.name))]
    pub fn identify_report<R: Read + Seek>(
        &self,
        reader: &mut R,
        name: &str,
        mime: Option<&str>,
    ) -> Result<Identification> {
        let start = Instant::now();
        let window = Window::read_seekable(reader, self.corpus.window_spec(&self.config))?;
        Ok(self.run(&window, Some(reader), name, mime, start))
    }

    /// Identify a source that can only be read forward once.
    ///
    /// The stream is read to its end keeping a bounded head and a rolling
    /// tail. Containers are walked only when the whole stream fit in the
    /// window.
    pub fn identify_stream<R: Read>(
        &self,
        reader: &mut R,
        name: &str,
        mime: Option<&str>,
    ) -> Result<Vec<MatchResult>> {
        let start = Instant::now();
        let window = Window::read_stream(reader, self.corpus.window_spec(&self.config))?;
        Ok(self
            .run::<Cursor<&[u8]>>(&window, None, name, mime, start)
            .matches)
    }

    /// Identify an in-memory buffer. Reading a slice cannot fail.
    pub fn identify_bytes(&self, data: &[u8], name: &str, mime: Option<&str>) -> Vec<MatchResult> {
        self.identify_bytes_report(data, name, mime).matches
    }

    pub fn identify_bytes_report(&self, data: &[u8], name: &str, mime: Option<&str>) -> Identification {
        let start = Instant::now();
        let window = Window::from_slice(data, self.corpus.window_spec(&self.config));
        self.run(&window, Some(&mut Cursor::new(data)), name, mime, start)
    }

    /// Identify a file on disk, using its file name as the name hint.
    pub fn identify_file<P: AsRef<Path>>(&self, path: P) -> Result<Identification> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let mut file = File::open(path)?;
        self.identify_report(&mut file, &name, None)
    }

    /// Identify independent buffers on the rayon pool.
    ///
    /// The output is in input order.
    pub fn identify_all(&self, items: &[(&[u8], &str)]) -> Vec<Vec<MatchResult>> {
        items
            .par_iter()
            .map(|(data, name)| self.identify_bytes(data, name, None))
            .collect()
    }

    fn run<R: Read + Seek>(
        &self,
        window: &Window,
        reader: Option<&mut R>,
        name: &str,
        mime: Option<&str>,
        start: Instant,
    ) -> Identification {
        let mut session = Session::new(&self.corpus, &self.config);
        let path = [name.to_string()];
        let matches = session.examine(window, reader, Hints::new(name, mime), &path, 0);
        session.finish(matches, start.elapsed())
    }
}
