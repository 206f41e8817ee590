//! State of a single identification call.

use super::Corpus;
use crate::config::Config;
use crate::container;
use crate::matcher::{self, Window};
use crate::resolver::{ContainerContext, Hints, Identification, MatchResult, Warning, resolve};
use std::io::{Cursor, Read, Seek};
use std::time::Duration;
use tracing::{debug, warn};

/// Warnings raised so far; results are returned from [`Session::examine`].
///
/// A session lives for one call, so nothing is shared between calls.
pub(crate) struct Session<'a> {
    pub corpus: &'a Corpus,
    pub config: &'a Config,
    warnings: Vec<Warning>,
}

impl<'a> Session<'a> {
    pub fn new(corpus: &'a Corpus, config: &'a Config) -> Self {
        Self {
            corpus,
            config,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: Warning) {
        warn!(identifier = %self.corpus.name, %warning, "identification degraded");
        self.warnings.push(warning);
    }

    /// Identify the stream behind `window` and walk it if it is a container.
    ///
    /// `reader` is the original source when one is available; otherwise only
    /// a complete window can be walked. The results for this stream come
    /// first, followed by the results of its members.
    pub fn examine<R: Read + Seek>(
        &mut self,
        window: &Window,
        reader: Option<&mut R>,
        hints: Hints<'_>,
        path: &[String],
        depth: usize,
    ) -> Vec<MatchResult> {
        let mut hits = matcher::scan(self.corpus, window, self.config);
        let mut resolution = resolve(self.corpus, &hits, &hints, self.config);
        let mut nested = Vec::new();

        let kind = resolution
            .results
            .iter()
            .filter(|result| !result.is_hint_only())
            .filter_map(|result| self.corpus.lookup(result.id()))
            .find_map(|fi| self.corpus.formats[fi].container());

        if let Some(kind) = kind {
            let container_hits = match (reader, window.contents()) {
                (Some(reader), _) => container::walk(self, kind, reader, path, depth, &mut nested),
                (None, Some(data)) => {
                    container::walk(self, kind, &mut Cursor::new(data), path, depth, &mut nested)
                },
                (None, None) => {
                    debug!(
                        path = %path.join(" -> "),
                        %kind,
                        len = window.len(),
                        "container too large to walk"
                    );
                    Vec::new()
                },
            };
            if !container_hits.is_empty() {
                hits.extend(container_hits);
                resolution = resolve(self.corpus, &hits, &hints, self.config);
            }
        }

        if depth == 0 && resolution.hint_only {
            self.warn(Warning::ExtensionOnly);
        }

        let mut results = resolution.results;
        if depth > 0 {
            let context = ContainerContext::new(path.to_vec());
            for result in &mut results {
                result.context = Some(context.clone());
            }
        }
        results.extend(nested);
        results
    }

    pub fn finish(mut self, matches: Vec<MatchResult>, elapsed: Duration) -> Identification {
        let threshold = self.config.latency_warning;
        if elapsed > threshold {
            self.warn(Warning::Slow { elapsed, threshold });
        }
        Identification {
            matches,
            warnings: self.warnings,
            elapsed,
        }
    }
}
