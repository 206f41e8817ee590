use super::{Container, Loaded};
use crate::common::Result;
use crate::identifier::ContainerKind;
use crate::matcher::{Window, WindowSpec};
use ::zip::ZipArchive;
use std::io::{Read, Seek};

/// ZIP archive opened for member access.
pub(crate) struct ZipContainer<R: Read + Seek> {
    archive: ZipArchive<R>,
    /// File entries in sorted order; directory entries are dropped
    names: Vec<String>,
}

impl<R: Read + Seek> ZipContainer<R> {
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(Self { archive, names })
    }
}

impl<R: Read + Seek> Container for ZipContainer<R> {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Zip
    }

    fn members(&self) -> &[String] {
        &self.names
    }

    fn find(&self, name: &str) -> Option<&str> {
        self.names
            .binary_search_by(|probe| probe.as_str().cmp(name))
            .ok()
            .map(|i| self.names[i].as_str())
    }

    fn load(&mut self, name: &str, spec: WindowSpec, limit: usize) -> Loaded {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(e) => return Loaded::Failed(e.to_string()),
        };
        // Oversized members are read forward once, keeping only both ends.
        if file.size() > limit as u64 {
            return match Window::read_stream(&mut file, spec) {
                Ok(window) => Loaded::Window(window),
                Err(e) => Loaded::Failed(e.to_string()),
            };
        }
        let mut buffer = Vec::with_capacity(file.size() as usize);
        match file.read_to_end(&mut buffer) {
            Ok(_) => Loaded::Window(Window::from_vec(buffer)),
            Err(e) => Loaded::Failed(e.to_string()),
        }
    }
}
