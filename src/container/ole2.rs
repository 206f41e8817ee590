use super::{Container, Loaded};
use crate::common::Result;
use crate::identifier::ContainerKind;
use crate::matcher::{Window, WindowSpec};
use crate::ole::OleFile;
use std::io::{Read, Seek};

/// OLE2 compound document opened for stream access.
///
/// Member names are full stream paths; lookups ignore ASCII case the way
/// compound-document directories do.
pub(crate) struct Ole2Container<R: Read + Seek> {
    file: OleFile<R>,
    names: Vec<String>,
}

impl<R: Read + Seek> Ole2Container<R> {
    pub fn open(reader: R) -> Result<Self> {
        let file = OleFile::open(reader)?;
        let names = file.stream_paths().map(str::to_string).collect();
        Ok(Self { file, names })
    }
}

impl<R: Read + Seek> Container for Ole2Container<R> {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Ole2
    }

    fn members(&self) -> &[String] {
        &self.names
    }

    fn find(&self, name: &str) -> Option<&str> {
        self.file.find(name)
    }

    fn load(&mut self, name: &str, _spec: WindowSpec, limit: usize) -> Loaded {
        match self.file.stream_size(name) {
            Some(size) if size > limit as u64 => Loaded::TooLarge(size),
            Some(_) => match self.file.open_stream(name) {
                Ok(data) => Loaded::Window(Window::from_vec(data)),
                Err(e) => Loaded::Failed(e.to_string()),
            },
            None => Loaded::Failed(format!("no stream named {name}")),
        }
    }
}
