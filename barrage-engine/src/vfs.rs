//! Virtual filesystem seam.
//!
//! Archive and texture bytes resolve through [`Vfs`] so the engine never
//! touches the disk layout directly; the game shell decides whether assets
//! come from loose files, a packed archive, or memory.

use std::io;
use std::path::PathBuf;

use hashbrown::HashMap;

pub trait Vfs {
    fn read(&mut self, path: &str) -> io::Result<Vec<u8>>;
}

/// Reads files relative to a root directory.
pub struct DiskVfs {
    root: PathBuf,
}

impl DiskVfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Vfs for DiskVfs {
    fn read(&mut self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }
}

/// In-memory filesystem for tests and packed-asset shells.
#[derive(Default)]
pub struct MemoryVfs {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) -> &mut Self {
        self.files.insert(path.into(), bytes);
        self
    }
}

impl Vfs for MemoryVfs {
    fn read(&mut self, path: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}
