//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use bucketsync_core::Namespace;
use bucketsync_store::{MemoryStore, Result as StoreResult};

/// A temporary directory tree, removed on drop.
pub struct TreeFixture {
    dir: TempDir,
}

impl TreeFixture {
    /// Create an empty tree.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// The root of the tree.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a slash-separated relative path.
    pub fn path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .fold(self.root().to_path_buf(), |path, part| path.join(part))
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, contents: impl AsRef<[u8]>) -> io::Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Create a directory and its parents.
    pub fn mkdir(&self, relative: &str) -> io::Result<PathBuf> {
        let path = self.path(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    pub fn remove(&self, relative: &str) -> io::Result<()> {
        fs::remove_file(self.path(relative))
    }

    /// Invert one byte of an existing file, keeping its length.
    pub fn flip_byte(&self, relative: &str, offset: usize) -> io::Result<()> {
        let path = self.path(relative);
        let mut contents = fs::read(&path)?;
        let byte = contents.get_mut(offset).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "offset past end of file")
        })?;
        *byte = !*byte;
        fs::write(path, contents)
    }
}

/// A small static website: the shape bucketsync is usually pointed at.
pub fn site_fixture() -> io::Result<TreeFixture> {
    let tree = TreeFixture::new()?;
    tree.write("index.html", "<!doctype html><title>home</title>")?;
    tree.write("about/index.html", "<!doctype html><title>about</title>")?;
    tree.write("css/site.css", "body { margin: 0 }")?;
    tree.write("js/app.js", "console.log('hi');")?;
    tree.write("img/logo.png", [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])?;
    tree.write("robots.txt", "User-agent: *\n")?;
    Ok(tree)
}

/// A memory store with `namespace` already created.
pub fn memory_store(namespace: &str) -> StoreResult<(MemoryStore, Namespace)> {
    let store = MemoryStore::new();
    let namespace = Namespace::from(namespace);
    store.create_namespace(&namespace)?;
    Ok((store, namespace))
}
