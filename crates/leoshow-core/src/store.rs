use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

/// Size and modification time of one store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub size: u64,
    pub mtime: SystemTime,
}

/// Directory abstraction the garbage collector and allocator work against.
///
/// The filesystem backing is the real one; the trait exists so tests can
/// substitute an in-memory store with controllable sizes and mtimes. All
/// mutation of the shared store goes through these operations.
pub trait Store {
    type Handle: Write;

    /// Stat a named entry. `NotFound` when absent; any other error is a
    /// read failure the caller must tolerate conservatively.
    fn stat(&self, name: &str) -> io::Result<EntryStat>;

    /// Atomically create `name` for exclusive writing. Returns `Ok(None)`
    /// when the name is already taken, which callers treat as a retryable
    /// collision rather than an error.
    fn try_create(&self, name: &str) -> io::Result<Option<Self::Handle>>;

    /// Delete a named entry; succeeds silently if it is already absent.
    fn delete(&self, name: &str) -> io::Result<()>;

    /// List up to `cap` entry names. The cap bounds the cost of a sweep
    /// over a pathologically large directory; no ordering is guaranteed.
    fn entries(&self, cap: usize) -> io::Result<Vec<String>>;

    fn exists(&self, name: &str) -> bool {
        self.stat(name).is_ok()
    }
}

/// Store rooted at a single flat directory, the entry name being the file
/// name. Subdirectories are ignored by listing and never created.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Store for FsStore {
    type Handle = File;

    fn stat(&self, name: &str) -> io::Result<EntryStat> {
        let meta = fs::metadata(self.entry_path(name))?;
        Ok(EntryStat {
            size: meta.len(),
            mtime: meta.modified()?,
        })
    }

    fn try_create(&self, name: &str) -> io::Result<Option<File>> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.entry_path(name))
        {
            Ok(file) => Ok(Some(file)),
            Err(err) if err.kind() == IoErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn delete(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.entry_path(name)) {
            Ok(()) => {
                debug!(name, "store entry deleted");
                Ok(())
            }
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn entries(&self, cap: usize) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            if names.len() >= cap {
                break;
            }
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct MemEntry {
        bytes: Vec<u8>,
        // Reported size can exceed the actual payload so GC tests can model
        // multi-MiB entries without allocating them.
        size: u64,
        mtime: SystemTime,
    }

    type Shared = Arc<Mutex<BTreeMap<String, MemEntry>>>;

    /// In-memory store with settable sizes and mtimes.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct MemStore {
        inner: Shared,
    }

    impl MemStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn seed(&self, name: &str, size: u64, mtime: SystemTime) {
            let mut map = self.inner.lock().unwrap();
            map.insert(
                name.to_string(),
                MemEntry {
                    bytes: Vec::new(),
                    size,
                    mtime,
                },
            );
        }

        pub(crate) fn contents(&self, name: &str) -> Option<Vec<u8>> {
            let map = self.inner.lock().unwrap();
            map.get(name).map(|entry| entry.bytes.clone())
        }

        pub(crate) fn names(&self) -> Vec<String> {
            let map = self.inner.lock().unwrap();
            map.keys().cloned().collect()
        }

        pub(crate) fn total_size(&self) -> u64 {
            let map = self.inner.lock().unwrap();
            map.values().map(|entry| entry.size).sum()
        }
    }

    #[derive(Debug)]
    pub(crate) struct MemHandle {
        inner: Shared,
        name: String,
    }

    impl Write for MemHandle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut map = self.inner.lock().unwrap();
            let entry = map
                .get_mut(&self.name)
                .ok_or_else(|| io::Error::new(IoErrorKind::NotFound, "entry deleted"))?;
            entry.bytes.extend_from_slice(buf);
            entry.size += buf.len() as u64;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Store for MemStore {
        type Handle = MemHandle;

        fn stat(&self, name: &str) -> io::Result<EntryStat> {
            let map = self.inner.lock().unwrap();
            map.get(name)
                .map(|entry| EntryStat {
                    size: entry.size,
                    mtime: entry.mtime,
                })
                .ok_or_else(|| io::Error::new(IoErrorKind::NotFound, "no such entry"))
        }

        fn try_create(&self, name: &str) -> io::Result<Option<MemHandle>> {
            let mut map = self.inner.lock().unwrap();
            if map.contains_key(name) {
                return Ok(None);
            }
            map.insert(
                name.to_string(),
                MemEntry {
                    bytes: Vec::new(),
                    size: 0,
                    mtime: SystemTime::now(),
                },
            );
            Ok(Some(MemHandle {
                inner: Arc::clone(&self.inner),
                name: name.to_string(),
            }))
        }

        fn delete(&self, name: &str) -> io::Result<()> {
            let mut map = self.inner.lock().unwrap();
            map.remove(name);
            Ok(())
        }

        fn entries(&self, cap: usize) -> io::Result<Vec<String>> {
            let map = self.inner.lock().unwrap();
            Ok(map.keys().take(cap).cloned().collect())
        }
    }
}
