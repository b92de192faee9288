//! Storage seam between the clip core and the device filesystem
//!
//! The muxer only needs a seekable reader for a stored clip (and its
//! companion WAV), and audio capture only needs a writer for the finished
//! WAV. [`FsStorage`] maps names onto a directory; [`MemoryStorage`] keeps
//! everything in RAM for tests and tooling.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::ClipResult;

/// Named byte storage holding recorded clips
pub trait ClipStorage {
    type Reader: Read + Seek;
    type Writer: Write;

    /// Open a stored file for reading, `None` if it does not exist
    fn open(&self, name: &str) -> ClipResult<Option<Self::Reader>>;

    /// Create (or truncate) a file for writing
    fn create(&self, name: &str) -> ClipResult<Self::Writer>;
}

/// Length of a seekable source; leaves the cursor at the start
pub fn stream_len<S: Seek>(source: &mut S) -> io::Result<u64> {
    let len = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;
    Ok(len)
}

/// Storage rooted at a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

impl ClipStorage for FsStorage {
    type Reader = File;
    type Writer = BufWriter<File>;

    fn open(&self, name: &str) -> ClipResult<Option<File>> {
        match File::open(self.resolve(name)) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self, name: &str) -> ClipResult<BufWriter<File>> {
        let path = self.resolve(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(BufWriter::new(File::create(path)?))
    }
}

type FileMap = HashMap<String, Vec<u8>>;

/// In-memory storage, cheap to clone and share between threads
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<FileMap>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, FileMap> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, name: impl Into<String>, data: Vec<u8>) {
        self.files().insert(name.into(), data);
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files().contains_key(name)
    }
}

/// Writer that publishes its contents to a [`MemoryStorage`] on flush and drop
#[derive(Debug)]
pub struct MemoryWriter {
    name: String,
    data: Vec<u8>,
    storage: MemoryStorage,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.storage.insert(self.name.clone(), self.data.clone());
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.storage
            .insert(self.name.clone(), std::mem::take(&mut self.data));
    }
}

impl ClipStorage for MemoryStorage {
    type Reader = Cursor<Vec<u8>>;
    type Writer = MemoryWriter;

    fn open(&self, name: &str) -> ClipResult<Option<Cursor<Vec<u8>>>> {
        Ok(self.get(name).map(Cursor::new))
    }

    fn create(&self, name: &str) -> ClipResult<MemoryWriter> {
        self.insert(name, Vec::new());
        Ok(MemoryWriter {
            name: name.to_string(),
            data: Vec::new(),
            storage: self.clone(),
        })
    }
}
