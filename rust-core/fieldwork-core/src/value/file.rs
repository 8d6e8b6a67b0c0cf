//! File-like values held by `IoField` and `FileField`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Anything that can back a [`FileHandle`]
pub trait FileLike: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> FileLike for T {}

/// Shared handle to an open file-like object
///
/// Cloning shares the underlying stream; equality is identity.
#[derive(Clone)]
pub struct FileHandle {
    name: String,
    inner: Arc<Mutex<Option<Box<dyn FileLike>>>>,
    readable: bool,
    writable: bool,
}

impl FileHandle {
    /// Wrap an open stream, readable and writable
    pub fn new(name: impl Into<String>, stream: impl FileLike + 'static) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(Some(Box::new(stream)))),
            readable: true,
            writable: true,
        }
    }

    /// Open a file on disk for reading and writing
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file: File = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(path.to_string_lossy(), file))
    }

    /// Override the access flags
    #[must_use]
    pub const fn with_mode(mut self, readable: bool, writable: bool) -> Self {
        self.readable = readable;
        self.writable = writable;
        self
    }

    /// File name (or path) the handle was opened with
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased extension of the file name, without the dot
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Whether the handle may be read from
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.readable
    }

    /// Whether the handle may be written to
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    /// Whether the stream has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Close the stream; later operations fail
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut stream) = guard.take() {
            let _ = stream.flush();
        }
    }

    /// Size of the stream in bytes, leaving the cursor where it was
    ///
    /// # Errors
    ///
    /// Fails if the handle is closed or the stream cannot seek.
    pub fn size(&self) -> io::Result<u64> {
        self.with_stream(|stream| {
            let position = stream.stream_position()?;
            let end = stream.seek(SeekFrom::End(0))?;
            stream.seek(SeekFrom::Start(position))?;
            Ok(end)
        })
    }

    /// Read the whole stream from the start
    ///
    /// # Errors
    ///
    /// Fails if the handle is closed or unreadable.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        if !self.readable {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "not readable"));
        }
        self.with_stream(|stream| {
            stream.seek(SeekFrom::Start(0))?;
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf)?;
            Ok(buf)
        })
    }

    fn with_stream<R>(
        &self,
        f: impl FnOnce(&mut (dyn FileLike + 'static)) -> io::Result<R>,
    ) -> io::Result<R> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(stream) => f(&mut **stream),
            None => Err(io::Error::other("I/O operation on closed file")),
        }
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_size_keeps_position() {
        let handle = FileHandle::new("notes.txt", Cursor::new(b"hello world".to_vec()));
        assert_eq!(handle.size().unwrap(), 11);
        assert_eq!(handle.read_all().unwrap(), b"hello world");
        assert_eq!(handle.extension().as_deref(), Some("txt"));
    }

    #[test]
    fn test_close() {
        let handle = FileHandle::new("a.bin", Cursor::new(Vec::new()));
        let shared = handle.clone();
        assert!(!handle.is_closed());
        shared.close();
        assert!(handle.is_closed());
        assert!(handle.size().is_err());
        assert_eq!(handle, shared);
    }

    #[test]
    fn test_open_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"abc").unwrap();
        let handle = FileHandle::open(tmp.path()).unwrap();
        assert_eq!(handle.size().unwrap(), 3);
        assert!(handle.is_readable() && handle.is_writable());
    }
}
