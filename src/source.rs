//! Input sources for a crosswalk.
//!
//! A crosswalk reads its input twice: once for schema validation and once for
//! parsing. Streams cannot be rewound in general, so every source is drained
//! into a single buffer up front and each pass opens its own reader over that
//! buffer. Streams and files are closed as soon as the buffer is filled.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Where the XML of a crosswalk comes from.
pub enum Source<'a> {
    /// A file on disk
    File(PathBuf),
    /// XML text held in memory
    Xml(Cow<'a, str>),
    /// Raw XML bytes held in memory
    Bytes(Cow<'a, [u8]>),
    /// An already open stream
    Reader(Box<dyn Read + 'a>),
}

impl<'a> Source<'a> {
    /// A file path.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Source::File(path.as_ref().to_path_buf())
    }

    /// XML text.
    pub fn xml(xml: impl Into<Cow<'a, str>>) -> Self {
        Source::Xml(xml.into())
    }

    /// Raw bytes.
    pub fn bytes(bytes: impl Into<Cow<'a, [u8]>>) -> Self {
        Source::Bytes(bytes.into())
    }

    /// An open stream. It is read to the end and dropped by the crosswalk.
    pub fn reader(reader: impl Read + 'a) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// Drains the source into memory.
    ///
    /// In-memory sources are borrowed, not copied.
    pub fn into_bytes(self) -> io::Result<Cow<'a, [u8]>> {
        match self {
            Source::File(path) => {
                let mut file = File::open(&path).map_err(|e| {
                    io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
                })?;
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;
                Ok(Cow::Owned(buf))
            }
            Source::Xml(Cow::Borrowed(s)) => Ok(Cow::Borrowed(s.as_bytes())),
            Source::Xml(Cow::Owned(s)) => Ok(Cow::Owned(s.into_bytes())),
            Source::Bytes(bytes) => Ok(bytes),
            Source::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Cow::Owned(buf))
            }
        }
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => f.debug_tuple("File").field(path).finish(),
            Source::Xml(xml) => f.debug_tuple("Xml").field(&xml.len()).finish(),
            Source::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Source::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}
