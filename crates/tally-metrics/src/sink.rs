//! Snapshot line destinations

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Destination for snapshot lines.
///
/// A drain checks [`is_writable`](Sink::is_writable) first and skips the whole
/// cycle when it returns `false`. Each drain then makes exactly one
/// [`write_line`](Sink::write_line) call, which must land as one unit.
pub trait Sink {
    /// Whether the sink can currently accept a line
    fn is_writable(&self) -> bool;

    /// Write one complete line, terminator included
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}

/// Sink over any [`Write`] implementation.
///
/// The sink is open while it holds a writer. A closed sink reports itself
/// unwritable, so drains against it are skipped.
#[derive(Debug)]
pub struct StreamSink<W: Write> {
    writer: Option<W>,
}

impl<W: Write> StreamSink<W> {
    /// Open sink over `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    /// Sink that was never opened
    pub fn closed() -> Self {
        Self { writer: None }
    }

    /// Flush and release the writer. Later drains are skipped.
    pub fn close(&mut self) -> io::Result<Option<W>> {
        match self.writer.take() {
            Some(mut w) => {
                w.flush()?;
                Ok(Some(w))
            }
            None => Ok(None),
        }
    }

    /// Whether a writer is attached
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Borrow the writer, if open
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    /// Take the writer out, if open
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

impl<W: Write> Sink for StreamSink<W> {
    fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sink is closed"))?;
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}

/// File-backed sink
pub type FileSink = StreamSink<File>;

impl StreamSink<File> {
    /// Open `path` for appending, creating it and its parent directories.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        create_parent(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }

    /// Open `path` truncated, creating it and its parent directories.
    pub fn truncate(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        create_parent(path)?;
        Ok(Self::new(File::create(path)?))
    }
}

fn create_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
