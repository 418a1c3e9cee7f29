use std::{
    cell::RefCell,
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use serde::Serialize;

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    BatchError,
};

/// Writes items as JSON lines, one object per line.
///
/// Items of a chunk are serialized into a buffer by `write` and reach the
/// destination on `flush`; a chunk that fails to serialize writes nothing.
/// The buffer is discarded once flushed, failed or not, so a chunk whose
/// flush failed never reaches the destination later.
pub struct JsonItemWriter<W: Write> {
    stream: RefCell<W>,
    buffer: RefCell<Vec<u8>>,
    use_pretty_formatter: bool,
}

impl<W: Write, T: Serialize> ItemWriter<T> for JsonItemWriter<W> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        let mut buffer = self.buffer.borrow_mut();
        buffer.clear();

        for item in items {
            let result = if self.use_pretty_formatter {
                serde_json::to_writer_pretty(&mut *buffer, item)
            } else {
                serde_json::to_writer(&mut *buffer, item)
            };
            result.map_err(|error| BatchError::ItemWriter(error.to_string()))?;
            buffer.push(b'\n');
        }

        Ok(())
    }

    fn flush(&self) -> ItemWriterResult {
        let mut buffer = self.buffer.borrow_mut();
        let mut stream = self.stream.borrow_mut();

        let result = stream.write_all(&buffer).and_then(|()| stream.flush());
        buffer.clear();

        result.map_err(|error| BatchError::ItemWriter(error.to_string()))
    }
}

/// Builder for a [`JsonItemWriter`].
#[derive(Default)]
pub struct JsonItemWriterBuilder {
    pretty_formatter: bool,
    append: bool,
}

impl JsonItemWriterBuilder {
    pub fn new() -> Self {
        Self {
            pretty_formatter: false,
            append: false,
        }
    }

    pub fn pretty_formatter(mut self, yes: bool) -> Self {
        self.pretty_formatter = yes;
        self
    }

    /// Appends to an existing file instead of truncating it, as needed when
    /// resuming a step.
    pub fn append(mut self, yes: bool) -> Self {
        self.append = yes;
        self
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> JsonItemWriter<W> {
        JsonItemWriter {
            stream: RefCell::new(wtr),
            buffer: RefCell::new(Vec::new()),
            use_pretty_formatter: self.pretty_formatter,
        }
    }

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<JsonItemWriter<File>, BatchError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(path)
            .map_err(|error| BatchError::ItemWriter(format!("{}: {}", path.display(), error)))?;

        Ok(self.from_writer(file))
    }
}
