use std::{
    cell::RefCell,
    fmt::Display,
    io::{self, Stdout, Write},
};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    BatchError,
};

/// Prints one line per item using its `Display` form.
///
/// Lines of a chunk are buffered and reach the underlying stream only on
/// `flush`, so a chunk is printed as a whole or not at all.
pub struct ConsoleItemWriter<W: Write> {
    out: RefCell<W>,
    buffer: RefCell<Vec<u8>>,
}

impl ConsoleItemWriter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleItemWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
            buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write, T: Display> ItemWriter<T> for ConsoleItemWriter<W> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        let mut buffer = self.buffer.borrow_mut();
        buffer.clear();
        for item in items {
            writeln!(buffer, "{}", item)
                .map_err(|error| BatchError::ItemWriter(error.to_string()))?;
        }
        Ok(())
    }

    fn flush(&self) -> ItemWriterResult {
        let mut buffer = self.buffer.borrow_mut();
        let mut out = self.out.borrow_mut();

        let result = out.write_all(&buffer).and_then(|()| out.flush());
        buffer.clear();

        result.map_err(|error| BatchError::ItemWriter(error.to_string()))
    }
}
