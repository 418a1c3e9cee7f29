//! Mock versions of std::fs::File and of an item writer.
use mockall::mock;

use std::io::{self, Write};

use async_batch_rs::core::item::{ItemWriter, ItemWriterResult};

mock! {
    pub File {}
    impl Write for File {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}

mock! {
    pub Writer {}
    impl ItemWriter<u64> for Writer {
        fn write(&self, items: &[u64]) -> ItemWriterResult;
        fn flush(&self) -> ItemWriterResult;
        fn open(&self) -> ItemWriterResult;
        fn close(&self) -> ItemWriterResult;
    }
}
