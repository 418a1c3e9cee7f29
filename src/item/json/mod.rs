/// JSON support for writing structured data.
///
/// The JSON writer serializes items with `serde_json` as JSON lines: one
/// object per line, one chunk per flush. The line-oriented format lets a
/// resumed step append its chunks to the output of the interrupted run.
///
/// # Examples
///
/// ```
/// use async_batch_rs::item::json::json_writer::JsonItemWriterBuilder;
/// use async_batch_rs::core::item::ItemWriter;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// let users = vec![
///     User { id: 1, name: "Alice".to_string() },
///     User { id: 2, name: "Bob".to_string() },
/// ];
///
/// let writer = JsonItemWriterBuilder::new().from_writer(Vec::<u8>::new());
/// ItemWriter::<User>::write(&writer, &users).unwrap();
/// ItemWriter::<User>::flush(&writer).unwrap();
/// ```

/// A module providing facilities for writing JSON lines.
pub mod json_writer;
