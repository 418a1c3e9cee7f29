use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use serde::de::DeserializeOwned;
use std::{
    cell::RefCell,
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
};

/// A CSV item reader that implements the `ItemReader` trait.
///
/// This reader deserializes delimited lines into Rust structs one at a time,
/// using Serde. Fields are matched by name when field names are configured
/// (or read from the header row), by position otherwise.
///
/// # Implementation Details
///
/// - Uses a `RefCell` to provide interior mutability for the CSV record iterator
/// - Lines starting with the comment prefix are removed from the input before
///   it is parsed, so they are never returned nor counted and quotes inside
///   them cannot open a field
/// - A line with the wrong number of fields, or a field that cannot be
///   converted, is reported as `BatchError::ItemReader` with its line number;
///   the next call continues with the following line
///
/// # Examples
///
/// ```
/// use async_batch_rs::item::csv::csv_reader::CsvItemReaderBuilder;
/// use async_batch_rs::core::item::ItemReader;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Record {
///     name: String,
///     value: i32,
/// }
///
/// let data = "\
/// -- exported values
/// foo,123
/// bar,456
/// ";
///
/// let reader = CsvItemReaderBuilder::new()
///     .field_names(&["name", "value"])
///     .comment_prefix("--")
///     .from_reader(data.as_bytes());
///
/// let record: Record = reader.read().unwrap().unwrap();
/// assert_eq!(record.name, "foo");
/// assert_eq!(record.value, 123);
///
/// let record: Record = reader.read().unwrap().unwrap();
/// assert_eq!(record.name, "bar");
///
/// assert!(ItemReader::<Record>::read(&reader).unwrap().is_none());
/// ```
pub struct CsvItemReader<R> {
    /// Iterator over the CSV records
    records: RefCell<StringRecordsIntoIter<CommentFilter<R>>>,
    /// Names used to deserialize fields by name
    field_names: Option<StringRecord>,
}

impl<R: Read> CsvItemReader<R> {
    /// Next record, or `None` at the end of input.
    fn next_record(&self) -> Option<Result<StringRecord, BatchError>> {
        match self.records.borrow_mut().next()? {
            Ok(record) => Some(Ok(record)),
            Err(error) => Some(Err(BatchError::ItemReader(error.to_string()))),
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, record: &StringRecord) -> Result<T, BatchError> {
        let line = record.position().map(|position| position.line()).unwrap_or_default();

        if let Some(field_names) = &self.field_names {
            if record.len() != field_names.len() {
                return Err(BatchError::ItemReader(format!(
                    "line {}: expected {} fields, found {}",
                    line,
                    field_names.len(),
                    record.len()
                )));
            }
        }

        record
            .deserialize(self.field_names.as_ref())
            .map_err(|error| BatchError::ItemReader(format!("line {}: {}", line, error)))
    }
}

impl<R: Read, T: DeserializeOwned> ItemReader<T> for CsvItemReader<R> {
    /// Reads the next item from the CSV source.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a record is successfully read
    /// - `Ok(None)` if there are no more records to read
    /// - `Err(BatchError::ItemReader(error))` if the line is malformed
    fn read(&self) -> ItemReaderResult<T> {
        match self.next_record() {
            Some(Ok(record)) => self.deserialize(&record).map(Some),
            Some(Err(error)) => Err(error),
            None => Ok(None),
        }
    }

    /// Skips `offset` lines without deserializing them.
    ///
    /// Comments are not counted, malformed lines are, exactly as `read` does.
    fn seek(&self, offset: usize) -> Result<(), BatchError> {
        for _ in 0..offset {
            if self.next_record().is_none() {
                break;
            }
        }
        Ok(())
    }
}

/// Blanks out comment lines of the raw input.
///
/// A comment line is replaced by its bare line terminator: the CSV parser
/// ignores empty lines, and line numbers in error messages stay those of the
/// source file.
struct CommentFilter<R> {
    inner: BufReader<R>,
    prefix: Option<Vec<u8>>,
    line: Vec<u8>,
    pos: usize,
}

impl<R: Read> CommentFilter<R> {
    fn new(inner: R, prefix: Option<String>) -> Self {
        Self {
            inner: BufReader::new(inner),
            prefix: prefix.map(String::into_bytes),
            line: Vec::new(),
            pos: 0,
        }
    }

    /// Loads the next raw line; returns false at the end of input.
    fn next_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        self.pos = 0;

        if self.inner.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(false);
        }

        if let Some(prefix) = &self.prefix {
            if self.line.starts_with(prefix) {
                let terminator = if self.line.ends_with(b"\r\n") {
                    2
                } else if self.line.ends_with(b"\n") {
                    1
                } else {
                    0
                };
                self.line.drain(..self.line.len() - terminator);
            }
        }

        Ok(true)
    }
}

impl<R: Read> Read for CommentFilter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.line.len() {
            if !self.next_line()? {
                return Ok(0);
            }
        }

        let count = buf.len().min(self.line.len() - self.pos);
        buf[..count].copy_from_slice(&self.line[self.pos..self.pos + count]);
        self.pos += count;
        Ok(count)
    }
}

/// A builder for configuring CSV item reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Headers: disabled
/// - Field names: none (fields deserialized by position)
/// - Comment prefix: none
/// - Trimming: All fields trimmed
pub struct CsvItemReaderBuilder {
    /// The delimiter character (default: comma ',')
    delimiter: u8,
    /// Whether the CSV has headers (default: false)
    has_headers: bool,
    field_names: Option<Vec<String>>,
    comment_prefix: Option<String>,
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
            field_names: None,
            comment_prefix: None,
        }
    }

    /// Sets the delimiter character for the CSV parsing.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the first line is a header row.
    ///
    /// When enabled and no field names are configured, the header row
    /// provides the names used to deserialize fields.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    /// Names of the columns, in order.
    ///
    /// Every line must have exactly this many fields.
    pub fn field_names<S: AsRef<str>>(mut self, field_names: &[S]) -> Self {
        self.field_names = Some(
            field_names
                .iter()
                .map(|name| name.as_ref().to_string())
                .collect(),
        );
        self
    }

    /// Lines starting with `prefix` are skipped, whatever they contain.
    pub fn comment_prefix(mut self, prefix: &str) -> Self {
        self.comment_prefix = Some(prefix.to_string());
        self
    }

    /// Creates a `CsvItemReader` from any source implementing `Read`.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvItemReader<R> {
        let mut rdr = ReaderBuilder::new()
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            // Field counts are checked per line so that one bad line does not
            // end the whole file.
            .flexible(true)
            .from_reader(CommentFilter::new(rdr, self.comment_prefix));

        let field_names = match self.field_names {
            Some(names) => Some(StringRecord::from(names)),
            None if self.has_headers => rdr.headers().ok().cloned(),
            None => None,
        };

        CsvItemReader {
            records: RefCell::new(rdr.into_records()),
            field_names,
        }
    }

    /// Creates a `CsvItemReader` reading the file at `path`.
    ///
    /// # Errors
    /// - `BatchError::NotFound` if the file does not exist
    /// - `BatchError::ItemReader` if it cannot be opened for another reason
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemReader<File>, BatchError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => BatchError::NotFound(path.display().to_string()),
            _ => BatchError::ItemReader(format!("{}: {}", path.display(), error)),
        })?;

        Ok(self.from_reader(file))
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::item::person::Person;

    #[derive(Debug, Deserialize, PartialEq)]
    struct City {
        city: String,
        country: String,
        pop: u32,
    }

    const PERSONS: &str = "\
-- name,email,birthDay,age,id
Ana, ana@mail.com, 1990-04-01, 34, 1
Bruno,bruno@mail.com,1985-11-23,39,2
";

    fn person_reader(data: &str) -> CsvItemReader<&[u8]> {
        CsvItemReaderBuilder::new()
            .field_names(&["name", "email", "birthDay", "age", "id"])
            .comment_prefix("--")
            .from_reader(data.as_bytes())
    }

    #[test]
    fn reads_persons_by_field_name_and_skips_comments() {
        let reader = person_reader(PERSONS);

        let first: Person = reader.read().unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.name, "Ana");
        assert_eq!(first.email, "ana@mail.com");
        assert_eq!(first.age, 34);
        assert_eq!(first.thumbnail, None);

        let second: Person = reader.read().unwrap().unwrap();
        assert_eq!(second.birth_day, "1985-11-23");

        assert!(ItemReader::<Person>::read(&reader).unwrap().is_none());
    }

    #[test]
    fn uses_header_row_when_no_field_names() {
        let data = "city,country,pop
        Boston,United States,4628910
        Concord,United States,42695";

        let reader = CsvItemReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());

        let boston: City = reader.read().unwrap().unwrap();
        assert_eq!(
            boston,
            City {
                city: "Boston".to_string(),
                country: "United States".to_string(),
                pop: 4628910
            }
        );
    }

    #[test]
    fn malformed_line_is_reported_and_reading_continues() {
        let data = "\
Ana,ana@mail.com,1990-04-01,thirty,1
Bruno,bruno@mail.com,1985-11-23
Carla,carla@mail.com,2001-02-03,23,3
";
        let reader = person_reader(data);

        let bad_age = ItemReader::<Person>::read(&reader);
        match bad_age {
            Err(BatchError::ItemReader(message)) => assert!(message.starts_with("line 1")),
            other => panic!("unexpected result: {:?}", other),
        }

        let missing_field = ItemReader::<Person>::read(&reader);
        match missing_field {
            Err(BatchError::ItemReader(message)) => {
                assert!(message.contains("expected 5 fields, found 3"))
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let carla: Person = reader.read().unwrap().unwrap();
        assert_eq!(carla.id, 3);
    }

    #[test]
    fn seek_skips_items_but_not_comments() {
        let data = "\
-- header comment
Ana,ana@mail.com,1990-04-01,34,1
-- another comment
Bruno,bruno@mail.com,1985-11-23,39,2
Carla,carla@mail.com,2001-02-03,23,3
";
        let reader = person_reader(data);

        ItemReader::<Person>::seek(&reader, 2).unwrap();

        let next: Person = reader.read().unwrap().unwrap();
        assert_eq!(next.name, "Carla");
    }

    #[test]
    fn quotes_inside_comments_do_not_swallow_records() {
        let data = "\
-- note,\"multi
Ana,ana@mail.com,1990-04-01,34,1
Bruno,bruno@mail.com,1985-11-23,39,2
-- x,\"
Carla,carla@mail.com,2001-02-03,23,3
";
        let reader = person_reader(data);

        let mut ids = Vec::new();
        while let Some(person) = ItemReader::<Person>::read(&reader).unwrap() {
            ids.push(person.id);
        }

        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn line_numbers_count_comment_lines() {
        let data = "\
-- first comment
-- second comment
Ana,ana@mail.com,1990-04-01,34
";
        let reader = person_reader(data);

        match ItemReader::<Person>::read(&reader) {
            Err(BatchError::ItemReader(message)) => assert!(message.starts_with("line 3")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = CsvItemReaderBuilder::new().from_path("does/not/exist.csv");

        assert!(matches!(result, Err(BatchError::NotFound(_))));
    }
}
