/// CSV support for reading delimited record files.
///
/// The reader deserializes each line into a Rust struct with Serde, matching
/// fields either by configured names, by the header row, or by position. It
/// implements the core `ItemReader` trait, including restart support through
/// `seek`, so it can be plugged directly into a chunk-oriented step.
///
/// # Examples
///
/// ```
/// use async_batch_rs::item::csv::csv_reader::CsvItemReaderBuilder;
/// use async_batch_rs::core::item::ItemReader;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct City {
///     city: String,
///     country: String,
///     pop: u32,
/// }
///
/// let csv_data = "\
/// city;country;pop
/// Boston;United States;4628910
/// Concord;United States;42695
/// ";
///
/// let reader = CsvItemReaderBuilder::new()
///     .has_headers(true)
///     .delimiter(b';')
///     .from_reader(csv_data.as_bytes());
///
/// let mut cities: Vec<City> = Vec::new();
/// while let Some(city) = reader.read().unwrap() {
///     cities.push(city);
/// }
///
/// assert_eq!(cities.len(), 2);
/// assert_eq!(cities[1].city, "Concord");
/// assert_eq!(cities[1].pop, 42695);
/// ```

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;
