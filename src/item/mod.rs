/// The client record flowing through the import pipeline.
pub mod person;

/// Writer printing items to the standard output.
pub mod console;

#[cfg(feature = "logger")]
/// This module provides a logger item writer implementation.
pub mod logger;

#[cfg(feature = "csv")]
/// This module provides a CSV item reader implementation.
pub mod csv;

#[cfg(feature = "json")]
/// This module provides a JSON lines item writer implementation.
pub mod json;

#[cfg(feature = "http")]
/// This module provides an HTTP enrichment processor implementation.
pub mod http;
