/// Enrichment of person records through the photo HTTP API.
pub mod photo_processor;
