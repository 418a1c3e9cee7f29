use std::time::Duration;

use log::debug;
use reqwest::{
    StatusCode,
    blocking::{Client, Response},
};

use crate::{
    BatchError,
    core::item::{ItemProcessor, ItemProcessorResult},
    error::EnrichmentError,
    item::person::{Person, Photo},
};

/// Builds the HTTP client shared by all enrichment calls of a job.
///
/// `timeout` bounds every request; it is the only timeout applied to the
/// enrichment stage.
pub fn http_client(timeout: Duration) -> Result<Client, BatchError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| BatchError::Configuration(error.to_string()))
}

/// Looks up the photo of each person by id and sets its thumbnail.
///
/// Sends `GET {base_url}/{id}` and expects a JSON body with a `thumbnailUrl`.
/// Failures map to [`EnrichmentError`]: `Timeout` when the request timed
/// out, `NotFound` on HTTP 404, `Remote` for anything else.
pub struct PhotoThumbnailProcessor {
    client: Client,
    base_url: String,
}

impl PhotoThumbnailProcessor {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn fetch_photo(&self, url: &str) -> Result<Photo, EnrichmentError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|error| to_enrichment_error(url, error))?;

        Self::check_status(url, &response)?;

        response
            .json::<Photo>()
            .map_err(|error| to_enrichment_error(url, error))
    }

    fn check_status(url: &str, response: &Response) -> Result<(), EnrichmentError> {
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(EnrichmentError::NotFound(url.to_string())),
            status => Err(EnrichmentError::Remote(format!("{}: {}", url, status))),
        }
    }
}

impl ItemProcessor<Person, Person> for PhotoThumbnailProcessor {
    fn process(&self, person: &Person) -> ItemProcessorResult<Person> {
        let url = format!("{}/{}", self.base_url, person.id);
        debug!("Fetching photo {}", url);

        let photo = self.fetch_photo(&url)?;
        Ok(person.with_thumbnail(photo.thumbnail_url))
    }
}

fn to_enrichment_error(url: &str, error: reqwest::Error) -> EnrichmentError {
    if error.is_timeout() {
        EnrichmentError::Timeout(url.to_string())
    } else {
        EnrichmentError::Remote(format!("{}: {}", url, error))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        thread,
    };

    use super::*;

    /// Serves `responses` in order, one per connection, then stops.
    fn serve(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                while reader.read_line(&mut line).unwrap() > 2 {
                    line.clear();
                }
                stream.write_all(response.as_bytes()).unwrap();
            }
        });

        format!("http://{}/photos", address)
    }

    fn person(id: u64) -> Person {
        Person {
            id,
            name: "Ana".to_string(),
            email: "ana@mail.com".to_string(),
            birth_day: "1990-04-01".to_string(),
            age: 34,
            thumbnail: None,
        }
    }

    fn processor(base_url: &str, timeout: Duration) -> PhotoThumbnailProcessor {
        PhotoThumbnailProcessor::new(http_client(timeout).unwrap(), base_url)
    }

    #[test]
    fn sets_thumbnail_from_photo() {
        let body = r#"{"id":1,"thumbnailUrl":"https://via.placeholder.com/150/92c952"}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let base_url = serve(vec![response]);

        let enriched = processor(&base_url, Duration::from_secs(5))
            .process(&person(1))
            .unwrap();

        assert_eq!(
            enriched.thumbnail.as_deref(),
            Some("https://via.placeholder.com/150/92c952")
        );
    }

    #[test]
    fn not_found_status_maps_to_not_found() {
        let base_url = serve(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
        ]);

        let result = processor(&base_url, Duration::from_secs(5)).process(&person(99));

        assert!(matches!(
            result,
            Err(BatchError::Enrichment(EnrichmentError::NotFound(_)))
        ));
    }

    #[test]
    fn server_error_maps_to_remote() {
        let base_url = serve(vec![
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string(),
        ]);

        let result = processor(&base_url, Duration::from_secs(5)).process(&person(1));

        assert!(matches!(
            result,
            Err(BatchError::Enrichment(EnrichmentError::Remote(_)))
        ));
    }

    #[test]
    fn silent_server_maps_to_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/photos", listener.local_addr().unwrap());

        let result = processor(&base_url, Duration::from_millis(100)).process(&person(1));

        assert!(matches!(
            result,
            Err(BatchError::Enrichment(EnrichmentError::Timeout(_)))
        ));
        drop(listener);
    }
}
