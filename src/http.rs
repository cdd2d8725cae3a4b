//! HTTP indexer posting image URLs to the visual search service.
//!
//! Every image becomes one `POST {endpoint}` with the body
//! `{"imageUrl": "..."}`. The service fetches the image itself, so the URL
//! must be reachable from there: either `image_base_url` joined with the
//! path below the walk root, or a `file://` URL when no base is configured.

use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Component, PathBuf};
use std::time::Duration;

use crate::error::IndexError;
use crate::indexer::Indexer;
use crate::models::ImageCandidate;

/// Index endpoint of a locally running service
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/visualsearch/image";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Request body of the index endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexImageRequest<'a> {
    image_url: &'a str,
}

/// Response body of the index endpoint
#[derive(Debug, Deserialize)]
struct IndexImageResponse {
    #[serde(rename = "_id")]
    id: Option<String>,
}

/// Indexer talking to the visual search service over HTTP
#[derive(Debug, Clone)]
pub struct HttpIndexer {
    endpoint: Url,
    image_base_url: Option<Url>,
    client: Client,
}

impl HttpIndexer {
    /// Create an indexer for `endpoint`.
    ///
    /// `image_base_url` is the public location of the walk root; when it is
    /// `None` images are referenced by `file://` URL.
    pub fn new(
        endpoint: &str,
        image_base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let endpoint = parse_url(endpoint)?;
        let image_base_url = image_base_url.map(parse_url).transpose()?;
        if let Some(base) = &image_base_url {
            if base.cannot_be_a_base() {
                return Err(IndexError::InvalidEndpoint {
                    url: base.to_string(),
                    message: "cannot be used as a base url".to_string(),
                });
            }
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            image_base_url,
            client,
        })
    }

    /// Endpoint receiving the submissions
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// URL under which the service can fetch `candidate`
    pub fn image_url(&self, candidate: &ImageCandidate) -> Result<Url, IndexError> {
        let Some(base) = &self.image_base_url else {
            return file_url(candidate);
        };

        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid_url(candidate, "base url cannot carry a path"))?;
            segments.pop_if_empty();
            for component in candidate.relative_path().components() {
                if let Component::Normal(part) = component {
                    segments.push(&part.to_string_lossy());
                }
            }
        }
        Ok(url)
    }
}

impl Indexer for HttpIndexer {
    fn submit(&self, candidate: &ImageCandidate) -> Result<(), IndexError> {
        let image_url = self.image_url(candidate)?;
        let body = IndexImageRequest {
            image_url: image_url.as_str(),
        };

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IndexError::Rejected {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }
        let text = resp
            .text()
            .map_err(|e| IndexError::Transport(format!("reading response body: {}", e)))?;

        match parse_index_response(&text)? {
            Some(id) => log::debug!("Indexed {} as {}", image_url, id),
            None => log::debug!("Indexed {}", image_url),
        }
        Ok(())
    }
}

/// Extract the document id from a successful response.
/// An empty body is accepted; anything else must be JSON.
pub fn parse_index_response(body: &str) -> Result<Option<String>, IndexError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let resp: IndexImageResponse = serde_json::from_str(body)
        .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;
    Ok(resp.id)
}

fn parse_url(url: &str) -> Result<Url, IndexError> {
    Url::parse(url).map_err(|e| IndexError::InvalidEndpoint {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn file_url(candidate: &ImageCandidate) -> Result<Url, IndexError> {
    let path = candidate.path();
    let absolute: PathBuf = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(|e| invalid_url(candidate, &e.to_string()))?
            .join(path)
    };
    Url::from_file_path(&absolute).map_err(|_| invalid_url(candidate, "not an absolute path"))
}

fn invalid_url(candidate: &ImageCandidate, message: &str) -> IndexError {
    IndexError::InvalidUrl {
        path: candidate.path(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileEntry;

    fn candidate(dir: &str, name: &str) -> ImageCandidate {
        ImageCandidate::new("/images", FileEntry::new(dir, name))
    }

    fn indexer(base: Option<&str>) -> HttpIndexer {
        HttpIndexer::new(DEFAULT_ENDPOINT, base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_image_url_from_base() {
        let indexer = indexer(Some("http://nginx/data/"));
        let url = indexer.image_url(&candidate("/images/a/b", "img2.JPG")).unwrap();
        assert_eq!(url.as_str(), "http://nginx/data/a/b/img2.JPG");
    }

    #[test]
    fn test_image_url_base_without_trailing_slash() {
        let indexer = indexer(Some("http://nginx/data"));
        let url = indexer.image_url(&candidate("/images", "test.jpg")).unwrap();
        assert_eq!(url.as_str(), "http://nginx/data/test.jpg");
    }

    #[test]
    fn test_image_url_escapes_segments() {
        let indexer = indexer(Some("http://nginx/"));
        let url = indexer
            .image_url(&candidate("/images/summer 2017", "a#1?.png"))
            .unwrap();
        assert_eq!(url.as_str(), "http://nginx/summer%202017/a%231%3F.png");
    }

    #[cfg(unix)]
    #[test]
    fn test_image_url_defaults_to_file_url() {
        let indexer = indexer(None);
        let url = indexer.image_url(&candidate("/images/a", "img1.png")).unwrap();
        assert_eq!(url.as_str(), "file:///images/a/img1.png");
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = HttpIndexer::new("not a url", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, IndexError::InvalidEndpoint { .. }));

        let err = HttpIndexer::new(DEFAULT_ENDPOINT, Some("mailto:x@y"), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_parse_index_response() {
        assert_eq!(
            parse_index_response(r#"{"_id":"AV1x"}"#).unwrap(),
            Some("AV1x".to_string())
        );
        assert_eq!(parse_index_response("").unwrap(), None);
        assert_eq!(parse_index_response("{}").unwrap(), None);
        assert!(matches!(
            parse_index_response("<html>"),
            Err(IndexError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let body = IndexImageRequest {
            image_url: "http://nginx/data/test.jpg",
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"imageUrl":"http://nginx/data/test.jpg"}"#
        );
    }
}
