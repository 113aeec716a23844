//! Blocking HTTP boundary. Every network read in a run goes through a
//! [`Fetcher`], one request at a time.

use crate::error::{ImportError, ImportResult};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues a GET and blocks until the full response is read. Non-success
/// statuses come back as a response, not an error; only transport failures
/// are errors here.
pub trait Fetcher {
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> ImportResult<FetchResponse>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> ImportResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ImportError::ClientSetup(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn get(&mut self, url: &str, headers: &[(&str, &str)]) -> ImportResult<FetchResponse> {
        let transport = |err: reqwest::Error| ImportError::Transport { url: url.to_string(), message: err.to_string() };
        debug!("GET {url}");
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().map_err(transport)?;
        let status = response.status().as_u16();
        let headers = header_map(response.headers());
        let body = response.bytes().map_err(transport)?.to_vec();
        debug!("GET {url} -> {status} ({} bytes)", body.len());
        Ok(FetchResponse { status, headers, body })
    }
}

fn header_map(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, SET_COOKIE};

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/png"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        let map = header_map(&headers);
        assert_eq!(map.get("content-type").map(String::as_str), Some("image/png"));
        assert_eq!(map.get("set-cookie").map(String::as_str), Some("a=1, b=2"));
    }

    #[test]
    fn success_range_is_2xx() {
        let mut response = FetchResponse { status: 204, headers: BTreeMap::new(), body: Vec::new() };
        assert!(response.is_success());
        response.status = 304;
        assert!(!response.is_success());
    }
}
