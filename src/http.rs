/*
 *  http.rs
 *
 *  BoltWatch - lightning safety for the office signage
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use flate2::read::GzDecoder;
use log::debug;
use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

pub const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Failures talking to a weather provider. None of these are fatal; the
/// ingestor logs them and moves on to the next source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(StatusCode),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing weather data: {0}")]
    MissingData(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_secs(1) }
    }
}

/// Shared client: versioned User-Agent, JSON accept, and a hard request
/// timeout so a hung provider only costs freshness.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();
    headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
    headers.insert("Accept", header::HeaderValue::from_static("application/json"));
    headers.insert("Accept-Encoding", header::HeaderValue::from_static("gzip"));
    headers.insert("Connection", header::HeaderValue::from_static("close"));

    Client::builder()
        .connect_timeout(timeout.min(Duration::from_secs(3)))
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

/// Body as text; gzip if it decodes as gzip, plain otherwise.
pub fn decode_body(raw: &[u8]) -> String {
    let mut decoder = GzDecoder::new(raw);
    let mut decoded = String::new();
    match decoder.read_to_string(&mut decoded) {
        Ok(_) => decoded,
        Err(_) => String::from_utf8_lossy(raw).to_string(),
    }
}

/// GET with retries on transport errors. A non-2xx answer is returned
/// straight away, retrying a 401 or 404 gains nothing.
pub async fn get_with_retries<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    params: &T,
    retry: RetryPolicy,
) -> Result<String, FetchError> {
    let mut attempts = 0;
    loop {
        match client.get(url).query(params).send().await {
            Ok(response) => {
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status));
                }
                let raw = response.bytes().await?;
                return Ok(decode_body(&raw));
            }
            Err(e) => {
                attempts += 1;
                if attempts >= retry.max_attempts.max(1) {
                    return Err(FetchError::Http(e));
                }
                debug!("GET {} failed (attempt {}): {}", url, attempts, e);
                tokio::time::sleep(retry.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use std::io::Write;

    #[test]
    fn test_decode_plain_and_gzip() {
        assert_eq!(decode_body(br#"{"ok":true}"#), r#"{"ok":true}"#);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"zipped":1}"#).unwrap();
        let zipped = encoder.finish().unwrap();
        assert_eq!(decode_body(&zipped), r#"{"zipped":1}"#);
    }

    #[tokio::test]
    async fn test_connection_refused_is_an_error_not_a_panic() {
        let client = build_client(Duration::from_secs(2)).unwrap();
        let retry = RetryPolicy { max_attempts: 2, delay: Duration::from_millis(10) };
        // port 9 (discard) is not listening on the test host
        let result = get_with_retries(&client, "http://127.0.0.1:9/v1/current.json", &[("q", "31,-97")], retry).await;
        assert!(matches!(result, Err(FetchError::Http(_))));
    }
}
