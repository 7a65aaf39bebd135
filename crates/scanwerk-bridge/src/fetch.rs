// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP(S) fetcher for remote documents, built on reqwest's blocking client.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use scanwerk_core::error::{Result, ScanwerkError};
use tracing::{debug, info, instrument};

use crate::traits::{FetchedResource, Fetcher};

/// Limits applied to every download.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Bodies larger than this are refused.
    pub max_bytes: u64,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Downloads documents over HTTP(S).
pub struct HttpFetcher {
    client: Client,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| ScanwerkError::Fetch(format!("failed to build HTTP client: {}", err)))?;
        Ok(Self { client, config })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip(self))]
    fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| ScanwerkError::Fetch(format!("invalid URL {}: {}", url, err)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScanwerkError::Fetch(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        info!("Fetching remote document");
        let response = self
            .client
            .get(parsed)
            .send()
            .map_err(|err| ScanwerkError::Fetch(format!("request to {} failed: {}", url, err)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let declared_len = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        if let Some(len) = declared_len {
            if len > self.config.max_bytes {
                return Err(ScanwerkError::DocumentTooLarge {
                    size: len as usize,
                    limit: self.config.max_bytes as usize,
                });
            }
        }

        // Content-Length can lie or be absent; cap the read as well.
        let mut bytes = Vec::new();
        response
            .take(self.config.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|err| ScanwerkError::Fetch(format!("reading body of {} failed: {}", url, err)))?;
        if bytes.len() as u64 > self.config.max_bytes {
            return Err(ScanwerkError::DocumentTooLarge {
                size: bytes.len(),
                limit: self.config.max_bytes as usize,
            });
        }

        debug!(status, content_type = ?content_type, bytes = bytes.len(), "Fetch complete");
        Ok(FetchedResource {
            status,
            content_type,
            bytes,
        })
    }
}
