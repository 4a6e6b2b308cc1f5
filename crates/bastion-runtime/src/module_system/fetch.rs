// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Network access for remote modules

use crate::config::EngineConfig;
use crate::error::RequireError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::cell::OnceCell;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Schemes remote modules may be fetched over
pub const FETCH_SCHEMES: &[&str] = &["http", "https"];

/// Source of remote module code.
///
/// Implementations must not follow redirects: a redirect could leave the
/// loader's pinned origin after the origin check was made.
pub trait Fetcher {
    /// Download the module at `url`. Only a 200 response is a success.
    fn fetch(&self, url: &Url) -> Result<String, RequireError>;
}

/// Blocking HTTP fetcher backed by reqwest
#[derive(Debug)]
pub struct HttpFetcher {
    client: OnceCell<Client>,
    timeout: Duration,
    user_agent: String,
    max_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the engine configuration
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            client: OnceCell::new(),
            timeout: config.fetch_timeout(),
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_module_bytes,
        }
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn client(&self) -> reqwest::Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(Policy::none())
            .user_agent(self.user_agent.clone())
            .build()?;
        Ok(self.client.get_or_init(|| client))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, RequireError> {
        if !FETCH_SCHEMES.contains(&url.scheme()) {
            return Err(RequireError::fetch_failure(
                url.as_str(),
                format!("unsupported scheme {}", url.scheme()),
            ));
        }

        let client = self
            .client()
            .map_err(|e| RequireError::fetch_failure(url.as_str(), e))?;

        debug!(url = %url, timeout = ?self.timeout, "GET remote module");
        let response = client
            .get(url.clone())
            .send()
            .map_err(|e| RequireError::fetch_failure(url.as_str(), e))?;

        if response.status() != StatusCode::OK {
            return Err(RequireError::fetch_failure(
                url.as_str(),
                format!(
                    "unexpected status {} from remote endpoint, expecting 200",
                    response.status()
                ),
            ));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(RequireError::fetch_failure(
                url.as_str(),
                format!("response exceeds {} bytes", self.max_bytes),
            ));
        }

        let body = response
            .bytes()
            .map_err(|e| RequireError::fetch_failure(url.as_str(), e))?;
        if body.len() as u64 > self.max_bytes {
            return Err(RequireError::fetch_failure(
                url.as_str(),
                format!("response exceeds {} bytes", self.max_bytes),
            ));
        }

        String::from_utf8(body.to_vec())
            .map_err(|_| RequireError::fetch_failure(url.as_str(), "response is not valid UTF-8"))
    }
}
