//! HTTP liveness checks.

use std::time::Duration;

use stackup_common::error::{Result, StackupError};

/// Issues a GET and reports the final status code.
pub trait HttpProbe: Send + Sync {
    /// Requests `url` and returns the response status.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Http`] if no response was received.
    fn get_status(&self, url: &str) -> Result<u16>;
}

/// [`HttpProbe`] backed by a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: reqwest::blocking::Client,
}

impl ReqwestProbe {
    /// Creates a probe whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stackup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StackupError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl HttpProbe for ReqwestProbe {
    fn get_status(&self, url: &str) -> Result<u16> {
        let response = self.client.get(url).send().map_err(|e| StackupError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(response.status().as_u16())
    }
}

/// Whether `status` is a 2xx code.
#[must_use]
pub const fn is_success(status: u16) -> bool {
    200 <= status && status < 300
}
