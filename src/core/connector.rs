//! Network connector for remote resources.
//!
//! Remote anchor records (METS `mptr` links) and externally hosted
//! page images are fetched through a [`Connector`]. Calls are blocking,
//! carry a timeout and are never retried here.

use std::path::Path;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

use crate::core::error::{Result, StrataError};

/// Blocking fetch of a remote resource
pub trait Connector: Send + Sync {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// HTTP(S) connector backed by `reqwest`
///
/// Must be called from a thread that is not driving the runtime, such
/// as a `spawn_blocking` worker. `file://` URLs are read from the local
/// filesystem; any other scheme, or none, is refused.
pub struct HttpConnector {
    client: reqwest::Client,
    handle: Handle,
}

impl HttpConnector {
    pub fn new(handle: Handle) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("strata/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StrataError::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, handle })
    }

    /// Connector bound to the runtime of the calling context
    pub fn from_current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| StrataError::ConfigError(format!("No tokio runtime: {e}")))?;
        Self::new(handle)
    }

    fn fetch_local(path: &Path, url: &str) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| StrataError::RemoteFetchError {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl Connector for HttpConnector {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        if let Some(path) = url.strip_prefix("file://") {
            return Self::fetch_local(Path::new(path), url);
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(StrataError::RemoteFetchError {
                url: url.to_string(),
                message: "unsupported URL scheme".to_string(),
            });
        }

        debug!("Fetching {} (timeout {:?})", url, timeout);
        let fetch_error = |message: String| StrataError::RemoteFetchError {
            url: url.to_string(),
            message,
        };

        let request = async {
            let response = self.client.get(url).send().await?.error_for_status()?;
            response.bytes().await
        };
        let bytes = self
            .handle
            .block_on(async { tokio::time::timeout(timeout, request).await })
            .map_err(|_| fetch_error(format!("timed out after {}s", timeout.as_secs())))?
            .map_err(|e| fetch_error(e.to_string()))?;

        Ok(bytes.to_vec())
    }
}
