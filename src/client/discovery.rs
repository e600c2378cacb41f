//! Server URL discovery.
//!
//! Produces the one WebSocket URL the client connects to. The URL is
//! resolved once, before the first connect attempt.
//!
//! | Source | Result |
//! |--------|--------|
//! | [`ServerSource::Explicit`] | The given URL, untouched |
//! | [`ServerSource::Host`] | Whatever the native shell's invoke returns |
//! | [`ServerSource::Origin`] | `ws(s)://<host>[:port]/ws` derived from a page origin |
//! | [`ServerSource::Default`] | `ws://127.0.0.1:8080/ws` |
//!
//! Explicit URLs are not validated here: a malformed URL fails at connect
//! time and goes through the normal reconnect path.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Development server URL.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080/ws";

/// Path the window service listens on.
const WS_PATH: &str = "/ws";

// ============================================================================
// HostInvoke
// ============================================================================

/// Native shell bridge that knows the backend's WebSocket URL.
#[async_trait]
pub trait HostInvoke: Send + Sync {
    /// Asks the host for the WebSocket URL.
    async fn websocket_url(&self) -> Result<String>;
}

// ============================================================================
// ServerSource
// ============================================================================

/// Where the server URL comes from.
#[derive(Clone, Default)]
pub enum ServerSource {
    /// Fixed URL.
    Explicit(String),
    /// Ask the native host shell.
    Host(Arc<dyn HostInvoke>),
    /// Derive from the serving page's origin (`http(s)://host[:port]`).
    Origin(String),
    /// Development default.
    #[default]
    Default,
}

impl fmt::Debug for ServerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(url) => f.debug_tuple("Explicit").field(url).finish(),
            Self::Host(_) => f.write_str("Host(..)"),
            Self::Origin(origin) => f.debug_tuple("Origin").field(origin).finish(),
            Self::Default => f.write_str("Default"),
        }
    }
}

impl ServerSource {
    /// Creates an explicit source.
    #[inline]
    #[must_use]
    pub fn explicit(url: impl Into<String>) -> Self {
        Self::Explicit(url.into())
    }

    /// Creates a host-invoke source.
    #[inline]
    #[must_use]
    pub fn host(invoke: impl HostInvoke + 'static) -> Self {
        Self::Host(Arc::new(invoke))
    }

    /// Creates a same-origin source.
    #[inline]
    #[must_use]
    pub fn origin(origin: impl Into<String>) -> Self {
        Self::Origin(origin.into())
    }

    /// Produces the WebSocket URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if the host invoke fails or returns an empty URL
    /// - [`Error::Discovery`] if the origin is not an `http`/`https` URL
    pub async fn resolve(&self) -> Result<String> {
        let url = match self {
            Self::Explicit(url) => url.clone(),
            Self::Host(invoke) => {
                let url = invoke
                    .websocket_url()
                    .await
                    .map_err(|e| Error::discovery(format!("Host invoke failed: {e}")))?;
                if url.trim().is_empty() {
                    return Err(Error::discovery("Host returned an empty URL"));
                }
                url
            }
            Self::Origin(origin) => websocket_url_for_origin(origin)?,
            Self::Default => DEFAULT_SERVER_URL.to_string(),
        };

        debug!(source = ?self, %url, "Server URL resolved");
        Ok(url)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Maps `http(s)://host[:port]/...` to `ws(s)://host[:port]/ws`.
///
/// # Errors
///
/// Returns [`Error::Discovery`] for unparseable or non-http(s) origins.
pub fn websocket_url_for_origin(origin: &str) -> Result<String> {
    let parsed =
        Url::parse(origin).map_err(|e| Error::discovery(format!("Invalid origin {origin}: {e}")))?;

    let scheme = match parsed.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(Error::discovery(format!(
                "Unsupported origin scheme: {other}"
            )));
        }
    };

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::discovery(format!("Origin has no host: {origin}")))?;

    Ok(match parsed.port() {
        Some(port) => format!("{scheme}://{host}:{port}{WS_PATH}"),
        None => format!("{scheme}://{host}{WS_PATH}"),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedHost(&'static str);

    #[async_trait]
    impl HostInvoke for FixedHost {
        async fn websocket_url(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingHost;

    #[async_trait]
    impl HostInvoke for FailingHost {
        async fn websocket_url(&self) -> Result<String> {
            Err(Error::connection("bridge unavailable"))
        }
    }

    #[test]
    fn test_origin_http() {
        assert_eq!(
            websocket_url_for_origin("http://localhost:1420").expect("derive"),
            "ws://localhost:1420/ws"
        );
    }

    #[test]
    fn test_origin_https_default_port() {
        assert_eq!(
            websocket_url_for_origin("https://app.example.com/some/page").expect("derive"),
            "wss://app.example.com/ws"
        );
    }

    #[test]
    fn test_origin_rejects_other_schemes() {
        assert!(websocket_url_for_origin("file:///index.html").is_err());
        assert!(websocket_url_for_origin("not a url").is_err());
    }

    #[tokio::test]
    async fn test_resolve_default() {
        let url = ServerSource::default().resolve().await.expect("resolve");
        assert_eq!(url, DEFAULT_SERVER_URL);
    }

    #[tokio::test]
    async fn test_resolve_explicit_is_untouched() {
        let url = ServerSource::explicit("definitely not a url")
            .resolve()
            .await
            .expect("resolve");
        assert_eq!(url, "definitely not a url");
    }

    #[tokio::test]
    async fn test_resolve_host() {
        let url = ServerSource::host(FixedHost("ws://127.0.0.1:9000/ws"))
            .resolve()
            .await
            .expect("resolve");
        assert_eq!(url, "ws://127.0.0.1:9000/ws");
    }

    #[tokio::test]
    async fn test_resolve_host_failure() {
        let err = ServerSource::host(FailingHost).resolve().await.unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[tokio::test]
    async fn test_resolve_host_empty() {
        let err = ServerSource::host(FixedHost("  ")).resolve().await.unwrap_err();
        assert!(matches!(err, Error::Discovery { .. }));
    }

    #[test]
    fn test_resolve_origin_blocking() {
        let url = tokio_test::block_on(ServerSource::origin("https://host:8443").resolve())
            .expect("resolve");
        assert_eq!(url, "wss://host:8443/ws");
    }
}
