//! Stream URL resolution
//!
//! Derives the URL the dashboard should open for the camera's MJPEG stream
//! from the stream status and the page the dashboard is served from.
//!
//! # Rules
//!
//! - A disabled stream has no URL
//! - An absolute http(s) URL supplied by the server wins
//! - Otherwise the URL is built on the page's host:
//!   - port 443 forces https, port 80 or any other explicit port forces http,
//!     no port inherits the page's scheme and port
//!   - the port is omitted when it is the scheme default
//!   - the path defaults to [`DEFAULT_STREAM_PATH`]; query and fragment are
//!     dropped

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, warn};

/// Route served by the camera streamer when no path is configured
pub const DEFAULT_STREAM_PATH: &str = "/mjpg";

#[derive(Debug, Error)]
enum ResolveError {
    #[error("page URL '{0}' has no host")]
    NoHost(String),

    #[error("unsupported page scheme '{0}'")]
    Scheme(String),

    #[error("invalid stream port {0}")]
    Port(u16),

    #[error("could not build stream URL: {0}")]
    Build(String),
}

/// Resolve a displayable stream URL.
///
/// Never fails: malformed input yields `None` and a warning.
pub fn resolve_stream_url(
    enabled: bool,
    override_url: Option<&str>,
    port: Option<u16>,
    path: Option<&str>,
    page: &Url,
) -> Option<String> {
    if !enabled {
        return None;
    }

    match try_resolve(override_url, port, path, page) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Unable to resolve camera stream URL: {}", e);
            None
        }
    }
}

fn try_resolve(
    override_url: Option<&str>,
    port: Option<u16>,
    path: Option<&str>,
    page: &Url,
) -> Result<String, ResolveError> {
    if let Some(candidate) = override_url.map(str::trim).filter(|s| !s.is_empty()) {
        match Url::parse(candidate) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                return Ok(url.to_string());
            }
            _ => debug!("Ignoring non-absolute stream URL '{}'", candidate),
        }
    }

    let host = page
        .host_str()
        .ok_or_else(|| ResolveError::NoHost(page.to_string()))?;

    let page_scheme = match page.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => return Err(ResolveError::Scheme(other.to_string())),
    };

    let (scheme, port) = match port {
        Some(0) => return Err(ResolveError::Port(0)),
        Some(443) => ("https", Some(443)),
        Some(explicit) => ("http", Some(explicit)),
        None => (page_scheme, page.port()),
    };

    let mut url = Url::parse(&format!("{}://{}", scheme, host))
        .map_err(|e| ResolveError::Build(e.to_string()))?;
    // The url crate drops a port equal to the scheme default
    url.set_port(port)
        .map_err(|_| ResolveError::Build(format!("cannot set port on {}", url)))?;
    url.set_path(&normalize_path(path));
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.to_string())
}

fn normalize_path(path: Option<&str>) -> String {
    let raw = path.map(str::trim).unwrap_or("");
    let raw = raw.split(['?', '#']).next().unwrap_or("");
    if raw.is_empty() {
        return DEFAULT_STREAM_PATH.to_string();
    }
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_port_443_forces_https_without_port() {
        let url = resolve_stream_url(true, None, Some(443), Some("/stream"), &page("https://host/ui"));
        assert_eq!(url.as_deref(), Some("https://host/stream"));

        let url = resolve_stream_url(true, None, Some(443), Some("/stream"), &page("http://host/ui"));
        assert_eq!(url.as_deref(), Some("https://host/stream"));
    }

    #[test]
    fn test_explicit_port_forces_http() {
        let url = resolve_stream_url(true, None, Some(80), Some("/stream"), &page("https://host/ui"));
        assert_eq!(url.as_deref(), Some("http://host/stream"));

        let url = resolve_stream_url(true, None, Some(9000), None, &page("https://robot.local:8443/"));
        assert_eq!(url.as_deref(), Some("http://robot.local:9000/mjpg"));
    }

    #[test]
    fn test_no_port_inherits_page_origin() {
        let url = resolve_stream_url(true, None, None, Some("cam"), &page("https://host:8443/dash?x=1"));
        assert_eq!(url.as_deref(), Some("https://host:8443/cam"));
    }

    #[test]
    fn test_query_is_stripped() {
        let url = resolve_stream_url(true, None, Some(8080), Some("/mjpg?action=stream#top"), &page("http://10.0.0.5/"));
        assert_eq!(url.as_deref(), Some("http://10.0.0.5:8080/mjpg"));
    }

    #[test]
    fn test_disabled_yields_none() {
        assert_eq!(resolve_stream_url(false, Some("http://cam/x"), Some(80), None, &page("http://host/")), None);
    }

    #[test]
    fn test_absolute_override_wins() {
        let url = resolve_stream_url(true, Some("http://camera.lan:9000/mjpg"), Some(443), None, &page("https://host/"));
        assert_eq!(url.as_deref(), Some("http://camera.lan:9000/mjpg"));
    }

    #[test]
    fn test_relative_override_is_ignored() {
        let url = resolve_stream_url(true, Some("/mjpg"), Some(9000), None, &page("http://host/"));
        assert_eq!(url.as_deref(), Some("http://host:9000/mjpg"));
    }

    #[test]
    fn test_malformed_inputs_yield_none() {
        assert_eq!(resolve_stream_url(true, None, Some(0), None, &page("http://host/")), None);
        assert_eq!(resolve_stream_url(true, None, None, None, &page("data:text/plain,hello")), None);
        assert_eq!(resolve_stream_url(true, None, None, None, &page("ftp://host/")), None);
    }
}
