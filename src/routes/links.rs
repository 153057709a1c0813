//! Download link construction

use axum::http::{header, HeaderMap};

use crate::config::Config;

/// Path prefix served by the download route
pub const DOWNLOAD_PREFIX: &str = "/download/";

/// Absolute URL a client can fetch `file_name` from
pub fn download_link(config: &Config, headers: &HeaderMap, file_name: &str) -> String {
    format!("{}{}{}", origin(config, headers), DOWNLOAD_PREFIX, file_name)
}

/// Externally visible origin.
///
/// A configured `PUBLIC_URL` wins. Otherwise the Host header is used, over
/// plain http for localhost and https for anything else. Without either, the
/// bind address is used, with wildcard addresses swapped for localhost.
pub fn origin(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = &config.server.public_url {
        return url.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match host {
        Some(host) => {
            let scheme = if host.contains("localhost") { "http" } else { "https" };
            format!("{}://{}", scheme, host)
        }
        // A wildcard bind address is not dialable
        None if config.binds_wildcard() => format!("http://localhost:{}", config.server.port),
        None => format!("http://{}:{}", config.server.host, config.server.port),
    }
}
