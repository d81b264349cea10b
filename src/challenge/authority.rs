//! Authority keys used to partition discovered challenges.

// self
use crate::{_prelude::*, error::ConfigError, http::Uri};

/// Derives the cache key for a request URI.
///
/// The key is the host, with `:port` appended only when the port is explicit, differs from the
/// scheme's default, and the host does not already contain a colon (bracketed IPv6 literals).
pub fn authority_key(uri: &Uri) -> Result<String> {
	let host = uri.host().ok_or_else(|| ConfigError::MissingHost { uri: uri.to_string() })?;
	let default_port = match uri.scheme_str() {
		Some("https") => Some(443),
		Some("http") => Some(80),
		_ => None,
	};

	Ok(compose(host, uri.port_u16().filter(|port| Some(*port) != default_port)))
}

/// Derives the cache key for a parsed [`Url`]; `url` already hides default ports.
pub fn authority_key_for_url(url: &Url) -> Result<String> {
	let host = url.host_str().ok_or_else(|| ConfigError::MissingHost { uri: url.to_string() })?;

	Ok(compose(host, url.port()))
}

fn compose(host: &str, port: Option<u16>) -> String {
	match port {
		Some(port) if port > 0 && !host.contains(':') => format!("{host}:{port}"),
		_ => host.to_owned(),
	}
}
