//! Address helpers for cluster API endpoints.

use url::{Host, Url};

use crate::{Error, Result};

fn invalid(url: &str, reason: &str) -> Error {
	Error::InvalidEndpoint {
		url: url.to_owned(),
		reason: reason.to_owned(),
	}
}

fn parse(endpoint: &str) -> Result<Url> {
	let url = Url::parse(endpoint).map_err(|e| invalid(endpoint, &e.to_string()))?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(invalid(endpoint, &format!("unsupported scheme {other}"))),
	}
}

/// The IP literal an endpoint is served on.
pub fn host_ip(endpoint: &str) -> Result<String> {
	match parse(endpoint)?.host() {
		Some(Host::Ipv4(ip)) => Ok(ip.to_string()),
		Some(Host::Ipv6(ip)) => Ok(ip.to_string()),
		_ => Err(invalid(endpoint, "host is not an IP address")),
	}
}

/// The port of an endpoint, the scheme default when none is written.
pub fn port(endpoint: &str) -> Result<u16> {
	parse(endpoint)?
		.port_or_known_default()
		.ok_or_else(|| invalid(endpoint, "port is not set"))
}
