//! Service locator parsing.
//!
//! A locator string identifies a peer's network endpoint together with its
//! transport scheme, e.g. `fast+udp:host=192.168.1.4,port=11000`. A server
//! may advertise several alternative transports for the same endpoint,
//! joined by `;`: `tcp:host=...,port=11000;fast+udp:host=...,port=11001`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("locator string is empty")]
    Empty,

    #[error("locator segment '{0}' has no ':' separating scheme from fields")]
    MissingScheme(String),

    #[error("locator segment '{0}' is missing a 'host' field")]
    MissingHost(String),

    #[error("locator segment '{0}' is missing a 'port' field")]
    MissingPort(String),

    #[error("locator segment '{0}' has an unparseable port")]
    InvalidPort(String),

    #[error("none of the preferred transport schemes {preference:?} were found in '{locator}'")]
    NoPreferredScheme {
        locator: String,
        preference: Vec<String>,
    },
}

/// One `scheme:host=...,port=...` alternative within a locator string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:host={},port={}", self.scheme, self.host, self.port)
    }
}

fn parse_segment(segment: &str) -> Result<Endpoint, LocatorError> {
    let (scheme, fields) = segment
        .split_once(':')
        .ok_or_else(|| LocatorError::MissingScheme(segment.to_string()))?;

    let mut host = None;
    let mut port = None;
    for field in fields.split(',') {
        if let Some((key, value)) = field.split_once('=') {
            match key {
                "host" => host = Some(value.to_string()),
                "port" => port = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let host = host.ok_or_else(|| LocatorError::MissingHost(segment.to_string()))?;
    let port = port.ok_or_else(|| LocatorError::MissingPort(segment.to_string()))?;
    let port: u16 = port
        .parse()
        .map_err(|_| LocatorError::InvalidPort(segment.to_string()))?;

    Ok(Endpoint {
        scheme: scheme.to_string(),
        host,
        port,
    })
}

/// Parses every `;`-separated alternative in a locator string.
pub fn parse_all(locator: &str) -> Result<Vec<Endpoint>, LocatorError> {
    if locator.trim().is_empty() {
        return Err(LocatorError::Empty);
    }
    locator.split(';').map(str::trim).map(parse_segment).collect()
}

/// Picks the first endpoint whose scheme appears in `preference`, in the
/// order `preference` lists them (not the order they appear in `locator`).
pub fn parse_preferred(locator: &str, preference: &[&str]) -> Result<Endpoint, LocatorError> {
    let endpoints = parse_all(locator)?;
    for &scheme in preference {
        if let Some(endpoint) = endpoints.iter().find(|e| e.scheme == scheme) {
            return Ok(endpoint.clone());
        }
    }
    Err(LocatorError::NoPreferredScheme {
        locator: locator.to_string(),
        preference: preference.iter().map(|s| (*s).to_string()).collect(),
    })
}

/// Derives the failure-detector's UDP bind port from a locator: the port of
/// the first preferred-scheme endpoint, plus a fixed offset.
pub fn failure_detector_port(
    locator: &str,
    preference: &[&str],
    port_offset: u16,
) -> Result<u16, LocatorError> {
    let endpoint = parse_preferred(locator, preference)?;
    Ok(endpoint.port.wrapping_add(port_offset))
}
