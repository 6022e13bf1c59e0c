//! HTTP URL model
//!
//! Only what the client needs: `scheme://host[:port][/path][?query][#fragment]`
//! with http or https, bracketed IPv6 hosts, path segment editing and a query
//! that is either passed through raw or built from key/value pairs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::UrlError;

/// URL scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub const fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl FromStr for Scheme {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(UrlError::UnsupportedScheme(s.to_owned())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query component of a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Emitted as given (without the leading `?`)
    Raw(String),
    /// Emitted as `k=v&k=v`, percent-encoded, in key order
    Pairs(BTreeMap<String, String>),
}

impl Query {
    fn render(&self, out: &mut String) {
        match self {
            Self::Raw(raw) => out.push_str(raw),
            Self::Pairs(pairs) => {
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push('&');
                    }
                    percent_encode(key, out);
                    out.push('=');
                    percent_encode(value, out);
                }
            }
        }
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters
pub fn percent_encode(s: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[usize::from(b >> 4)] as char);
            out.push(HEX[usize::from(b & 0x0f)] as char);
        }
    }
}

/// An http or https URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
    /// Always starts with `/`
    path: String,
    query: Option<Query>,
    fragment: Option<String>,
}

impl Url {
    /// URL with root path and no query
    pub fn new(scheme: Scheme, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            path: "/".into(),
            query: None,
            fragment: None,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if any
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Explicit port, or the scheme's default
    pub fn port_or_infer(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Non-empty path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    pub fn query(&self) -> Option<&Query> {
        self.query.as_ref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn set_scheme(&mut self, scheme: Scheme) -> &mut Self {
        self.scheme = scheme;
        self
    }

    pub fn set_host(&mut self, host: impl Into<String>) -> &mut Self {
        self.host = host.into();
        self
    }

    pub fn set_port(&mut self, port: Option<u16>) -> &mut Self {
        self.port = port;
        self
    }

    /// Replace the path; a missing leading `/` is added
    pub fn set_path(&mut self, path: &str) -> &mut Self {
        self.path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn set_query(&mut self, query: Option<Query>) -> &mut Self {
        self.query = query;
        self
    }

    pub fn set_fragment(&mut self, fragment: Option<String>) -> &mut Self {
        self.fragment = fragment;
        self
    }

    /// Append one path segment
    pub fn push(&mut self, segment: &str) -> &mut Self {
        if !self.path.ends_with('/') {
            self.path.push('/');
        }
        self.path.push_str(segment.trim_matches('/'));
        self
    }

    /// Remove the last path segment, returning it
    pub fn pop(&mut self) -> Option<String> {
        let trimmed = self.path.trim_end_matches('/');
        let cut = trimmed.rfind('/')?;
        let segment = trimmed[cut + 1..].to_owned();
        if segment.is_empty() {
            return None;
        }
        self.path.truncate(cut.max(1));
        Some(segment)
    }

    /// `host[:port]`, with the port only when it differs from the default
    ///
    /// This is the value of the `Host` header.
    pub fn authority(&self) -> String {
        let mut out = String::with_capacity(self.host.len() + 6);
        self.write_host(&mut out);
        if let Some(port) = self.port
            && port != self.scheme.default_port()
        {
            out.push(':');
            out.push_str(&port.to_string());
        }
        out
    }

    /// Request target: origin form (`/path?query`) or absolute form
    pub fn request_target(&self, absolute: bool) -> String {
        let mut out = String::new();
        if absolute {
            out.push_str(self.scheme.as_str());
            out.push_str("://");
            out.push_str(&self.authority());
        }
        out.push_str(&self.path);
        if let Some(query) = &self.query {
            out.push('?');
            query.render(&mut out);
        }
        out
    }

    fn write_host(&self, out: &mut String) {
        if self.host.contains(':') {
            out.push('[');
            out.push_str(&self.host);
            out.push(']');
        } else {
            out.push_str(&self.host);
        }
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| UrlError::MissingScheme(input.to_owned()))?;
        let scheme: Scheme = scheme.parse()?;

        let (rest, fragment) = match rest.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_owned())),
            None => (rest, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(Query::Raw(query.to_owned()))),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = parse_authority(authority)?;

        Ok(Self {
            scheme,
            host,
            port,
            path: path.to_owned(),
            query,
            fragment,
        })
    }
}

fn parse_authority(authority: &str) -> Result<(String, Option<u16>), UrlError> {
    let invalid_host = || UrlError::InvalidHost(authority.to_owned());

    if authority.contains('@') {
        return Err(invalid_host());
    }

    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(invalid_host)?;
        match after {
            "" => (host, None),
            _ => (host, Some(after.strip_prefix(':').ok_or_else(invalid_host)?)),
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(invalid_host());
    }

    let port = match port {
        None => None,
        Some(p) => Some(p.parse().map_err(|_| UrlError::InvalidPort(p.to_owned()))?),
    };

    Ok((host.to_owned(), port))
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut host = String::new();
        self.write_host(&mut host);
        write!(f, "{}://{}", self.scheme, host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.request_target(false))?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "url_test.rs"]
mod url_test;
