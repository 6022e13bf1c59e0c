//! Header map with case-insensitive names
//!
//! Names are lowercased on insert and lookup. Repeated headers are folded
//! into one comma-separated value, which is how HTTP/1.1 allows them to be
//! combined.

use std::collections::BTreeMap;
use std::fmt;

/// Request or response headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    map: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any previous value
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.map.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Append to an existing value (`a, b`) or insert
    pub fn append(&mut self, name: &str, value: &str) -> &mut Self {
        self.map
            .entry(name.to_ascii_lowercase())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
        self
    }

    /// Set a header only if it is not present yet
    pub fn augment(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.map
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.map.remove(&name.to_ascii_lowercase())
    }

    /// True if the comma-separated header value lists `token`
    ///
    /// Used for `connection: keep-alive, close` style headers; matching
    /// ignores case and surrounding whitespace.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name).is_some_and(|value| {
            value
                .split(',')
                .any(|t| t.trim().eq_ignore_ascii_case(token))
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Headers in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Wire form, one `name: value\r\n` line per header
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}
