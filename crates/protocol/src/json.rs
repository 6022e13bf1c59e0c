//! Streaming JSON writer
//!
//! Emits a JSON document incrementally to any `io::Write` without building
//! an intermediate tree. The only state kept is a stack of open containers.
//!
//! # Example
//!
//! ```
//! use framecast_protocol::json::{Container, JsonWriter};
//!
//! let mut json = JsonWriter::new(Vec::new(), Container::Object);
//! json.field("fps", 15);
//! json.array_field("results");
//! json.value("a");
//! json.close();
//! let out = json.finish().unwrap();
//!
//! assert_eq!(out, b"{\"fps\":15,\"results\":[\"a\"]}\n");
//! ```
//!
//! # Invariants
//!
//! Containers close in LIFO order. Closing more containers than were opened,
//! writing a keyed field inside an array, or writing a bare value inside an
//! object are programming errors and panic. Whatever is still open when the
//! writer is finished or dropped is closed, so the output is always
//! well-formed.

use std::io::{self, Write};

/// Kind of JSON container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// `{ ... }`
    Object,
    /// `[ ... ]`
    Array,
}

impl Container {
    #[inline]
    fn open_byte(self) -> u8 {
        match self {
            Self::Object => b'{',
            Self::Array => b'[',
        }
    }

    #[inline]
    fn close_byte(self) -> u8 {
        match self {
            Self::Object => b'}',
            Self::Array => b']',
        }
    }
}

/// Scalar value accepted by the writer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Str(&'a str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Self::Str(v)
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(v: &'a String) -> Self {
        Self::Str(v.as_str())
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value<'_> {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u16> for Value<'_> {
    fn from(v: u16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// One open container on the writer stack
#[derive(Debug)]
struct Open {
    kind: Container,
    /// No member written yet (controls the `,` separator)
    empty: bool,
}

/// Incremental JSON writer
///
/// Output errors are sticky: the first `io::Error` stops further output and
/// is returned from [`JsonWriter::finish`]. Writing into a `Vec<u8>` never
/// fails.
pub struct JsonWriter<W: Write> {
    out: Option<W>,
    stack: Vec<Open>,
    error: Option<io::Error>,
}

impl<W: Write> JsonWriter<W> {
    /// Start a document whose root is the given container
    pub fn new(out: W, root: Container) -> Self {
        let mut writer = Self {
            out: Some(out),
            stack: Vec::with_capacity(8),
            error: None,
        };
        writer.put(&[root.open_byte()]);
        writer.stack.push(Open {
            kind: root,
            empty: true,
        });
        writer
    }

    /// Number of containers currently open (the root counts)
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Open an anonymous object as the next array element
    pub fn object(&mut self) {
        self.begin_element();
        self.open(Container::Object);
    }

    /// Open an anonymous array as the next array element
    pub fn array(&mut self) {
        self.begin_element();
        self.open(Container::Array);
    }

    /// Open an object under `key` in the current object
    pub fn object_field(&mut self, key: &str) {
        self.begin_field(key);
        self.open(Container::Object);
    }

    /// Open an array under `key` in the current object
    pub fn array_field(&mut self, key: &str) {
        self.begin_field(key);
        self.open(Container::Array);
    }

    /// Write `key: value` in the current object
    pub fn field<'v>(&mut self, key: &str, value: impl Into<Value<'v>>) {
        self.begin_field(key);
        self.scalar(value.into());
    }

    /// Write a bare value as the next array element
    pub fn value<'v>(&mut self, value: impl Into<Value<'v>>) {
        self.begin_element();
        self.scalar(value.into());
    }

    /// Close the innermost open container
    ///
    /// # Panics
    ///
    /// Panics if the only container left is the root; the root is closed by
    /// [`JsonWriter::finish`] or on drop.
    pub fn close(&mut self) {
        assert!(
            self.stack.len() > 1,
            "JsonWriter::close called with no open container besides the root"
        );
        if let Some(open) = self.stack.pop() {
            self.put(&[open.kind.close_byte()]);
        }
    }

    /// Close every open container, terminate the document with a newline and
    /// flush, returning the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.close_all();
        if let Some(e) = self.error.take() {
            self.out = None;
            return Err(e);
        }
        self.out
            .take()
            .ok_or_else(|| io::Error::other("json writer output already taken"))
    }

    fn close_all(&mut self) {
        while let Some(open) = self.stack.pop() {
            self.put(&[open.kind.close_byte()]);
        }
        self.put(b"\n");
        if self.error.is_none()
            && let Some(out) = self.out.as_mut()
            && let Err(e) = out.flush()
        {
            self.error = Some(e);
        }
    }

    fn open(&mut self, kind: Container) {
        self.put(&[kind.open_byte()]);
        self.stack.push(Open { kind, empty: true });
    }

    fn begin_field(&mut self, key: &str) {
        let top = self.top_mut();
        assert_eq!(
            top.kind,
            Container::Object,
            "keyed field `{key}` written inside an array"
        );
        self.separator();
        self.string(key);
        self.put(b":");
    }

    fn begin_element(&mut self) {
        let top = self.top_mut();
        assert_eq!(
            top.kind,
            Container::Array,
            "bare value written inside an object"
        );
        self.separator();
    }

    fn top_mut(&mut self) -> &mut Open {
        self.stack
            .last_mut()
            .expect("JsonWriter used after the root container was closed")
    }

    fn separator(&mut self) {
        let top = self.top_mut();
        if top.empty {
            top.empty = false;
        } else {
            self.put(b",");
        }
    }

    fn scalar(&mut self, value: Value<'_>) {
        match value {
            Value::Str(s) => self.string(s),
            Value::Int(i) => self.put(i.to_string().as_bytes()),
            // JSON has no NaN or infinity
            Value::Float(f) if !f.is_finite() => self.put(b"null"),
            Value::Float(f) => self.put(f.to_string().as_bytes()),
            Value::Bool(true) => self.put(b"true"),
            Value::Bool(false) => self.put(b"false"),
        }
    }

    fn string(&mut self, s: &str) {
        self.put(b"\"");
        let bytes = s.as_bytes();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let escape: &[u8] = match b {
                b'"' => b"\\\"",
                b'\\' => b"\\\\",
                b'\n' => b"\\n",
                b'\r' => b"\\r",
                b'\t' => b"\\t",
                0x08 => b"\\b",
                0x0c => b"\\f",
                0x00..=0x1f => {
                    self.put(&bytes[start..i]);
                    self.put(format!("\\u{:04x}", b).as_bytes());
                    start = i + 1;
                    continue;
                }
                _ => continue,
            };
            self.put(&bytes[start..i]);
            self.put(escape);
            start = i + 1;
        }
        self.put(&bytes[start..]);
        self.put(b"\"");
    }

    fn put(&mut self, bytes: &[u8]) {
        if self.error.is_some() || bytes.is_empty() {
            return;
        }
        if let Some(out) = self.out.as_mut()
            && let Err(e) = out.write_all(bytes)
        {
            self.error = Some(e);
        }
    }
}

impl<W: Write> Drop for JsonWriter<W> {
    fn drop(&mut self) {
        if self.out.is_some() {
            self.close_all();
        }
    }
}

#[cfg(test)]
#[path = "json_test.rs"]
mod tests;
