//! HTTP/1.1 wire codec
//!
//! Pure functions over byte buffers; the connection task owns the socket and
//! feeds whatever it reads in here. Nothing assumes a read delivers a whole
//! head or body, so input may arrive one byte at a time.
//!
//! Supported response framing is `Content-Length` or read-until-close.
//! Chunked transfer encoding is rejected as a protocol error.

use bytes::{BufMut, Bytes, BytesMut};

use super::headers::Headers;
use super::message::{Request, Response, StatusCode, Version};
use crate::error::HttpError;

/// Largest accepted response head (status line plus headers)
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Value of the `user-agent` header when the caller sets none
pub const DEFAULT_USER_AGENT: &str = concat!("framecast/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Requests
// =============================================================================

/// Serialize a request
///
/// Adds `host` and `user-agent` unless the caller set them, `content-length`
/// and `content-type` for a body, and `connection: close` when the
/// connection will not be reused.
pub fn encode_request(request: &Request, keep_alive: bool, user_agent: &str) -> BytesMut {
    let mut headers = request.headers.clone();
    headers
        .augment("host", request.url.authority())
        .augment("user-agent", user_agent);
    if let Some(body) = &request.body {
        headers
            .set("content-length", body.len().to_string())
            .augment("content-type", "application/json");
    }
    if !keep_alive {
        headers.set("connection", "close");
    }

    let head = format!(
        "{} {} HTTP/1.1\r\n{}\r\n",
        request.method,
        request.url.request_target(false),
        headers
    );
    let body = request.body.as_deref().unwrap_or_default();

    let mut out = BytesMut::with_capacity(head.len() + body.len());
    out.put_slice(head.as_bytes());
    out.put_slice(body);
    out
}

// =============================================================================
// Response head
// =============================================================================

/// Status line and headers of a response
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub version: Version,
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
}

impl ResponseHead {
    /// Whether the connection stays usable after this response
    ///
    /// Only HTTP/1.1 responses without `connection: close` whose body end is
    /// not marked by the close itself.
    pub fn keep_alive(&self, framing: BodyFraming) -> bool {
        self.version == Version::Http11
            && !self.headers.has_token("connection", "close")
            && framing != BodyFraming::UntilClose
    }

    pub fn into_response(self, body: Bytes) -> Response {
        Response {
            version: self.version,
            status: self.status,
            reason: self.reason,
            headers: self.headers,
            body,
        }
    }
}

/// Parse a response head from the start of `buf`
///
/// Returns `Ok(None)` until the blank line ending the head has arrived,
/// otherwise the head and the number of bytes it occupied.
///
/// # Errors
///
/// Returns a protocol error for an unsupported version, a status code that
/// is not three digits, a header line without `:`, or a head larger than
/// [`MAX_HEAD_SIZE`].
pub fn parse_head(buf: &[u8]) -> Result<Option<(ResponseHead, usize)>, HttpError> {
    let Some(end) = find_head_end(buf) else {
        if buf.len() > MAX_HEAD_SIZE {
            return Err(HttpError::HeadTooLarge {
                limit: MAX_HEAD_SIZE,
            });
        }
        return Ok(None);
    };
    if end > MAX_HEAD_SIZE {
        return Err(HttpError::HeadTooLarge {
            limit: MAX_HEAD_SIZE,
        });
    }

    let text = std::str::from_utf8(&buf[..end - 4])
        .map_err(|_| HttpError::InvalidHeader("head is not valid utf-8".into()))?;
    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or_default();

    let (version, rest) = status_line.split_once(' ').unwrap_or((status_line, ""));
    let version =
        Version::from_token(version).ok_or_else(|| HttpError::UnsupportedVersion(version.into()))?;

    let (code, reason) = rest.split_once(' ').unwrap_or((rest, ""));
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HttpError::InvalidStatusLine(status_line.into()));
    }
    let status = code
        .parse()
        .map(StatusCode::new)
        .map_err(|_| HttpError::InvalidStatusLine(status_line.into()))?;

    let mut headers = Headers::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            return Err(HttpError::InvalidHeader(line.into()));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(HttpError::InvalidHeader(line.into()));
        }
        headers.append(name, value.trim());
    }

    let head = ResponseHead {
        version,
        status,
        reason: reason.trim().to_owned(),
        headers,
    };
    Ok(Some((head, end)))
}

/// Offset just past the `\r\n\r\n` ending the head
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

// =============================================================================
// Response body
// =============================================================================

/// How the end of a response body is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body (1xx, 204, 304)
    Empty,
    /// Exactly this many bytes
    Length(usize),
    /// Everything until the peer closes
    UntilClose,
}

impl BodyFraming {
    /// Framing announced by a response head
    ///
    /// # Errors
    ///
    /// Returns a protocol error for a malformed `content-length` or a
    /// transfer encoding other than `identity`.
    pub fn for_response(head: &ResponseHead) -> Result<Self, HttpError> {
        if head.status.forbids_body() {
            return Ok(Self::Empty);
        }

        if let Some(encoding) = head.headers.get("transfer-encoding")
            && !encoding.trim().eq_ignore_ascii_case("identity")
        {
            return Err(HttpError::UnsupportedTransferEncoding(encoding.into()));
        }

        match head.headers.get("content-length") {
            Some(value) => value
                .trim()
                .parse()
                .map(Self::Length)
                .map_err(|_| HttpError::InvalidContentLength(value.into())),
            None => Ok(Self::UntilClose),
        }
    }
}

/// Collects a body as it arrives
#[derive(Debug)]
pub struct BodyReader {
    framing: BodyFraming,
    body: BytesMut,
}

impl BodyReader {
    pub fn new(framing: BodyFraming) -> Self {
        let capacity = match framing {
            BodyFraming::Length(n) => n.min(MAX_HEAD_SIZE),
            _ => 0,
        };
        Self {
            framing,
            body: BytesMut::with_capacity(capacity),
        }
    }

    pub fn framing(&self) -> BodyFraming {
        self.framing
    }

    /// Move body bytes out of `buf`
    ///
    /// Bytes beyond a length-framed body stay in `buf`. Returns true once
    /// the body is complete.
    pub fn feed(&mut self, buf: &mut BytesMut) -> bool {
        match self.framing {
            BodyFraming::Empty => true,
            BodyFraming::Length(n) => {
                let take = (n - self.body.len()).min(buf.len());
                self.body.extend_from_slice(&buf.split_to(take));
                self.body.len() == n
            }
            BodyFraming::UntilClose => {
                self.body.extend_from_slice(buf);
                buf.clear();
                false
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        match self.framing {
            BodyFraming::Empty => true,
            BodyFraming::Length(n) => self.body.len() == n,
            BodyFraming::UntilClose => false,
        }
    }

    /// Body of a complete length-framed or empty response
    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }

    /// The peer closed the connection
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::EndOfStream`] if a length-framed body is short.
    pub fn finish_on_eof(self) -> Result<Bytes, HttpError> {
        match self.framing {
            BodyFraming::UntilClose => Ok(self.body.freeze()),
            _ if self.is_complete() => Ok(self.body.freeze()),
            _ => Err(HttpError::EndOfStream),
        }
    }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
