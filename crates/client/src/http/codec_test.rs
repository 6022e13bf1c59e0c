use super::*;
use crate::http::message::{Method, StatusClass};
use crate::http::url::Url;

fn url(s: &str) -> Url {
    s.parse().unwrap()
}

fn head(raw: &str) -> ResponseHead {
    parse_head(raw.as_bytes()).unwrap().unwrap().0
}

/// Feed `raw` one byte at a time, the way a slow socket would deliver it
fn read_slowly(raw: &[u8]) -> Result<Option<Response>, HttpError> {
    let mut buf = BytesMut::new();
    let mut input = raw.iter();

    let head = loop {
        let Some(&b) = input.next() else {
            return Ok(None);
        };
        buf.put_u8(b);
        if let Some((head, used)) = parse_head(&buf)? {
            let _ = buf.split_to(used);
            break head;
        }
    };

    let mut body = BodyReader::new(BodyFraming::for_response(&head)?);
    while !body.feed(&mut buf) {
        match input.next() {
            Some(&b) => buf.put_u8(b),
            None => return body.finish_on_eof().map(|b| Some(head.into_response(b))),
        }
    }
    Ok(Some(head.into_response(body.into_body())))
}

// =============================================================================
// Request encoding
// =============================================================================

#[test]
fn test_encode_get_adds_default_headers() {
    let request = Request::get(url("http://collector:8080/status?v=1"));
    let wire = encode_request(&request, true, "agent/1");

    assert_eq!(
        &wire[..],
        b"GET /status?v=1 HTTP/1.1\r\nhost: collector:8080\r\nuser-agent: agent/1\r\n\r\n"
    );
}

#[test]
fn test_encode_post_json_body() {
    let request = Request::post_json(url("http://collector/frames"), &b"{\"a\":1}"[..]);
    let wire = encode_request(&request, true, DEFAULT_USER_AGENT);
    let text = std::str::from_utf8(&wire).unwrap();

    assert!(text.starts_with("POST /frames HTTP/1.1\r\n"));
    assert!(text.contains("content-length: 7\r\n"));
    assert!(text.contains("content-type: application/json\r\n"));
    assert!(text.contains("host: collector\r\n"));
    assert!(text.ends_with("\r\n\r\n{\"a\":1}"));
    assert!(!text.contains("connection:"));
}

#[test]
fn test_encode_keeps_caller_headers() {
    let request = Request::new(Method::Put, url("http://collector/"))
        .with_header("User-Agent", "mine")
        .with_header("Host", "virtual");
    let wire = encode_request(&request, true, DEFAULT_USER_AGENT);
    let text = std::str::from_utf8(&wire).unwrap();

    assert!(text.starts_with("PUT / HTTP/1.1\r\n"));
    assert!(text.contains("user-agent: mine\r\n"));
    assert!(text.contains("host: virtual\r\n"));
}

#[test]
fn test_encode_without_reuse_asks_to_close() {
    let request = Request::get(url("http://collector/"));
    let wire = encode_request(&request, false, DEFAULT_USER_AGENT);
    assert!(std::str::from_utf8(&wire).unwrap().contains("connection: close\r\n"));
}

// =============================================================================
// Head parsing
// =============================================================================

#[test]
fn test_parse_head_complete() {
    let raw = b"HTTP/1.1 201 Created\r\nContent-Length: 2\r\nX-Id: 7\r\n\r\nok";
    let (head, used) = parse_head(raw).unwrap().unwrap();

    assert_eq!(used, raw.len() - 2);
    assert_eq!(head.version, Version::Http11);
    assert_eq!(head.status.as_u16(), 201);
    assert_eq!(head.status.class(), StatusClass::Success);
    assert_eq!(head.reason, "Created");
    assert_eq!(head.headers.get("content-length"), Some("2"));
    assert_eq!(head.headers.get("x-id"), Some("7"));
}

#[test]
fn test_parse_head_incomplete() {
    assert!(parse_head(b"").unwrap().is_none());
    assert!(parse_head(b"HTTP/1.1 200 OK\r\n").unwrap().is_none());
    assert!(parse_head(b"HTTP/1.1 200 OK\r\nA: b\r\n\r").unwrap().is_none());
}

#[test]
fn test_parse_head_without_reason() {
    let head = head("HTTP/1.0 204\r\n\r\n");
    assert_eq!(head.version, Version::Http10);
    assert_eq!(head.status, StatusCode::NO_CONTENT);
    assert_eq!(head.reason, "");
}

#[test]
fn test_parse_head_rejects_other_versions() {
    for raw in ["HTTP/2 200 OK\r\n\r\n", "ICY 200 OK\r\n\r\n", "http/1.1 200 OK\r\n\r\n"] {
        let err = parse_head(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, HttpError::UnsupportedVersion(_)), "{raw:?}");
        assert!(err.is_protocol());
    }
}

#[test]
fn test_parse_head_rejects_bad_status_code() {
    for raw in [
        "HTTP/1.1 20 OK\r\n\r\n",
        "HTTP/1.1 2000 OK\r\n\r\n",
        "HTTP/1.1 2x0 OK\r\n\r\n",
        "HTTP/1.1\r\n\r\n",
    ] {
        assert!(
            matches!(parse_head(raw.as_bytes()), Err(HttpError::InvalidStatusLine(_))),
            "{raw:?}"
        );
    }
}

#[test]
fn test_parse_head_rejects_bad_header() {
    let err = parse_head(b"HTTP/1.1 200 OK\r\nno separator\r\n\r\n").unwrap_err();
    assert!(matches!(err, HttpError::InvalidHeader(_)));

    let err = parse_head(b"HTTP/1.1 200 OK\r\n: empty\r\n\r\n").unwrap_err();
    assert!(matches!(err, HttpError::InvalidHeader(_)));
}

#[test]
fn test_parse_head_size_limit() {
    let mut raw = b"HTTP/1.1 200 OK\r\nX: ".to_vec();
    raw.resize(MAX_HEAD_SIZE + 1, b'a');
    assert!(matches!(
        parse_head(&raw),
        Err(HttpError::HeadTooLarge { limit: MAX_HEAD_SIZE })
    ));
}

// =============================================================================
// Framing and keep-alive
// =============================================================================

#[test]
fn test_framing_rules() {
    let framing = |raw: &str| BodyFraming::for_response(&head(raw));

    assert_eq!(
        framing("HTTP/1.1 200 OK\r\nContent-Length: 12\r\n\r\n").unwrap(),
        BodyFraming::Length(12)
    );
    assert_eq!(
        framing("HTTP/1.1 200 OK\r\n\r\n").unwrap(),
        BodyFraming::UntilClose
    );
    assert_eq!(
        framing("HTTP/1.1 204 No Content\r\nContent-Length: 5\r\n\r\n").unwrap(),
        BodyFraming::Empty
    );
    assert_eq!(
        framing("HTTP/1.1 304 Not Modified\r\n\r\n").unwrap(),
        BodyFraming::Empty
    );
    assert_eq!(
        framing("HTTP/1.1 200 OK\r\nTransfer-Encoding: identity\r\n\r\n").unwrap(),
        BodyFraming::UntilClose
    );

    assert!(matches!(
        framing("HTTP/1.1 200 OK\r\nContent-Length: -1\r\n\r\n"),
        Err(HttpError::InvalidContentLength(_))
    ));
    assert!(matches!(
        framing("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"),
        Err(HttpError::UnsupportedTransferEncoding(_))
    ));
}

#[test]
fn test_keep_alive_rules() {
    let length = BodyFraming::Length(0);

    assert!(head("HTTP/1.1 200 OK\r\n\r\n").keep_alive(length));
    assert!(!head("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n").keep_alive(length));
    assert!(!head("HTTP/1.1 200 OK\r\nConnection: Keep-Alive, Close\r\n\r\n").keep_alive(length));
    assert!(!head("HTTP/1.0 200 OK\r\n\r\n").keep_alive(length));
    assert!(!head("HTTP/1.1 200 OK\r\n\r\n").keep_alive(BodyFraming::UntilClose));
}

// =============================================================================
// Bodies arriving in small pieces
// =============================================================================

#[test]
fn test_content_length_body_from_single_byte_reads() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\n\r\nhello world";
    let response = read_slowly(raw).unwrap().unwrap();

    assert!(response.is_success());
    assert_eq!(&response.body[..], b"hello world");
}

#[test]
fn test_content_length_leaves_trailing_bytes() {
    let mut buf = BytesMut::from(&b"abcdef"[..]);
    let mut body = BodyReader::new(BodyFraming::Length(4));

    assert!(body.feed(&mut buf));
    assert_eq!(&buf[..], b"ef");
    assert_eq!(&body.into_body()[..], b"abcd");
}

#[test]
fn test_close_delimited_body_is_everything_until_eof() {
    let raw = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\nall of\r\nthis\r\n\r\ndata";
    let response = read_slowly(raw).unwrap().unwrap();

    assert_eq!(&response.body[..], b"all of\r\nthis\r\n\r\ndata");
}

#[test]
fn test_short_body_is_end_of_stream() {
    let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
    assert!(matches!(read_slowly(raw), Err(HttpError::EndOfStream)));
}

#[test]
fn test_empty_body_needs_no_bytes() {
    let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\n"[..]);
    let mut body = BodyReader::new(BodyFraming::Empty);
    assert!(body.feed(&mut buf));
    assert!(body.is_complete());
    assert_eq!(buf.len(), 17);
    assert!(body.into_body().is_empty());
}
