use super::*;

fn url(s: &str) -> Url {
    s.parse().unwrap()
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_parse_full_url() {
    let u = url("http://collector.local:8080/ingest/frames?cam=1#top");
    assert_eq!(u.scheme(), Scheme::Http);
    assert_eq!(u.host(), "collector.local");
    assert_eq!(u.port(), Some(8080));
    assert_eq!(u.path(), "/ingest/frames");
    assert_eq!(u.query(), Some(&Query::Raw("cam=1".into())));
    assert_eq!(u.fragment(), Some("top"));
}

#[test]
fn test_parse_host_only() {
    let u = url("http://collector");
    assert_eq!(u.host(), "collector");
    assert_eq!(u.port(), None);
    assert_eq!(u.path(), "/");
    assert!(u.query().is_none());
}

#[test]
fn test_parse_query_without_path() {
    let u = url("http://collector?x=1");
    assert_eq!(u.path(), "/");
    assert_eq!(u.request_target(false), "/?x=1");
}

#[test]
fn test_parse_bracketed_ipv6() {
    let u = url("http://[::1]:9000/x");
    assert_eq!(u.host(), "::1");
    assert_eq!(u.port(), Some(9000));
    assert_eq!(u.authority(), "[::1]:9000");

    let u = url("https://[fe80::1]");
    assert_eq!(u.port_or_infer(), 443);
}

#[test]
fn test_scheme_is_case_insensitive() {
    assert_eq!(url("HTTP://x").scheme(), Scheme::Http);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        "collector:80".parse::<Url>(),
        Err(UrlError::MissingScheme(_))
    ));
    assert!(matches!(
        "ftp://x".parse::<Url>(),
        Err(UrlError::UnsupportedScheme(_))
    ));
    assert!(matches!("http://".parse::<Url>(), Err(UrlError::InvalidHost(_))));
    assert!(matches!(
        "http://:80/".parse::<Url>(),
        Err(UrlError::InvalidHost(_))
    ));
    assert!(matches!(
        "http://user@host/".parse::<Url>(),
        Err(UrlError::InvalidHost(_))
    ));
    assert!(matches!(
        "http://[::1/".parse::<Url>(),
        Err(UrlError::InvalidHost(_))
    ));
    assert!(matches!(
        "http://host:99999/".parse::<Url>(),
        Err(UrlError::InvalidPort(_))
    ));
    assert!(matches!(
        "http://host:/".parse::<Url>(),
        Err(UrlError::InvalidPort(_))
    ));
}

// =============================================================================
// Ports and authority
// =============================================================================

#[test]
fn test_port_or_infer() {
    assert_eq!(url("http://x").port_or_infer(), 80);
    assert_eq!(url("https://x").port_or_infer(), 443);
    assert_eq!(url("http://x:5500").port_or_infer(), 5500);
}

#[test]
fn test_authority_omits_default_port() {
    assert_eq!(url("http://x:80/").authority(), "x");
    assert_eq!(url("http://x:81/").authority(), "x:81");
}

// =============================================================================
// Request target and display
// =============================================================================

#[test]
fn test_request_target_forms() {
    let u = url("http://x:8080/a/b?q=1#frag");
    assert_eq!(u.request_target(false), "/a/b?q=1");
    assert_eq!(u.request_target(true), "http://x:8080/a/b?q=1");
}

#[test]
fn test_display_round_trip() {
    for s in [
        "http://x/",
        "http://x:80/a?b=c#d",
        "https://[::1]:8443/v1/frames",
    ] {
        assert_eq!(url(s).to_string(), s);
        assert_eq!(url(&url(s).to_string()), url(s));
    }
}

#[test]
fn test_query_pairs_are_encoded_in_key_order() {
    let mut u = Url::new(Scheme::Http, "x", None);
    let pairs = [("stream", "cam 1"), ("a&b", "c=d/e")]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
    u.set_query(Some(Query::Pairs(pairs)));

    assert_eq!(u.request_target(false), "/?a%26b=c%3Dd%2Fe&stream=cam%201");
}

#[test]
fn test_percent_encode_keeps_unreserved() {
    let mut out = String::new();
    percent_encode("Az09-._~ \n", &mut out);
    assert_eq!(out, "Az09-._~%20%0A");
}

// =============================================================================
// Building and editing
// =============================================================================

#[test]
fn test_new_from_parts() {
    let mut u = Url::new(Scheme::Http, "collector", Some(5500));
    u.push("ingest").push("frames");
    assert_eq!(u.to_string(), "http://collector:5500/ingest/frames");
    assert_eq!(u.segments().collect::<Vec<_>>(), vec!["ingest", "frames"]);
}

#[test]
fn test_push_and_pop_segments() {
    let mut u = url("http://x/api/");
    u.push("/v1/");
    assert_eq!(u.path(), "/api/v1");

    assert_eq!(u.pop().as_deref(), Some("v1"));
    assert_eq!(u.path(), "/api");
    assert_eq!(u.pop().as_deref(), Some("api"));
    assert_eq!(u.path(), "/");
    assert_eq!(u.pop(), None);
    assert_eq!(u.path(), "/");
}

#[test]
fn test_setters() {
    let mut u = url("http://a/b");
    u.set_scheme(Scheme::Https)
        .set_host("c")
        .set_port(Some(1))
        .set_path("d")
        .set_query(Some(Query::Raw("e".into())))
        .set_fragment(Some("f".into()));
    assert_eq!(u.to_string(), "https://c:1/d?e#f");
}
