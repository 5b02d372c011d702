//! URL canonicalization for stub matching.
//!
//! Two URLs are considered equal for matching when they agree on scheme,
//! authority and path, and carry the same query parameters regardless of the
//! order the keys appear in. The query is decoded and re-encoded as form
//! data, so equivalent encodings of it compare equal (`%20` and `+` both
//! become `+`, a stray `%` becomes `%25`). Outside the query nothing is
//! folded: default ports, path encoding and trailing slashes on non-empty
//! paths all stay significant.

use crate::error::MatchError;
use hyper::Uri;
use url::form_urlencoded;

/// Canonicalize a URL string so that query-parameter order does not matter.
///
/// Query pairs are decoded, stable-sorted by key (values of a repeated key keep
/// their relative order) and re-encoded as `application/x-www-form-urlencoded`.
/// An empty query is dropped entirely.
pub fn normalize_url(raw: &str) -> Result<String, MatchError> {
    let uri: Uri = raw.parse().map_err(|e: hyper::http::uri::InvalidUri| {
        MatchError::UrlParse {
            url: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok(normalize_uri(&uri))
}

/// Canonicalize an already-parsed URI.
pub fn normalize_uri(uri: &Uri) -> String {
    let mut out = String::new();
    if let Some(scheme) = uri.scheme_str() {
        out.push_str(scheme);
        out.push_str("://");
    }
    if let Some(authority) = uri.authority() {
        out.push_str(authority.as_str());
    }
    out.push_str(uri.path());

    if let Some(query) = uri.query() {
        let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        if !pairs.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            out.push('?');
            out.push_str(&encoded);
        }
    }
    out
}

/// Hostname of a request target, without userinfo or port.
///
/// Bracketed IPv6 hosts are returned without their brackets.
pub fn request_host(uri: &Uri) -> Option<&str> {
    let authority = uri.authority()?.as_str();
    let hostport = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    Some(strip_port(hostport))
}

fn strip_port(hostport: &str) -> &str {
    let Some(colon) = hostport.find(':') else {
        return hostport;
    };
    if let Some(end) = hostport.find(']') {
        let host = &hostport[..end];
        return host.strip_prefix('[').unwrap_or(host);
    }
    &hostport[..colon]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_order_is_ignored() {
        let a = normalize_url("http://h/?a=1&b=2").unwrap();
        let b = normalize_url("http://h/?b=2&a=1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "http://h/?a=1&b=2");
    }

    #[test]
    fn test_extra_param_is_significant() {
        let a = normalize_url("http://h/?a=1").unwrap();
        let b = normalize_url("http://h/?a=1&b=2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_repeated_key_keeps_value_order() {
        let a = normalize_url("http://h/p?z=0&k=2&k=1").unwrap();
        assert_eq!(a, "http://h/p?k=2&k=1&z=0");
        let b = normalize_url("http://h/p?k=1&k=2&z=0").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_scheme_host_path_untouched() {
        assert_eq!(
            normalize_url("https://api.example.com:8443/v1/items").unwrap(),
            "https://api.example.com:8443/v1/items"
        );
        assert_ne!(
            normalize_url("http://h:80/").unwrap(),
            normalize_url("http://h/").unwrap()
        );
        assert_ne!(
            normalize_url("http://h/a/").unwrap(),
            normalize_url("http://h/a").unwrap()
        );
    }

    #[test]
    fn test_empty_query_dropped() {
        assert_eq!(normalize_url("http://h/x?").unwrap(), "http://h/x");
    }

    #[test]
    fn test_invalid_url_is_parse_error() {
        let err = normalize_url("http://exa mple.com/").unwrap_err();
        assert!(matches!(err, MatchError::UrlParse { .. }));
        assert!(normalize_url("").is_err());
    }

    #[test]
    fn test_query_encoding_is_canonicalized() {
        let plus = normalize_url("http://a/?a=b+c").unwrap();
        assert_eq!(normalize_url("http://a/?a=b%20c").unwrap(), plus);
        assert_eq!(plus, "http://a/?a=b+c");
        assert_eq!(normalize_url("http://a/?a=%zz").unwrap(), "http://a/?a=%25zz");
    }

    #[test]
    fn test_request_host_strips_port() {
        let uri: Uri = "http://example.com:8080/x".parse().unwrap();
        assert_eq!(request_host(&uri), Some("example.com"));
        let uri: Uri = "http://example.com/x".parse().unwrap();
        assert_eq!(request_host(&uri), Some("example.com"));
    }

    #[test]
    fn test_request_host_ipv6() {
        let uri: Uri = "http://[::1]:8080/".parse().unwrap();
        assert_eq!(request_host(&uri), Some("::1"));
        let uri: Uri = "http://[::1]/".parse().unwrap();
        assert_eq!(request_host(&uri), Some("::1"));
    }

    #[test]
    fn test_request_host_strips_userinfo() {
        let uri: Uri = "http://user:pw@example.com:9000/".parse().unwrap();
        assert_eq!(request_host(&uri), Some("example.com"));
    }

    #[test]
    fn test_origin_form_has_no_host() {
        let uri: Uri = "/only/path".parse().unwrap();
        assert_eq!(request_host(&uri), None);
    }
}
