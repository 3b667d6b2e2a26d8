//! Minimal `Cookie` header parsing.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, header};

/// Every cookie sent with the request. Later duplicates win.
pub fn parse(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_owned(), value.trim().trim_matches('"').to_owned()))
        })
        .collect()
}

/// One cookie's value.
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    parse(headers).remove(name)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn parses_multiple_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("lang=fr; census.sid=abc"));
        let cookies = parse(&headers);
        assert_eq!(cookies.get("lang").map(String::as_str), Some("fr"));
        assert_eq!(cookies.get("census.sid").map(String::as_str), Some("abc"));
    }

    #[test]
    fn ignores_malformed_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("junk; =x; lang=\"de\""));
        assert_eq!(get(&headers, "lang").as_deref(), Some("de"));
        assert_eq!(parse(&headers).len(), 1);
    }

    #[test]
    fn no_header_no_cookies() {
        assert!(get(&HeaderMap::new(), "lang").is_none());
    }
}
