//! Derives the limiting identifier for a request.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

// Edge-asserted headers first; x-forwarded-for is client-controlled unless a
// trusted proxy chain rewrites it.
const CDN_CLIENT_IP: &str = "cf-connecting-ip";
const REAL_IP: &str = "x-real-ip";
const FORWARDED_FOR: &str = "x-forwarded-for";

/// `user:<id>` when authenticated, otherwise `ip:<addr>` from the first
/// usable proxy header, or `ip:unknown`.
pub fn client_identifier(headers: &HeaderMap, user_id: Option<&str>) -> String {
    if let Some(id) = user_id {
        return format!("user:{}", id);
    }
    format!("ip:{}", client_ip(headers).unwrap_or("unknown"))
}

fn client_ip(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, CDN_CLIENT_IP)
        .or_else(|| header_str(headers, REAL_IP))
        .or_else(|| {
            header_str(headers, FORWARDED_FOR)
                .and_then(|list| list.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn user_id_wins_over_ip_headers() {
        let h = headers(&[("cf-connecting-ip", "203.0.113.7")]);
        assert_eq!(client_identifier(&h, Some("42")), "user:42");
    }

    #[test]
    fn cdn_header_wins_over_forwarded_for() {
        let h = headers(&[
            ("x-forwarded-for", "198.51.100.1, 10.0.0.1"),
            ("x-real-ip", "192.0.2.5"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(client_identifier(&h, None), "ip:203.0.113.7");
    }

    #[test]
    fn real_ip_wins_over_forwarded_for() {
        let h = headers(&[
            ("x-forwarded-for", "198.51.100.1"),
            ("x-real-ip", "192.0.2.5"),
        ]);
        assert_eq!(client_identifier(&h, None), "ip:192.0.2.5");
    }

    #[test]
    fn forwarded_for_uses_first_entry() {
        let h = headers(&[("x-forwarded-for", " 198.51.100.1 , 10.0.0.1")]);
        assert_eq!(client_identifier(&h, None), "ip:198.51.100.1");
    }

    #[test]
    fn empty_headers_fall_through() {
        let h = headers(&[("cf-connecting-ip", " "), ("x-forwarded-for", ",10.0.0.1")]);
        assert_eq!(client_identifier(&h, None), "ip:unknown");
    }

    #[test]
    fn no_headers_is_unknown() {
        assert_eq!(client_identifier(&HeaderMap::new(), None), "ip:unknown");
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer abc.def")])), Some("abc.def"));
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic Zm9v")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
