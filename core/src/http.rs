//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! resource client builds `HttpRequest` values and parses `HttpResponse`
//! values; a [`Transport`](crate::transport::Transport) implementation is
//! the only thing that touches the network.
//!
//! All fields use owned types (`String`, `Vec`) so values can be moved into
//! spawned tasks without lifetime concerns.

use std::fmt;

use url::form_urlencoded;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built by `ResourceClient::build_*` methods. `path` is the absolute URL
/// without a query string; query parameters live in `query` so they can be
/// asserted on without re-parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Full URL including the percent-encoded query string.
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a transport after executing an `HttpRequest`, then passed
/// to `ResourceClient::parse_*` methods for classification and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: Vec<(&str, &str)>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: "http://localhost:3000/subtasks".to_string(),
            query: query
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: vec![("X-Client-Request-Id".to_string(), "abc".to_string())],
            body: None,
        }
    }

    #[test]
    fn url_without_query_is_the_path() {
        assert_eq!(request(vec![]).url(), "http://localhost:3000/subtasks");
    }

    #[test]
    fn url_encodes_query_pairs_in_order() {
        let req = request(vec![("list_id", "12"), ("completed_tasks", "false")]);
        assert_eq!(
            req.url(),
            "http://localhost:3000/subtasks?list_id=12&completed_tasks=false"
        );
    }

    #[test]
    fn url_percent_encodes_values() {
        let req = request(vec![("q", "a b&c")]);
        assert_eq!(req.url(), "http://localhost:3000/subtasks?q=a+b%26c");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = request(vec![]);
        assert_eq!(req.header("x-client-request-id"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(409, "").is_success());
    }
}
