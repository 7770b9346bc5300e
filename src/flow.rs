// Keywarden Flow - Mutable per-request object at the transport boundary
// The MITM runtime hands one Flow per intercepted request; writing the
// response slot short-circuits upstream delivery.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

/// Response synthesized by the core instead of forwarding upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl SyntheticResponse {
    /// Build a plain-text response.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain"),
        );
        Self {
            status,
            headers,
            body: body.into().into_bytes(),
        }
    }
}

/// One intercepted request.
///
/// The transport owns TLS termination and HTTP parsing; by the time a Flow
/// reaches the core, `host` is the parsed destination hostname (no port),
/// `path` is the wire path, and query parameter values are decoded. Header
/// lookup is case-insensitive regardless of how the transport cased them.
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    method: Method,
    scheme: String,
    host: String,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Vec<u8>,
    response: Option<SyntheticResponse>,
}

impl Flow {
    pub fn new(method: Method, scheme: &str, host: &str, path: &str) -> Self {
        Self {
            method,
            scheme: scheme.to_string(),
            host: host.to_string(),
            path: path.to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            response: None,
        }
    }

    /// Construction helper for transport adapters and tests. Panics on
    /// header names/values that HTTP itself would reject.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = HeaderName::try_from(name).expect("valid header name");
        let value = HeaderValue::from_str(value).expect("valid header value");
        self.headers.insert(name, value);
        self
    }

    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full request URL, query values re-encoded for the wire.
    pub fn url(&self) -> String {
        let mut url = format!("{}://{}{}", self.scheme, self.host, self.path);
        if !self.query.is_empty() {
            let encoded: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| {
                    format!("{}={}", encode_query_component(k), encode_query_component(v))
                })
                .collect();
            url.push('?');
            url.push_str(&encoded.join("&"));
        }
        url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Case-insensitive header lookup, dropping non-UTF8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First query parameter with this exact name.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace the first query parameter with this name. Returns false when
    /// no such parameter exists.
    pub fn set_query_value(&mut self, name: &str, value: &str) -> bool {
        if let Some(pair) = self.query.iter_mut().find(|(k, _)| k == name) {
            pair.1 = value.to_string();
            true
        } else {
            false
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn response(&self) -> Option<&SyntheticResponse> {
        self.response.as_ref()
    }

    pub fn set_response(&mut self, response: SyntheticResponse) {
        self.response = Some(response);
    }
}

/// Percent-encode a query component, keeping RFC 3986 unreserved characters.
/// Matches the canonical encoding SigV4 applies, so a URL built from decoded
/// parameters canonicalizes to itself.
pub fn encode_query_component(component: &str) -> String {
    let mut out = String::with_capacity(component.len());
    for byte in component.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
