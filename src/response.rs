//! CGI-style response assembly.
//!
//! Responses are written to the gateway as a `Status:` line, headers, a
//! blank line and the body. Every response carries a `Content-Type` and an
//! accurate `Content-Length`.

/// One complete response, serialized by the worker just before the request
/// is released.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Plain-text response with the given status.
    pub fn plain(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// `200 text/html` page.
    pub fn html(body: String) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: body.into_bytes(),
        }
    }

    /// `302` redirect. CR and LF are stripped from the location before it is
    /// placed in the header.
    pub fn redirect(location: &str) -> Self {
        let sanitized: String = location.chars().filter(|c| *c != '\r' && *c != '\n').collect();
        Self {
            status: 302,
            headers: vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("Location".to_string(), sanitized),
            ],
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serializes into the bytes handed back to the gateway.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = format!("Status: {}\r\n", self.status);
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str(&format!("Content-Length: {}\r\n\r\n", self.body.len()));

        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}
