//! HTTP/1.1 response builder with a single designated completion point.
//!
//! [`Response`] offers a fluent builder API and serializes to a byte buffer
//! for transmission. A response additionally carries one optional
//! [`FinalizeHook`]: a one-shot observer of the completion point, the moment
//! the headers and body are final and about to be sent. The hook slot is
//! taken before invocation, so finalizing a response more than once fires
//! the hook at most once.

use std::fmt;

use bytes::{BufMut, BytesMut};

use super::{Headers, StatusCode};

/// One-shot observer of a response's completion point.
///
/// Receives the headers and body exactly as they are about to be sent.
pub type FinalizeHook = Box<dyn FnOnce(&Headers, &[u8]) + Send>;

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use recache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
    on_finalize: Option<FinalizeHook>,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
            on_finalize: None,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces a singleton header in-place (see [`Headers::set`]).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Sets the response body from a string.
    ///
    /// The `Content-Length` header is written automatically by [`into_bytes`](Self::into_bytes).
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the current response body bytes.
    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Registers the completion-point hook for this response.
    ///
    /// A response holds a single hook slot; registering again replaces the
    /// previous hook. The hook fires when the response is finalized — either
    /// explicitly via [`finalize`](Self::finalize) or implicitly by
    /// [`into_bytes`](Self::into_bytes) — and observes the headers and body
    /// exactly as sent.
    pub fn set_on_finalize(&mut self, hook: FinalizeHook) {
        self.on_finalize = Some(hook);
    }

    /// Invokes the completion-point hook, if one is registered.
    ///
    /// The hook is removed from its slot before it runs, so repeated
    /// finalization fires it at most once; later calls are no-ops.
    pub fn finalize(&mut self) {
        if let Some(hook) = self.on_finalize.take() {
            hook(&self.headers, &self.body);
        }
    }

    /// Serializes the response into a `BytesMut` buffer using HTTP/1.1 wire format.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if the body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Content-Length: <n>` (always written).
    /// - `Connection: keep-alive` or `Connection: close`.
    ///
    /// The completion-point hook fires after the default `Content-Type` is
    /// applied and before the wire bytes are produced.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        self.finalize();

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.set("Connection", connection);

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Status line
        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        // Headers
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        // Content-Length is always the last header before the blank line
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        // Body
        if !self.body.is_empty() {
            buf.put(self.body.as_slice());
        }

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("keep_alive", &self.keep_alive)
            .field("has_finalize_hook", &self.on_finalize.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let r = Response::new(StatusCode::Ok).body("Hello");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn custom_header() {
        let r = Response::new(StatusCode::Ok)
            .header("X-Request-Id", "abc-123")
            .body("ok");
        let s = to_string(r.into_bytes());
        assert!(s.contains("X-Request-Id: abc-123\r\n"));
    }

    #[test]
    fn no_body_no_content_type() {
        let r = Response::new(StatusCode::NoContent);
        let s = to_string(r.into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn connection_close() {
        let r = Response::new(StatusCode::Ok).keep_alive(false);
        let s = to_string(r.into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn finalize_fires_at_most_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut r = Response::new(StatusCode::Ok).body("hi");
        r.set_on_finalize(Box::new(move |_headers, _body| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        r.finalize();
        r.finalize();
        r.finalize();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn into_bytes_finalizes_with_sent_headers() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let slot = Arc::clone(&seen);
        let mut r = Response::new(StatusCode::Ok).body("payload");
        // No explicit Content-Type: the hook must observe the default one.
        r.set_on_finalize(Box::new(move |headers, body| {
            *slot.lock().unwrap() =
                Some((headers.get("content-type").map(str::to_owned), body.to_vec()));
        }));

        let _ = r.into_bytes();

        let (content_type, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
        assert_eq!(body, b"payload");
    }

    #[test]
    fn finalized_response_serializes_without_refiring() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut r = Response::new(StatusCode::Ok).body("x");
        r.set_on_finalize(Box::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        r.finalize();
        let _ = r.into_bytes(); // finalizes again internally — must be a no-op

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
